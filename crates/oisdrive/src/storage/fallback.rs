use async_trait::async_trait;
use chrono::Utc;

use super::{
    content_type_for, AttachmentKey, AttachmentStore, ProbeOutcome, StorageError, StorageMode,
    StorageResult, StoredFile, UploadedFileRecord,
};
use crate::intake::{IncomingFile, SubmissionId};

const PLACEHOLDER_SCHEME: &str = "local-placeholder://";

/// Store used when no bucket is configured.
///
/// Records are synthesized so the submission flow stays identical, but no
/// bytes are kept: reads report [`StorageError::ReadUnsupported`].
#[derive(Debug, Clone, Default)]
pub struct PlaceholderAttachmentStore;

impl PlaceholderAttachmentStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AttachmentStore for PlaceholderAttachmentStore {
    fn mode(&self) -> StorageMode {
        StorageMode::Fallback
    }

    async fn upload(
        &self,
        submission_id: &SubmissionId,
        files: &[IncomingFile],
    ) -> StorageResult<Vec<UploadedFileRecord>> {
        let records: Vec<UploadedFileRecord> = files
            .iter()
            .map(|file| {
                let uploaded_at = Utc::now();
                let key = AttachmentKey::new(submission_id, &file.name, uploaded_at);
                let id = key.file_id();
                UploadedFileRecord {
                    retrieval_url: Some(format!("{PLACEHOLDER_SCHEME}{id}")),
                    id,
                    original_name: file.name.clone(),
                    storage_key: key.storage_key(),
                    size: file.size(),
                    mime_type: content_type_for(file),
                    uploaded_at,
                }
            })
            .collect();

        tracing::warn!(
            submission_id = %submission_id,
            files = records.len(),
            "attachments accepted without persistence"
        );
        Ok(records)
    }

    async fn fetch(&self, _file_id: &str) -> StorageResult<StoredFile> {
        Err(StorageError::ReadUnsupported)
    }

    async fn delete(&self, _file_id: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn probe(&self) -> ProbeOutcome {
        ProbeOutcome::NotConfigured
    }
}

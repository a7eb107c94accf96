//! Attachment storage.
//!
//! One [`AttachmentStore`] is chosen at startup: the S3-backed
//! [`CloudAttachmentStore`] when credentials and a bucket are configured,
//! otherwise the [`PlaceholderAttachmentStore`], which records metadata only.

mod cloud;
mod fallback;
mod health;
mod keys;
mod router;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::StorageConfig;
use crate::intake::{IncomingFile, SubmissionId};

pub use cloud::{classify_probe_error, CloudAttachmentStore};
pub use fallback::PlaceholderAttachmentStore;
pub use health::{check_storage, ProbeOutcome, StorageHealthReport, StorageHealthStatus};
pub use keys::{sanitize_file_name, AttachmentKey, KEY_PREFIX};
pub use router::storage_router;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const CLOUD_PROVIDER: &str = "AWS S3";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Erreur lors de l'upload vers S3: {0}")]
    UploadFailed(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("invalid file identifier: {0}")]
    InvalidFileId(String),
    #[error("attachments are not persisted by the placeholder store")]
    ReadUnsupported,
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
    #[error("storage configuration error: {0}")]
    Config(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Where uploaded attachments end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    Cloud(CloudLocation),
    Fallback,
}

impl StorageMode {
    pub fn is_cloud(&self) -> bool {
        matches!(self, StorageMode::Cloud(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudLocation {
    pub provider: String,
    pub bucket: String,
    pub region: String,
}

/// Metadata for one stored attachment, returned to the visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileRecord {
    pub id: String,
    pub original_name: String,
    pub storage_key: String,
    pub size: u64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_url: Option<String>,
}

/// Bytes and metadata read back from the store.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    fn mode(&self) -> StorageMode;

    /// Stores every file or none of them; the first failure fails the batch.
    async fn upload(
        &self,
        submission_id: &SubmissionId,
        files: &[IncomingFile],
    ) -> StorageResult<Vec<UploadedFileRecord>>;

    async fn fetch(&self, file_id: &str) -> StorageResult<StoredFile>;

    async fn delete(&self, file_id: &str) -> StorageResult<()>;

    async fn probe(&self) -> ProbeOutcome;
}

/// Declared type when the browser sent one, otherwise guessed from the extension.
pub fn content_type_for(file: &IncomingFile) -> String {
    file.content_type.clone().unwrap_or_else(|| {
        mime_guess::from_path(&file.name)
            .first_raw()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string()
    })
}

/// Picks the store for this process from configuration.
pub fn attachment_store_from_config(config: &StorageConfig) -> StorageResult<Arc<dyn AttachmentStore>> {
    match config.credentials() {
        Some(credentials) => {
            let store = CloudAttachmentStore::s3(
                &credentials,
                &config.region,
                config.endpoint.as_deref(),
            )?;
            tracing::info!(
                bucket = %credentials.bucket,
                region = %config.region,
                "attachments stored in S3"
            );
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("S3 not configured; attachments will not be persisted");
            Ok(Arc::new(PlaceholderAttachmentStore::new()))
        }
    }
}

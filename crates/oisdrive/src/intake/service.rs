use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use super::attachments::{validate_files, AttachmentValidationError};
use super::domain::{FileRef, IncomingFile, SubmissionId};
use super::validation::{ContactPayload, FieldError};
use crate::notify::{NotificationDispatcher, NotificationOutcome};
use crate::storage::{AttachmentStore, StorageError, UploadedFileRecord};

pub const UNKNOWN_CALLER: &str = "unknown";

/// One contact form post, already split into fields and attachment parts.
#[derive(Debug, Clone)]
pub struct ContactRequest {
    pub payload: ContactPayload,
    pub attachments: Vec<IncomingFile>,
    /// Best-effort client address from proxy headers.
    pub caller: String,
}

impl ContactRequest {
    pub fn json(payload: ContactPayload) -> Self {
        Self {
            payload,
            attachments: Vec::new(),
            caller: UNKNOWN_CALLER.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub id: SubmissionId,
    pub timestamp: DateTime<Utc>,
    pub files: Vec<UploadedFileRecord>,
    pub notification: NotificationOutcome,
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("invalid contact form ({} field errors)", .0.len())]
    Fields(Vec<FieldError>),
    #[error(transparent)]
    Attachments(#[from] AttachmentValidationError),
    #[error("attachment upload failed: {0}")]
    Storage(#[from] StorageError),
}

/// Validates a submission, stores its attachments, then notifies by e-mail.
pub struct ContactService {
    storage: Arc<dyn AttachmentStore>,
    notifier: Arc<NotificationDispatcher>,
}

impl ContactService {
    pub fn new(storage: Arc<dyn AttachmentStore>, notifier: Arc<NotificationDispatcher>) -> Self {
        Self { storage, notifier }
    }

    pub fn storage(&self) -> Arc<dyn AttachmentStore> {
        Arc::clone(&self.storage)
    }

    pub fn notifier(&self) -> &NotificationDispatcher {
        &self.notifier
    }

    /// Attachment problems abort before anything is sent; e-mail problems never do.
    pub async fn submit(&self, request: ContactRequest) -> Result<SubmissionReceipt, ContactError> {
        let ContactRequest {
            payload,
            attachments,
            caller,
        } = request;

        let mut submission = payload.into_submission().map_err(ContactError::Fields)?;
        let timestamp = Utc::now();
        let id = SubmissionId::generate(timestamp);

        let files = if attachments.is_empty() {
            Vec::new()
        } else {
            let refs: Vec<FileRef> = attachments.iter().map(IncomingFile::file_ref).collect();
            validate_files(&refs)?;
            let records = self.storage.upload(&id, &attachments).await?;
            submission.attachments = attachments.iter().map(|file| file.name.clone()).collect();
            records
        };

        tracing::info!(
            submission_id = %id,
            name = %submission.name,
            email = %submission.email,
            phone = %submission.phone,
            company = submission.company.as_deref().unwrap_or(""),
            service_type = %submission.service_type,
            urgency = %submission.urgency,
            description = %submission.description,
            attachments = ?submission.attachments,
            timestamp = %timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            ip = %caller,
            "contact form submission"
        );

        let notification = self.notifier.send(&submission).await;
        if !notification.success {
            tracing::error!(
                submission_id = %id,
                outcome = %notification.message,
                "email sending failed; submission still accepted"
            );
        }

        Ok(SubmissionReceipt {
            id,
            timestamp,
            files,
            notification,
        })
    }
}

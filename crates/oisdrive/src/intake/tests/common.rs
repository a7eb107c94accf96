use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request};
use axum::response::Response;
use object_store::memory::InMemory;
use serde_json::Value;

use crate::config::SiteConfig;
use crate::intake::{ContactPayload, ContactService, IncomingFile, SubmissionId};
use crate::notify::{EmailTemplate, Mailer, NotificationDispatcher, NotificationError};
use crate::storage::{
    AttachmentStore, CloudAttachmentStore, PlaceholderAttachmentStore, ProbeOutcome, StorageError,
    StorageMode, StorageResult, StoredFile, UploadedFileRecord,
};

pub(super) const BOUNDARY: &str = "oisdrive-test-boundary";

#[derive(Default)]
pub(super) struct RecordingMailer {
    pub(super) sent: Mutex<Vec<(String, EmailTemplate)>>,
    pub(super) failing: bool,
}

impl RecordingMailer {
    pub(super) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub(super) fn sent(&self) -> Vec<(String, EmailTemplate)> {
        self.sent.lock().expect("mailer lock").clone()
    }

    pub(super) fn sent_to(&self, to: &str) -> Option<EmailTemplate> {
        self.sent()
            .into_iter()
            .find(|(recipient, _)| recipient == to)
            .map(|(_, template)| template)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, template: &EmailTemplate) -> Result<(), NotificationError> {
        if self.failing {
            return Err(NotificationError::Rejected {
                status: 502,
                body: "upstream unavailable".to_string(),
            });
        }
        self.sent
            .lock()
            .expect("mailer lock")
            .push((to.to_string(), template.clone()));
        Ok(())
    }
}

/// Store whose uploads always fail.
pub(super) struct BrokenStore;

#[async_trait]
impl AttachmentStore for BrokenStore {
    fn mode(&self) -> StorageMode {
        StorageMode::Fallback
    }

    async fn upload(
        &self,
        _submission_id: &SubmissionId,
        _files: &[IncomingFile],
    ) -> StorageResult<Vec<UploadedFileRecord>> {
        Err(StorageError::UploadFailed("bucket unreachable".to_string()))
    }

    async fn fetch(&self, file_id: &str) -> StorageResult<StoredFile> {
        Err(StorageError::NotFound(file_id.to_string()))
    }

    async fn delete(&self, _file_id: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn probe(&self) -> ProbeOutcome {
        ProbeOutcome::Unhealthy("bucket unreachable".to_string())
    }
}

pub(super) fn memory_cloud_store() -> Arc<CloudAttachmentStore> {
    Arc::new(CloudAttachmentStore::with_store(
        Arc::new(InMemory::new()),
        "oisdrive-attachments",
        "eu-west-3",
    ))
}

pub(super) fn build_service_with(
    store: Arc<dyn AttachmentStore>,
    mailer: Arc<RecordingMailer>,
) -> Arc<ContactService> {
    let notifier = Arc::new(NotificationDispatcher::new(mailer, SiteConfig::default()));
    Arc::new(ContactService::new(store, notifier))
}

pub(super) fn build_service() -> (Arc<ContactService>, Arc<RecordingMailer>) {
    let mailer = Arc::new(RecordingMailer::default());
    let service = build_service_with(Arc::new(PlaceholderAttachmentStore::new()), mailer.clone());
    (service, mailer)
}

pub(super) fn valid_payload() -> ContactPayload {
    ContactPayload {
        name: "Jean Dupont".to_string(),
        email: "jean@example.com".to_string(),
        phone: "0612345678".to_string(),
        company: None,
        service_type: "emergency-recovery".to_string(),
        urgency: "emergency".to_string(),
        description: "Perte totale de données suite à incendie".to_string(),
        files: None,
    }
}

pub(super) fn pdf(name: &str, size: usize) -> IncomingFile {
    IncomingFile::new(name, Some("application/pdf"), vec![b'%'; size])
}

pub(super) fn json_request(body: &Value) -> Request<Body> {
    Request::post("/api/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize body")))
        .expect("request")
}

/// Multipart request with text fields followed by file parts `(name, content type, bytes)`.
pub(super) fn multipart_request(
    fields: &[(&str, &str)],
    files: &[(&str, &str, &[u8])],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (file_name, content_type, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"attachments\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/api/contact")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

pub(super) fn form_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("name", "Jean Dupont"),
        ("email", "jean@example.com"),
        ("phone", "0612345678"),
        ("serviceType", "data-recovery"),
        ("urgency", "high"),
        ("description", "Serveur RAID 5 en panne après coupure"),
    ]
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

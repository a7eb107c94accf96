use super::common::*;
use std::sync::Arc;

use crate::intake::{
    AttachmentValidationError, ContactError, ContactPayload, ContactRequest, IncomingFile,
};
use crate::storage::{AttachmentStore, PlaceholderAttachmentStore};

fn request_with(attachments: Vec<IncomingFile>) -> ContactRequest {
    ContactRequest {
        payload: valid_payload(),
        attachments,
        caller: "203.0.113.7".to_string(),
    }
}

#[tokio::test]
async fn accepted_submission_gets_an_id_and_both_emails() {
    let (service, mailer) = build_service();

    let receipt = service
        .submit(ContactRequest::json(valid_payload()))
        .await
        .expect("submission accepted");

    assert!(receipt.id.as_str().starts_with("contact-"));
    assert!(receipt.files.is_empty());
    assert!(receipt.notification.success);

    let admin = mailer.sent_to("contact@oisdrive.com").expect("admin email sent");
    assert!(admin.subject.contains("emergency-recovery"));
    assert!(admin.text.contains("2 heures"));
    assert!(mailer.sent_to("jean@example.com").is_some());
}

#[tokio::test]
async fn field_errors_are_reported_before_any_side_effect() {
    let (service, mailer) = build_service();
    let payload = ContactPayload {
        email: "not-an-email".to_string(),
        description: "trop court".chars().take(9).collect(),
        ..valid_payload()
    };

    let error = service
        .submit(ContactRequest::json(payload))
        .await
        .expect_err("payload is invalid");

    match error {
        ContactError::Fields(errors) => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["email", "description"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn invalid_attachments_abort_before_upload_and_email() {
    let mailer = Arc::new(RecordingMailer::default());
    let store = memory_cloud_store();
    let service = build_service_with(store.clone(), mailer.clone());

    let error = service
        .submit(request_with(vec![IncomingFile::new("virus.exe", None, b"MZ".to_vec())]))
        .await
        .expect_err("exe rejected");

    assert!(matches!(
        error,
        ContactError::Attachments(AttachmentValidationError::UnsupportedExtension { .. })
    ));
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn attachments_are_stored_and_listed_in_the_admin_email() {
    let mailer = Arc::new(RecordingMailer::default());
    let store = memory_cloud_store();
    let service = build_service_with(store.clone(), mailer.clone());

    let receipt = service
        .submit(request_with(vec![pdf("devis.pdf", 128), pdf("photo.pdf", 64)]))
        .await
        .expect("submission accepted");

    assert_eq!(receipt.files.len(), 2);
    for record in &receipt.files {
        assert!(record.storage_key.contains(receipt.id.as_str()));
        let stored = store.fetch(&record.id).await.expect("stored file readable");
        assert_eq!(stored.data.len() as u64, record.size);
    }

    let admin = mailer.sent_to("contact@oisdrive.com").expect("admin email sent");
    assert!(admin.text.contains("Fichiers joints: devis.pdf, photo.pdf"));
}

#[tokio::test]
async fn storage_failure_fails_the_submission_without_email() {
    let mailer = Arc::new(RecordingMailer::default());
    let service = build_service_with(Arc::new(BrokenStore), mailer.clone());

    let error = service
        .submit(request_with(vec![pdf("devis.pdf", 10)]))
        .await
        .expect_err("upload fails");

    assert!(matches!(error, ContactError::Storage(_)));
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn email_failure_does_not_fail_the_submission() {
    let mailer = Arc::new(RecordingMailer::failing());
    let service = build_service_with(Arc::new(PlaceholderAttachmentStore::new()), mailer);

    let receipt = service
        .submit(ContactRequest::json(valid_payload()))
        .await
        .expect("submission still accepted");

    assert!(!receipt.notification.success);
    assert_eq!(receipt.notification.message, "Erreur lors de l'envoi des emails");
}

#[tokio::test]
async fn concurrent_submissions_get_distinct_ids() {
    let (service, _) = build_service();

    let (first, second) = tokio::join!(
        service.submit(ContactRequest::json(valid_payload())),
        service.submit(ContactRequest::json(valid_payload())),
    );

    assert_ne!(
        first.expect("first accepted").id,
        second.expect("second accepted").id
    );
}

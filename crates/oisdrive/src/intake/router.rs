use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::SecondsFormat;
use serde::Serialize;

use super::attachments::MAX_TOTAL_SIZE;
use super::domain::IncomingFile;
use super::service::{ContactError, ContactRequest, ContactService, SubmissionReceipt, UNKNOWN_CALLER};
use super::validation::{ContactPayload, FieldError};
use crate::cors::preflight;
use crate::storage::UploadedFileRecord;

/// Room for the form fields and multipart framing on top of the attachments.
const FORM_OVERHEAD: usize = 5 * 1024 * 1024;

pub const SUCCESS_MESSAGE: &str =
    "Votre demande a été envoyée avec succès. Notre équipe vous contactera dans les plus brefs délais.";
pub const INVALID_FORM_MESSAGE: &str = "Données du formulaire invalides";
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Une erreur est survenue lors de l'envoi de votre demande. Veuillez réessayer ou nous contacter directement.";

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ContactResponseData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponseData {
    pub id: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<UploadedFileRecord>>,
}

impl ContactResponse {
    fn accepted(receipt: SubmissionReceipt) -> Self {
        Self {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            data: Some(ContactResponseData {
                id: receipt.id.0,
                timestamp: receipt.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                files: (!receipt.files.is_empty()).then_some(receipt.files),
            }),
            errors: None,
        }
    }

    fn failure(message: impl Into<String>, errors: Option<Vec<FieldError>>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            errors,
        }
    }
}

/// Router builder for the contact form endpoint.
pub fn contact_router(service: Arc<ContactService>) -> Router {
    Router::new()
        .route(
            "/api/contact",
            post(submit_handler).options(|| async { preflight("POST, OPTIONS") }),
        )
        .layer(DefaultBodyLimit::max(MAX_TOTAL_SIZE as usize + FORM_OVERHEAD))
        .with_state(service)
}

/// Client address as reported by the fronting proxy.
pub fn caller_address(headers: &HeaderMap) -> String {
    ["x-forwarded-for", "x-real-ip"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_CALLER)
        .to_string()
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .map(|parsed| parsed.type_() == mime::MULTIPART && parsed.subtype() == mime::FORM_DATA)
        .unwrap_or(false)
}

/// The body could not be read as a contact form.
struct MalformedBody(String);

fn assign_text_field(payload: &mut ContactPayload, name: &str, value: String) {
    match name {
        "name" => payload.name = value,
        "email" => payload.email = value,
        "phone" => payload.phone = value,
        "company" => payload.company = Some(value),
        "serviceType" => payload.service_type = value,
        "urgency" => payload.urgency = value,
        "description" => payload.description = value,
        "files" | "files[]" => payload.files.get_or_insert_with(Vec::new).push(value),
        other => tracing::debug!(field = other, "ignoring unknown contact form field"),
    }
}

async fn read_multipart(request: Request) -> Result<(ContactPayload, Vec<IncomingFile>), MalformedBody> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| MalformedBody(rejection.body_text()))?;

    let mut payload = ContactPayload::default();
    let mut attachments = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MalformedBody(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) if !file_name.is_empty() => {
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| MalformedBody(e.body_text()))?;
                attachments.push(IncomingFile::new(file_name, content_type.as_deref(), data));
            }
            Some(_) => {
                // Empty file input; the browser still sends the part.
                field
                    .bytes()
                    .await
                    .map_err(|e| MalformedBody(e.body_text()))?;
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| MalformedBody(e.body_text()))?;
                assign_text_field(&mut payload, &name, value);
            }
        }
    }

    Ok((payload, attachments))
}

async fn read_json(request: Request) -> Result<ContactPayload, MalformedBody> {
    let body = Bytes::from_request(request, &())
        .await
        .map_err(|rejection| MalformedBody(rejection.body_text()))?;
    serde_json::from_slice(&body).map_err(|e| MalformedBody(e.to_string()))
}

pub(crate) async fn submit_handler(
    State(service): State<Arc<ContactService>>,
    request: Request,
) -> Response {
    let caller = caller_address(request.headers());
    let parsed = if is_multipart(request.headers()) {
        read_multipart(request).await
    } else {
        read_json(request).await.map(|payload| (payload, Vec::new()))
    };

    let (payload, attachments) = match parsed {
        Ok(parsed) => parsed,
        Err(MalformedBody(detail)) => {
            tracing::warn!(ip = %caller, detail = %detail, "unreadable contact form body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ContactResponse::failure(INVALID_FORM_MESSAGE, None)),
            )
                .into_response();
        }
    };

    let request = ContactRequest {
        payload,
        attachments,
        caller,
    };

    match service.submit(request).await {
        Ok(receipt) => (StatusCode::OK, Json(ContactResponse::accepted(receipt))).into_response(),
        Err(ContactError::Fields(errors)) => (
            StatusCode::BAD_REQUEST,
            Json(ContactResponse::failure(INVALID_FORM_MESSAGE, Some(errors))),
        )
            .into_response(),
        Err(ContactError::Attachments(error)) => (
            StatusCode::BAD_REQUEST,
            Json(ContactResponse::failure(error.to_string(), None)),
        )
            .into_response(),
        Err(ContactError::Storage(error)) => {
            tracing::error!(error = %error, "contact form error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ContactResponse::failure(GENERIC_FAILURE_MESSAGE, None)),
            )
                .into_response()
        }
    }
}

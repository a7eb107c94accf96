use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use super::health::check_storage;
use super::{sanitize_file_name, AttachmentStore, StorageError};
use crate::cors::preflight;

const FILE_CACHE_CONTROL: &str = "private, max-age=3600";

/// Routes for attachment retrieval and the storage health probe.
pub fn storage_router(store: Arc<dyn AttachmentStore>) -> Router {
    Router::new()
        .route("/api/files", get(missing_file_id))
        .route("/api/files/", get(missing_file_id))
        .route(
            "/api/files/:file_id",
            get(file_handler).options(|| async { preflight("GET, OPTIONS") }),
        )
        .route(
            "/api/health/storage",
            get(storage_health_handler).options(|| async { preflight("GET, OPTIONS") }),
        )
        .with_state(store)
}

async fn missing_file_id() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "File ID is required" })),
    )
        .into_response()
}

pub(crate) async fn file_handler(
    State(store): State<Arc<dyn AttachmentStore>>,
    Path(file_id): Path<String>,
) -> Response {
    if file_id.trim().is_empty() {
        return missing_file_id().await;
    }

    match store.fetch(&file_id).await {
        Ok(file) => {
            let disposition = format!(
                "attachment; filename=\"{}\"",
                sanitize_file_name(&file.file_name)
            );
            let content_type = HeaderValue::from_str(&file.content_type)
                .unwrap_or_else(|_| HeaderValue::from_static(super::DEFAULT_CONTENT_TYPE));
            let disposition = HeaderValue::from_str(&disposition)
                .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_LENGTH, HeaderValue::from(file.data.len())),
                    (header::CONTENT_DISPOSITION, disposition),
                    (header::CACHE_CONTROL, HeaderValue::from_static(FILE_CACHE_CONTROL)),
                ],
                file.data,
            )
                .into_response()
        }
        Err(StorageError::ReadUnsupported) => (
            StatusCode::NOT_IMPLEMENTED,
            Json(json!({
                "error": "File storage not available",
                "message": "This endpoint requires cloud storage integration",
                "fileId": file_id,
            })),
        )
            .into_response(),
        Err(StorageError::NotFound(_))
        | Err(StorageError::InvalidFileId(_))
        | Err(StorageError::DownloadFailed(_)) => {
            tracing::debug!(file_id = %file_id, "attachment not served");
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "File not found" })),
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!(error = %error, file_id = %file_id, "error serving attachment");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

pub(crate) async fn storage_health_handler(
    State(store): State<Arc<dyn AttachmentStore>>,
) -> Response {
    let report = check_storage(store.as_ref()).await;
    (report.status_code(), Json(report)).into_response()
}

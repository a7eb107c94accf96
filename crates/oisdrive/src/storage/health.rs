use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{AttachmentStore, StorageMode};

/// Result of a single reachability probe against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// No backend to reach; the placeholder store is in use.
    NotConfigured,
    Healthy,
    Unhealthy(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageHealthStatus {
    NotConfigured,
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageHealthReport {
    pub status: StorageHealthStatus,
    pub message: String,
    pub cloud_storage: bool,
    pub local_storage: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StorageHealthReport {
    pub fn from_probe(mode: &StorageMode, outcome: ProbeOutcome, timestamp: DateTime<Utc>) -> Self {
        let location = match mode {
            StorageMode::Cloud(location) => Some(location),
            StorageMode::Fallback => None,
        };

        match (location, outcome) {
            (None, _) | (_, ProbeOutcome::NotConfigured) => Self {
                status: StorageHealthStatus::NotConfigured,
                message: "Cloud storage not configured. Using local storage fallback.".to_string(),
                cloud_storage: false,
                local_storage: true,
                provider: None,
                bucket: None,
                region: None,
                error: None,
                timestamp,
            },
            (Some(location), ProbeOutcome::Healthy) => Self {
                status: StorageHealthStatus::Healthy,
                message: "Cloud storage is working correctly".to_string(),
                cloud_storage: true,
                local_storage: false,
                provider: Some(location.provider.clone()),
                bucket: Some(location.bucket.clone()),
                region: Some(location.region.clone()),
                error: None,
                timestamp,
            },
            (Some(location), ProbeOutcome::Unhealthy(error)) => Self {
                status: StorageHealthStatus::Unhealthy,
                message: format!("Cloud storage error: {error}"),
                cloud_storage: false,
                local_storage: true,
                provider: Some(location.provider.clone()),
                bucket: None,
                region: None,
                error: Some(error),
                timestamp,
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.status {
            StorageHealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            StorageHealthStatus::NotConfigured | StorageHealthStatus::Healthy => StatusCode::OK,
        }
    }
}

/// Probes the store once and builds the report served on the health endpoint.
pub async fn check_storage(store: &dyn AttachmentStore) -> StorageHealthReport {
    let mode = store.mode();
    let outcome = store.probe().await;
    if let ProbeOutcome::Unhealthy(error) = &outcome {
        tracing::warn!(error = %error, "storage probe failed");
    }
    StorageHealthReport::from_probe(&mode, outcome, Utc::now())
}

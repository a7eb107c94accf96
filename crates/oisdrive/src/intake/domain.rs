use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Services a visitor can ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    DataRecovery,
    SensitiveDataProcessing,
    LargeScaleDataManagement,
    EmergencyRecovery,
    Consultation,
}

impl ServiceType {
    pub const ALL: [ServiceType; 5] = [
        ServiceType::DataRecovery,
        ServiceType::SensitiveDataProcessing,
        ServiceType::LargeScaleDataManagement,
        ServiceType::EmergencyRecovery,
        ServiceType::Consultation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::DataRecovery => "data-recovery",
            ServiceType::SensitiveDataProcessing => "sensitive-data-processing",
            ServiceType::LargeScaleDataManagement => "large-scale-data-management",
            ServiceType::EmergencyRecovery => "emergency-recovery",
            ServiceType::Consultation => "consultation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ServiceType::DataRecovery => "Récupération de Données",
            ServiceType::SensitiveDataProcessing => "Traitement des Données Sensibles",
            ServiceType::LargeScaleDataManagement => "Gestion des Données Volumineuses",
            ServiceType::EmergencyRecovery => "Récupération d'Urgence",
            ServiceType::Consultation => "Consultation",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|value| value.as_str() == raw)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Emergency,
}

impl Urgency {
    pub const ALL: [Urgency; 4] = [
        Urgency::Low,
        Urgency::Medium,
        Urgency::High,
        Urgency::Emergency,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Emergency => "emergency",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Urgency::Low => "Faible",
            Urgency::Medium => "Moyenne",
            Urgency::High => "Élevée",
            Urgency::Emergency => "Critique",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|value| value.as_str() == raw)
    }

    pub fn is_emergency(self) -> bool {
        matches!(self, Urgency::Emergency)
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier returned to the visitor and used to group stored attachments.
///
/// Shape: `contact-{unix_millis}-{32 hex}`. No segment after the prefix contains
/// a `-`, which lets file identifiers embed it unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn generate(at: DateTime<Utc>) -> Self {
        Self(format!(
            "contact-{}-{}",
            at.timestamp_millis(),
            Uuid::new_v4().simple()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated contact request. Never persisted past the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: Option<String>,
    pub service_type: ServiceType,
    pub urgency: Urgency,
    pub description: String,
    /// Display names of the attached files.
    pub attachments: Vec<String>,
}

/// What the intake validator needs to know about a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub name: String,
    pub size: u64,
    pub content_type: Option<String>,
}

impl FileRef {
    pub fn new(name: impl Into<String>, size: u64, content_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            size,
            content_type: content_type.map(str::to_string),
        }
    }
}

/// An attachment received in a multipart submission.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, content_type: Option<&str>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn file_ref(&self) -> FileRef {
        FileRef {
            name: self.name.clone(),
            size: self.size(),
            content_type: self.content_type.clone(),
        }
    }
}

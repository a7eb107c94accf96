use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::domain::{ContactSubmission, ServiceType, Urgency};

/// Order in which field errors are reported, matching the form layout.
const FIELD_ORDER: [&str; 8] = [
    "name",
    "email",
    "phone",
    "company",
    "serviceType",
    "urgency",
    "description",
    "files",
];

/// Raw contact form as posted by the browser.
///
/// Every field defaults so that a missing value is reported as a field error
/// alongside the others instead of rejecting the whole body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactPayload {
    #[validate(length(min = 2, message = "Le nom doit contenir au moins 2 caractères"))]
    pub name: String,
    #[validate(email(message = "Adresse email invalide"))]
    pub email: String,
    #[validate(length(min = 10, message = "Numéro de téléphone invalide"))]
    pub phone: String,
    pub company: Option<String>,
    #[validate(custom(function = "validate_service_type"))]
    pub service_type: String,
    #[validate(custom(function = "validate_urgency"))]
    pub urgency: String,
    #[validate(length(
        min = 10,
        message = "La description doit contenir au moins 10 caractères"
    ))]
    pub description: String,
    /// Attachment identifiers; only used by the JSON variant of the form.
    pub files: Option<Vec<String>>,
}

/// One offending field, reported back to the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn validate_service_type(value: &str) -> Result<(), ValidationError> {
    match ServiceType::parse(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("service_type")
            .with_message(Cow::Borrowed("Type de service invalide"))),
    }
}

fn validate_urgency(value: &str) -> Result<(), ValidationError> {
    match Urgency::parse(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("urgency")
            .with_message(Cow::Borrowed("Niveau d'urgence invalide"))),
    }
}

fn wire_name(field: &str) -> String {
    match field {
        "service_type" => "serviceType".to_string(),
        other => other.to_string(),
    }
}

fn collect_field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut collected = Vec::new();
    for (field, entries) in errors.field_errors() {
        let field: &str = field.as_ref();
        for entry in entries.iter() {
            let message = entry
                .message
                .as_ref()
                .map(|message| message.to_string())
                .unwrap_or_else(|| format!("Valeur invalide ({})", entry.code));
            collected.push(FieldError::new(wire_name(field), message));
        }
    }

    collected.sort_by_key(|error| {
        FIELD_ORDER
            .iter()
            .position(|name| *name == error.field)
            .unwrap_or(FIELD_ORDER.len())
    });
    collected
}

impl ContactPayload {
    /// Checks every constraint and reports all offending fields at once.
    pub fn check(&self) -> Result<(), Vec<FieldError>> {
        self.validate()
            .map_err(|errors| collect_field_errors(&errors))
    }

    pub fn into_submission(self) -> Result<ContactSubmission, Vec<FieldError>> {
        self.check()?;

        let service_type = ServiceType::parse(&self.service_type)
            .ok_or_else(|| vec![FieldError::new("serviceType", "Type de service invalide")])?;
        let urgency = Urgency::parse(&self.urgency)
            .ok_or_else(|| vec![FieldError::new("urgency", "Niveau d'urgence invalide")])?;
        let company = self
            .company
            .map(|company| company.trim().to_string())
            .filter(|company| !company.is_empty());

        Ok(ContactSubmission {
            name: self.name,
            email: self.email,
            phone: self.phone,
            company,
            service_type,
            urgency,
            description: self.description,
            attachments: self.files.unwrap_or_default(),
        })
    }
}

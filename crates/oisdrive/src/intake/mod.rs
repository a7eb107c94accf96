//! Contact form intake: field validation, attachment checks and the submission flow.

pub mod attachments;
pub mod domain;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use attachments::{
    validate_file, validate_files, AttachmentValidationError, ALLOWED_EXTENSIONS,
    ALLOWED_MIME_TYPES, MAX_FILES_PER_SUBMISSION, MAX_FILE_SIZE, MAX_TOTAL_SIZE,
};
pub use domain::{ContactSubmission, FileRef, IncomingFile, ServiceType, SubmissionId, Urgency};
pub use router::{caller_address, contact_router, ContactResponse, ContactResponseData};
pub use service::{ContactError, ContactRequest, ContactService, SubmissionReceipt};
pub use validation::{ContactPayload, FieldError};

//! Notification e-mails for contact submissions.

mod dispatcher;
mod mailer;
mod templates;

use thiserror::Error;

pub use dispatcher::{NotificationDispatcher, NotificationOutcome};
pub use mailer::{mailer_from_config, LogMailer, Mailer, MailgunMailer};
pub use templates::{escape_html, render, ContactEmails, EmailTemplate, POSTAL_ADDRESS};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("email provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("email provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

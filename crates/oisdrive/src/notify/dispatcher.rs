use std::sync::Arc;

use serde::Serialize;

use super::mailer::Mailer;
use super::templates::{render, ContactEmails, EmailTemplate};
use crate::config::SiteConfig;
use crate::intake::ContactSubmission;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationOutcome {
    pub success: bool,
    pub message: String,
}

/// Sends the internal notification and the visitor confirmation for a submission.
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    site: SiteConfig,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, site: SiteConfig) -> Self {
        Self { mailer, site }
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub fn render(&self, submission: &ContactSubmission) -> ContactEmails {
        render(submission, &self.site)
    }

    async fn deliver(&self, to: &str, template: &EmailTemplate, kind: &'static str) -> bool {
        match self.mailer.send(to, template).await {
            Ok(()) => true,
            Err(error) => {
                tracing::error!(
                    error = %error,
                    to = %to,
                    kind,
                    subject = %template.subject,
                    "notification email failed"
                );
                false
            }
        }
    }

    /// Never fails: each delivery error is logged and folded into the outcome.
    pub async fn send(&self, submission: &ContactSubmission) -> NotificationOutcome {
        let emails = self.render(submission);
        let (admin_sent, user_sent) = tokio::join!(
            self.deliver(&self.site.contact_email, &emails.admin, "admin"),
            self.deliver(&submission.email, &emails.user, "confirmation"),
        );

        if admin_sent && user_sent {
            NotificationOutcome {
                success: true,
                message: "Emails envoyés avec succès".to_string(),
            }
        } else {
            NotificationOutcome {
                success: false,
                message: "Erreur lors de l'envoi des emails".to_string(),
            }
        }
    }
}

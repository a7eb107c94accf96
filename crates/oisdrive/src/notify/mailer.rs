use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::templates::EmailTemplate;
use super::NotificationError;
use crate::config::EmailConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const PREVIEW_CHARS: usize = 200;

/// Delivers one rendered e-mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, template: &EmailTemplate) -> Result<(), NotificationError>;
}

fn preview(text: &str) -> String {
    let mut preview: String = text.trim().chars().take(PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}

/// Sends through the Mailgun messages API with `api:{key}` basic auth.
#[derive(Debug, Clone)]
pub struct MailgunMailer {
    client: Client,
    api_key: String,
    messages_url: String,
    from: String,
}

#[derive(Debug, Deserialize)]
struct MailgunResponse {
    #[serde(default)]
    id: Option<String>,
}

impl MailgunMailer {
    pub fn new(
        api_key: impl Into<String>,
        domain: &str,
        api_base_url: &str,
        from: impl Into<String>,
    ) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(NotificationError::Http)?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            messages_url: format!("{}/v3/{}/messages", api_base_url.trim_end_matches('/'), domain),
            from: from.into(),
        })
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    async fn send(&self, to: &str, template: &EmailTemplate) -> Result<(), NotificationError> {
        let form = [
            ("from", self.from.as_str()),
            ("to", to),
            ("subject", template.subject.as_str()),
            ("text", template.text.as_str()),
            ("html", template.html.as_str()),
        ];

        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<unreadable body>"));
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let accepted: MailgunResponse = response.json().await.unwrap_or(MailgunResponse { id: None });
        tracing::info!(
            to = %to,
            message_id = accepted.id.as_deref().unwrap_or("unknown"),
            "email sent via Mailgun"
        );
        Ok(())
    }
}

/// Stand-in used when no e-mail provider is configured: logs instead of sending.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, template: &EmailTemplate) -> Result<(), NotificationError> {
        tracing::warn!(
            to = %to,
            subject = %template.subject,
            preview = %preview(&template.text),
            "Mailgun not configured; email logged instead of sent"
        );
        Ok(())
    }
}

pub fn mailer_from_config(config: &EmailConfig) -> Result<Arc<dyn Mailer>, NotificationError> {
    match (config.api_key.as_deref(), config.domain.as_deref()) {
        (Some(api_key), Some(domain)) => {
            let mailer = MailgunMailer::new(
                api_key,
                domain,
                &config.api_base_url,
                config.from_address.clone(),
            )?;
            tracing::info!(url = %mailer.messages_url(), "notification emails sent via Mailgun");
            Ok(Arc::new(mailer))
        }
        _ => {
            tracing::warn!("Mailgun not configured; notification emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_url_joins_base_and_domain() {
        let mailer = MailgunMailer::new("key", "mg.oisdrive.com", "https://api.eu.mailgun.net/", "OISDRIVE <noreply@oisdrive.com>")
            .expect("client builds");
        assert_eq!(mailer.messages_url(), "https://api.eu.mailgun.net/v3/mg.oisdrive.com/messages");
    }

    #[test]
    fn preview_is_bounded() {
        let long = "é".repeat(500);
        let shortened = preview(&long);
        assert_eq!(shortened.chars().count(), PREVIEW_CHARS + 3);
    }

    #[tokio::test]
    async fn log_mailer_reports_success() {
        let template = EmailTemplate {
            subject: "sujet".to_string(),
            html: "<p>corps</p>".to_string(),
            text: "corps".to_string(),
        };
        assert!(LogMailer.send("jean@example.com", &template).await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_provider_is_an_error() {
        let mailer = MailgunMailer::new("key", "example.com", "http://127.0.0.1:9", "from@example.com")
            .expect("client builds");
        let template = EmailTemplate {
            subject: "s".to_string(),
            html: "h".to_string(),
            text: "t".to_string(),
        };
        assert!(matches!(
            mailer.send("to@example.com", &template).await,
            Err(NotificationError::Http(_))
        ));
    }
}

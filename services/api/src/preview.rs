use clap::{Args, ValueEnum};
use oisdrive::config::{AppConfig, SiteConfig};
use oisdrive::error::AppError;
use oisdrive::intake::{ContactSubmission, ServiceType, Urgency};
use oisdrive::notify::{render, ContactEmails, EmailTemplate};
use oisdrive::storage::{attachment_store_from_config, check_storage};

#[derive(Args, Debug)]
pub(crate) struct NotifyPreviewArgs {
    /// Service requested by the sample visitor
    #[arg(long, default_value = "emergency-recovery", value_parser = parse_service_type)]
    pub(crate) service_type: ServiceType,
    /// Urgency chosen by the sample visitor
    #[arg(long, default_value = "emergency", value_parser = parse_urgency)]
    pub(crate) urgency: Urgency,
    /// Company name to include
    #[arg(long)]
    pub(crate) company: Option<String>,
    /// Attachment names to list in the e-mails
    #[arg(long = "attachment")]
    pub(crate) attachments: Vec<String>,
    /// Which body to print
    #[arg(long, value_enum, default_value_t = PreviewFormat::Text)]
    pub(crate) format: PreviewFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum PreviewFormat {
    Text,
    Html,
}

#[derive(Args, Debug, Default)]
pub(crate) struct StorageHealthArgs {
    /// Emit indented JSON
    #[arg(long)]
    pub(crate) pretty: bool,
}

fn parse_service_type(raw: &str) -> Result<ServiceType, String> {
    ServiceType::parse(raw.trim()).ok_or_else(|| {
        let accepted: Vec<&str> = ServiceType::ALL.iter().map(|value| value.as_str()).collect();
        format!("unknown service type '{raw}' (expected one of: {})", accepted.join(", "))
    })
}

fn parse_urgency(raw: &str) -> Result<Urgency, String> {
    Urgency::parse(raw.trim()).ok_or_else(|| {
        let accepted: Vec<&str> = Urgency::ALL.iter().map(|value| value.as_str()).collect();
        format!("unknown urgency '{raw}' (expected one of: {})", accepted.join(", "))
    })
}

pub(crate) fn sample_submission(args: &NotifyPreviewArgs) -> ContactSubmission {
    ContactSubmission {
        name: "Jean Dupont".to_string(),
        email: "jean@example.com".to_string(),
        phone: "0612345678".to_string(),
        company: args.company.clone(),
        service_type: args.service_type,
        urgency: args.urgency,
        description: "Perte totale de données suite à incendie".to_string(),
        attachments: args.attachments.clone(),
    }
}

pub(crate) fn render_preview(args: &NotifyPreviewArgs, site: &SiteConfig) -> String {
    let ContactEmails { admin, user } = render(&sample_submission(args), site);
    let mut output = String::new();
    append_template(&mut output, &format!("To: {}", site.contact_email), &admin, args.format);
    output.push('\n');
    append_template(&mut output, "To: jean@example.com", &user, args.format);
    output
}

fn append_template(output: &mut String, recipient: &str, template: &EmailTemplate, format: PreviewFormat) {
    output.push_str(recipient);
    output.push('\n');
    output.push_str(&format!("Subject: {}\n\n", template.subject));
    match format {
        PreviewFormat::Text => output.push_str(template.text.trim()),
        PreviewFormat::Html => output.push_str(template.html.trim()),
    }
    output.push('\n');
}

pub(crate) fn run_notify_preview(args: NotifyPreviewArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    println!("{}", render_preview(&args, &config.site));
    Ok(())
}

pub(crate) async fn run_storage_health(args: StorageHealthArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = attachment_store_from_config(&config.storage)?;
    let report = check_storage(store.as_ref()).await;

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .map_err(|err| AppError::Io(err.into()))?;

    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(service_type: ServiceType, urgency: Urgency) -> NotifyPreviewArgs {
        NotifyPreviewArgs {
            service_type,
            urgency,
            company: None,
            attachments: Vec::new(),
            format: PreviewFormat::Text,
        }
    }

    #[test]
    fn parsers_accept_wire_values_only() {
        assert_eq!(parse_service_type("consultation"), Ok(ServiceType::Consultation));
        assert!(parse_service_type("Consultation").is_err());
        assert_eq!(parse_urgency(" high "), Ok(Urgency::High));
        let err = parse_urgency("urgent").expect_err("unknown urgency");
        assert!(err.contains("low, medium, high, emergency"));
    }

    #[test]
    fn preview_prints_both_messages() {
        let output = render_preview(
            &args(ServiceType::EmergencyRecovery, Urgency::Emergency),
            &SiteConfig::default(),
        );
        assert!(output.contains("To: contact@oisdrive.com"));
        assert!(output.contains("To: jean@example.com"));
        assert!(output.contains("Subject: [OISDRIVE] Nouvelle demande de contact - emergency-recovery"));
        assert!(output.contains("2 heures"));
    }

    #[test]
    fn html_format_prints_markup() {
        let mut preview_args = args(ServiceType::Consultation, Urgency::Low);
        preview_args.format = PreviewFormat::Html;
        preview_args.attachments = vec!["rapport.pdf".to_string()];
        let output = render_preview(&preview_args, &SiteConfig::default());
        assert!(output.contains("<"));
        assert!(output.contains("rapport.pdf"));
        assert!(!output.contains("2 heures"));
    }
}

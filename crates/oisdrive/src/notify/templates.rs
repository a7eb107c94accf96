//! French e-mail bodies sent for every contact submission.

use serde::Serialize;

use crate::config::SiteConfig;
use crate::intake::{ContactSubmission, Urgency};

pub const POSTAL_ADDRESS: &str = "3 rue Dieudonné Costes, Suite 4, 31700 Blagnac, France";

const ADMIN_EMERGENCY_FLAG: &str = "🚨 URGENCE CRITIQUE - Réponse immédiate requise (sous 2 heures)";
const ADMIN_STANDARD_FLAG: &str = "Action requise - Répondre dans les 24h";
const USER_EMERGENCY_FLAG: &str =
    "🚨 URGENCE DÉTECTÉE - Notre équipe d'urgence vous contactera dans les 2 heures.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailTemplate {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Internal notification plus the visitor's confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactEmails {
    pub admin: EmailTemplate,
    pub user: EmailTemplate,
}

/// Escapes text for insertion into HTML element content or attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn urgency_color(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::Emergency => "#dc2626",
        Urgency::High => "#ea580c",
        Urgency::Low | Urgency::Medium => "#059669",
    }
}

fn html_footer(site: &SiteConfig, with_privacy: bool) -> String {
    let mut footer = format!(
        r#"<div style="background: #1f2937; color: white; padding: 15px; text-align: center; font-size: 12px;">
  <p style="margin: 0;">OISDRIVE - {address}</p>
  <p style="margin: 5px 0 0 0;">Tél: {phone} | Email: {email}</p>"#,
        address = escape_html(POSTAL_ADDRESS),
        phone = escape_html(&site.contact_phone),
        email = escape_html(&site.contact_email),
    );
    if with_privacy {
        footer.push_str(&format!(
            r#"
  <p style="margin: 10px 0 0 0;"><a href="{}" style="color: #93c5fd;">Politique de confidentialité</a></p>"#,
            escape_html(&site.privacy_url())
        ));
    }
    footer.push_str("\n</div>");
    footer
}

fn text_footer(site: &SiteConfig) -> String {
    format!(
        "---\nOISDRIVE - {POSTAL_ADDRESS}\nTél: {} | Email: {}",
        site.contact_phone, site.contact_email
    )
}

fn admin_email(submission: &ContactSubmission, site: &SiteConfig) -> EmailTemplate {
    let emergency = submission.urgency.is_emergency();
    let flag = if emergency { ADMIN_EMERGENCY_FLAG } else { ADMIN_STANDARD_FLAG };

    let company_row = submission
        .company
        .as_deref()
        .map(|company| {
            format!(
                r#"
    <tr><td style="padding: 8px 0; font-weight: bold;">Entreprise :</td><td style="padding: 8px 0;">{}</td></tr>"#,
                escape_html(company)
            )
        })
        .unwrap_or_default();

    let attachments_html = if submission.attachments.is_empty() {
        String::new()
    } else {
        let items: String = submission
            .attachments
            .iter()
            .map(|name| format!("<li>{}</li>", escape_html(name)))
            .collect();
        format!(
            r#"
  <h3 style="color: #1e40af; margin-top: 20px;">Fichiers Joints</h3>
  <ul style="background: white; padding: 15px; margin: 10px 0;">{items}</ul>"#
        )
    };

    let email = escape_html(&submission.email);
    let phone = escape_html(&submission.phone);
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
<div style="background: #1e40af; color: white; padding: 20px; text-align: center;">
  <h1 style="margin: 0;">Nouvelle Demande de Contact</h1>
  <p style="margin: 5px 0 0 0;">OISDRIVE - Récupération de Données</p>
</div>
<div style="padding: 20px; background: #f8fafc;">
  <h2 style="color: #1e40af; margin-top: 0;">Informations du Client</h2>
  <table style="width: 100%; border-collapse: collapse;">
    <tr><td style="padding: 8px 0; font-weight: bold; width: 150px;">Nom :</td><td style="padding: 8px 0;">{name}</td></tr>
    <tr><td style="padding: 8px 0; font-weight: bold;">Email :</td><td style="padding: 8px 0;"><a href="mailto:{email}">{email}</a></td></tr>
    <tr><td style="padding: 8px 0; font-weight: bold;">Téléphone :</td><td style="padding: 8px 0;"><a href="tel:{phone}">{phone}</a></td></tr>{company_row}
    <tr><td style="padding: 8px 0; font-weight: bold;">Service :</td><td style="padding: 8px 0;">{service}</td></tr>
    <tr><td style="padding: 8px 0; font-weight: bold;">Urgence :</td><td style="padding: 8px 0; color: {color};">{urgency}</td></tr>
  </table>
  <h3 style="color: #1e40af; margin-top: 20px;">Description de la Situation</h3>
  <div style="background: white; padding: 15px; border-left: 4px solid #1e40af; margin: 10px 0;">{description}</div>{attachments_html}
  <div style="margin-top: 20px; padding: 15px; background: {flag_background}; border: 1px solid {flag_border}; border-radius: 5px;">
    <p style="margin: 0; font-weight: bold; color: {flag_color};">{flag}</p>
  </div>
</div>
{footer}
</div>"#,
        name = escape_html(&submission.name),
        service = submission.service_type.label(),
        color = urgency_color(submission.urgency),
        urgency = submission.urgency.label(),
        description = escape_html(&submission.description).replace('\n', "<br>"),
        flag_background = if emergency { "#fef2f2" } else { "#f0f9ff" },
        flag_border = if emergency { "#fecaca" } else { "#bae6fd" },
        flag_color = if emergency { "#dc2626" } else { "#0369a1" },
        footer = html_footer(site, false),
    );

    let mut text = format!(
        "NOUVELLE DEMANDE DE CONTACT - OISDRIVE\n\nInformations du Client:\n- Nom: {}\n- Email: {}\n- Téléphone: {}\n",
        submission.name, submission.email, submission.phone
    );
    if let Some(company) = &submission.company {
        text.push_str(&format!("- Entreprise: {company}\n"));
    }
    text.push_str(&format!(
        "- Service: {}\n- Urgence: {}\n\nDescription:\n{}\n\n",
        submission.service_type.label(),
        submission.urgency.label(),
        submission.description
    ));
    if !submission.attachments.is_empty() {
        text.push_str(&format!(
            "Fichiers joints: {}\n\n",
            submission.attachments.join(", ")
        ));
    }
    text.push_str(flag);
    text.push_str("\n\n");
    text.push_str(&text_footer(site));

    EmailTemplate {
        subject: format!(
            "[OISDRIVE] Nouvelle demande de contact - {}",
            submission.service_type.as_str()
        ),
        html,
        text,
    }
}

fn user_email(submission: &ContactSubmission, site: &SiteConfig) -> EmailTemplate {
    let emergency = submission.urgency.is_emergency();
    let service = submission.service_type.label();
    let urgency = submission.urgency.label();
    let phone_link: String = site
        .contact_phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    let emergency_html = if emergency {
        format!(
            r#"
  <div style="background: #fef2f2; padding: 15px; border: 1px solid #fecaca; border-radius: 5px; margin: 20px 0;">
    <p style="margin: 0; color: #dc2626; font-weight: bold;">{}</p>
  </div>"#,
            escape_html(USER_EMERGENCY_FLAG)
        )
    } else {
        String::new()
    };

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
<div style="background: #1e40af; color: white; padding: 20px; text-align: center;">
  <h1 style="margin: 0;">OISDRIVE</h1>
  <p style="margin: 5px 0 0 0;">Expert en Récupération de Données</p>
</div>
<div style="padding: 20px;">
  <h2 style="color: #1e40af;">Bonjour {name},</h2>
  <p>Nous avons bien reçu votre demande concernant nos services de <strong>{service}</strong>.</p>
  <div style="background: #f0f9ff; padding: 15px; border-left: 4px solid #1e40af; margin: 20px 0;">
    <h3 style="margin-top: 0; color: #1e40af;">Récapitulatif de votre demande</h3>
    <p><strong>Service :</strong> {service}</p>
    <p><strong>Niveau d&#39;urgence :</strong> {urgency}</p>
    <p><strong>Description :</strong> {description}</p>
  </div>
  <h3 style="color: #1e40af;">Prochaines étapes</h3>
  <ul>
    <li>Notre équipe d&#39;experts examine votre demande</li>
    <li>Nous vous contactons dans les plus brefs délais</li>
    <li>Nous vous proposons une solution personnalisée</li>
  </ul>{emergency_html}
  <h3 style="color: #1e40af;">Besoin d&#39;aide immédiate ?</h3>
  <p>Pour toute urgence, n&#39;hésitez pas à nous appeler directement :</p>
  <p style="text-align: center; margin: 20px 0;">
    <a href="tel:{phone_link}" style="background: #dc2626; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; font-weight: bold;">📞 {phone}</a>
  </p>
  <p>Merci de votre confiance.</p>
  <p>L&#39;équipe OISDRIVE</p>
</div>
{footer}
</div>"#,
        name = escape_html(&submission.name),
        description = escape_html(&submission.description),
        phone = escape_html(&site.contact_phone),
        footer = html_footer(site, true),
    );

    let mut text = format!(
        "Bonjour {name},\n\nNous avons bien reçu votre demande concernant nos services de {service}.\n\n\
         Récapitulatif de votre demande:\n- Service: {service}\n- Niveau d'urgence: {urgency}\n- Description: {description}\n\n\
         Prochaines étapes:\n1. Notre équipe d'experts examine votre demande\n2. Nous vous contactons dans les plus brefs délais\n\
         3. Nous vous proposons une solution personnalisée\n\n",
        name = submission.name,
        description = submission.description,
    );
    if emergency {
        text.push_str(USER_EMERGENCY_FLAG);
        text.push_str("\n\n");
    }
    text.push_str(&format!(
        "Besoin d'aide immédiate ?\nPour toute urgence, appelez-nous directement : {}\n\nMerci de votre confiance.\nL'équipe OISDRIVE\n\n{}\nPolitique de confidentialité: {}",
        site.contact_phone,
        text_footer(site),
        site.privacy_url()
    ));

    EmailTemplate {
        subject: "Confirmation de votre demande - OISDRIVE".to_string(),
        html,
        text,
    }
}

/// Renders both e-mails for a submission.
pub fn render(submission: &ContactSubmission, site: &SiteConfig) -> ContactEmails {
    ContactEmails {
        admin: admin_email(submission, site),
        user: user_email(submission, site),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::ServiceType;

    fn submission(urgency: Urgency) -> ContactSubmission {
        ContactSubmission {
            name: "Jean Dupont".to_string(),
            email: "jean@example.com".to_string(),
            phone: "0612345678".to_string(),
            company: None,
            service_type: ServiceType::EmergencyRecovery,
            urgency,
            description: "Perte totale de données suite à incendie".to_string(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn admin_subject_carries_the_raw_service_type() {
        let emails = render(&submission(Urgency::Low), &SiteConfig::default());
        assert_eq!(
            emails.admin.subject,
            "[OISDRIVE] Nouvelle demande de contact - emergency-recovery"
        );
        assert_eq!(emails.user.subject, "Confirmation de votre demande - OISDRIVE");
    }

    #[test]
    fn emergency_is_flagged_in_both_emails() {
        let emails = render(&submission(Urgency::Emergency), &SiteConfig::default());
        for body in [&emails.admin.html, &emails.admin.text] {
            assert!(body.contains("URGENCE CRITIQUE"));
            assert!(body.contains("2 heures"));
        }
        for body in [&emails.user.html, &emails.user.text] {
            assert!(body.contains("dans les 2 heures"));
        }
        assert!(emails.admin.html.contains("Critique"));
        assert!(emails.admin.html.contains("Récupération d'Urgence"));
    }

    #[test]
    fn non_emergency_asks_for_a_response_within_a_day() {
        let emails = render(&submission(Urgency::High), &SiteConfig::default());
        assert!(emails.admin.text.contains(ADMIN_STANDARD_FLAG));
        assert!(!emails.admin.text.contains("URGENCE"));
        assert!(!emails.user.text.contains("URGENCE"));
        assert!(emails.admin.html.contains("#ea580c"));
    }

    #[test]
    fn user_supplied_values_are_escaped_in_html_only() {
        let mut risky = submission(Urgency::Medium);
        risky.name = "<script>alert(1)</script>".to_string();
        risky.company = Some("Dupont & Fils".to_string());
        risky.description = "ligne 1\nligne <2>".to_string();
        risky.attachments = vec!["a\"b.pdf".to_string()];

        let emails = render(&risky, &SiteConfig::default());
        assert!(!emails.admin.html.contains("<script>"));
        assert!(emails.admin.html.contains("&lt;script&gt;"));
        assert!(emails.admin.html.contains("Dupont &amp; Fils"));
        assert!(emails.admin.html.contains("ligne 1<br>ligne &lt;2&gt;"));
        assert!(emails.admin.html.contains("<li>a&quot;b.pdf</li>"));
        assert!(emails.admin.text.contains("- Entreprise: Dupont & Fils"));
        assert!(emails.admin.text.contains("Fichiers joints: a\"b.pdf"));
        assert!(!emails.user.html.contains("<script>"));
    }

    #[test]
    fn footers_use_site_contact_details() {
        let site = SiteConfig {
            public_url: "https://staging.oisdrive.com/".to_string(),
            contact_email: "support@oisdrive.com".to_string(),
            contact_phone: "+33 1 23 45 67 89".to_string(),
        };
        let emails = render(&submission(Urgency::Low), &site);
        assert!(emails.admin.text.contains("Tél: +33 1 23 45 67 89 | Email: support@oisdrive.com"));
        assert!(emails.user.html.contains("https://staging.oisdrive.com/privacy"));
        assert!(emails.user.html.contains("tel:+33123456789"));
        assert!(emails.user.text.contains(POSTAL_ADDRESS));
    }
}

//! Object keys and the public file identifiers derived from them.
//!
//! Key: `contact-attachments/{submission_id}/{timestamp}-{token}-{sanitized_name}`.
//! File id: `{submission_id}-{timestamp}-{token}-{sanitized_name}`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::intake::SubmissionId;

pub const KEY_PREFIX: &str = "contact-attachments";

const TOKEN_LEN: usize = 6;

/// Replaces every character outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentKey {
    submission_id: String,
    object_name: String,
}

impl AttachmentKey {
    pub fn new(submission_id: &SubmissionId, original_name: &str, at: DateTime<Utc>) -> Self {
        let token: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(TOKEN_LEN)
            .collect();
        Self {
            submission_id: submission_id.as_str().to_string(),
            object_name: format!(
                "{}-{}-{}",
                at.timestamp_millis(),
                token,
                sanitize_file_name(original_name)
            ),
        }
    }

    /// Recovers the key behind a file identifier.
    ///
    /// Returns `None` unless the identifier has the
    /// `contact-{millis}-{hex}-{timestamp}-{token}-{name}` shape.
    pub fn parse_file_id(file_id: &str) -> Option<Self> {
        let parts: Vec<&str> = file_id.splitn(6, '-').collect();
        let [prefix, millis, nonce, timestamp, token, name] = parts.as_slice() else {
            return None;
        };
        let digits = |value: &str| !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit());
        if *prefix != "contact"
            || !digits(*millis)
            || nonce.is_empty()
            || !digits(*timestamp)
            || token.is_empty()
            || name.is_empty()
            || name.contains('/')
        {
            return None;
        }

        Some(Self {
            submission_id: format!("{prefix}-{millis}-{nonce}"),
            object_name: format!("{timestamp}-{token}-{name}"),
        })
    }

    pub fn submission_id(&self) -> &str {
        &self.submission_id
    }

    pub fn storage_key(&self) -> String {
        format!("{KEY_PREFIX}/{}/{}", self.submission_id, self.object_name)
    }

    pub fn file_id(&self) -> String {
        format!("{}-{}", self.submission_id, self.object_name)
    }

    /// Sanitized file name as stored, without the timestamp and token.
    pub fn stored_name(&self) -> &str {
        self.object_name
            .splitn(3, '-')
            .nth(2)
            .unwrap_or(&self.object_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sanitizes_everything_outside_the_safe_set() {
        assert_eq!(sanitize_file_name("rapport final (v2).pdf"), "rapport_final__v2_.pdf");
        assert_eq!(sanitize_file_name("été.txt"), "_t_.txt");
        assert_eq!(sanitize_file_name("../etc/passwd"), ".._etc_passwd");
    }

    #[test]
    fn file_id_reconstructs_the_storage_key() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).single().expect("valid time");
        let submission = SubmissionId::generate(at);
        let key = AttachmentKey::new(&submission, "my-photo 1.jpg", at);

        assert!(key
            .storage_key()
            .starts_with(&format!("contact-attachments/{submission}/{}-", at.timestamp_millis())));
        assert!(key.storage_key().ends_with("-my-photo_1.jpg"));

        let parsed = AttachmentKey::parse_file_id(&key.file_id()).expect("file id parses");
        assert_eq!(parsed, key);
        assert_eq!(parsed.submission_id(), submission.as_str());
        assert_eq!(parsed.stored_name(), "my-photo_1.jpg");
    }

    #[test]
    fn malformed_file_ids_are_rejected() {
        for id in [
            "",
            "contact",
            "contact-123-abc",
            "upload-1-abc-2-tok-name.pdf",
            "contact-x-abc-2-tok-name.pdf",
            "contact-1-abc-x-tok-name.pdf",
            "contact-1-abc-2-tok-",
        ] {
            assert_eq!(AttachmentKey::parse_file_id(id), None, "{id}");
        }
    }
}

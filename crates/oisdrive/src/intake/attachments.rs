use thiserror::Error;

use super::domain::FileRef;

pub const MAX_FILES_PER_SUBMISSION: usize = 5;
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const MAX_TOTAL_SIZE: u64 = MAX_FILE_SIZE * MAX_FILES_PER_SUBMISSION as u64;

pub const ALLOWED_EXTENSIONS: [&str; 7] = [".jpg", ".jpeg", ".png", ".pdf", ".doc", ".docx", ".txt"];

pub const ALLOWED_MIME_TYPES: [&str; 7] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// First rule an attachment batch broke. Messages are shown to the visitor as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentValidationError {
    #[error("Trop de fichiers. Maximum autorisé: {max}", max = MAX_FILES_PER_SUBMISSION)]
    TooManyFiles { count: usize },
    #[error("La taille totale des fichiers est trop importante.")]
    TotalTooLarge { total: u64 },
    #[error("Le fichier \"{name}\" est trop volumineux. Taille maximale: 10MB")]
    FileTooLarge { name: String, size: u64 },
    #[error("Le fichier \"{name}\" n'est pas dans un format accepté. Formats autorisés: {}", ALLOWED_EXTENSIONS.join(", "))]
    UnsupportedExtension { name: String },
    #[error("Le fichier \"{name}\" n'est pas dans un format accepté.")]
    UnsupportedMimeType { name: String, mime: String },
}

/// Lower-cased extension including the dot, or an empty string when the name has none.
fn extension_of(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, extension)| format!(".{}", extension.to_ascii_lowercase()))
        .unwrap_or_default()
}

pub fn validate_file(file: &FileRef) -> Result<(), AttachmentValidationError> {
    if file.size > MAX_FILE_SIZE {
        return Err(AttachmentValidationError::FileTooLarge {
            name: file.name.clone(),
            size: file.size,
        });
    }

    let extension = extension_of(&file.name);
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AttachmentValidationError::UnsupportedExtension {
            name: file.name.clone(),
        });
    }

    if let Some(mime) = file.content_type.as_deref() {
        if !ALLOWED_MIME_TYPES.contains(&mime) {
            return Err(AttachmentValidationError::UnsupportedMimeType {
                name: file.name.clone(),
                mime: mime.to_string(),
            });
        }
    }

    Ok(())
}

/// Checks a whole batch: count, then total size, then each file in order.
pub fn validate_files(files: &[FileRef]) -> Result<(), AttachmentValidationError> {
    if files.len() > MAX_FILES_PER_SUBMISSION {
        return Err(AttachmentValidationError::TooManyFiles { count: files.len() });
    }

    let total: u64 = files.iter().map(|file| file.size).sum();
    if total > MAX_TOTAL_SIZE {
        return Err(AttachmentValidationError::TotalTooLarge { total });
    }

    files.iter().try_for_each(validate_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    fn pdf(name: &str, size: u64) -> FileRef {
        FileRef::new(name, size, Some("application/pdf"))
    }

    #[test]
    fn five_files_pass_and_a_sixth_is_rejected() {
        let mut files: Vec<FileRef> = (0..5).map(|i| pdf(&format!("scan-{i}.pdf"), MIB)).collect();
        assert_eq!(validate_files(&files), Ok(()));

        files.push(pdf("scan-5.pdf", MIB));
        let err = validate_files(&files).expect_err("six files are too many");
        assert_eq!(err, AttachmentValidationError::TooManyFiles { count: 6 });
        assert_eq!(err.to_string(), "Trop de fichiers. Maximum autorisé: 5");
    }

    #[test]
    fn size_limit_is_inclusive() {
        assert_eq!(validate_files(&[pdf("exact.pdf", 10 * MIB)]), Ok(()));

        let err = validate_files(&[pdf("big.pdf", 11 * MIB)]).expect_err("over the limit");
        assert!(matches!(err, AttachmentValidationError::FileTooLarge { ref name, .. } if name == "big.pdf"));
        assert!(err.to_string().contains("\"big.pdf\""));
    }

    #[test]
    fn executable_without_mime_is_rejected_by_extension() {
        let err = validate_files(&[FileRef::new("setup.exe", 100, None)])
            .expect_err("exe is not allowed");
        assert_eq!(
            err,
            AttachmentValidationError::UnsupportedExtension {
                name: "setup.exe".to_string()
            }
        );
        assert!(err.to_string().contains(".jpg, .jpeg, .png, .pdf, .doc, .docx, .txt"));
    }

    #[test]
    fn extensions_are_case_insensitive() {
        assert_eq!(validate_file(&FileRef::new("PHOTO.JPG", 10, Some("image/jpeg"))), Ok(()));
        assert!(validate_file(&FileRef::new("README", 10, None)).is_err());
    }

    #[test]
    fn mime_type_checked_only_when_present() {
        assert_eq!(validate_file(&FileRef::new("notes.txt", 10, None)), Ok(()));

        let err = validate_file(&FileRef::new("notes.txt", 10, Some("text/html")))
            .expect_err("html is not allowed");
        assert!(matches!(err, AttachmentValidationError::UnsupportedMimeType { .. }));
    }

    #[test]
    fn count_is_checked_before_contents() {
        let files: Vec<FileRef> = (0..6).map(|i| FileRef::new(format!("bad-{i}.exe"), 1, None)).collect();
        assert!(matches!(
            validate_files(&files),
            Err(AttachmentValidationError::TooManyFiles { .. })
        ));
    }

    #[test]
    fn empty_batch_is_valid() {
        assert_eq!(validate_files(&[]), Ok(()));
    }
}

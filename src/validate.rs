//! Acceptance rules for incoming files.
//!
//! Rules are checked in order and the first failure wins: the MIME type must be in the
//! `image/*` family, then the declared size must not exceed the upload cap.

use crate::model::{ImageSubmission, SelectedFile};

/// Upload cap (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid file type: {mime:?} is not an image")]
    InvalidMimeType { mime: String },

    #[error("file too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },
}

impl ValidationError {
    /// Title shown to the user.
    pub fn title(&self) -> &'static str {
        match self {
            ValidationError::InvalidMimeType { .. } => "Invalid file type",
            ValidationError::FileTooLarge { .. } => "File too large",
        }
    }

    /// Guidance shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::InvalidMimeType { .. } => {
                "Please upload an image file (JPG, PNG, etc.)".to_string()
            }
            ValidationError::FileTooLarge { limit, .. } => {
                format!(
                    "Please upload an image smaller than {}MB",
                    limit / (1024 * 1024)
                )
            }
        }
    }
}

/// MIME types are case-insensitive; only the `image/` family is accepted.
fn is_image_mime(mime: &str) -> bool {
    mime.trim()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

/// Validate against the default 10 MiB cap.
pub fn validate(file: SelectedFile) -> Result<ImageSubmission, ValidationError> {
    validate_with_limit(file, MAX_UPLOAD_BYTES)
}

pub fn validate_with_limit(
    file: SelectedFile,
    limit: u64,
) -> Result<ImageSubmission, ValidationError> {
    if !is_image_mime(&file.mime_type) {
        return Err(ValidationError::InvalidMimeType {
            mime: file.mime_type,
        });
    }
    if file.size_bytes > limit {
        return Err(ValidationError::FileTooLarge {
            size: file.size_bytes,
            limit,
        });
    }
    Ok(ImageSubmission {
        name: file.name,
        mime_type: file.mime_type,
        size_bytes: file.size_bytes,
        bytes: file.bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use proptest::prelude::*;

    fn file(name: &str, mime: &str, size: u64) -> SelectedFile {
        SelectedFile {
            name: name.to_string(),
            mime_type: mime.to_string(),
            size_bytes: size,
            bytes: Bytes::new(),
        }
    }

    #[test]
    fn accepts_jpeg_under_limit() {
        let sub = validate(file("tiger.jpg", "image/jpeg", 2 * 1024 * 1024)).unwrap();
        assert_eq!(sub.name, "tiger.jpg");
        assert_eq!(sub.mime_type, "image/jpeg");
    }

    #[test]
    fn limit_is_inclusive() {
        assert!(validate(file("a.png", "image/png", MAX_UPLOAD_BYTES)).is_ok());
        assert_eq!(
            validate(file("a.png", "image/png", MAX_UPLOAD_BYTES + 1)),
            Err(ValidationError::FileTooLarge {
                size: MAX_UPLOAD_BYTES + 1,
                limit: MAX_UPLOAD_BYTES
            })
        );
    }

    #[test]
    fn large_png_is_rejected_for_size() {
        let err = validate(file("big.png", "image/png", 15 * 1024 * 1024)).unwrap_err();
        assert_eq!(err.title(), "File too large");
        assert_eq!(err.user_message(), "Please upload an image smaller than 10MB");
    }

    #[test]
    fn text_file_is_rejected_for_type() {
        let err = validate(file("notes.txt", "text/plain", 120)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidMimeType { .. }));
        assert_eq!(err.title(), "Invalid file type");
    }

    #[test]
    fn type_rule_wins_over_size_rule() {
        let err = validate(file("movie.mp4", "video/mp4", 50 * 1024 * 1024)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidMimeType { .. }));
    }

    #[test]
    fn mime_prefix_is_case_insensitive() {
        assert!(validate(file("a.PNG", "IMAGE/PNG", 10)).is_ok());
        assert!(validate(file("a", "", 10)).is_err());
        assert!(validate(file("a", "imag", 10)).is_err());
    }

    proptest! {
        #[test]
        fn oversized_images_never_pass(size in (MAX_UPLOAD_BYTES + 1)..u64::MAX) {
            let res = validate(file("x.jpg", "image/jpeg", size));
            prop_assert!(matches!(res, Err(ValidationError::FileTooLarge { .. })), "expected FileTooLarge");
        }

        #[test]
        fn non_image_mime_never_passes(mime in "[a-z]{1,10}/[a-z0-9.+-]{1,12}", size in 0u64..(MAX_UPLOAD_BYTES * 2)) {
            prop_assume!(!mime.starts_with("image/"));
            let res = validate(file("x", &mime, size));
            prop_assert!(matches!(res, Err(ValidationError::InvalidMimeType { .. })), "expected InvalidMimeType");
        }

        #[test]
        fn small_images_always_pass(subtype in "[a-z0-9.+-]{1,12}", size in 0u64..=MAX_UPLOAD_BYTES) {
            let mime = format!("image/{subtype}");
            prop_assert!(validate(file("x", &mime, size)).is_ok());
        }
    }
}

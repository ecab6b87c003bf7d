//! Input validation, the first pipeline stage.
//!
//! Runs before any decode so oversized or unsupported uploads are rejected
//! without spending CPU on them. Checks are pure: a declared MIME type and a
//! byte length go in, an error or `()` comes out.
//!
//! User ids are validated here too: the first segment of every storage key
//! is the user id, so a user id must never be able to escape its own folder.

use std::path::Path;
use thiserror::Error;

/// MIME types accepted for profile images.
pub const ACCEPTED_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Largest accepted upload (2 MiB).
pub const MAX_INPUT_BYTES: u64 = 2 * 1024 * 1024;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported file type '{0}'. Please upload a JPEG, PNG, GIF, or WebP image")]
    UnsupportedType(String),
    #[error("File is too large ({size} bytes). Maximum size is {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("File is empty")]
    Empty,
    #[error("Invalid user id '{0}'")]
    InvalidUserId(String),
}

/// What the validator lets through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPolicy {
    pub accepted_types: Vec<String>,
    pub max_bytes: u64,
}

impl Default for InputPolicy {
    fn default() -> Self {
        Self {
            accepted_types: ACCEPTED_TYPES.iter().map(|t| t.to_string()).collect(),
            max_bytes: MAX_INPUT_BYTES,
        }
    }
}

impl InputPolicy {
    /// Whether a declared MIME type is accepted (case-insensitive, trimmed).
    pub fn accepts(&self, mime: &str) -> bool {
        let mime = mime.trim();
        self.accepted_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(mime))
    }
}

/// Check a file's declared MIME type and byte length against the policy.
///
/// The type is checked first so a huge PDF reports as the wrong type rather
/// than as too large.
pub fn validate_input(policy: &InputPolicy, mime: &str, size: u64) -> Result<(), ValidationError> {
    if !policy.accepts(mime) {
        return Err(ValidationError::UnsupportedType(mime.trim().to_string()));
    }
    if size == 0 {
        return Err(ValidationError::Empty);
    }
    if size > policy.max_bytes {
        return Err(ValidationError::TooLarge {
            size,
            max: policy.max_bytes,
        });
    }
    Ok(())
}

/// Validate a user id for use as a storage folder name.
///
/// Rejects empty ids, path separators, `.`, and anything containing `..`,
/// so the id is always exactly one key segment.
pub fn validate_user_id(user_id: &str) -> Result<(), ValidationError> {
    let bad = user_id.is_empty()
        || user_id == "."
        || user_id.contains("..")
        || user_id.contains(['/', '\\'])
        || user_id.chars().any(char::is_control);
    if bad {
        return Err(ValidationError::InvalidUserId(user_id.to_string()));
    }
    Ok(())
}

/// Guess the MIME type a browser would declare for a file, from its extension.
///
/// Unknown extensions map to `application/octet-stream`, which the validator
/// rejects.
pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_image_types() {
        let policy = InputPolicy::default();
        for mime in ACCEPTED_TYPES {
            assert_eq!(validate_input(&policy, mime, 1024), Ok(()), "{mime}");
        }
    }

    #[test]
    fn accepts_mixed_case_and_whitespace() {
        let policy = InputPolicy::default();
        assert!(validate_input(&policy, " Image/PNG ", 10).is_ok());
    }

    #[test]
    fn rejects_pdf() {
        let policy = InputPolicy::default();
        assert_eq!(
            validate_input(&policy, "application/pdf", 1024),
            Err(ValidationError::UnsupportedType("application/pdf".into()))
        );
    }

    #[test]
    fn rejects_svg() {
        let policy = InputPolicy::default();
        assert!(matches!(
            validate_input(&policy, "image/svg+xml", 1024),
            Err(ValidationError::UnsupportedType(_))
        ));
    }

    #[test]
    fn rejects_three_megabytes() {
        let policy = InputPolicy::default();
        assert_eq!(
            validate_input(&policy, "image/jpeg", 3 * 1024 * 1024),
            Err(ValidationError::TooLarge {
                size: 3 * 1024 * 1024,
                max: MAX_INPUT_BYTES
            })
        );
    }

    #[test]
    fn accepts_exactly_the_limit() {
        let policy = InputPolicy::default();
        assert!(validate_input(&policy, "image/jpeg", MAX_INPUT_BYTES).is_ok());
        assert!(validate_input(&policy, "image/jpeg", MAX_INPUT_BYTES + 1).is_err());
    }

    #[test]
    fn rejects_empty_file() {
        let policy = InputPolicy::default();
        assert_eq!(
            validate_input(&policy, "image/png", 0),
            Err(ValidationError::Empty)
        );
    }

    #[test]
    fn type_checked_before_size() {
        let policy = InputPolicy::default();
        assert!(matches!(
            validate_input(&policy, "application/pdf", 10 * MAX_INPUT_BYTES),
            Err(ValidationError::UnsupportedType(_))
        ));
    }

    #[test]
    fn custom_policy_limits() {
        let policy = InputPolicy {
            accepted_types: vec!["image/png".into()],
            max_bytes: 100,
        };
        assert!(validate_input(&policy, "image/png", 100).is_ok());
        assert!(validate_input(&policy, "image/jpeg", 100).is_err());
        assert!(validate_input(&policy, "image/png", 101).is_err());
    }

    #[test]
    fn user_id_rules() {
        assert!(validate_user_id("3f2a9c1e-7d4b-4e8a-9b1c-2d3e4f5a6b7c").is_ok());
        assert!(validate_user_id("alice").is_ok());
        for bad in ["", ".", "..", "a..b", "..hidden", "a/b", "a\\b", "tab\there"] {
            assert!(validate_user_id(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_from_path(Path::new("me.JPG")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("me.jpeg")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("me.png")), "image/png");
        assert_eq!(mime_from_path(Path::new("me.gif")), "image/gif");
        assert_eq!(mime_from_path(Path::new("me.webp")), "image/webp");
        assert_eq!(mime_from_path(Path::new("cv.pdf")), "application/pdf");
        assert_eq!(mime_from_path(Path::new("noext")), "application/octet-stream");
    }
}

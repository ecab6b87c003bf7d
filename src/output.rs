//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! me.jpg
//!     Type: image/jpeg
//!     Size: 601.0 KB
//!     OK
//! ```
//!
//! ## Optimize
//!
//! ```text
//! me.jpg → out/me.webp
//!     601.0 KB → 58.3 KB (90.3% smaller)
//!     quality 0.85, 1 attempt
//! ```
//!
//! ## Upload
//!
//! ```text
//! user-1/avatar-1700000000123.webp
//!     601.0 KB → 58.3 KB (90.3% smaller)
//!     quality 0.85, 1 attempt
//!     Removed: user-1/avatar-1699999999000.webp
//!     URL: http://localhost:54321/storage/v1/object/public/profile-images/user-1/avatar-1700000000123.webp
//! ```

use crate::imaging::CompressionResult;
use crate::pipeline::{BatchEvent, UploadOutcome};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count in KB (1 KB = 1024 bytes).
fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

fn size_line(original: u64, compressed: u64, ratio: f64) -> String {
    format!(
        "{}{} → {} ({:.1}% smaller)",
        indent(1),
        format_kb(original),
        format_kb(compressed),
        ratio
    )
}

fn quality_line(quality: u32, attempts: u32, meets_target: bool) -> String {
    let plural = if attempts == 1 { "" } else { "s" };
    let over = if meets_target {
        ""
    } else {
        ", above target size"
    };
    format!(
        "{}quality {:.2}, {} attempt{}{}",
        indent(1),
        quality as f32 / 100.0,
        attempts,
        plural,
        over
    )
}

fn result_lines(result: &CompressionResult) -> Vec<String> {
    vec![
        size_line(
            result.original_size,
            result.compressed_size,
            result.compression_ratio,
        ),
        quality_line(
            result.quality.value(),
            result.attempts,
            result.meets_target(),
        ),
    ]
}

// ============================================================================
// check
// ============================================================================

/// Format the outcome of validating one file.
pub fn format_check_output(
    path: &Path,
    mime: &str,
    size: u64,
    error: Option<&str>,
) -> Vec<String> {
    let mut lines = vec![
        path.display().to_string(),
        format!("{}Type: {}", indent(1), mime),
        format!("{}Size: {}", indent(1), format_kb(size)),
    ];
    match error {
        None => lines.push(format!("{}OK", indent(1))),
        Some(e) => lines.push(format!("{}Rejected: {}", indent(1), e)),
    }
    lines
}

pub fn print_check_output(path: &Path, mime: &str, size: u64, error: Option<&str>) {
    for line in format_check_output(path, mime, size, error) {
        println!("{}", line);
    }
}

// ============================================================================
// optimize
// ============================================================================

/// Format a batch progress event.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Optimized {
            source,
            output,
            original_size,
            compressed_size,
            compression_ratio,
            quality,
            attempts,
            meets_target,
        } => vec![
            format!("{} → {}", source.display(), output.display()),
            size_line(*original_size, *compressed_size, *compression_ratio),
            quality_line(*quality, *attempts, *meets_target),
        ],
        BatchEvent::Failed { source, message } => vec![
            source.display().to_string(),
            format!("{}Error: {}", indent(1), message),
        ],
    }
}

/// Format the closing summary line of a batch.
pub fn format_batch_summary(succeeded: usize, failed: usize) -> String {
    let plural = if succeeded == 1 { "" } else { "s" };
    if failed == 0 {
        format!("Optimized {succeeded} image{plural}")
    } else {
        format!("Optimized {succeeded} image{plural}, {failed} failed")
    }
}

// ============================================================================
// upload
// ============================================================================

/// Format the outcome of an upload.
pub fn format_upload_output(outcome: &UploadOutcome) -> Vec<String> {
    let mut lines = vec![outcome.file.key.clone()];
    lines.extend(result_lines(&outcome.result));
    for key in &outcome.report.removed {
        lines.push(format!("{}Removed: {}", indent(1), key));
    }
    for (key, error) in &outcome.report.leftover {
        lines.push(format!("{}Not removed: {} ({})", indent(1), key, error));
    }
    lines.push(format!("{}URL: {}", indent(1), outcome.report.public_url));
    lines
}

pub fn print_upload_output(outcome: &UploadOutcome) {
    for line in format_upload_output(outcome) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{Dimensions, Quality};
    use crate::package::AvatarFile;
    use crate::storage::{ReplaceReport, StorageError};
    use std::path::PathBuf;

    fn result(original: u64, compressed: u64, quality: u32, attempts: u32) -> CompressionResult {
        CompressionResult {
            data: Vec::new(),
            original_size: original,
            compressed_size: compressed,
            compression_ratio: crate::imaging::compression_ratio(original, compressed),
            dimensions: Dimensions {
                width: 512,
                height: 512,
            },
            quality: Quality::new(quality),
            attempts,
            target_bytes: 100 * 1024,
        }
    }

    #[test]
    fn check_ok_lines() {
        let lines = format_check_output(Path::new("me.jpg"), "image/jpeg", 2048, None);
        assert_eq!(
            lines,
            vec!["me.jpg", "    Type: image/jpeg", "    Size: 2.0 KB", "    OK"]
        );
    }

    #[test]
    fn check_rejected_line() {
        let lines = format_check_output(
            Path::new("cv.pdf"),
            "application/pdf",
            10,
            Some("Unsupported"),
        );
        assert_eq!(lines.last().unwrap(), "    Rejected: Unsupported");
    }

    #[test]
    fn batch_event_optimized() {
        let event = BatchEvent::Optimized {
            source: PathBuf::from("me.jpg"),
            output: PathBuf::from("out/me.webp"),
            original_size: 10240,
            compressed_size: 1024,
            compression_ratio: 90.0,
            quality: 75,
            attempts: 2,
            meets_target: true,
        };
        assert_eq!(
            format_batch_event(&event),
            vec![
                "me.jpg → out/me.webp",
                "    10.0 KB → 1.0 KB (90.0% smaller)",
                "    quality 0.75, 2 attempts",
            ]
        );
    }

    #[test]
    fn batch_event_over_target_is_flagged() {
        let event = BatchEvent::Optimized {
            source: PathBuf::from("big.png"),
            output: PathBuf::from("out/big.webp"),
            original_size: 2_000_000,
            compressed_size: 150_000,
            compression_ratio: 92.5,
            quality: 55,
            attempts: 4,
            meets_target: false,
        };
        let lines = format_batch_event(&event);
        assert_eq!(lines[2], "    quality 0.55, 4 attempts, above target size");
    }

    #[test]
    fn batch_event_failed() {
        let event = BatchEvent::Failed {
            source: PathBuf::from("cv.pdf"),
            message: "nope".into(),
        };
        assert_eq!(format_batch_event(&event), vec!["cv.pdf", "    Error: nope"]);
    }

    #[test]
    fn batch_summary_wording() {
        assert_eq!(format_batch_summary(1, 0), "Optimized 1 image");
        assert_eq!(format_batch_summary(3, 1), "Optimized 3 images, 1 failed");
    }

    #[test]
    fn upload_lists_removed_and_leftover() {
        let outcome = UploadOutcome {
            result: result(601 * 1024, 60 * 1024, 85, 1),
            file: AvatarFile {
                key: "u/avatar-2.webp".into(),
                content_type: "image/webp",
                data: Vec::new(),
                sha256: String::new(),
            },
            report: ReplaceReport {
                key: "u/avatar-2.webp".into(),
                public_url: "https://cdn/u/avatar-2.webp".into(),
                removed: vec!["u/avatar-1.webp".into()],
                leftover: vec![(
                    "u/avatar-0.webp".into(),
                    StorageError::NotFound("u/avatar-0.webp".into()),
                )],
            },
        };

        let lines = format_upload_output(&outcome);
        assert_eq!(lines[0], "u/avatar-2.webp");
        assert_eq!(lines[1], "    601.0 KB → 60.0 KB (90.0% smaller)");
        assert_eq!(lines[2], "    quality 0.85, 1 attempt");
        assert_eq!(lines[3], "    Removed: u/avatar-1.webp");
        assert!(lines[4].starts_with("    Not removed: u/avatar-0.webp"));
        assert_eq!(lines[5], "    URL: https://cdn/u/avatar-2.webp");
    }
}

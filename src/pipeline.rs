//! The avatar pipeline end to end.
//!
//! ```text
//! validate → decode → center-crop → compress → package → replace in bucket → profile
//! ```
//!
//! Each stage runs to completion before the next starts; nothing is retried.
//! Errors fall into the three categories users see:
//!
//! | Stage | Error | Message |
//! |---|---|---|
//! | validate | [`ValidationError`] | the validation message itself |
//! | decode / crop / compress | [`BackendError`] | `Failed to compress image: …` |
//! | upload | [`StorageError`] | `Failed to upload image: …` |
//!
//! [`optimize_batch`] runs the pipeline (without storage) over many files,
//! in parallel across files with rayon. A single file's compression attempts
//! are always sequential.

use crate::config::AvatarConfig;
use crate::imaging::{
    BackendError, CompressionParams, CompressionResult, ImageBackend, optimize_image,
};
use crate::package::{AvatarFile, package};
use crate::profile::{ProfileError, ProfileTable};
use crate::storage::{ObjectStore, ReplaceReport, StorageError, replace_avatar};
use crate::validate::{
    InputPolicy, ValidationError, mime_from_path, validate_input, validate_user_id,
};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("{0}")]
    Invalid(#[from] ValidationError),
    #[error("Failed to compress image: {0}")]
    Compress(#[from] BackendError),
    #[error("Failed to upload image: {0}")]
    Upload(#[from] StorageError),
    #[error("Failed to update profile: {0}")]
    Profile(#[from] ProfileError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the pipeline needs from configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub input: InputPolicy,
    pub compression: CompressionParams,
}

impl PipelineConfig {
    pub fn from_config(config: &AvatarConfig) -> Self {
        Self {
            input: config.input_policy(),
            compression: config.compression_params(),
        }
    }
}

/// Validate, then decode, crop, and compress.
///
/// Invalid input is rejected before the backend sees a single byte.
pub fn optimize_avatar(
    backend: &impl ImageBackend,
    bytes: &[u8],
    mime: &str,
    config: &PipelineConfig,
) -> Result<CompressionResult, AvatarError> {
    validate_input(&config.input, mime, bytes.len() as u64)?;
    let result = optimize_image(backend, bytes, &config.compression)?;

    if !result.meets_target() {
        warn!(
            bytes = result.compressed_size,
            target = result.target_bytes,
            quality = result.quality.value(),
            "quality floor reached above target size"
        );
    }
    info!(
        original = result.original_size,
        compressed = result.compressed_size,
        ratio = result.compression_ratio,
        quality = result.quality.value(),
        attempts = result.attempts,
        "optimized avatar"
    );
    Ok(result)
}

/// Result of a successful upload.
#[derive(Debug)]
pub struct UploadOutcome {
    pub result: CompressionResult,
    pub file: AvatarFile,
    pub report: ReplaceReport,
}

/// Optimize an image and make it the user's only avatar.
///
/// The new object is uploaded before old ones are deleted; see
/// [`replace_avatar`]. `unix_millis` becomes part of the storage key.
pub fn upload_avatar(
    backend: &impl ImageBackend,
    store: &impl ObjectStore,
    bytes: &[u8],
    mime: &str,
    user_id: &str,
    unix_millis: u64,
    config: &PipelineConfig,
) -> Result<UploadOutcome, AvatarError> {
    validate_user_id(user_id)?;
    let result = optimize_avatar(backend, bytes, mime, config)?;
    let file = package(user_id, unix_millis, &result)?;
    let report = replace_avatar(store, &file)?;
    Ok(UploadOutcome {
        result,
        file,
        report,
    })
}

/// Upload an avatar and record its URL on the user's profile row.
#[allow(clippy::too_many_arguments)]
pub fn upload_and_record(
    backend: &impl ImageBackend,
    store: &impl ObjectStore,
    profiles: &mut ProfileTable,
    bytes: &[u8],
    mime: &str,
    user_id: &str,
    unix_millis: u64,
    config: &PipelineConfig,
) -> Result<UploadOutcome, AvatarError> {
    let outcome = upload_avatar(backend, store, bytes, mime, user_id, unix_millis, config)?;
    profiles.set_avatar(user_id, &outcome.report.public_url);
    profiles.save()?;
    Ok(outcome)
}

// =============================================================================
// Batch optimization
// =============================================================================

/// Progress event emitted as each file finishes.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Optimized {
        source: PathBuf,
        output: PathBuf,
        original_size: u64,
        compressed_size: u64,
        compression_ratio: f64,
        quality: u32,
        attempts: u32,
        meets_target: bool,
    },
    Failed {
        source: PathBuf,
        message: String,
    },
}

/// Outcome for one file of a batch.
#[derive(Debug)]
pub struct BatchItem {
    pub source: PathBuf,
    pub output: PathBuf,
    pub result: Result<CompressionResult, AvatarError>,
}

/// Output path for a source file: `<out_dir>/<stem>.webp`.
pub fn batch_output_path(source: &Path, out_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "avatar".to_string());
    out_dir.join(format!("{stem}.webp"))
}

/// Output paths for a whole batch, one per source and all distinct.
///
/// The first source with a given stem gets `<stem>.webp`; later ones get
/// `<stem>-2.webp`, `<stem>-3.webp` and so on.
pub fn batch_output_paths(sources: &[PathBuf], out_dir: &Path) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    sources
        .iter()
        .map(|source| {
            let base = batch_output_path(source, out_dir);
            let mut candidate = base.clone();
            let mut n = 2;
            while !taken.insert(candidate.clone()) {
                let stem = base
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                candidate = out_dir.join(format!("{stem}-{n}.webp"));
                n += 1;
            }
            candidate
        })
        .collect()
}

/// Read a file for the pipeline, rejecting it on declared type and size
/// before its contents are loaded.
pub fn read_checked(
    path: &Path,
    mime: &str,
    policy: &InputPolicy,
) -> Result<Vec<u8>, AvatarError> {
    let size = std::fs::metadata(path)?.len();
    validate_input(policy, mime, size)?;
    Ok(std::fs::read(path)?)
}

fn optimize_file(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    config: &PipelineConfig,
) -> Result<CompressionResult, AvatarError> {
    let mime = mime_from_path(source);
    let bytes = read_checked(source, mime, &config.input)?;
    let result = optimize_avatar(backend, &bytes, mime, config)?;
    std::fs::write(output, &result.data)?;
    Ok(result)
}

/// Optimize many files into `out_dir`, in parallel across files.
///
/// Results come back in input order. Per-file failures do not stop the batch.
/// Sources sharing a stem write to distinct files, see [`batch_output_paths`].
pub fn optimize_batch(
    backend: &impl ImageBackend,
    sources: &[PathBuf],
    out_dir: &Path,
    config: &PipelineConfig,
    events: Option<Sender<BatchEvent>>,
) -> Result<Vec<BatchItem>, AvatarError> {
    std::fs::create_dir_all(out_dir)?;

    let outputs = batch_output_paths(sources, out_dir);
    let items = sources
        .par_iter()
        .zip(outputs)
        .map(|(source, output)| {
            let result = optimize_file(backend, source, &output, config);

            if let Some(tx) = &events {
                let event = match &result {
                    Ok(r) => BatchEvent::Optimized {
                        source: source.clone(),
                        output: output.clone(),
                        original_size: r.original_size,
                        compressed_size: r.compressed_size,
                        compression_ratio: r.compression_ratio,
                        quality: r.quality.value(),
                        attempts: r.attempts,
                        meets_target: r.meets_target(),
                    },
                    Err(e) => BatchEvent::Failed {
                        source: source.clone(),
                        message: e.to_string(),
                    },
                };
                // Receiver gone only means nobody is printing progress.
                tx.send(event).ok();
            }

            BatchItem {
                source: source.clone(),
                output,
                result,
            }
        })
        .collect();

    Ok(items)
}

//! Configuration module.
//!
//! Handles loading, validating, and merging `avatar.toml`. Stock defaults
//! encode the avatar contract (2 MiB input ceiling, 512×512 WebP output,
//! 100 KiB target, quality 0.85 → 0.5 in 0.1 steps); a config file only
//! needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [input]
//! max_bytes = 2097152       # Largest accepted upload (2 MiB)
//! accepted_types = ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"]
//!
//! [output]
//! size = 512                # Edge of the square output canvas
//! target_bytes = 102400     # Stop compressing once at or below this (100 KiB)
//!
//! [compression]
//! start_quality = 85        # First attempt (percent, 85 = 0.85)
//! quality_step = 10         # Decrease per attempt
//! min_quality = 50          # Never encode below this
//!
//! [storage]
//! bucket = "profile-images"
//! root = ".simple-avatar/storage"
//! public_base_url = "http://localhost:54321/storage/v1/object/public"
//! profiles = ".simple-avatar/profiles.json"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers for batch optimize (omit for auto)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{CompressionParams, Quality};
use crate::validate::{ACCEPTED_TYPES, InputPolicy, MAX_INPUT_BYTES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `avatar.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AvatarConfig {
    /// Upload acceptance rules.
    pub input: InputConfig,
    /// Output canvas and size target.
    pub output: OutputConfig,
    /// Quality schedule for the compressor.
    pub compression: CompressionConfig,
    /// Bucket and profile table locations.
    pub storage: StorageConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl AvatarConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "input.max_bytes must be non-zero".into(),
            ));
        }
        if self.input.accepted_types.is_empty() {
            return Err(ConfigError::Validation(
                "input.accepted_types must not be empty".into(),
            ));
        }
        if self.output.size == 0 {
            return Err(ConfigError::Validation("output.size must be non-zero".into()));
        }
        if self.output.target_bytes == 0 {
            return Err(ConfigError::Validation(
                "output.target_bytes must be non-zero".into(),
            ));
        }
        let c = &self.compression;
        for (name, value) in [
            ("start_quality", c.start_quality),
            ("min_quality", c.min_quality),
        ] {
            if !(1..=100).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "compression.{name} must be 1-100"
                )));
            }
        }
        if c.quality_step == 0 {
            return Err(ConfigError::Validation(
                "compression.quality_step must be non-zero".into(),
            ));
        }
        if c.min_quality > c.start_quality {
            return Err(ConfigError::Validation(
                "compression.min_quality must not exceed start_quality".into(),
            ));
        }
        let bucket = self.storage.bucket.as_str();
        if bucket.is_empty()
            || bucket == "."
            || bucket == ".."
            || bucket.contains(['/', '\\'])
        {
            return Err(ConfigError::Validation(
                "storage.bucket must be a single non-empty name".into(),
            ));
        }
        Ok(())
    }

    /// Validator rules derived from `[input]`.
    pub fn input_policy(&self) -> InputPolicy {
        InputPolicy {
            accepted_types: self.input.accepted_types.clone(),
            max_bytes: self.input.max_bytes,
        }
    }

    /// Compressor bounds derived from `[output]` and `[compression]`.
    pub fn compression_params(&self) -> CompressionParams {
        CompressionParams {
            target_bytes: self.output.target_bytes,
            output_size: self.output.size,
            start_quality: Quality::new(self.compression.start_quality),
            quality_step: self.compression.quality_step,
            min_quality: Quality::new(self.compression.min_quality),
        }
    }
}

/// Upload acceptance rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Largest accepted upload in bytes.
    pub max_bytes: u64,
    /// Declared MIME types that are accepted.
    pub accepted_types: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_bytes: MAX_INPUT_BYTES,
            accepted_types: ACCEPTED_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Output canvas settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Edge length in pixels of the square WebP output.
    pub size: u32,
    /// Byte ceiling the compressor aims for.
    pub target_bytes: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            size: 512,
            target_bytes: 100 * 1024,
        }
    }
}

/// Compressor quality schedule, in percent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    pub start_quality: u32,
    pub quality_step: u32,
    pub min_quality: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            start_quality: 85,
            quality_step: 10,
            min_quality: 50,
        }
    }
}

/// Where avatars and profiles live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Bucket name; objects are keyed `{user_id}/avatar-{millis}.webp` inside it.
    pub bucket: String,
    /// Directory holding the bucket for the local store.
    pub root: PathBuf,
    /// Base URL objects are publicly served from.
    pub public_base_url: String,
    /// JSON file holding profile rows.
    pub profiles: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "profile-images".to_string(),
            root: PathBuf::from(".simple-avatar/storage"),
            public_base_url: "http://localhost:54321/storage/v1/object/public".to_string(),
            profiles: PathBuf::from(".simple-avatar/profiles.json"),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers for batch optimization.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(AvatarConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<AvatarConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AvatarConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file, falling back to stock defaults if it is absent.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<AvatarConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `avatar.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Simple Avatar Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Input validation
# ---------------------------------------------------------------------------
[input]
# Largest accepted upload in bytes (2 MiB). Checked before decoding.
max_bytes = 2097152

# Declared MIME types that are accepted. Anything else is rejected outright.
accepted_types = ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"]

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Edge length of the square WebP avatar, in pixels.
size = 512

# The compressor stops at the first attempt at or below this many bytes.
# If no attempt gets there, the smallest one is kept anyway.
target_bytes = 102400

# ---------------------------------------------------------------------------
# Compression schedule (percent: 85 = quality 0.85)
# ---------------------------------------------------------------------------
[compression]
start_quality = 85
quality_step = 10
min_quality = 50

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Bucket name. Objects are keyed {user_id}/avatar-{unix_millis}.webp.
bucket = "profile-images"

# Directory holding the bucket.
root = ".simple-avatar/storage"

# Public URL prefix; the object URL is {public_base_url}/{bucket}/{key}.
public_base_url = "http://localhost:54321/storage/v1/object/public"

# JSON file holding profile rows (avatar_url / profile_picture).
profiles = ".simple-avatar/profiles.json"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for batch optimize.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

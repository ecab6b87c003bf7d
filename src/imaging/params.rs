//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what to crop and how hard to compress) and the
//! [`backend`](super::backend) (which does the actual pixel work). This
//! separation allows swapping backends (e.g. for testing with a mock) without
//! changing operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality in percent (1–100, default 85). Clamped on construction.
//! - [`CropParams`]: Square source region plus the edge length of the output canvas.
//! - [`CompressionParams`]: Target byte ceiling and the quality schedule bounds.

use super::calculations::CropRect;
use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding, in percent (1-100).
///
/// `Quality::new(85)` corresponds to an encoder quality of `0.85`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Quality as the 0.0–1.0 fraction used in user-facing reports.
    pub fn as_fraction(self) -> f32 {
        self.0 as f32 / 100.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Crop a square region and scale it to an `output_size` square canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropParams {
    pub rect: CropRect,
    pub output_size: u32,
}

/// Bounds for the iterative compressor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionParams {
    /// Stop as soon as an encode is at or below this many bytes.
    pub target_bytes: u64,
    /// Edge length of the square output canvas.
    pub output_size: u32,
    pub start_quality: Quality,
    pub quality_step: u32,
    pub min_quality: Quality,
}

impl Default for CompressionParams {
    fn default() -> Self {
        Self {
            target_bytes: 100 * 1024,
            output_size: 512,
            start_quality: Quality::new(85),
            quality_step: 10,
            min_quality: Quality::new(50),
        }
    }
}

//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take parameters, compute the crop and quality schedule, and call the
//! backend. [`optimize_image`] is the decode → crop → compress part of the
//! avatar pipeline; input validation happens before it and packaging after.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{calculate_center_crop, compression_ratio, quality_schedule};
use super::params::{CompressionParams, CropParams, Quality};
use tracing::debug;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Output of the iterative compressor.
#[derive(Debug, Clone, PartialEq)]
pub struct Compressed {
    pub data: Vec<u8>,
    pub quality: Quality,
    /// Number of encodes performed (1 when the first attempt met the target).
    pub attempts: u32,
}

/// A compressed avatar and the numbers describing it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    /// Encoded WebP bytes.
    pub data: Vec<u8>,
    pub original_size: u64,
    pub compressed_size: u64,
    /// Size reduction in percent, see [`compression_ratio`].
    pub compression_ratio: f64,
    /// Output canvas dimensions.
    pub dimensions: Dimensions,
    /// Quality of the returned attempt.
    pub quality: Quality,
    pub attempts: u32,
    /// The byte ceiling the compressor aimed for.
    pub target_bytes: u64,
}

impl CompressionResult {
    /// Whether the output is within the byte ceiling.
    ///
    /// The compressor is best-effort: when the quality floor is reached first
    /// the result is still returned, so callers must check this.
    pub fn meets_target(&self) -> bool {
        self.compressed_size <= self.target_bytes
    }
}

/// Plan the crop for a decoded image without executing it.
pub fn plan_crop(dims: Dimensions, output_size: u32) -> CropParams {
    CropParams {
        rect: calculate_center_crop(dims.width, dims.height),
        output_size,
    }
}

/// Encode at decreasing quality until the output fits the byte ceiling.
///
/// Attempts follow [`quality_schedule`]; the loop stops at the first encode
/// at or below `params.target_bytes`. If none fits, the smallest attempt is
/// returned (ties keep the higher quality).
pub fn compress<B: ImageBackend>(
    backend: &B,
    bitmap: &B::Bitmap,
    params: &CompressionParams,
) -> Result<Compressed> {
    let schedule = quality_schedule(
        params.start_quality,
        params.quality_step,
        params.min_quality,
    );
    let mut best: Option<Compressed> = None;
    let mut attempts = 0;

    for quality in schedule {
        let data = backend.encode_webp(bitmap, quality)?;
        attempts += 1;
        debug!(
            quality = quality.value(),
            bytes = data.len(),
            target = params.target_bytes,
            "compression attempt"
        );

        let fits = data.len() as u64 <= params.target_bytes;
        let smaller = best
            .as_ref()
            .is_none_or(|b| data.len() < b.data.len());
        if smaller {
            best = Some(Compressed {
                data,
                quality,
                attempts,
            });
        }
        if fits {
            break;
        }
    }

    let mut best = best.ok_or_else(|| {
        BackendError::ProcessingFailed("Quality schedule produced no attempts".into())
    })?;
    best.attempts = attempts;
    Ok(best)
}

/// Decode, center-crop, resize, and compress an image held in memory.
pub fn optimize_image(
    backend: &impl ImageBackend,
    bytes: &[u8],
    params: &CompressionParams,
) -> Result<CompressionResult> {
    let bitmap = backend.decode(bytes)?;
    let dims = backend.dimensions(&bitmap);
    if dims.width == 0 || dims.height == 0 {
        return Err(BackendError::Decode(format!(
            "Image has no pixels ({}x{})",
            dims.width, dims.height
        )));
    }

    let crop = plan_crop(dims, params.output_size);
    debug!(
        width = dims.width,
        height = dims.height,
        x = crop.rect.x,
        y = crop.rect.y,
        size = crop.rect.size,
        "center crop"
    );
    let cropped = backend.crop_resize(&bitmap, &crop)?;
    let compressed = compress(backend, &cropped, params)?;

    let original_size = bytes.len() as u64;
    let compressed_size = compressed.data.len() as u64;
    Ok(CompressionResult {
        data: compressed.data,
        original_size,
        compressed_size,
        compression_ratio: compression_ratio(original_size, compressed_size),
        dimensions: backend.dimensions(&cropped),
        quality: compressed.quality,
        attempts: compressed.attempts,
        target_bytes: params.target_bytes,
    })
}

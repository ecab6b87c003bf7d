//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations the avatar pipeline
//! needs: decode, dimensions, crop_resize, and encode_webp. Operations work on
//! in-memory buffers; nothing here touches the filesystem.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate for decoding and resampling and `libwebp` (via the `webp` crate) for
//! lossy encoding.

use super::params::{CropParams, Quality};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Bitmap` is the backend's decoded representation. The pipeline only ever
/// moves bitmaps between calls on the same backend, so a mock can use plain
/// [`Dimensions`] while the real backend uses `image::DynamicImage`.
pub trait ImageBackend: Sync {
    type Bitmap;

    /// Decode an encoded image held in memory.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Bitmap, BackendError>;

    /// Dimensions of a decoded bitmap.
    fn dimensions(&self, bitmap: &Self::Bitmap) -> Dimensions;

    /// Crop a square region and scale it to the output canvas.
    fn crop_resize(
        &self,
        bitmap: &Self::Bitmap,
        params: &CropParams,
    ) -> Result<Self::Bitmap, BackendError>;

    /// Encode as lossy WebP at the given quality.
    fn encode_webp(&self, bitmap: &Self::Bitmap, quality: Quality)
    -> Result<Vec<u8>, BackendError>;
}

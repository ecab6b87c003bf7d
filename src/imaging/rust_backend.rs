//! Production image backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP) | `image::ImageReader` with content-sniffed format |
//! | Crop | `image::DynamicImage::crop_imm` |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → WebP (lossy) | `webp::Encoder` (libwebp) |
//!
//! GIF input decodes to its first frame. Animated avatars are flattened.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{CropParams, Quality};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;

/// Backend using the `image` crate ecosystem plus libwebp for encoding.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    type Bitmap = DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(format!("Failed to sniff format: {e}")))?
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn dimensions(&self, bitmap: &DynamicImage) -> Dimensions {
        let (width, height) = bitmap.dimensions();
        Dimensions { width, height }
    }

    fn crop_resize(
        &self,
        bitmap: &DynamicImage,
        params: &CropParams,
    ) -> Result<DynamicImage, BackendError> {
        let (width, height) = bitmap.dimensions();
        let rect = params.rect;
        let outside = |start: u32, limit: u32| {
            start
                .checked_add(rect.size)
                .is_none_or(|end| end > limit)
        };
        if rect.size == 0 || outside(rect.x, width) || outside(rect.y, height) {
            return Err(BackendError::ProcessingFailed(format!(
                "Crop {}x{}+{}+{} outside {}x{} image",
                rect.size, rect.size, rect.x, rect.y, width, height
            )));
        }

        let cropped = bitmap.crop_imm(rect.x, rect.y, rect.size, rect.size);
        if rect.size == params.output_size {
            return Ok(cropped);
        }
        Ok(cropped.resize_exact(
            params.output_size,
            params.output_size,
            FilterType::Lanczos3,
        ))
    }

    fn encode_webp(
        &self,
        bitmap: &DynamicImage,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        // libwebp only takes 8-bit RGB/RGBA; drop the alpha plane when unused.
        let pixels = if bitmap.color().has_alpha() {
            DynamicImage::ImageRgba8(bitmap.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(bitmap.to_rgb8())
        };
        let encoder = webp::Encoder::from_image(&pixels).map_err(|e| {
            BackendError::ProcessingFailed(format!("WebP encoder rejected image: {e}"))
        })?;
        let memory = encoder
            .encode_simple(false, quality.value() as f32)
            .map_err(|e| BackendError::ProcessingFailed(format!("WebP encode failed: {e:?}")))?;
        Ok(memory.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::calculations::calculate_center_crop;
    use crate::test_helpers::{encode_test_jpeg, encode_test_png_rgba, is_webp};

    #[test]
    fn decode_synthetic_jpeg() {
        let bytes = encode_test_jpeg(200, 150);
        let backend = RustBackend::new();
        let bitmap = backend.decode(&bytes).unwrap();
        assert_eq!(
            backend.dimensions(&bitmap),
            Dimensions {
                width: 200,
                height: 150
            }
        );
    }

    #[test]
    fn decode_garbage_errors() {
        let backend = RustBackend::new();
        let result = backend.decode(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn crop_resize_produces_square_canvas() {
        let bytes = encode_test_jpeg(416, 626);
        let backend = RustBackend::new();
        let bitmap = backend.decode(&bytes).unwrap();

        let params = CropParams {
            rect: calculate_center_crop(416, 626),
            output_size: 512,
        };
        let out = backend.crop_resize(&bitmap, &params).unwrap();
        assert_eq!(out.dimensions(), (512, 512));
    }

    #[test]
    fn crop_resize_rejects_out_of_bounds_rect() {
        let bytes = encode_test_jpeg(100, 100);
        let backend = RustBackend::new();
        let bitmap = backend.decode(&bytes).unwrap();

        let params = CropParams {
            rect: crate::imaging::CropRect {
                x: 50,
                y: 0,
                size: 100,
            },
            output_size: 64,
        };
        assert!(backend.crop_resize(&bitmap, &params).is_err());
    }

    #[test]
    fn crop_resize_rejects_rect_past_u32_range() {
        let bytes = encode_test_jpeg(16, 16);
        let backend = RustBackend::new();
        let bitmap = backend.decode(&bytes).unwrap();

        let params = CropParams {
            rect: crate::imaging::CropRect {
                x: u32::MAX,
                y: 0,
                size: 8,
            },
            output_size: 8,
        };
        assert!(matches!(
            backend.crop_resize(&bitmap, &params),
            Err(BackendError::ProcessingFailed(_))
        ));
    }

    #[test]
    fn encode_webp_writes_riff_container() {
        let bytes = encode_test_jpeg(64, 64);
        let backend = RustBackend::new();
        let bitmap = backend.decode(&bytes).unwrap();

        let webp = backend.encode_webp(&bitmap, Quality::new(85)).unwrap();
        assert!(is_webp(&webp));
    }

    #[test]
    fn encode_webp_keeps_alpha_input_working() {
        let bytes = encode_test_png_rgba(48, 32);
        let backend = RustBackend::new();
        let bitmap = backend.decode(&bytes).unwrap();
        assert!(bitmap.color().has_alpha());

        let webp = backend.encode_webp(&bitmap, Quality::new(75)).unwrap();
        assert!(is_webp(&webp));
        let decoded = backend.decode(&webp).unwrap();
        assert_eq!(decoded.dimensions(), (48, 32));
    }

    #[test]
    fn lower_quality_is_not_larger() {
        let bytes = encode_test_jpeg(256, 256);
        let backend = RustBackend::new();
        let bitmap = backend.decode(&bytes).unwrap();

        let high = backend.encode_webp(&bitmap, Quality::new(95)).unwrap();
        let low = backend.encode_webp(&bitmap, Quality::new(50)).unwrap();
        assert!(low.len() <= high.len());
    }
}

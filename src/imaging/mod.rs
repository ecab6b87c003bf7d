//! Image processing for avatars.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (JPEG, PNG, GIF, WebP) |
//! | **Center crop** | [`calculate_center_crop`] + `crop_imm` |
//! | **Resize** | Lanczos3 to the square output canvas |
//! | **Compress** | lossy WebP, stepping quality down to a floor |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop geometry and the quality schedule (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{CropRect, calculate_center_crop, compression_ratio, quality_schedule};
pub use operations::{Compressed, CompressionResult, compress, optimize_image, plan_crop};
pub use params::{CompressionParams, CropParams, Quality};
pub use rust_backend::RustBackend;

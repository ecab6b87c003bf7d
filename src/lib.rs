//! # Simple Avatar
//!
//! The profile-image pipeline: take whatever a user uploads as their avatar,
//! turn it into a small square WebP, and make it their only stored avatar.
//!
//! # Architecture: One Sequential Pipeline
//!
//! ```text
//! 1. Validate   MIME + size          → reject early, before any decode
//! 2. Decode     bytes → bitmap
//! 3. Crop       centered square on the smaller dimension
//! 4. Compress   512×512 WebP, quality 0.85 → 0.5 until ≤ 100 KiB
//! 5. Package    {user_id}/avatar-{unix_millis}.webp
//! 6. Replace    upload new object, then delete the user's old ones
//! 7. Record     avatar_url + profile_picture on the profile row
//! ```
//!
//! Stages 2–4 are pure functions over an [`imaging::ImageBackend`], so unit
//! tests can exercise the pipeline logic with a mock that never encodes a
//! pixel.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`validate`] | MIME/size/user-id precondition checks |
//! | [`imaging`] | Crop geometry, quality schedule, backend trait, `image` + libwebp backend |
//! | [`package`] | Storage key and file wrapper for a compressed avatar |
//! | [`storage`] | `ObjectStore` trait, directory-backed bucket, avatar replacement |
//! | [`profile`] | Profile rows with the avatar URL kept in both columns |
//! | [`pipeline`] | Stage orchestration, error categories, parallel batch mode |
//! | [`config`] | `avatar.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Best-Effort Size Target
//!
//! The compressor tries at most four qualities (0.85, 0.75, 0.65, 0.55). If
//! none fits under the target it keeps the smallest encode instead of failing.
//! An oversized avatar is better than no avatar;
//! [`imaging::CompressionResult::meets_target`] tells the caller which case
//! it got.
//!
//! ## Upload Before Delete
//!
//! Replacing an avatar uploads the new object first and only then removes the
//! old ones. A failed upload changes nothing; a failed cleanup leaves an extra
//! object behind and says so in [`storage::ReplaceReport`]. The user is never
//! left without an avatar by a crash mid-replace.

pub mod config;
pub mod imaging;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod profile;
pub mod storage;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;

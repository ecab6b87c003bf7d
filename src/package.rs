//! Packaging compressed avatars for storage.
//!
//! The storage key is a pure function of the user id and a millisecond
//! timestamp: `{user_id}/avatar-{unix_millis}.webp`. Callers pass the
//! timestamp in; [`unix_millis_now`] is the production source.

use crate::imaging::CompressionResult;
use crate::validate::{ValidationError, validate_user_id};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Content type of every packaged avatar.
pub const AVATAR_CONTENT_TYPE: &str = "image/webp";

/// A compressed avatar ready to hand to object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarFile {
    pub key: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
    /// SHA-256 of `data`, hex encoded.
    pub sha256: String,
}

/// Storage folder owned by a user (always ends in `/`).
pub fn user_prefix(user_id: &str) -> String {
    format!("{user_id}/")
}

/// Storage key for an avatar uploaded at `unix_millis`.
pub fn avatar_key(user_id: &str, unix_millis: u64) -> String {
    format!("{}avatar-{unix_millis}.webp", user_prefix(user_id))
}

/// Milliseconds since the Unix epoch (0 if the clock is before 1970).
pub fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Wrap a compression result as a storable file.
pub fn package(
    user_id: &str,
    unix_millis: u64,
    result: &CompressionResult,
) -> Result<AvatarFile, ValidationError> {
    validate_user_id(user_id)?;
    Ok(AvatarFile {
        key: avatar_key(user_id, unix_millis),
        content_type: AVATAR_CONTENT_TYPE,
        data: result.data.clone(),
        sha256: sha256_hex(&result.data),
    })
}

//! Object storage for avatars.
//!
//! The [`ObjectStore`] trait is the seam to whatever holds the
//! `profile-images` bucket. [`LocalStore`] keeps the bucket in a directory,
//! one file per object, which is what the CLI and the tests use.
//!
//! # Replacing an avatar
//!
//! [`replace_avatar`] uploads the new object **before** removing the user's
//! old ones:
//!
//! ```text
//! put  user-1/avatar-1700000000999.webp
//! list user-1/        → [avatar-1700000000123.webp, avatar-1700000000999.webp]
//! del  user-1/avatar-1700000000123.webp
//! ```
//!
//! A failed upload therefore leaves the previous avatar in place. A failed
//! cleanup after a successful upload is reported in
//! [`ReplaceReport::leftover`]; the new avatar is live either way.

use crate::package::{AvatarFile, user_prefix};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid object key '{0}'")]
    InvalidKey(String),
    #[error("Object not found: {0}")]
    NotFound(String),
}

/// A bucket of keyed objects.
pub trait ObjectStore: Sync {
    /// Store `data` under `key`, replacing any existing object.
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// All keys starting with `prefix`, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Remove the object at `key`.
    fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Public URL an object is served from.
    fn public_url(&self, key: &str) -> String;
}

/// Check that a key is a relative, `/`-separated path with no empty,
/// `.` or `..` segments.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Directory-backed bucket: object `a/b.webp` lives at `<root>/<bucket>/a/b.webp`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    bucket_dir: PathBuf,
    bucket: String,
    public_base_url: String,
}

impl LocalStore {
    pub fn new(root: &Path, bucket: &str, public_base_url: &str) -> Self {
        Self {
            bucket_dir: root.join(bucket),
            bucket: bucket.to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.bucket_dir.join(key))
    }

    /// Read an object back.
    pub fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::Io(e),
        })
    }

    /// Key of a file inside the bucket directory, `/`-separated.
    fn key_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.bucket_dir).ok()?;
        let mut segments = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(seg) => segments.push(seg.to_str()?),
                _ => return None,
            }
        }
        Some(segments.join("/"))
    }
}

impl ObjectStore for LocalStore {
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write beside the target, then rename, so readers never see a torn object.
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
        let partial = path.with_file_name(format!(".{file_name}.partial"));
        fs::write(&partial, data)?;
        fs::rename(&partial, &path)?;

        debug!(key, content_type, bytes = data.len(), "stored object");
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        // Only walk the deepest directory the prefix names.
        let dir = match prefix.rfind('/') {
            Some(idx) => {
                let dir_part = &prefix[..idx];
                validate_key(dir_part)?;
                self.bucket_dir.join(dir_part)
            }
            None => self.bucket_dir.clone(),
        };
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&dir) {
            let entry = entry.map_err(|e| StorageError::Io(io::Error::other(e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let hidden = entry
                .file_name()
                .to_str()
                .is_none_or(|name| name.starts_with('.'));
            if hidden {
                continue;
            }
            match self.key_for(entry.path()) {
                Some(key) if key.starts_with(prefix) => keys.push(key),
                _ => {}
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::Io(e),
        })?;
        debug!(key, "deleted object");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, key)
    }
}

/// Outcome of [`replace_avatar`].
#[derive(Debug)]
pub struct ReplaceReport {
    /// Key of the newly uploaded avatar.
    pub key: String,
    pub public_url: String,
    /// Old objects that were removed.
    pub removed: Vec<String>,
    /// Objects (or the prefix, if listing failed) that could not be removed.
    pub leftover: Vec<(String, StorageError)>,
}

impl ReplaceReport {
    /// True when the new avatar is the only object under the user's prefix.
    pub fn is_complete(&self) -> bool {
        self.leftover.is_empty()
    }
}

/// Upload a new avatar, then delete every other object under the owner's prefix.
///
/// Returns `Err` only when the upload itself fails, in which case nothing
/// was deleted.
pub fn replace_avatar(
    store: &impl ObjectStore,
    file: &AvatarFile,
) -> Result<ReplaceReport, StorageError> {
    let owner = file
        .key
        .split('/')
        .next()
        .filter(|seg| !seg.is_empty() && file.key.contains('/'))
        .ok_or_else(|| StorageError::InvalidKey(file.key.clone()))?;
    let prefix = user_prefix(owner);

    store.put(&file.key, &file.data, file.content_type)?;

    let mut report = ReplaceReport {
        key: file.key.clone(),
        public_url: store.public_url(&file.key),
        removed: Vec::new(),
        leftover: Vec::new(),
    };

    let existing = match store.list(&prefix) {
        Ok(keys) => keys,
        Err(e) => {
            warn!(prefix = %prefix, error = %e, "uploaded avatar but could not list old objects");
            report.leftover.push((prefix, e));
            return Ok(report);
        }
    };

    for key in existing.into_iter().filter(|k| *k != file.key) {
        match store.delete(&key) {
            Ok(()) => report.removed.push(key),
            Err(e) => {
                warn!(key = %key, error = %e, "could not delete old avatar");
                report.leftover.push((key, e));
            }
        }
    }

    info!(
        key = %report.key,
        removed = report.removed.len(),
        leftover = report.leftover.len(),
        "replaced avatar"
    );
    Ok(report)
}

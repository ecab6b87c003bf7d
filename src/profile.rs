//! Profile rows and the avatar URL kept on them.
//!
//! Profiles carry the avatar URL twice, as `avatar_url` and
//! `profile_picture`, because different readers look at different columns.
//! [`Profile::set_avatar`] is the only writer of either and always sets both.
//!
//! [`ProfileTable`] is a JSON file keyed by user id:
//!
//! ```json
//! {
//!   "user-1": {
//!     "id": "user-1",
//!     "username": "ada",
//!     "avatar_url": "https://…/profile-images/user-1/avatar-1700000000123.webp",
//!     "profile_picture": "https://…/profile-images/user-1/avatar-1700000000123.webp",
//!     "is_public": false
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A user's profile row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_me: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    pub is_public: bool,
}

impl Profile {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    /// Point both avatar columns at `url`.
    pub fn set_avatar(&mut self, url: &str) {
        self.avatar_url = Some(url.to_string());
        self.profile_picture = Some(url.to_string());
    }
}

/// Profiles persisted as one JSON file.
#[derive(Debug)]
pub struct ProfileTable {
    path: PathBuf,
    rows: BTreeMap<String, Profile>,
}

impl ProfileTable {
    /// Load the table, starting empty if the file does not exist yet.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let rows = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }

    pub fn save(&self) -> Result<(), ProfileError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.rows)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn get(&self, user_id: &str) -> Option<&Profile> {
        self.rows.get(user_id)
    }

    /// Record a new avatar URL, creating the row if needed.
    pub fn set_avatar(&mut self, user_id: &str, url: &str) -> &Profile {
        let profile = self
            .rows
            .entry(user_id.to_string())
            .or_insert_with(|| Profile::new(user_id));
        profile.set_avatar(url);
        profile
    }
}

//! Sync settings kept next to, not inside, the version-controlled data.

use crate::constants::DEFAULT_SYNC_BRANCH;
use crate::db::collection::write_atomic;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_branch() -> String {
    DEFAULT_SYNC_BRANCH.to_string()
}

/// Contents of `sync.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub cloned: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            branch: default_branch(),
            cloned: false,
        }
    }
}

impl SyncConfig {
    /// Read `path`; a missing or unreadable file yields the defaults.
    pub fn load(path: &Path) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                tracing::warn!("Failed to read sync config {:?}: {}", path, err);
                return Self::default();
            }
        };
        match serde_json::from_slice::<Self>(&bytes) {
            Ok(mut config) => {
                if config.branch.trim().is_empty() {
                    config.branch = default_branch();
                }
                config
            }
            Err(err) => {
                tracing::warn!("Ignoring malformed sync config {:?}: {}", path, err);
                Self::default()
            }
        }
    }

    /// Write to `path`, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        write_atomic(path, &bytes)
    }
}

//! Backups of the data directory and of corrupt collection files.

use super::fs_copy::copy_dir_recursive;
use super::time_util::unix_timestamp_seconds;
use crate::error::AppError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Copies the whole data directory to a timestamped sibling.
pub struct BackupManager {
    data_dir: PathBuf,
}

impl BackupManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Copy the data directory to `<data_dir>.backup.<unix-ts>`.
    ///
    /// # Returns
    /// The backup path, or `None` when there is no data directory yet.
    ///
    /// # Errors
    /// Returns an error if the clock is unusable or copying fails.
    pub fn create_backup(&self) -> Result<Option<PathBuf>, AppError> {
        if !self.data_dir.exists() {
            return Ok(None);
        }
        let timestamp = unix_timestamp_seconds(SystemTime::now())?;
        let backup_path = sibling_with_suffix(&self.data_dir, &format!("backup.{}", timestamp));
        copy_dir_recursive(&self.data_dir, &backup_path)?;
        tracing::info!("Created data backup at: {:?}", backup_path);
        Ok(Some(backup_path))
    }
}

/// `<path>.<suffix>`, keeping any existing extension in the name.
pub(crate) fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Copy a malformed collection file to `<stem>.backup.json` beside it.
///
/// An earlier backup at that path is overwritten.
///
/// # Errors
/// Returns an error when the copy fails.
pub(crate) fn backup_corrupt_file(path: &Path) -> Result<PathBuf, AppError> {
    let backup_path = path.with_extension("backup.json");
    fs::copy(path, &backup_path).map_err(|err| {
        AppError::StorageMessage(format!(
            "Failed to back up corrupt collection {:?}: {}",
            path, err
        ))
    })?;
    Ok(backup_path)
}

//! Process-lifetime owner lock for a data directory.
//!
//! The JSON collections have no locking of their own across processes, so a
//! server holds an exclusive `fs2` lock on a file beside the data directory
//! for as long as it runs.

use crate::error::AppError;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Outcome of probing whether another process owns the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessProbeResult {
    Running,
    NotRunning,
    Unknown,
}

/// Keeping this value alive holds the exclusive owner lock.
pub struct OwnerLockGuard {
    file: File,
    lock_path: PathBuf,
}

impl OwnerLockGuard {
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for OwnerLockGuard {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::warn!(
                "Failed to release owner lock {:?} during drop: {}",
                self.lock_path,
                err
            );
        }
    }
}

fn open_lock_file(lock_path: &Path) -> std::io::Result<File> {
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)
}

fn is_contended(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::PermissionDenied)
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Acquire and hold the exclusive owner lock at `lock_path`.
///
/// # Errors
/// Returns [`AppError::Locked`] when another process holds the lock and
/// [`AppError::StorageMessage`] when the lock file cannot be opened.
pub fn acquire_owner_lock_for_lifetime(lock_path: &Path) -> Result<OwnerLockGuard, AppError> {
    let file = open_lock_file(lock_path).map_err(|err| {
        AppError::StorageMessage(format!(
            "Failed to open owner lock '{}': {}",
            lock_path.display(),
            err
        ))
    })?;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(OwnerLockGuard {
            file,
            lock_path: lock_path.to_path_buf(),
        }),
        Err(err) if is_contended(&err) => Err(AppError::Locked(format!(
            "Owner lock '{}' is already held by another ACM Compass server. \
             Stop it first, or point COMPASS_CONFIG_DIR/COMPASS_DATA_DIR elsewhere.",
            lock_path.display()
        ))),
        Err(err) => Err(AppError::StorageMessage(format!(
            "Failed to acquire owner lock '{}': {}",
            lock_path.display(),
            err
        ))),
    }
}

/// Probe whether another process currently holds the owner lock.
///
/// Uncertainty is reported as [`ProcessProbeResult::Unknown`], never as an error.
pub fn probe_owner_lock(lock_path: &Path) -> ProcessProbeResult {
    let file = match open_lock_file(lock_path) {
        Ok(file) => file,
        Err(err) => {
            tracing::warn!("Owner-lock probe failed opening {:?}: {}", lock_path, err);
            return ProcessProbeResult::Unknown;
        }
    };
    match file.try_lock_exclusive() {
        Ok(()) => match file.unlock() {
            Ok(()) => ProcessProbeResult::NotRunning,
            Err(err) => {
                tracing::warn!("Owner-lock probe failed releasing {:?}: {}", lock_path, err);
                ProcessProbeResult::Unknown
            }
        },
        Err(err) if is_contended(&err) => ProcessProbeResult::Running,
        Err(err) => {
            tracing::warn!("Owner-lock probe failed locking {:?}: {}", lock_path, err);
            ProcessProbeResult::Unknown
        }
    }
}

/// Remove a stale owner lock file.
///
/// # Returns
/// `true` when a lock file was removed, `false` when there was none.
///
/// # Errors
/// Returns [`AppError::Locked`] when a live process still holds the lock, or
/// when ownership cannot be determined.
pub fn force_unlock(lock_path: &Path) -> Result<bool, AppError> {
    if !lock_path.exists() {
        return Ok(false);
    }
    match probe_owner_lock(lock_path) {
        ProcessProbeResult::NotRunning => {
            fs::remove_file(lock_path)?;
            tracing::info!("Removed stale owner lock {:?}", lock_path);
            Ok(true)
        }
        ProcessProbeResult::Running => Err(AppError::Locked(format!(
            "Refusing to remove '{}': another ACM Compass server is running",
            lock_path.display()
        ))),
        ProcessProbeResult::Unknown => Err(AppError::Locked(format!(
            "Could not verify whether '{}' is in use; not removing it",
            lock_path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_acquire_is_rejected_until_release() {
        let dir = TempDir::new().expect("temp dir");
        let lock_path = dir.path().join("nested").join("compass.owner.lock");

        let guard = acquire_owner_lock_for_lifetime(&lock_path).expect("first acquire");
        assert_eq!(guard.path(), lock_path.as_path());
        assert_eq!(probe_owner_lock(&lock_path), ProcessProbeResult::Running);
        assert!(matches!(
            acquire_owner_lock_for_lifetime(&lock_path),
            Err(AppError::Locked(_))
        ));
        assert!(matches!(force_unlock(&lock_path), Err(AppError::Locked(_))));

        drop(guard);
        assert_eq!(probe_owner_lock(&lock_path), ProcessProbeResult::NotRunning);
        let _again = acquire_owner_lock_for_lifetime(&lock_path).expect("re-acquire");
    }

    #[test]
    fn force_unlock_removes_stale_file() {
        let dir = TempDir::new().expect("temp dir");
        let lock_path = dir.path().join("compass.owner.lock");
        assert!(!force_unlock(&lock_path).expect("nothing to remove"));

        std::fs::write(&lock_path, b"").expect("stale lock");
        assert!(force_unlock(&lock_path).expect("remove stale"));
        assert!(!lock_path.exists());
    }
}

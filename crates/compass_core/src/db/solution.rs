//! One Markdown file per problem id.

use crate::constants::SOLUTION_EXTENSION;
use crate::error::AppError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Solution file store rooted at `<data_dir>/solutions`.
///
/// Clones share one mutex serializing file writes and deletes.
#[derive(Debug, Clone)]
pub struct SolutionDb {
    dir: PathBuf,
    lock: Arc<Mutex<()>>,
}

/// Reject ids that could escape the solutions directory.
fn check_id(id: &str) -> Result<(), AppError> {
    let unsafe_id = id.is_empty()
        || id.starts_with('.')
        || id.contains(['/', '\\', '\0'])
        || id.contains("..");
    if unsafe_id {
        return Err(AppError::Validation(format!(
            "'{}' is not a valid solution id",
            id
        )));
    }
    Ok(())
}

impl SolutionDb {
    /// Open the store, creating the directory if needed.
    ///
    /// # Errors
    /// Returns an error when the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            lock: Arc::new(Mutex::new(())),
        })
    }

    /// Hold off every write and delete until the guard drops.
    pub(crate) fn hold(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the solution file for `id`.
    ///
    /// # Errors
    /// Returns [`AppError::Validation`] for ids that are not safe file stems.
    pub fn path_for(&self, id: &str) -> Result<PathBuf, AppError> {
        check_id(id)?;
        Ok(self.dir.join(format!("{}.{}", id, SOLUTION_EXTENSION)))
    }

    /// Whether a solution file exists for `id`; unsafe ids never have one.
    pub fn exists(&self, id: &str) -> bool {
        self.path_for(id).map(|path| path.is_file()).unwrap_or(false)
    }

    /// # Returns
    /// The Markdown content, or `None` when there is no solution.
    ///
    /// # Errors
    /// Returns an error for unsafe ids or unreadable files.
    pub fn read(&self, id: &str) -> Result<Option<String>, AppError> {
        match fs::read_to_string(self.path_for(id)?) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Write `content` verbatim, replacing any existing file.
    pub fn write(&self, id: &str, content: &str) -> Result<(), AppError> {
        let path = self.path_for(id)?;
        let _guard = self.hold();
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, content).map_err(|err| {
            tracing::error!("failed to write solution {:?}: {}", path, err);
            AppError::from(err)
        })
    }

    /// Delete the solution file; a missing file is not an error.
    ///
    /// # Returns
    /// `true` when a file was removed.
    pub fn delete(&self, id: &str) -> Result<bool, AppError> {
        let path = self.path_for(id)?;
        let _guard = self.hold();
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Store edited content: trimmed text is written, blank text deletes.
    ///
    /// # Returns
    /// The stored content, or `None` when the solution is now absent.
    pub fn save(&self, id: &str, content: &str) -> Result<Option<String>, AppError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            self.delete(id)?;
            return Ok(None);
        }
        self.write(id, trimmed)?;
        Ok(Some(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (SolutionDb, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let db = SolutionDb::new(dir.path().join("solutions")).expect("solution store");
        (db, dir)
    }

    #[test]
    fn write_read_delete_cycle() {
        let (db, _dir) = store();
        assert!(!db.exists("p1"));
        assert_eq!(db.read("p1").expect("read missing"), None);

        db.write("p1", "# Idea\n\nUse a segment tree.\n").expect("write");
        assert!(db.exists("p1"));
        assert_eq!(
            db.read("p1").expect("read").as_deref(),
            Some("# Idea\n\nUse a segment tree.\n")
        );

        assert!(db.delete("p1").expect("delete"));
        assert!(!db.delete("p1").expect("delete missing is a no-op"));
        assert!(!db.exists("p1"));
    }

    #[test]
    fn save_blank_content_deletes() {
        let (db, _dir) = store();
        assert_eq!(
            db.save("p2", "  body \n").expect("save").as_deref(),
            Some("body")
        );
        assert!(db.exists("p2"));
        assert_eq!(db.save("p2", " \n\t").expect("save blank"), None);
        assert!(!db.exists("p2"));
        assert_eq!(db.save("p3", "").expect("blank on missing"), None);
    }

    #[test]
    fn unsafe_ids_are_rejected() {
        let (db, _dir) = store();
        for id in ["", "../escape", "a/b", "a\\b", ".hidden"] {
            assert!(matches!(db.write(id, "x"), Err(AppError::Validation(_))), "id {id:?}");
            assert!(!db.exists(id));
        }
    }
}

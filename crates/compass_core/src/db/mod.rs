//! File-based storage for ACM Compass.
//!
//! Layout under the data directory:
//! - `problems.json` and `contests.json`: pretty-printed JSON arrays,
//! - `solutions/<id>.md`: one Markdown file per problem.
//!
//! Every operation re-reads its file, so a `git pull` or clone that swaps
//! the files underneath is picked up by the next call.

/// Data directory snapshots and corrupt-file backups.
pub mod backup;
/// Generic JSON array collection.
pub mod collection;
/// Contest storage.
pub mod contest;
mod fs_copy;
/// Process-lifetime owner lock.
pub mod lock;
/// Problem storage.
pub mod problem;
/// Solution Markdown files.
pub mod solution;
pub(crate) mod time_util;

use crate::constants::{CONTESTS_FILE_NAME, PROBLEMS_FILE_NAME, SOLUTIONS_DIR_NAME};
use crate::error::AppError;
use crate::models::contest::{Contest, CreateContestRequest};
use crate::models::problem::{CreateProblemRequest, Problem};
use crate::staging::ImportSink;
use std::path::{Path, PathBuf};

/// Handle to every store rooted at one data directory.
pub struct Database {
    data_dir: PathBuf,
    pub problems: problem::ProblemDb,
    pub contests: contest::ContestDb,
    pub solutions: solution::SolutionDb,
}

#[cfg(test)]
mod tests;

impl Database {
    /// Open (and create if needed) the stores under `data_dir`.
    ///
    /// Legacy inline solutions are migrated during open.
    ///
    /// # Errors
    /// Returns an error when the directory or collection files cannot be
    /// created or read.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir).map_err(|err| {
            AppError::StorageMessage(format!(
                "Failed to create data directory {:?}: {}",
                data_dir, err
            ))
        })?;

        let solutions = solution::SolutionDb::new(data_dir.join(SOLUTIONS_DIR_NAME))?;
        let problems =
            problem::ProblemDb::new(data_dir.join(PROBLEMS_FILE_NAME), solutions.clone())?;
        let contests = contest::ContestDb::new(data_dir.join(CONTESTS_FILE_NAME))?;

        tracing::info!("Opened data directory {:?}", data_dir);
        Ok(Self {
            data_dir,
            problems,
            contests,
            solutions,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Run `op` while no store can read or write the data directory.
    ///
    /// Version-control operations that move or rewrite the directory run
    /// inside this, so no write lands in a directory that is being swapped.
    pub fn exclusive<R>(&self, op: impl FnOnce() -> R) -> R {
        // Same order as the nested problem -> solution locking in migrations.
        let _problems = self.problems.hold();
        let _contests = self.contests.hold();
        let _solutions = self.solutions.hold();
        op()
    }

    /// Copy the whole data directory to `<data_dir>.backup.<unix-ts>`.
    ///
    /// # Returns
    /// The backup path, or `None` when there was nothing to copy.
    pub fn snapshot(&self) -> Result<Option<PathBuf>, AppError> {
        backup::BackupManager::new(&self.data_dir).create_backup()
    }
}

impl ImportSink for Database {
    fn create_problem(&self, request: &CreateProblemRequest) -> Result<Problem, AppError> {
        self.problems.create(request)
    }

    fn create_contest(&self, request: &CreateContestRequest) -> Result<Contest, AppError> {
        self.contests.create(request)
    }
}

//! Version-control synchronisation of the data directory.
//!
//! The data directory is itself a repository. [`SyncManager`] ties a
//! [`VersionControl`] backend to the machine-local [`SyncConfig`] and picks
//! the branch each operation should use.

mod config;
mod git;
mod transcript;


pub use config::SyncConfig;
pub use git::{default_commit_message, GitBackend};
pub use transcript::{CommandOutcome, SyncTranscript};

use crate::constants::DEFAULT_SYNC_BRANCH;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Operations a repository backend must offer.
///
/// Every operation reports failure in its transcript instead of returning
/// an error.
pub trait VersionControl: Send + Sync {
    fn is_repo(&self) -> bool;

    fn remote_url(&self) -> Option<String>;

    fn current_branch(&self) -> Option<String>;

    /// Replace the data directory with a fresh clone of `url`.
    ///
    /// The directory is renamed; callers with open stores run this inside
    /// `Database::exclusive`.
    fn clone_repo(&self, url: &str, branch: &str) -> SyncTranscript;

    fn pull(&self, branch: &str) -> SyncTranscript;

    /// Stage everything, commit with `message` when something changed, push.
    fn push(&self, branch: &str, message: &str) -> SyncTranscript;

    fn status(&self) -> SyncTranscript;
}

/// Summary returned by `GET /api/sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub is_repo: bool,
    pub remote_url: Option<String>,
    pub current_branch: Option<String>,
    pub config: SyncConfig,
}

/// Backend plus persisted sync settings.
#[derive(Clone)]
pub struct SyncManager {
    vcs: Arc<dyn VersionControl>,
    config_path: PathBuf,
}

impl std::fmt::Debug for SyncManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncManager")
            .field("config_path", &self.config_path)
            .finish_non_exhaustive()
    }
}

impl SyncManager {
    pub fn new(vcs: Arc<dyn VersionControl>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            vcs,
            config_path: config_path.into(),
        }
    }

    /// A manager running `git` against the configured data directory.
    pub fn from_config(config: &crate::Config) -> Self {
        Self::new(
            Arc::new(GitBackend::from_config(config)),
            config.sync_config_path(),
        )
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config(&self) -> SyncConfig {
        SyncConfig::load(&self.config_path)
    }

    pub fn status_summary(&self) -> SyncStatus {
        let is_repo = self.vcs.is_repo();
        SyncStatus {
            is_repo,
            remote_url: if is_repo { self.vcs.remote_url() } else { None },
            current_branch: if is_repo { self.vcs.current_branch() } else { None },
            config: self.config(),
        }
    }

    /// Branch for pull/push: explicit, then configured, then checked out,
    /// then `main`.
    pub fn resolve_branch(&self, explicit: Option<&str>) -> String {
        if let Some(branch) = explicit.map(str::trim).filter(|b| !b.is_empty()) {
            return branch.to_string();
        }
        if self.config_path.exists() {
            return self.config().branch;
        }
        self.vcs
            .current_branch()
            .unwrap_or_else(|| DEFAULT_SYNC_BRANCH.to_string())
    }

    /// Clone `url` into the data directory and remember it on success.
    ///
    /// A blank `branch` falls back to the configured one.
    pub fn clone_repo(&self, url: &str, branch: Option<&str>) -> SyncTranscript {
        let branch = branch
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.config().branch);
        let mut transcript = self.vcs.clone_repo(url, &branch);
        if transcript.success {
            let config = SyncConfig {
                remote_url: Some(url.trim().to_string()),
                branch,
                cloned: true,
            };
            if let Err(err) = config.save(&self.config_path) {
                tracing::error!("Failed to save sync config {:?}: {}", self.config_path, err);
                transcript
                    .output
                    .push_str(&format!("\nwarning: sync settings were not saved: {}", err));
            }
        }
        transcript
    }

    pub fn pull(&self, branch: Option<&str>) -> SyncTranscript {
        let branch = self.resolve_branch(branch);
        let transcript = self.vcs.pull(&branch);
        tracing::info!("Pull from {} finished (success: {})", branch, transcript.success);
        transcript
    }

    pub fn push(&self, branch: Option<&str>, message: Option<&str>) -> SyncTranscript {
        let branch = self.resolve_branch(branch);
        let transcript = self.vcs.push(&branch, message.unwrap_or_default());
        tracing::info!("Push to {} finished (success: {})", branch, transcript.success);
        transcript
    }

    pub fn status(&self) -> SyncTranscript {
        self.vcs.status()
    }
}

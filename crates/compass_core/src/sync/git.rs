//! `git` command-line backend.

use super::transcript::{CommandOutcome, SyncTranscript, TranscriptBuilder};
use super::VersionControl;
use crate::constants::DEFAULT_REMOTE_NAME;
use crate::db::backup::sibling_with_suffix;
use crate::db::time_util::unix_timestamp_seconds;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

/// Runs the `git` binary against the data directory.
///
/// Arguments are passed as vectors, never through a shell.
#[derive(Debug, Clone)]
pub struct GitBackend {
    git_bin: String,
    data_dir: PathBuf,
}

/// Default commit message: `update data (YYYY-MM-DD HH:MM:SS)` in local time.
pub fn default_commit_message() -> String {
    format!(
        "update data ({})",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

impl GitBackend {
    pub fn new(git_bin: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_bin: git_bin.into(),
            data_dir: data_dir.into(),
        }
    }

    pub fn from_config(config: &crate::Config) -> Self {
        Self::new(config.git_bin.clone(), &config.data_dir)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn run_in(&self, cwd: &Path, args: &[&str]) -> CommandOutcome {
        let command = format!("git {}", args.join(" "));
        tracing::debug!("running {} in {:?}", command, cwd);
        let output = Command::new(&self.git_bin)
            .args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output();
        match output {
            Ok(output) => CommandOutcome {
                command,
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(err) => CommandOutcome {
                command,
                code: None,
                stdout: String::new(),
                stderr: format!("failed to start {}: {}", self.git_bin, err),
            },
        }
    }

    fn run(&self, args: &[&str]) -> CommandOutcome {
        self.run_in(&self.data_dir, args)
    }

    fn not_a_repo(&self) -> SyncTranscript {
        SyncTranscript::refused(format!(
            "{} is not a git repository; clone a remote first",
            self.data_dir.display()
        ))
    }

    fn push_with(&self, log: &mut TranscriptBuilder, branch: &str, message: &str) -> SyncTranscript {
        let add = self.run(&["add", "-A"]);
        log.command(&add);
        if !add.succeeded() {
            return log.finish(false, "git add failed");
        }

        let diff = self.run(&["diff", "--cached", "--name-only"]);
        if diff.succeeded() && diff.stdout.trim().is_empty() {
            return log.finish(true, "nothing to commit");
        }
        log.command(&diff);

        let commit = self.run(&["commit", "-m", message]);
        log.command(&commit);
        if !commit.succeeded() {
            return log.finish(false, "git commit failed");
        }

        let push = self.run(&["push", DEFAULT_REMOTE_NAME, branch]);
        log.command(&push);
        if push.succeeded() {
            return log.finish(true, "pushed to remote");
        }

        log.note(format!("retrying with upstream for {}", branch));
        let upstream = self.run(&["push", "-u", DEFAULT_REMOTE_NAME, branch]);
        log.command(&upstream);
        if upstream.succeeded() {
            log.finish(true, "pushed to remote (upstream set)")
        } else {
            log.finish(false, "push failed")
        }
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl VersionControl for GitBackend {
    fn is_repo(&self) -> bool {
        if !self.data_dir.is_dir() {
            return false;
        }
        // A data dir nested inside some other checkout does not count.
        let toplevel = self.run(&["rev-parse", "--show-toplevel"]);
        toplevel.succeeded() && same_dir(Path::new(toplevel.stdout.trim()), &self.data_dir)
    }

    fn remote_url(&self) -> Option<String> {
        if !self.is_repo() {
            return None;
        }
        let outcome = self.run(&["remote", "get-url", DEFAULT_REMOTE_NAME]);
        let url = outcome.stdout.trim();
        (outcome.succeeded() && !url.is_empty()).then(|| url.to_string())
    }

    fn current_branch(&self) -> Option<String> {
        if !self.is_repo() {
            return None;
        }
        let outcome = self.run(&["rev-parse", "--abbrev-ref", "HEAD"]);
        let branch = outcome.stdout.trim();
        (outcome.succeeded() && !branch.is_empty() && branch != "HEAD")
            .then(|| branch.to_string())
    }

    fn clone_repo(&self, url: &str, branch: &str) -> SyncTranscript {
        let url = url.trim();
        if url.is_empty() || url.starts_with('-') {
            return SyncTranscript::refused("a remote URL is required");
        }
        if branch.trim().is_empty() || branch.starts_with('-') {
            return SyncTranscript::refused(format!("'{}' is not a branch name", branch));
        }
        let Some(parent) = self.data_dir.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return SyncTranscript::refused("the data directory has no parent directory");
        };
        if let Err(err) = fs::create_dir_all(parent) {
            return SyncTranscript::refused(format!("cannot create {}: {}", parent.display(), err));
        }
        let stamp = match unix_timestamp_seconds(SystemTime::now()) {
            Ok(stamp) => stamp,
            Err(err) => return SyncTranscript::refused(err.to_string()),
        };

        let mut log = TranscriptBuilder::new();
        let staging_dir = sibling_with_suffix(&self.data_dir, &format!("clone-tmp.{}", stamp));
        let _ = fs::remove_dir_all(&staging_dir);
        let staging_arg = staging_dir.to_string_lossy().into_owned();
        let clone = self.run_in(
            parent,
            &["clone", "--branch", branch, "--", url, &staging_arg],
        );
        log.command(&clone);
        if !clone.succeeded() {
            let _ = fs::remove_dir_all(&staging_dir);
            return log.finish(false, "clone failed; data directory left untouched");
        }

        let mut set_aside = None;
        if self.data_dir.exists() {
            let aside = sibling_with_suffix(&self.data_dir, &format!("pre-clone.{}", stamp));
            if let Err(err) = fs::rename(&self.data_dir, &aside) {
                let _ = fs::remove_dir_all(&staging_dir);
                log.note(format!("could not move existing data aside: {}", err));
                return log.finish(false, "clone aborted; data directory left untouched");
            }
            log.note(format!("previous data moved to {}", aside.display()));
            set_aside = Some(aside);
        }

        if let Err(err) = fs::rename(&staging_dir, &self.data_dir) {
            log.note(format!("could not move clone into place: {}", err));
            if let Some(aside) = set_aside {
                if let Err(restore_err) = fs::rename(&aside, &self.data_dir) {
                    tracing::error!(
                        "failed to restore {:?} after aborted clone: {}",
                        aside,
                        restore_err
                    );
                    log.note(format!("previous data remains at {}", aside.display()));
                }
            }
            return log.finish(false, "clone failed");
        }

        tracing::info!("Cloned {} ({}) into {:?}", url, branch, self.data_dir);
        log.finish(true, &format!("cloned {} ({})", url, branch))
    }

    fn pull(&self, branch: &str) -> SyncTranscript {
        if !self.is_repo() {
            return self.not_a_repo();
        }
        let mut log = TranscriptBuilder::new();
        let pull = self.run(&["pull", DEFAULT_REMOTE_NAME, branch]);
        log.command(&pull);
        if pull.succeeded() {
            log.finish(true, "pulled remote changes")
        } else {
            log.finish(false, "pull failed")
        }
    }

    fn push(&self, branch: &str, message: &str) -> SyncTranscript {
        if !self.is_repo() {
            return self.not_a_repo();
        }
        let message = if message.trim().is_empty() {
            default_commit_message()
        } else {
            message.trim().to_string()
        };
        let mut log = TranscriptBuilder::new();
        self.push_with(&mut log, branch, &message)
    }

    fn status(&self) -> SyncTranscript {
        if !self.is_repo() {
            return self.not_a_repo();
        }
        let mut log = TranscriptBuilder::new();
        let status = self.run(&["status", "--short", "--branch"]);
        log.command(&status);
        let success = status.succeeded();
        log.finish(success, if success { "status read" } else { "status failed" })
    }
}

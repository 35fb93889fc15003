//! Shared test-only helpers for compass_core.

use crate::Database;
use tempfile::TempDir;

/// Creates an isolated data directory and opens a [`Database`] on it.
///
/// Keep the [`TempDir`] alive for the full test to preserve the backing files.
///
/// # Panics
/// Panics if temp-dir creation or opening the stores fails.
pub(crate) fn setup_temp_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let db = Database::open(temp_dir.path().join("data")).expect("db");
    (db, temp_dir)
}

/// Whether a usable `git` binary is on `PATH`.
pub(crate) fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

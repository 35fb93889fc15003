//! Configuration loading from environment variables.

use crate::constants::{
    DEFAULT_IMPORT_ORIGINS, DEFAULT_MAX_BODY_SIZE, DEFAULT_PORT, OWNER_LOCK_SUFFIX,
    SYNC_CONFIG_FILE_NAME,
};
use crate::db::backup::sibling_with_suffix;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Runtime configuration for ACM Compass.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding the collections and solutions (the synced repository).
    pub data_dir: String,
    /// Directory holding machine-local state that is never synced.
    pub config_dir: String,
    pub port: u16,
    pub max_body_size: usize,
    /// Extra CORS origins allowed to post scraped data.
    pub import_origins: Vec<String>,
    pub auto_backup: bool,
    pub git_bin: String,
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: String) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = resolve_home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path
}

fn resolve_home_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.trim().is_empty() {
            return Some(PathBuf::from(home));
        }
    }

    // Windows USERPROFILE (standard)
    if let Ok(profile) = env::var("USERPROFILE") {
        if !profile.trim().is_empty() {
            return Some(PathBuf::from(profile));
        }
    }

    std::env::current_dir().ok()
}

fn default_config_dir() -> PathBuf {
    resolve_home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".acm-compass")
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean flag from the environment.
///
/// Missing or unrecognized values are treated as `false`.
pub fn env_flag_enabled(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or(false)
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
pub fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing.
    pub fn from_env() -> Self {
        let config_dir = env::var("COMPASS_CONFIG_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(expand_tilde)
            .unwrap_or_else(|| default_config_dir().to_string_lossy().to_string());
        let data_dir = env::var("COMPASS_DATA_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(expand_tilde)
            .unwrap_or_else(|| {
                PathBuf::from(&config_dir)
                    .join("data")
                    .to_string_lossy()
                    .to_string()
            });
        Self {
            data_dir,
            config_dir,
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            max_body_size: env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_BODY_SIZE),
            import_origins: parse_origin_list(
                &env::var("IMPORT_ORIGINS").unwrap_or_else(|_| DEFAULT_IMPORT_ORIGINS.to_string()),
            ),
            auto_backup: env_flag_enabled("AUTO_BACKUP"),
            git_bin: env::var("GIT_BIN")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "git".to_string()),
        }
    }

    /// Location of the machine-local sync settings file.
    pub fn sync_config_path(&self) -> PathBuf {
        PathBuf::from(&self.config_dir).join(SYNC_CONFIG_FILE_NAME)
    }

    /// Location of the process owner lock: `<data_dir>.owner.lock` beside the
    /// canonical data directory, so every process sharing that directory
    /// contends on one file whatever its config directory.
    pub fn owner_lock_path(&self) -> PathBuf {
        sibling_with_suffix(&canonical_dir(Path::new(&self.data_dir)), OWNER_LOCK_SUFFIX)
    }
}

/// Resolve `dir` through symlinks and `..`; a directory that does not exist
/// yet resolves through its parent.
fn canonical_dir(dir: &Path) -> PathBuf {
    if let Ok(path) = dir.canonicalize() {
        return path;
    }
    match (dir.parent(), dir.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            parent
                .canonicalize()
                .map(|parent| parent.join(name))
                .unwrap_or_else(|_| dir.to_path_buf())
        }
        _ => dir.to_path_buf(),
    }
}

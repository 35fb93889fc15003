//! Core domain library for ACM Compass (config, storage, models, import staging, sync).

/// Configuration loading and defaults.
pub mod config;
/// Shared constants used across ACM Compass crates.
pub mod constants;
/// JSON collection storage, solution files, locks, and backups.
pub mod db;
/// Process-global environment mutation helpers.
pub mod env;
/// Application error types (storage/domain).
pub mod error;
/// Status and calendar-day filters for collection listings.
pub mod filter;
/// Data models for API requests and persistence.
pub mod models;
/// Raw record normalization and legacy migration rules.
pub mod normalize;
/// Two-phase import staging for scraped contest data.
pub mod staging;
/// Version-control backed synchronisation of the data directory.
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use constants::*;
pub use db::Database;
pub use error::AppError;
pub use staging::{ImportStaging, MemoryStagingStore, StagingStore};
pub use sync::{GitBackend, SyncManager, SyncStatus, SyncTranscript, VersionControl};

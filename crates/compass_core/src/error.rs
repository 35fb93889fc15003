//! Application error types for core storage and domain logic.
use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    StorageMessage(String),

    #[error("Not found")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Staged import belongs to contest '{staged}', got '{submitted}'")]
    ImportMismatch { staged: String, submitted: String },

    #[error("Nothing staged: {0}")]
    NothingStaged(&'static str),

    #[error("Locked: {0}")]
    Locked(String),

    #[error("Internal server error")]
    Internal,
}

impl From<validator::ValidationErrors> for AppError {
    fn from(value: validator::ValidationErrors) -> Self {
        Self::Validation(value.to_string())
    }
}

impl AppError {
    /// Whether this error is a caller-side validation failure.
    ///
    /// Staging mismatches and empty-staging rejections count as validation
    /// failures: nothing was mutated and the caller can correct the request.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::ImportMismatch { .. } | Self::NothingStaged(_)
        )
    }
}

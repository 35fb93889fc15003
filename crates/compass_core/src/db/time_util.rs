//! Clock helpers for backup and clone-aside names.

use crate::error::AppError;
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn unix_timestamp_seconds(now: SystemTime) -> Result<u64, AppError> {
    now.duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .map_err(|err| {
            AppError::StorageMessage(format!("System clock is before the Unix epoch: {}", err))
        })
}

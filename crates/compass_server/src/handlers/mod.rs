//! HTTP request handlers.

/// Contest endpoints.
pub mod contest;
/// Import staging endpoints.
pub mod import;
/// Problem and solution endpoints.
pub mod problem;
/// Repository sync endpoints.
pub mod sync;

use compass_core::AppError;

/// Parse an optional `YYYY-MM-DD` query value; blank means unbounded.
pub(crate) fn parse_day(
    name: &str,
    value: Option<String>,
) -> Result<Option<chrono::NaiveDate>, AppError> {
    let Some(value) = value.filter(|value| !value.trim().is_empty()) else {
        return Ok(None);
    };
    chrono::NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(Some)
        .map_err(|_| AppError::Validation(format!("{}: expected YYYY-MM-DD, got '{}'", name, value)))
}

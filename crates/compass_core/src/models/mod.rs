//! Data models for API requests and persistence.

/// Contest records and per-letter statistics.
pub mod contest;
/// Scraper payloads and staged import snapshots.
pub mod import;
/// Problem records and request payloads.
pub mod problem;
/// Shared field validators for request payloads.
pub mod validation;


use serde::{Deserialize, Deserializer};

/// Deserialize a present field (including explicit `null`) as `Some(..)`.
///
/// Paired with `#[serde(default)]` this lets update payloads tell "absent"
/// (`None`) apart from "clear this field" (`Some(None)`).
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

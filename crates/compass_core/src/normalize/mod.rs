//! Raw record normalization and legacy migration rules.
//!
//! Records are normalized as loose JSON objects before they are decoded into
//! typed models, so files written by any earlier release can still be read.
//! Each concern is one named [`MigrationRule`]; the rule lists are applied in
//! a fixed order and every list is idempotent as a whole.

mod contest;
mod problem;

pub use contest::{normalize_contest_problems, normalize_contest_record, CONTEST_RULES};
pub use problem::{normalize_problem_record, PROBLEM_RULES};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// A raw JSON object as stored on disk or posted by a client.
pub type RawRecord = Map<String, Value>;

/// One named normalization step over a raw record.
#[derive(Clone, Copy)]
pub struct MigrationRule {
    pub name: &'static str,
    pub apply: fn(&mut RawRecord),
}

impl std::fmt::Debug for MigrationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRule")
            .field("name", &self.name)
            .finish()
    }
}

/// Apply `rules` to `record` in order.
pub fn apply_rules(rules: &[MigrationRule], record: &mut RawRecord) {
    for rule in rules {
        (rule.apply)(record);
    }
}

/// Trim a text field in place; blank or non-text values become `null`.
///
/// Missing keys are inserted as `null` so every optional field is explicit.
pub(crate) fn trim_text_field(record: &mut RawRecord, key: &str) {
    let trimmed = match record.get(key) {
        Some(Value::String(text)) => {
            let text = text.trim();
            (!text.is_empty()).then(|| Value::String(text.to_string()))
        }
        Some(Value::Number(number)) => Some(Value::String(number.to_string())),
        _ => None,
    };
    record.insert(key.to_string(), trimmed.unwrap_or(Value::Null));
}

/// Read a non-negative integer out of a loosely typed JSON value.
///
/// Accepts integers, finite non-negative floats (truncated), and strings that
/// hold a non-negative integer.
pub(crate) fn coerce_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => {
            if let Some(n) = number.as_u64() {
                u32::try_from(n).ok()
            } else {
                number
                    .as_f64()
                    .filter(|n| n.is_finite() && *n >= 0.0 && *n <= f64::from(u32::MAX))
                    .map(|n| n.trunc() as u32)
            }
        }
        Value::String(text) => text.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Offset-less timestamps are taken as UTC.
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

/// Canonicalize `created_at`/`updated_at` to RFC 3339 UTC strings.
///
/// A missing `updated_at` falls back to `created_at`. Unparsable values are
/// left in place so the record fails to decode and gets reported.
pub(crate) fn normalize_timestamps(record: &mut RawRecord) {
    for key in ["created_at", "updated_at"] {
        let parsed = record
            .get(key)
            .and_then(Value::as_str)
            .and_then(parse_timestamp);
        if let Some(parsed) = parsed {
            record.insert(
                key.to_string(),
                Value::String(parsed.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            );
        }
    }
    let missing_updated = matches!(record.get("updated_at"), None | Some(Value::Null));
    if missing_updated {
        if let Some(created) = record.get("created_at").cloned() {
            record.insert("updated_at".to_string(), created);
        }
    }
}

#[cfg(test)]
mod tests;

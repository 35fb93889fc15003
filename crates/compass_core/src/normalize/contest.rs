//! Migration rules for contest records.

use super::{
    apply_rules, coerce_count, normalize_timestamps, trim_text_field, MigrationRule, RawRecord,
};
use crate::models::contest::{
    clamp_total_problems, ContestProblem, ContestProblemInput, ContestStatus,
};
use serde_json::Value;

/// Contest rules, in application order.
pub static CONTEST_RULES: &[MigrationRule] = &[
    MigrationRule {
        name: "total_problems_clamp",
        apply: total_problems_clamp,
    },
    MigrationRule {
        name: "problems_positional",
        apply: problems_positional,
    },
    MigrationRule {
        name: "optional_text",
        apply: optional_text,
    },
    MigrationRule {
        name: "timestamps",
        apply: normalize_timestamps,
    },
];

/// Coerce a raw contest mapping into the canonical contest shape.
pub fn normalize_contest_record(mut record: RawRecord) -> RawRecord {
    apply_rules(CONTEST_RULES, &mut record);
    record
}

/// Rebuild `total` statistics rows from loose input, positionally.
///
/// Rows past `inputs` get defaults, inputs past `total` are discarded, and
/// letters always follow the `A..` sequence whatever the input said.
pub fn normalize_contest_problems(total: usize, inputs: &[ContestProblemInput]) -> Vec<ContestProblem> {
    (0..total)
        .map(|index| {
            let mut row = ContestProblem::placeholder(index);
            if let Some(input) = inputs.get(index) {
                row.pass_count = input.pass_count.unwrap_or(0);
                row.attempt_count = input.attempt_count.unwrap_or(0);
                row.my_status = input.my_status.unwrap_or_default();
            }
            row
        })
        .collect()
}

fn raw_total(value: Option<&Value>) -> i64 {
    let parsed = match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|n| n.is_finite()).map(|n| n.trunc() as i64)),
        Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(0) | None => 1,
        Some(total) => total,
    }
}

fn total_problems_clamp(record: &mut RawRecord) {
    let total = clamp_total_problems(raw_total(record.get("total_problems")));
    record.insert("total_problems".to_string(), Value::from(total));
}

fn raw_row(index: usize, raw: Option<&Value>) -> Value {
    let base = ContestProblem::placeholder(index);
    let Some(Value::Object(raw)) = raw else {
        return row_value(&base);
    };
    let count = |key: &str| raw.get(key).and_then(coerce_count).unwrap_or(0);
    let status = raw
        .get("my_status")
        .and_then(Value::as_str)
        .and_then(ContestStatus::from_label)
        .unwrap_or_default();
    row_value(&ContestProblem {
        pass_count: count("pass_count"),
        attempt_count: count("attempt_count"),
        my_status: status,
        ..base
    })
}

fn row_value(row: &ContestProblem) -> Value {
    serde_json::to_value(row).unwrap_or_default()
}

fn problems_positional(record: &mut RawRecord) {
    let total = record
        .get("total_problems")
        .and_then(Value::as_u64)
        .map_or(1, |total| total as usize);
    let raw_rows = match record.remove("problems") {
        Some(Value::Array(rows)) => rows,
        _ => Vec::new(),
    };
    let rows = (0..total)
        .map(|index| raw_row(index, raw_rows.get(index)))
        .collect();
    record.insert("problems".to_string(), Value::Array(rows));
}

fn optional_text(record: &mut RawRecord) {
    for key in ["rank_str", "summary"] {
        trim_text_field(record, key);
    }
}

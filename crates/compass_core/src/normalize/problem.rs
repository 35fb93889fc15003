//! Migration rules for problem records.

use super::{
    apply_rules, coerce_count, normalize_timestamps, trim_text_field, MigrationRule, RawRecord,
};
use crate::models::problem::UnsolvedStage;
use serde_json::Value;

/// Problem rules, in application order.
pub static PROBLEM_RULES: &[MigrationRule] = &[
    MigrationRule {
        name: "drop_has_solution",
        apply: drop_has_solution,
    },
    MigrationRule {
        name: "owner_to_assignee",
        apply: owner_to_assignee,
    },
    MigrationRule {
        name: "solved_from_status",
        apply: solved_from_status,
    },
    MigrationRule {
        name: "legacy_stage_labels",
        apply: legacy_stage_labels,
    },
    MigrationRule {
        name: "unsolved_stage_enum",
        apply: unsolved_stage_enum,
    },
    MigrationRule {
        name: "unsolved_custom_label",
        apply: unsolved_custom_label,
    },
    MigrationRule {
        name: "solved_clears_unsolved",
        apply: solved_clears_unsolved,
    },
    MigrationRule {
        name: "tags_default",
        apply: tags_default,
    },
    MigrationRule {
        name: "pass_count",
        apply: pass_count,
    },
    MigrationRule {
        name: "assignee_trim",
        apply: assignee_trim,
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

/// Coerce a raw problem mapping into the canonical problem shape.
///
/// Never fails: anything it cannot interpret is reset to its default.
pub fn normalize_problem_record(mut record: RawRecord) -> RawRecord {
    apply_rules(PROBLEM_RULES, &mut record);
    record
}

fn is_solved(record: &RawRecord) -> bool {
    matches!(record.get("solved"), Some(Value::Bool(true)))
}

fn drop_has_solution(record: &mut RawRecord) {
    record.remove("has_solution");
}

fn owner_to_assignee(record: &mut RawRecord) {
    let Some(owner) = record.remove("owner") else {
        return;
    };
    let has_assignee = !matches!(record.get("assignee"), None | Some(Value::Null));
    let owner_set = match &owner {
        Value::String(text) => !text.is_empty(),
        Value::Null | Value::Bool(false) => false,
        _ => true,
    };
    if !has_assignee && owner_set {
        tracing::debug!("migrating legacy owner field to assignee");
        record.insert("assignee".to_string(), owner);
    }
}

fn solved_from_status(record: &mut RawRecord) {
    let status = record.remove("status");
    if matches!(record.get("solved"), Some(Value::Bool(_))) {
        return;
    }
    let done = status
        .as_ref()
        .and_then(Value::as_str)
        .is_some_and(|status| status.to_lowercase() == "done");
    record.insert("solved".to_string(), Value::Bool(done));
}

fn legacy_stage_labels(record: &mut RawRecord) {
    let migrated = record
        .get("unsolved_stage")
        .and_then(Value::as_str)
        .and_then(UnsolvedStage::from_legacy_label);
    if let Some(stage) = migrated {
        tracing::debug!(stage = stage.as_str(), "migrating legacy unsolved stage label");
        record.insert(
            "unsolved_stage".to_string(),
            Value::String(stage.as_str().to_string()),
        );
    }
}

fn unsolved_stage_enum(record: &mut RawRecord) {
    let valid = record
        .get("unsolved_stage")
        .and_then(Value::as_str)
        .and_then(UnsolvedStage::from_label);
    let value = valid.map_or(Value::Null, |stage| Value::String(stage.as_str().to_string()));
    record.insert("unsolved_stage".to_string(), value);
}

fn unsolved_custom_label(record: &mut RawRecord) {
    trim_text_field(record, "unsolved_custom_label");
}

fn solved_clears_unsolved(record: &mut RawRecord) {
    if is_solved(record) {
        record.insert("unsolved_stage".to_string(), Value::Null);
        record.insert("unsolved_custom_label".to_string(), Value::Null);
    }
}

fn tags_default(record: &mut RawRecord) {
    let tags = match record.remove("tags") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter(|item| item.is_string())
            .collect(),
        _ => Vec::new(),
    };
    record.insert("tags".to_string(), Value::Array(tags));
}

fn pass_count(record: &mut RawRecord) {
    let count = record.get("pass_count").and_then(coerce_count);
    record.insert(
        "pass_count".to_string(),
        count.map_or(Value::Null, Value::from),
    );
}

fn assignee_trim(record: &mut RawRecord) {
    trim_text_field(record, "assignee");
}

fn optional_text(record: &mut RawRecord) {
    for key in ["link", "source", "notes"] {
        trim_text_field(record, key);
    }
}

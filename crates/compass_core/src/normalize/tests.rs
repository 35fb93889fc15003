use super::*;
use serde_json::{json, Value};

fn raw(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn problem(value: Value) -> RawRecord {
    normalize_problem_record(raw(value))
}

#[test]
fn status_done_derives_solved_and_is_consumed() {
    for status in ["Done", "DONE", "done"] {
        let out = problem(json!({"title": "t", "status": status}));
        assert_eq!(out["solved"], true, "status {status}");
        assert!(!out.contains_key("status"));
    }
    let out = problem(json!({"title": "t", "status": "todo"}));
    assert_eq!(out["solved"], false);
    let out = problem(json!({"title": "t"}));
    assert_eq!(out["solved"], false);
}

#[test]
fn explicit_solved_wins_over_status() {
    let out = problem(json!({"solved": false, "status": "done"}));
    assert_eq!(out["solved"], false);

    let out = problem(json!({"solved": "yes", "status": "done"}));
    assert_eq!(out["solved"], true);
}

#[test]
fn solved_clears_stage_and_custom_label() {
    let out = problem(json!({
        "solved": true,
        "unsolved_stage": "viewed no idea",
        "unsolved_custom_label": "needs FFT"
    }));
    assert_eq!(out["unsolved_stage"], Value::Null);
    assert_eq!(out["unsolved_custom_label"], Value::Null);
}

#[test]
fn stage_outside_enumeration_becomes_null() {
    let out = problem(json!({"unsolved_stage": "almost there"}));
    assert_eq!(out["unsolved_stage"], Value::Null);
    let out = problem(json!({"unsolved_stage": 3}));
    assert_eq!(out["unsolved_stage"], Value::Null);
    let out = problem(json!({"unsolved_stage": "viewed no idea"}));
    assert_eq!(out["unsolved_stage"], "viewed no idea");
}

#[test]
fn legacy_stage_labels_map_to_canonical() {
    let cases = [
        ("未看题", "not viewed"),
        ("已看题无思路", "viewed no idea"),
        ("知道做法未实现", "approach known not implemented"),
    ];
    for (legacy, canonical) in cases {
        let out = problem(json!({"unsolved_stage": legacy}));
        assert_eq!(out["unsolved_stage"], canonical);
    }
}

#[test]
fn owner_migrates_only_when_assignee_missing() {
    let out = problem(json!({"owner": " alice "}));
    assert_eq!(out["assignee"], "alice");
    assert!(!out.contains_key("owner"));

    let out = problem(json!({"owner": "alice", "assignee": "bob"}));
    assert_eq!(out["assignee"], "bob");

    let out = problem(json!({"owner": "alice", "assignee": null}));
    assert_eq!(out["assignee"], "alice");

    let out = problem(json!({"owner": "", "assignee": "   "}));
    assert_eq!(out["assignee"], Value::Null);
}

#[test]
fn custom_label_and_optional_text_are_trimmed() {
    let out = problem(json!({
        "unsolved_custom_label": "  ",
        "source": "  ICPC Asia ",
        "notes": "",
        "link": " https://qoj.ac/contest/1 "
    }));
    assert_eq!(out["unsolved_custom_label"], Value::Null);
    assert_eq!(out["source"], "ICPC Asia");
    assert_eq!(out["notes"], Value::Null);
    assert_eq!(out["link"], "https://qoj.ac/contest/1");
}

#[test]
fn tags_default_and_filter_non_strings() {
    assert_eq!(problem(json!({}))["tags"], json!([]));
    assert_eq!(problem(json!({"tags": null}))["tags"], json!([]));
    assert_eq!(problem(json!({"tags": "dp"}))["tags"], json!([]));
    assert_eq!(
        problem(json!({"tags": ["dp", 1, "graph", null]}))["tags"],
        json!(["dp", "graph"])
    );
}

#[test]
fn pass_count_coercion_never_fails() {
    let cases = [
        (json!(7), json!(7)),
        (json!("12"), json!(12)),
        (json!(" 3 "), json!(3)),
        (json!(4.9), json!(4)),
        (json!("many"), Value::Null),
        (json!(-1), Value::Null),
        (json!([1]), Value::Null),
        (Value::Null, Value::Null),
    ];
    for (input, expected) in cases {
        let out = problem(json!({"pass_count": input.clone()}));
        assert_eq!(out["pass_count"], expected, "input {input}");
    }
}

#[test]
fn has_solution_is_never_kept() {
    let out = problem(json!({"has_solution": true}));
    assert!(!out.contains_key("has_solution"));
}

#[test]
fn offsetless_timestamps_are_read_as_utc() {
    let out = problem(json!({"created_at": "2024-01-31T23:59:00.250"}));
    assert_eq!(out["created_at"], "2024-01-31T23:59:00.250Z");
    assert_eq!(out["updated_at"], out["created_at"]);

    let out = problem(json!({
        "created_at": "2024-01-31T23:59:00+00:00",
        "updated_at": "2024-02-01T08:00:00+08:00"
    }));
    assert_eq!(out["created_at"], "2024-01-31T23:59:00Z");
    assert_eq!(out["updated_at"], "2024-02-01T00:00:00Z");
}

#[test]
fn problem_normalization_is_idempotent() {
    let inputs = [
        json!({"status": "Done", "unsolved_stage": "未看题", "owner": "amy"}),
        json!({"solved": "nope", "tags": ["a", 2], "pass_count": "9"}),
        json!({"unsolved_custom_label": " x ", "pass_count": 2.5, "created_at": "2024-01-01T00:00:00"}),
        json!({}),
    ];
    for input in inputs {
        let once = problem(input.clone());
        let twice = normalize_problem_record(once.clone());
        assert_eq!(once, twice, "input {input}");
    }
}

#[test]
fn every_rule_has_a_unique_name() {
    for rules in [PROBLEM_RULES, CONTEST_RULES] {
        let mut names: Vec<_> = rules.iter().map(|rule| rule.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), rules.len());
    }
}

#[test]
fn contest_rows_are_positional_and_clamped() {
    let out = normalize_contest_record(raw(json!({
        "name": "Round 1",
        "total_problems": 3,
        "problems": [
            {"letter": "Z", "pass_count": "4", "attempt_count": 9, "my_status": "AC"},
            "garbage",
            {"my_status": "won"},
            {"letter": "D", "pass_count": 1}
        ],
        "rank_str": " 3/120 ",
        "summary": ""
    })));
    let rows = out["problems"].as_array().expect("rows");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], json!({"letter": "A", "pass_count": 4, "attempt_count": 9, "my_status": "ac"}));
    assert_eq!(rows[1], json!({"letter": "B", "pass_count": 0, "attempt_count": 0, "my_status": "unsubmitted"}));
    assert_eq!(rows[2]["letter"], "C");
    assert_eq!(rows[2]["my_status"], "unsubmitted");
    assert_eq!(out["rank_str"], "3/120");
    assert_eq!(out["summary"], Value::Null);
}

#[test]
fn contest_total_problems_bounds() {
    let cases = [
        (json!(0), 1),
        (json!(-5), 1),
        (json!("12"), 12),
        (json!(40), 26),
        (json!("lots"), 1),
        (Value::Null, 1),
    ];
    for (input, expected) in cases {
        let out = normalize_contest_record(raw(json!({"total_problems": input.clone()})));
        assert_eq!(out["total_problems"], expected, "input {input}");
        assert_eq!(out["problems"].as_array().map(Vec::len), Some(expected));
    }
}

#[test]
fn contest_normalization_is_idempotent() {
    let once = normalize_contest_record(raw(json!({
        "total_problems": 2,
        "problems": [{"pass_count": 2.7, "my_status": "attempted"}],
        "rank_str": "1/2"
    })));
    assert_eq!(once.clone(), normalize_contest_record(once));
}

#[test]
fn typed_rows_pad_and_truncate() {
    use crate::models::contest::{ContestProblemInput, ContestStatus};

    let inputs = vec![
        ContestProblemInput {
            letter: Some("Q".to_string()),
            pass_count: Some(5),
            attempt_count: None,
            my_status: Some(ContestStatus::Ac),
        };
        4
    ];
    let rows = normalize_contest_problems(2, &inputs);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].letter, "B");
    assert_eq!(rows[1].pass_count, 5);
    assert_eq!(rows[1].attempt_count, 0);

    let padded = normalize_contest_problems(3, &inputs[..1]);
    assert_eq!(padded[2].letter, "C");
    assert_eq!(padded[2].my_status, ContestStatus::Unsubmitted);
}

//! Corrupt-file recovery and legacy data migration tests.

use super::*;
use serde_json::{json, Value};
use std::fs;

fn data_path(temp: &TempDir, name: &str) -> PathBuf {
    temp.path().join("data").join(name)
}

#[test]
fn malformed_collection_resets_to_empty_with_backup() {
    let (db, temp) = setup_test_db();
    let path = data_path(&temp, PROBLEMS_FILE_NAME);
    fs::write(&path, "[{\"id\": \"a\", ").unwrap();

    assert!(db.problems.list(&ProblemFilter::default()).unwrap().is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap().trim(), "[]");
    assert_eq!(
        fs::read_to_string(data_path(&temp, "problems.backup.json")).unwrap(),
        "[{\"id\": \"a\", "
    );

    // The store keeps working after recovery.
    db.problems.create(&problem_request("after")).unwrap();
    assert_eq!(db.problems.list(&ProblemFilter::default()).unwrap().len(), 1);
}

#[test]
fn non_array_contest_file_is_recovered() {
    let (db, temp) = setup_test_db();
    let path = data_path(&temp, CONTESTS_FILE_NAME);
    fs::write(&path, "{\"name\": \"not a list\"}").unwrap();

    assert!(db.contests.list(&ContestFilter::default()).unwrap().is_empty());
    assert!(data_path(&temp, "contests.backup.json").is_file());
}

#[test]
fn undecodable_records_are_dropped_and_backed_up() {
    let (db, temp) = setup_test_db();
    let path = data_path(&temp, PROBLEMS_FILE_NAME);
    let raw = json!([
        {"id": "keep", "title": "Keep", "created_at": "2024-03-01T10:00:00Z"},
        42,
        {"id": "no-title", "created_at": "2024-03-01T10:00:00Z"},
        {"id": "bad-time", "title": "Bad", "created_at": "yesterday"}
    ]);
    fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

    let problems = db.problems.list(&ProblemFilter::default()).unwrap();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].id, "keep");

    let backup: Value =
        serde_json::from_slice(&fs::read(data_path(&temp, "problems.backup.json")).unwrap())
            .unwrap();
    assert_eq!(backup, raw);
    let rewritten: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(rewritten.as_array().map(Vec::len), Some(1));
}

#[test]
fn missing_collection_file_is_recreated() {
    let (db, temp) = setup_test_db();
    let path = data_path(&temp, CONTESTS_FILE_NAME);
    fs::remove_file(&path).unwrap();

    assert!(db.contests.list(&ContestFilter::default()).unwrap().is_empty());
    assert!(path.is_file());
}

#[test]
fn legacy_inline_solutions_migrate_to_markdown_on_open() {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    let raw = json!([
        {
            "id": "legacy-1",
            "title": "Old",
            "status": "Done",
            "owner": "lee",
            "solution_markdown": "## Greedy\nSort by deadline.",
            "has_solution": true,
            "created_at": "2023-11-02T09:30:00.123456+00:00",
            "updated_at": "2023-11-02T09:30:00.123456+00:00"
        },
        {
            "id": "legacy-2",
            "title": "Older",
            "unsolved_stage": "已看题无思路",
            "solution": "",
            "created_at": "2023-11-03T09:30:00+00:00"
        }
    ]);
    fs::write(
        data_dir.join(PROBLEMS_FILE_NAME),
        serde_json::to_vec_pretty(&raw).unwrap(),
    )
    .unwrap();

    let db = Database::open(&data_dir).unwrap();
    assert_eq!(
        db.solutions.read("legacy-1").unwrap().as_deref(),
        Some("## Greedy\nSort by deadline.")
    );
    assert!(!db.solutions.exists("legacy-2"));

    let text = fs::read_to_string(data_dir.join(PROBLEMS_FILE_NAME)).unwrap();
    assert!(!text.contains("solution_markdown"));
    assert!(!text.contains("\"solution\""));
    assert!(!text.contains("has_solution"));
    assert!(!text.contains("\"owner\""));

    let old = db.problems.get("legacy-1").unwrap().expect("legacy-1");
    assert!(old.solved);
    assert_eq!(old.assignee.as_deref(), Some("lee"));
    assert!(db.problems.entry(old).has_solution);

    let older = db.problems.get("legacy-2").unwrap().expect("legacy-2");
    assert_eq!(older.unsolved_stage, Some(UnsolvedStage::ViewedNoIdea));
    assert_eq!(older.updated_at, older.created_at);
}

fn write_problems(data_dir: &Path, raw: &Value) {
    fs::create_dir_all(data_dir).unwrap();
    fs::write(
        data_dir.join(PROBLEMS_FILE_NAME),
        serde_json::to_vec_pretty(raw).unwrap(),
    )
    .unwrap();
}

#[test]
fn failed_solution_migration_keeps_inline_content() {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().join("data");
    write_problems(
        &data_dir,
        &json!([{
            "id": "p1",
            "title": "Kept",
            "solution_markdown": "precious content",
            "created_at": "2024-01-01T00:00:00Z"
        }]),
    );
    // A directory where the Markdown file belongs makes the write fail.
    let blocker = data_dir.join("solutions").join("p1.md");
    fs::create_dir_all(&blocker).unwrap();

    assert!(Database::open(&data_dir).is_err());
    let text = fs::read_to_string(data_dir.join(PROBLEMS_FILE_NAME)).unwrap();
    assert!(text.contains("precious content"));

    fs::remove_dir(&blocker).unwrap();
    let db = Database::open(&data_dir).unwrap();
    assert_eq!(
        db.solutions.read("p1").unwrap().as_deref(),
        Some("precious content")
    );
    let text = fs::read_to_string(data_dir.join(PROBLEMS_FILE_NAME)).unwrap();
    assert!(!text.contains("solution_markdown"));
}

#[test]
fn non_string_inline_solution_is_stringified() {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().join("data");
    write_problems(
        &data_dir,
        &json!([{
            "id": "p2",
            "title": "Numeric",
            "solution_md": 42,
            "created_at": "2024-01-01T00:00:00Z"
        }]),
    );

    let db = Database::open(&data_dir).unwrap();
    assert_eq!(db.solutions.read("p2").unwrap().as_deref(), Some("42"));
    let text = fs::read_to_string(data_dir.join(PROBLEMS_FILE_NAME)).unwrap();
    assert!(!text.contains("solution_md"));
}

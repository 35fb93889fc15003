use super::*;
use crate::filter::{ContestFilter, ProblemFilter};
use crate::models::contest::ContestStatus;
use crate::models::problem::UnsolvedStage;
use crate::test_support::setup_temp_db;
use crate::Database;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

fn batch(value: Value) -> ProblemBatchSubmission {
    serde_json::from_value(value).expect("batch payload")
}

fn standings(value: Value) -> StandingsSubmission {
    serde_json::from_value(value).expect("standings payload")
}

fn snapshot(value: Value) -> ContestSnapshotSubmission {
    serde_json::from_value(value).expect("snapshot payload")
}

/// Forwards to a real database but fails the n-th problem create (1-based).
struct FailNthProblem<'a> {
    db: &'a Database,
    fail_on: usize,
    seen: AtomicUsize,
}

impl ImportSink for FailNthProblem<'_> {
    fn create_problem(&self, request: &CreateProblemRequest) -> Result<Problem, AppError> {
        let call = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(AppError::StorageMessage("disk full".to_string()));
        }
        self.db.create_problem(request)
    }

    fn create_contest(&self, request: &CreateContestRequest) -> Result<Contest, AppError> {
        self.db.create_contest(request)
    }
}

/// Rejects every contest create.
struct RejectContests<'a>(&'a Database);

impl ImportSink for RejectContests<'_> {
    fn create_problem(&self, request: &CreateProblemRequest) -> Result<Problem, AppError> {
        self.0.create_problem(request)
    }

    fn create_contest(&self, _request: &CreateContestRequest) -> Result<Contest, AppError> {
        Err(AppError::StorageMessage("contests.json is read-only".to_string()))
    }
}

#[test]
fn merge_for_same_contest_overwrites_counts() {
    let staging = ImportStaging::default();
    staging
        .submit_problems(&batch(json!({
            "contestId": "1",
            "problems": [{"letter": "A", "title": "Alpha"}, {"letter": "B", "title": "Beta"}]
        })))
        .expect("stage");

    let merged = staging
        .merge_stats(&standings(json!({
            "contestId": "1",
            "stats": {"A": {"pass_count": 5, "attempt_count": 9}, "Z": {"pass_count": 1}}
        })))
        .expect("merge");
    assert!(merged.stats_merged);
    assert_eq!(merged.problems[0].pass_count, Some(5));
    assert_eq!(merged.problems[0].attempt_count, Some(9));
    assert_eq!(merged.problems[1].pass_count, None);
    assert_eq!(staging.problems(), Some(merged));
}

#[test]
fn merge_for_other_contest_is_rejected_and_batch_unchanged() {
    let staging = ImportStaging::default();
    let staged = staging
        .submit_problems(&batch(json!({
            "contestId": "123",
            "problems": [{"letter": "A", "title": "Alpha"}]
        })))
        .expect("stage");

    let err = staging
        .merge_stats(&standings(json!({
            "contestId": "999",
            "stats": {"A": {"pass_count": 5, "attempt_count": 9}}
        })))
        .unwrap_err();
    assert!(matches!(
        &err,
        AppError::ImportMismatch { staged, submitted } if staged == "123" && submitted == "999"
    ));
    assert!(err.is_validation());
    assert_eq!(staging.problems(), Some(staged));
}

#[test]
fn merge_without_batch_is_rejected() {
    let staging = ImportStaging::default();
    let err = staging
        .merge_stats(&standings(json!({"contestId": "1", "stats": {}})))
        .unwrap_err();
    assert!(matches!(err, AppError::NothingStaged(_)));
    assert!(staging.problems().is_none());
}

#[test]
fn stats_letters_match_case_insensitively() {
    let staging = ImportStaging::default();
    staging
        .submit_problems(&batch(json!({
            "contestId": 55,
            "problems": [{"letter": "c", "title": "Gamma"}]
        })))
        .expect("stage");
    let merged = staging
        .merge_stats(&standings(json!({
            "contestId": "55",
            "stats": {" c ": {"attempt_count": 4}}
        })))
        .expect("merge");
    assert_eq!(merged.problems[0].letter, "C");
    assert_eq!(merged.problems[0].attempt_count, Some(4));
    assert_eq!(merged.problems[0].pass_count, None);
}

#[test]
fn invalid_submission_leaves_existing_batch() {
    let staging = ImportStaging::default();
    let staged = staging
        .submit_problems(&batch(json!({
            "contestId": "7",
            "problems": [{"letter": "A", "title": "Alpha"}]
        })))
        .expect("stage");

    for bad in [
        json!({"contestId": "8", "problems": []}),
        json!({"contestId": "8", "problems": [{"letter": "A", "title": " "}]}),
        json!({"contestId": " ", "problems": [{"letter": "A", "title": "x"}]}),
        json!({"contestId": "8", "problems": [{"letter": "A", "title": "x"}, {"letter": "a", "title": "y"}]}),
        json!({"contestId": "8", "problems": [{"letter": "A", "title": "x", "link": "javascript:alert(1)"}]}),
    ] {
        let err = staging.submit_problems(&batch(bad.clone())).unwrap_err();
        assert!(err.is_validation(), "payload {bad}");
    }
    assert_eq!(staging.problems(), Some(staged));
}

#[test]
fn new_batch_replaces_previous() {
    let staging = ImportStaging::default();
    staging
        .submit_problems(&batch(json!({"contestId": "1", "problems": [{"letter": "A", "title": "One"}]})))
        .unwrap();
    staging
        .submit_problems(&batch(json!({"contestId": "2", "problems": [{"letter": "B", "title": "Two"}]})))
        .unwrap();
    let current = staging.problems().expect("staged");
    assert_eq!(current.contest_id, "2");
    assert_eq!(current.problems.len(), 1);
    assert_eq!(current.problems[0].title, "Two");
}

#[test]
fn intake_normalizes_and_inherits_batch_source() {
    let staging = ImportStaging::default();
    let staged = staging
        .submit_problems(&batch(json!({
            "contestId": "9",
            "source": " QOJ #9 ",
            "problems": [
                {"letter": "a", "title": " Alpha ", "solved": true, "unsolved_stage": "not viewed"},
                {"letter": "B", "title": "Beta", "source": "UCup", "unsolved_stage": "no clue", "tags": ["geo"]}
            ]
        })))
        .expect("stage");
    assert_eq!(staged.source.as_deref(), Some("QOJ #9"));
    let alpha = &staged.problems[0];
    assert_eq!(alpha.letter, "A");
    assert_eq!(alpha.title, "Alpha");
    assert_eq!(alpha.source.as_deref(), Some("QOJ #9"));
    assert_eq!(alpha.unsolved_stage, None);
    let beta = &staged.problems[1];
    assert_eq!(beta.source.as_deref(), Some("UCup"));
    assert_eq!(beta.unsolved_stage, None);
    assert_eq!(beta.tags, vec!["geo"]);
}

#[test]
fn reading_does_not_consume_and_clear_discards() {
    let staging = ImportStaging::default();
    staging
        .submit_contest(&snapshot(json!({"name": "Round", "total_problems": 2})))
        .unwrap();
    assert!(staging.contest().is_some());
    assert!(staging.contest().is_some());
    assert!(staging.pending().contest.is_some());

    assert!(staging.clear_contest());
    assert!(!staging.clear_contest());
    assert!(staging.contest().is_none());
    assert!(!staging.clear_problems());
}

#[test]
fn contest_snapshot_is_length_normalized() {
    let staging = ImportStaging::default();
    let pending = staging
        .submit_contest(&snapshot(json!({
            "name": " ICPC Regional ",
            "total_problems": 3,
            "problems": [
                {"letter": "X", "pass_count": 10, "attempt_count": 30, "my_status": "ac"},
                {"letter": "Y", "my_status": "attempted"},
                {"letter": "Z"},
                {"letter": "W", "my_status": "ac"}
            ],
            "user_rank": " 5/88 "
        })))
        .unwrap();
    assert_eq!(pending.name, "ICPC Regional");
    assert_eq!(pending.problems.len(), 3);
    assert_eq!(pending.problems[0].letter, "A");
    assert_eq!(pending.problems[1].my_status, ContestStatus::Attempted);
    assert_eq!(pending.problems[2].my_status, ContestStatus::Unsubmitted);
    assert_eq!(pending.rank_str.as_deref(), Some("5/88"));

    assert!(staging
        .submit_contest(&snapshot(json!({"name": ""})))
        .unwrap_err()
        .is_validation());
    assert_eq!(staging.contest(), Some(pending));
}

#[test]
fn confirm_problems_commits_and_clears() {
    let (db, _temp) = setup_temp_db();
    let staging = ImportStaging::default();
    staging
        .submit_problems(&batch(json!({
            "contestId": "1",
            "source": "QOJ",
            "problems": [{"letter": "A", "title": "Alpha", "pass_count": 3, "attempt_count": 8}]
        })))
        .unwrap();

    let report = staging.confirm_problems(&db).unwrap();
    assert_eq!(report.success_count, 1);
    assert_eq!(report.fail_count, 0);
    assert!(staging.problems().is_none());

    let stored = db
        .problems
        .get(&report.created[0])
        .unwrap()
        .expect("committed problem");
    assert_eq!(stored.title, "Alpha");
    assert_eq!(stored.source.as_deref(), Some("QOJ"));
    assert_eq!(stored.pass_count, Some(3));

    assert!(matches!(
        staging.confirm_problems(&db),
        Err(AppError::NothingStaged(_))
    ));
}

#[test]
fn partial_failure_is_counted_not_aborted() {
    let (db, _temp) = setup_temp_db();
    let staging = ImportStaging::default();
    staging
        .submit_problems(&batch(json!({
            "contestId": "3",
            "problems": [
                {"letter": "A", "title": "First"},
                {"letter": "B", "title": "Second"},
                {"letter": "C", "title": "Third"}
            ]
        })))
        .unwrap();

    let sink = FailNthProblem {
        db: &db,
        fail_on: 2,
        seen: AtomicUsize::new(0),
    };
    let report = staging.confirm_problems(&sink).unwrap();
    assert_eq!(report.success_count, 2);
    assert_eq!(report.fail_count, 1);
    assert_eq!(report.failures[0].letter, "B");
    assert!(report.failures[0].error.contains("disk full"));

    let titles: Vec<_> = db
        .problems
        .list(&ProblemFilter::default())
        .unwrap()
        .into_iter()
        .map(|problem| problem.title)
        .collect();
    assert_eq!(titles, vec!["First", "Third"]);
    assert!(staging.problems().is_none());
}

#[test]
fn combined_confirm_backfills_from_contest_status() {
    let (db, _temp) = setup_temp_db();
    let staging = ImportStaging::default();
    staging
        .submit_contest(&snapshot(json!({
            "name": "Stage 4",
            "total_problems": 3,
            "problems": [
                {"letter": "A", "my_status": "ac"},
                {"letter": "B", "my_status": "attempted"},
                {"letter": "C", "my_status": "unsubmitted"}
            ]
        })))
        .unwrap();
    staging
        .submit_problems(&batch(json!({
            "contestId": "44",
            "problems": [
                {"letter": "A", "title": "Ace", "unsolved_stage": "viewed no idea"},
                {"letter": "B", "title": "Bee", "unsolved_stage": "not viewed"},
                {"letter": "C", "title": "Sea", "unsolved_stage": "viewed no idea"}
            ]
        })))
        .unwrap();

    let report = staging.confirm_all(&db).unwrap();
    let contest = report.contest.expect("contest half");
    assert!(contest.success);
    let problems = report.problems.expect("problem half");
    assert_eq!(problems.success_count, 3);
    assert!(staging.pending().contest.is_none());
    assert!(staging.pending().problems.is_none());

    let stored = db.problems.list(&ProblemFilter::default()).unwrap();
    assert!(stored[0].solved);
    assert_eq!(stored[0].unsolved_stage, None);
    assert!(!stored[1].solved);
    assert_eq!(stored[1].unsolved_stage, Some(UnsolvedStage::ApproachKnown));
    assert_eq!(stored[2].unsolved_stage, Some(UnsolvedStage::ViewedNoIdea));

    let contests = db.contests.list(&ContestFilter::default()).unwrap();
    assert_eq!(contests.len(), 1);
    assert_eq!(contests[0].solved_count(), 1);
}

#[test]
fn combined_confirm_reports_each_half_independently() {
    let (db, _temp) = setup_temp_db();
    let staging = ImportStaging::default();
    staging
        .submit_contest(&snapshot(json!({
            "name": "Broken",
            "problems": [{"letter": "A", "my_status": "ac"}]
        })))
        .unwrap();
    staging
        .submit_problems(&batch(json!({
            "contestId": "5",
            "problems": [{"letter": "A", "title": "Still lands"}]
        })))
        .unwrap();

    let report = staging.confirm_all(&RejectContests(&db)).unwrap();
    let contest = report.contest.expect("contest half");
    assert!(!contest.success);
    assert!(contest.error.is_some());
    assert_eq!(report.problems.expect("problem half").success_count, 1);

    // The failed half stays staged; the committed half is cleared.
    assert!(staging.contest().is_some());
    assert!(staging.problems().is_none());
    assert!(db.problems.list(&ProblemFilter::default()).unwrap()[0].solved);
}

#[test]
fn combined_confirm_with_only_one_half() {
    let (db, _temp) = setup_temp_db();
    let staging = ImportStaging::default();
    assert!(matches!(
        staging.confirm_all(&db),
        Err(AppError::NothingStaged(_))
    ));

    staging
        .submit_contest(&snapshot(json!({"name": "Solo", "total_problems": 2})))
        .unwrap();
    let report = staging.confirm_all(&db).unwrap();
    assert!(report.problems.is_none());
    assert!(report.contest.expect("contest half").success);
}

#[test]
fn confirm_contest_keeps_snapshot_on_failure() {
    let (db, _temp) = setup_temp_db();
    let staging = ImportStaging::default();
    staging
        .submit_contest(&snapshot(json!({"name": "Retry me"})))
        .unwrap();
    assert!(staging.confirm_contest(&RejectContests(&db)).is_err());
    assert!(staging.contest().is_some());

    let created = staging.confirm_contest(&db).unwrap();
    assert_eq!(created.name, "Retry me");
    assert!(staging.contest().is_none());
}

#[test]
fn custom_store_is_injectable() {
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStagingStore,
        writes: AtomicUsize,
    }

    impl StagingStore for CountingStore {
        fn contest(&self) -> Option<PendingContest> {
            self.inner.contest()
        }
        fn set_contest(&self, contest: Option<PendingContest>) {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set_contest(contest);
        }
        fn problems(&self) -> Option<ProblemBatch> {
            self.inner.problems()
        }
        fn set_problems(&self, batch: Option<ProblemBatch>) {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set_problems(batch);
        }
    }

    let staging = ImportStaging::new(CountingStore::default());
    staging
        .submit_problems(&batch(json!({"contestId": "1", "problems": [{"letter": "A", "title": "A"}]})))
        .unwrap();
    staging.clear_problems();
    assert!(staging.pending().problems.is_none());
}

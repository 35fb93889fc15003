//! Turning validated scraper payloads into staged snapshots.

use crate::error::AppError;
use crate::models::contest::clamp_total_problems;
use crate::models::import::{
    ContestSnapshotSubmission, PendingContest, ProblemBatch, ProblemBatchSubmission,
    ScrapedProblem, StagedProblem,
};
use crate::normalize::{normalize_contest_problems, normalize_problem_record};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeSet;
use validator::Validate;

fn clean_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Canonical form of a problem letter: trimmed and uppercased.
pub(crate) fn canonical_letter(letter: &str) -> String {
    letter.trim().to_ascii_uppercase()
}

fn stage_problem(
    scraped: &ScrapedProblem,
    batch_source: Option<&str>,
) -> Result<StagedProblem, AppError> {
    let mut raw = match serde_json::to_value(scraped)? {
        Value::Object(map) => map,
        _ => return Err(AppError::Internal),
    };
    let source = clean_text(scraped.source.as_deref()).or_else(|| clean_text(batch_source));
    raw.insert("source".to_string(), source.map_or(Value::Null, Value::String));

    let mut staged: StagedProblem =
        serde_json::from_value(Value::Object(normalize_problem_record(raw)))?;
    staged.letter = canonical_letter(&staged.letter);
    staged.title = staged.title.trim().to_string();
    Ok(staged)
}

/// Validate and normalize a dashboard scrape.
///
/// # Errors
/// Returns [`AppError::Validation`] for schema violations, an empty problem
/// list, or repeated letters.
pub(crate) fn problem_batch(submission: &ProblemBatchSubmission) -> Result<ProblemBatch, AppError> {
    submission.validate()?;
    if submission.problems.is_empty() {
        return Err(AppError::Validation(
            "problems: a batch needs at least one problem".to_string(),
        ));
    }

    let mut seen = BTreeSet::new();
    for problem in &submission.problems {
        let letter = canonical_letter(&problem.letter);
        if !seen.insert(letter.clone()) {
            return Err(AppError::Validation(format!(
                "problems: letter {} appears more than once",
                letter
            )));
        }
    }

    let batch_source = submission.source.as_deref();
    let problems = submission
        .problems
        .iter()
        .map(|problem| stage_problem(problem, batch_source))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProblemBatch {
        contest_id: submission.contest_id.trim().to_string(),
        source: clean_text(batch_source),
        problems,
        staged_at: Utc::now(),
        stats_merged: false,
    })
}

/// Validate and length-normalize a whole-contest scrape.
pub(crate) fn pending_contest(
    submission: &ContestSnapshotSubmission,
) -> Result<PendingContest, AppError> {
    submission.validate()?;
    let requested = submission
        .total_problems
        .unwrap_or(submission.problems.len() as i64);
    let total = clamp_total_problems(requested);

    Ok(PendingContest {
        name: submission.name.trim().to_string(),
        total_problems: total,
        problems: normalize_contest_problems(total, &submission.problems),
        rank_str: clean_text(submission.user_rank.as_deref()),
        summary: clean_text(submission.summary.as_deref()),
        staged_at: Utc::now(),
    })
}

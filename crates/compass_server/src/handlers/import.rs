//! Import staging HTTP handlers used by the scraper bookmarklet.

use crate::{error::HttpError, extract::ApiJson, AppState};
use axum::{extract::State, Json};
use compass_core::models::contest::Contest;
use compass_core::models::import::{
    BatchCommitReport, CombinedCommitReport, ContestSnapshotSubmission, PendingContest,
    PendingImport, ProblemBatch, ProblemBatchSubmission, StandingsSubmission,
};
use serde_json::{json, Value};

/// Everything currently staged.
pub async fn get_pending(State(state): State<AppState>) -> Json<PendingImport> {
    Json(state.staging.pending())
}

/// Discard both staged halves.
pub async fn clear_pending(State(state): State<AppState>) -> Json<Value> {
    let contest = state.staging.clear_contest();
    let problems = state.staging.clear_problems();
    Json(json!({ "success": true, "contest": contest, "problems": problems }))
}

pub async fn submit_contest(
    State(state): State<AppState>,
    ApiJson(submission): ApiJson<ContestSnapshotSubmission>,
) -> Result<Json<PendingContest>, HttpError> {
    Ok(Json(state.staging.submit_contest(&submission)?))
}

/// The staged contest snapshot, or `null`.
pub async fn get_contest(State(state): State<AppState>) -> Json<Option<PendingContest>> {
    Json(state.staging.contest())
}

pub async fn clear_contest(State(state): State<AppState>) -> Json<Value> {
    let cleared = state.staging.clear_contest();
    Json(json!({ "success": true, "cleared": cleared }))
}

/// Commit the staged contest snapshot.
///
/// # Errors
/// Returns 400 when nothing is staged.
pub async fn confirm_contest(State(state): State<AppState>) -> Result<Json<Contest>, HttpError> {
    Ok(Json(state.staging.confirm_contest(state.db.as_ref())?))
}

pub async fn submit_problems(
    State(state): State<AppState>,
    ApiJson(submission): ApiJson<ProblemBatchSubmission>,
) -> Result<Json<ProblemBatch>, HttpError> {
    Ok(Json(state.staging.submit_problems(&submission)?))
}

/// The staged problem batch, or `null`.
pub async fn get_problems(State(state): State<AppState>) -> Json<Option<ProblemBatch>> {
    Json(state.staging.problems())
}

pub async fn clear_problems(State(state): State<AppState>) -> Json<Value> {
    let cleared = state.staging.clear_problems();
    Json(json!({ "success": true, "cleared": cleared }))
}

/// Merge standings pass/attempt counts into the staged batch.
///
/// # Errors
/// Returns 400 when no batch is staged or it belongs to another contest.
pub async fn merge_stats(
    State(state): State<AppState>,
    ApiJson(submission): ApiJson<StandingsSubmission>,
) -> Result<Json<ProblemBatch>, HttpError> {
    Ok(Json(state.staging.merge_stats(&submission)?))
}

pub async fn confirm_problems(
    State(state): State<AppState>,
) -> Result<Json<BatchCommitReport>, HttpError> {
    Ok(Json(state.staging.confirm_problems(state.db.as_ref())?))
}

/// Commit the staged contest then the staged batch, backfilling results.
pub async fn confirm_all(
    State(state): State<AppState>,
) -> Result<Json<CombinedCommitReport>, HttpError> {
    Ok(Json(state.staging.confirm_all(state.db.as_ref())?))
}

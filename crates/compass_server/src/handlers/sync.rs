//! Repository sync HTTP handlers.
//!
//! Git runs on the blocking pool. Clone, pull, and push hold every store
//! lock while they run so no write lands in a directory being swapped or
//! rewritten. Operations always answer 200; the transcript's `success` flag
//! carries the outcome.

use crate::{error::HttpError, extract::ApiJson, AppError, AppState};
use axum::{extract::State, Json};
use compass_core::{SyncManager, SyncStatus, SyncTranscript};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CloneRequest {
    pub url: String,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PullRequest {
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PushRequest {
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

async fn run_blocking<T, F>(state: &AppState, op: F) -> Result<T, HttpError>
where
    T: Send + 'static,
    F: FnOnce(&SyncManager) -> T + Send + 'static,
{
    let sync = state.sync.clone();
    tokio::task::spawn_blocking(move || op(sync.as_ref()))
        .await
        .map_err(|err| {
            tracing::error!("Sync task failed: {}", err);
            HttpError::from(AppError::Internal)
        })
}

/// [`run_blocking`] with the data directory held exclusively.
async fn run_exclusive<T, F>(state: &AppState, op: F) -> Result<T, HttpError>
where
    T: Send + 'static,
    F: FnOnce(&SyncManager) -> T + Send + 'static,
{
    let db = state.db.clone();
    run_blocking(state, move |sync| db.exclusive(|| op(sync))).await
}

pub async fn sync_summary(State(state): State<AppState>) -> Result<Json<SyncStatus>, HttpError> {
    run_blocking(&state, |sync| sync.status_summary())
        .await
        .map(Json)
}

pub async fn sync_status(
    State(state): State<AppState>,
) -> Result<Json<SyncTranscript>, HttpError> {
    run_blocking(&state, |sync| sync.status()).await.map(Json)
}

pub async fn clone_repo(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CloneRequest>,
) -> Result<Json<SyncTranscript>, HttpError> {
    run_exclusive(&state, move |sync| {
        sync.clone_repo(&req.url, req.branch.as_deref())
    })
    .await
    .map(Json)
}

/// Pull; an empty body uses the configured branch.
pub async fn pull(
    State(state): State<AppState>,
    body: Option<ApiJson<PullRequest>>,
) -> Result<Json<SyncTranscript>, HttpError> {
    let req = body.map(|ApiJson(req)| req).unwrap_or_default();
    run_exclusive(&state, move |sync| sync.pull(req.branch.as_deref()))
        .await
        .map(Json)
}

/// Commit everything and push; a blank message gets a timestamped default.
pub async fn push(
    State(state): State<AppState>,
    body: Option<ApiJson<PushRequest>>,
) -> Result<Json<SyncTranscript>, HttpError> {
    let req = body.map(|ApiJson(req)| req).unwrap_or_default();
    run_exclusive(&state, move |sync| {
        sync.push(req.branch.as_deref(), req.message.as_deref())
    })
    .await
    .map(Json)
}

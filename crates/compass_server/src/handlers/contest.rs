//! Contest HTTP handlers.

use super::parse_day;
use crate::{error::HttpError, extract::ApiJson, AppError, AppState};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use compass_core::filter::{ContestFilter, DateRange};
use compass_core::models::contest::{Contest, CreateContestRequest, UpdateContestRequest};
use serde::Deserialize;

/// Query string for `GET /api/contests`.
#[derive(Debug, Default, Deserialize)]
pub struct ContestQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn list_contests(
    State(state): State<AppState>,
    Query(query): Query<ContestQuery>,
) -> Result<Json<Vec<Contest>>, HttpError> {
    let filter = ContestFilter {
        range: DateRange::new(parse_day("from", query.from)?, parse_day("to", query.to)?),
    };
    Ok(Json(state.db.contests.list(&filter)?))
}

/// Create a contest; its problem rows are padded or truncated to
/// `total_problems`.
pub async fn create_contest(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateContestRequest>,
) -> Result<Json<Contest>, HttpError> {
    Ok(Json(state.db.contests.create(&req)?))
}

pub async fn get_contest(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Contest>, HttpError> {
    state
        .db
        .contests
        .get(&id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound.into())
}

pub async fn update_contest(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateContestRequest>,
) -> Result<Json<Contest>, HttpError> {
    state
        .db
        .contests
        .update(&id, &req)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound.into())
}

pub async fn delete_contest(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, HttpError> {
    if state.db.contests.delete(&id)? {
        Ok(Json(serde_json::json!({ "success": true })))
    } else {
        Err(AppError::NotFound.into())
    }
}

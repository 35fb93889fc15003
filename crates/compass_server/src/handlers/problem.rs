//! Problem and solution HTTP handlers.

use super::parse_day;
use crate::{error::HttpError, extract::ApiJson, AppError, AppState};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use compass_core::filter::{DateRange, ProblemFilter};
use compass_core::models::problem::{
    CreateProblemRequest, ProblemEntry, StatusFilter, UpdateProblemRequest,
};
use serde::{Deserialize, Serialize};

/// Query string for `GET /api/problems`.
#[derive(Debug, Default, Deserialize)]
pub struct ProblemQuery {
    pub status: Option<StatusFilter>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl ProblemQuery {
    fn into_filter(self) -> Result<ProblemFilter, AppError> {
        Ok(ProblemFilter {
            status: self.status.unwrap_or_default(),
            range: DateRange::new(parse_day("from", self.from)?, parse_day("to", self.to)?),
        })
    }
}

/// Body for `PUT /api/problems/:id/solution`.
#[derive(Debug, Deserialize)]
pub struct SolutionBody {
    #[serde(default)]
    pub content: String,
}

/// Solution text for one problem; `content` is `null` when none is saved.
#[derive(Debug, Serialize)]
pub struct SolutionResponse {
    pub problem_id: String,
    pub content: Option<String>,
}

fn ensure_problem_exists(state: &AppState, id: &str) -> Result<(), HttpError> {
    match state.db.problems.get(id)? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound.into()),
    }
}

/// List problems, optionally filtered by solved state and creation day.
///
/// # Errors
/// Returns 400 for unparseable dates.
pub async fn list_problems(
    State(state): State<AppState>,
    Query(query): Query<ProblemQuery>,
) -> Result<Json<Vec<ProblemEntry>>, HttpError> {
    let filter = query.into_filter()?;
    let entries = state
        .db
        .problems
        .list(&filter)?
        .into_iter()
        .map(|problem| state.db.problems.entry(problem))
        .collect();
    Ok(Json(entries))
}

/// Create a problem.
///
/// # Errors
/// Returns 400 when validation fails.
pub async fn create_problem(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateProblemRequest>,
) -> Result<Json<ProblemEntry>, HttpError> {
    let problem = state.db.problems.create(&req)?;
    Ok(Json(state.db.problems.entry(problem)))
}

pub async fn get_problem(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProblemEntry>, HttpError> {
    let problem = state.db.problems.get(&id)?.ok_or(AppError::NotFound)?;
    Ok(Json(state.db.problems.entry(problem)))
}

/// Partially update a problem. Explicit `null` clears a field.
///
/// # Errors
/// Returns 404 for unknown ids and 400 when validation fails.
pub async fn update_problem(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateProblemRequest>,
) -> Result<Json<ProblemEntry>, HttpError> {
    let problem = state
        .db
        .problems
        .update(&id, &req)?
        .ok_or(AppError::NotFound)?;
    Ok(Json(state.db.problems.entry(problem)))
}

/// Delete a problem together with its solution file.
pub async fn delete_problem(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, HttpError> {
    if state.db.problems.delete(&id)? {
        Ok(Json(serde_json::json!({ "success": true })))
    } else {
        Err(AppError::NotFound.into())
    }
}

pub async fn get_solution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SolutionResponse>, HttpError> {
    ensure_problem_exists(&state, &id)?;
    let content = state.db.solutions.read(&id)?;
    Ok(Json(SolutionResponse {
        problem_id: id,
        content,
    }))
}

/// Save a solution; blank content removes the file.
pub async fn save_solution(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SolutionBody>,
) -> Result<Json<SolutionResponse>, HttpError> {
    ensure_problem_exists(&state, &id)?;
    let content = state.db.solutions.save(&id, &body.content)?;
    Ok(Json(SolutionResponse {
        problem_id: id,
        content,
    }))
}

pub async fn delete_solution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, HttpError> {
    ensure_problem_exists(&state, &id)?;
    let removed = state.db.solutions.delete(&id)?;
    Ok(Json(serde_json::json!({ "success": true, "removed": removed })))
}

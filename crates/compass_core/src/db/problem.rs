//! Problem collection: CRUD, filters, and legacy solution migration.

use super::collection::{CollectionRecord, JsonCollection};
use super::solution::SolutionDb;
use crate::error::AppError;
use crate::filter::ProblemFilter;
use crate::models::problem::{CreateProblemRequest, Problem, ProblemEntry, UpdateProblemRequest};
use crate::normalize::{normalize_problem_record, RawRecord};
use chrono::Utc;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::MutexGuard;
use validator::Validate;

/// Inline solution fields written by earlier releases, in priority order.
const LEGACY_SOLUTION_FIELDS: [&str; 3] = ["solution_markdown", "solution_md", "solution"];

/// Text of a legacy inline solution value; scalars are stringified.
fn legacy_solution_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    (!text.trim().is_empty()).then_some(text)
}

impl CollectionRecord for Problem {
    const KIND: &'static str = "problem";

    fn normalize(raw: RawRecord) -> RawRecord {
        normalize_problem_record(raw)
    }
}

/// Problem storage backed by `problems.json`.
pub struct ProblemDb {
    collection: JsonCollection<Problem>,
    solutions: SolutionDb,
}

fn to_raw<T: serde::Serialize>(value: &T) -> Result<RawRecord, AppError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Internal),
    }
}

fn decode(raw: RawRecord) -> Result<Problem, AppError> {
    let normalized = normalize_problem_record(raw);
    Ok(serde_json::from_value(Value::Object(normalized))?)
}

fn set<T: serde::Serialize>(raw: &mut RawRecord, key: &str, value: &T) -> Result<(), AppError> {
    raw.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(())
}

fn apply_update(raw: &mut RawRecord, update: &UpdateProblemRequest) -> Result<(), AppError> {
    if let Some(title) = &update.title {
        set(raw, "title", title)?;
    }
    if let Some(link) = &update.link {
        set(raw, "link", link)?;
    }
    if let Some(source) = &update.source {
        set(raw, "source", source)?;
    }
    if let Some(tags) = &update.tags {
        set(raw, "tags", tags)?;
    }
    if let Some(assignee) = &update.assignee {
        set(raw, "assignee", assignee)?;
    }
    if let Some(solved) = update.solved {
        set(raw, "solved", &solved)?;
    }
    if let Some(stage) = &update.unsolved_stage {
        set(raw, "unsolved_stage", stage)?;
    }
    if let Some(label) = &update.unsolved_custom_label {
        set(raw, "unsolved_custom_label", label)?;
    }
    if let Some(pass_count) = &update.pass_count {
        set(raw, "pass_count", pass_count)?;
    }
    if let Some(notes) = &update.notes {
        set(raw, "notes", notes)?;
    }
    Ok(())
}

impl ProblemDb {
    /// Hold the collection mutex, blocking every read and write.
    pub(crate) fn hold(&self) -> MutexGuard<'_, ()> {
        self.collection.guard()
    }

    /// Open `path`, migrating legacy inline solutions into `solutions`.
    ///
    /// # Errors
    /// Returns an error when the collection file cannot be created or read.
    pub fn new(path: PathBuf, solutions: SolutionDb) -> Result<Self, AppError> {
        let db = Self {
            collection: JsonCollection::open(path)?,
            solutions,
        };
        let migrated = db.list(&ProblemFilter::default())?;
        tracing::debug!("problem collection ready with {} record(s)", migrated.len());
        Ok(db)
    }

    /// Move a non-empty legacy inline solution out of `raw` into its file.
    ///
    /// Returns `true` when the record changed and must be written back. The
    /// legacy field is removed only after the file write succeeds.
    ///
    /// # Errors
    /// Returns [`AppError::StorageMessage`] when the solution file cannot be
    /// written; the caller must not rewrite the collection in that case.
    fn migrate_inline_solution(&self, raw: &mut RawRecord) -> Result<bool, AppError> {
        let mut changed = raw.remove("has_solution").is_some();
        let content = LEGACY_SOLUTION_FIELDS
            .iter()
            .find_map(|key| raw.get(*key).and_then(legacy_solution_text));
        let id = raw.get("id").and_then(Value::as_str).map(str::to_string);

        match (content, id) {
            (Some(content), Some(id)) => {
                self.solutions.write(&id, &content).map_err(|err| {
                    tracing::error!("failed to migrate inline solution of {}: {}", id, err);
                    AppError::StorageMessage(format!(
                        "inline solution of problem {} could not be migrated: {}",
                        id, err
                    ))
                })?;
                tracing::info!("migrated inline solution of problem {} to Markdown", id);
            }
            // Without an id the record is dropped and backed up as undecodable.
            (Some(_), None) => return Ok(changed),
            (None, _) => {}
        }

        for key in LEGACY_SOLUTION_FIELDS {
            changed |= raw.remove(key).is_some();
        }
        Ok(changed)
    }

    fn load(&self) -> Result<Vec<Problem>, AppError> {
        self.collection
            .load(|raw| self.migrate_inline_solution(raw))
    }

    /// Attach the derived `has_solution` flag.
    pub fn entry(&self, problem: Problem) -> ProblemEntry {
        let has_solution = self.solutions.exists(&problem.id);
        ProblemEntry {
            problem,
            has_solution,
        }
    }

    /// Create a problem with a fresh id and timestamps.
    ///
    /// # Errors
    /// Returns [`AppError::Validation`] for invalid payloads and storage
    /// errors when the collection cannot be written.
    pub fn create(&self, request: &CreateProblemRequest) -> Result<Problem, AppError> {
        request.validate()?;
        let now = Utc::now();
        let mut raw = to_raw(request)?;
        set(&mut raw, "id", &uuid::Uuid::new_v4().to_string())?;
        set(&mut raw, "created_at", &now)?;
        set(&mut raw, "updated_at", &now)?;
        let problem = decode(raw)?;

        self.collection.modify(
            |raw| self.migrate_inline_solution(raw),
            |records| {
                records.push(problem.clone());
                Ok(())
            },
        )?;
        tracing::debug!("created problem {}", problem.id);
        Ok(problem)
    }

    pub fn get(&self, id: &str) -> Result<Option<Problem>, AppError> {
        Ok(self.load()?.into_iter().find(|problem| problem.id == id))
    }

    /// Problems matching `filter`, in file (creation) order.
    pub fn list(&self, filter: &ProblemFilter) -> Result<Vec<Problem>, AppError> {
        let mut problems = self.load()?;
        problems.retain(|problem| filter.matches(problem));
        Ok(problems)
    }

    /// Merge `update` over the stored problem and refresh `updated_at`.
    ///
    /// # Returns
    /// The updated problem, or `None` when `id` does not exist.
    pub fn update(
        &self,
        id: &str,
        update: &UpdateProblemRequest,
    ) -> Result<Option<Problem>, AppError> {
        update.validate()?;
        self.collection.modify(
            |raw| self.migrate_inline_solution(raw),
            |records| {
                let Some(slot) = records.iter_mut().find(|problem| problem.id == id) else {
                    return Ok(None);
                };
                let mut raw = to_raw(&*slot)?;
                apply_update(&mut raw, update)?;
                set(&mut raw, "updated_at", &Utc::now())?;
                let mut updated = decode(raw)?;
                updated.id = slot.id.clone();
                updated.created_at = slot.created_at;
                *slot = updated.clone();
                Ok(Some(updated))
            },
        )
    }

    /// Delete a problem and its solution file.
    ///
    /// # Returns
    /// `false` when `id` does not exist.
    pub fn delete(&self, id: &str) -> Result<bool, AppError> {
        let removed = self.collection.modify(
            |raw| self.migrate_inline_solution(raw),
            |records| {
                let before = records.len();
                records.retain(|problem| problem.id != id);
                Ok(records.len() != before)
            },
        )?;
        if removed {
            if let Err(err) = self.solutions.delete(id) {
                tracing::error!("problem {} deleted but its solution file remains: {}", id, err);
                return Err(err);
            }
        }
        Ok(removed)
    }
}

//! Contest collection.

use super::collection::{CollectionRecord, JsonCollection};
use crate::error::AppError;
use crate::filter::ContestFilter;
use crate::models::contest::{Contest, CreateContestRequest, UpdateContestRequest};
use crate::normalize::{normalize_contest_record, RawRecord};
use chrono::Utc;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::MutexGuard;
use validator::Validate;

impl CollectionRecord for Contest {
    const KIND: &'static str = "contest";

    fn normalize(raw: RawRecord) -> RawRecord {
        normalize_contest_record(raw)
    }
}

/// Contest storage backed by `contests.json`.
///
/// Every write goes through [`normalize_contest_record`], so the stored
/// `problems` list always has exactly `total_problems` rows lettered `A..`.
pub struct ContestDb {
    collection: JsonCollection<Contest>,
}

fn no_migration(_: &mut RawRecord) -> Result<bool, AppError> {
    Ok(false)
}

fn decode(mut raw: RawRecord) -> Result<Contest, AppError> {
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .map(|name| name.trim().to_string());
    if let Some(name) = name {
        raw.insert("name".to_string(), Value::String(name));
    }
    let normalized = normalize_contest_record(raw);
    Ok(serde_json::from_value(Value::Object(normalized))?)
}

fn to_raw<T: serde::Serialize>(value: &T) -> Result<RawRecord, AppError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Internal),
    }
}

impl ContestDb {
    /// Hold the collection mutex, blocking every read and write.
    pub(crate) fn hold(&self) -> MutexGuard<'_, ()> {
        self.collection.guard()
    }

    pub fn new(path: PathBuf) -> Result<Self, AppError> {
        Ok(Self {
            collection: JsonCollection::open(path)?,
        })
    }

    /// Create a contest; a missing `total_problems` follows the row count.
    pub fn create(&self, request: &CreateContestRequest) -> Result<Contest, AppError> {
        request.validate()?;
        let now = Utc::now();
        let total = request
            .total_problems
            .unwrap_or(request.problems.len() as i64);
        let mut raw = to_raw(request)?;
        raw.insert("total_problems".to_string(), Value::from(total));
        raw.insert(
            "id".to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
        raw.insert("created_at".to_string(), serde_json::to_value(now)?);
        raw.insert("updated_at".to_string(), serde_json::to_value(now)?);
        let contest = decode(raw)?;

        self.collection.modify(no_migration, |records| {
            records.push(contest.clone());
            Ok(())
        })?;
        tracing::debug!("created contest {}", contest.id);
        Ok(contest)
    }

    pub fn get(&self, id: &str) -> Result<Option<Contest>, AppError> {
        Ok(self
            .collection
            .load(no_migration)?
            .into_iter()
            .find(|contest| contest.id == id))
    }

    /// Contests matching `filter`, in file (creation) order.
    pub fn list(&self, filter: &ContestFilter) -> Result<Vec<Contest>, AppError> {
        let mut contests = self.collection.load(no_migration)?;
        contests.retain(|contest| filter.matches(contest));
        Ok(contests)
    }

    /// Merge `update` over the stored contest and refresh `updated_at`.
    ///
    /// Supplied `problems` rows replace the stored rows positionally; a new
    /// `total_problems` pads or truncates whichever rows are in effect.
    pub fn update(
        &self,
        id: &str,
        update: &UpdateContestRequest,
    ) -> Result<Option<Contest>, AppError> {
        update.validate()?;
        self.collection.modify(no_migration, |records| {
            let Some(slot) = records.iter_mut().find(|contest| contest.id == id) else {
                return Ok(None);
            };
            let mut raw = to_raw(&*slot)?;
            if let Some(name) = &update.name {
                raw.insert("name".to_string(), Value::String(name.clone()));
            }
            if let Some(total) = update.total_problems {
                raw.insert("total_problems".to_string(), Value::from(total));
            }
            if let Some(problems) = &update.problems {
                raw.insert("problems".to_string(), serde_json::to_value(problems)?);
            }
            if let Some(rank_str) = &update.rank_str {
                raw.insert("rank_str".to_string(), serde_json::to_value(rank_str)?);
            }
            if let Some(summary) = &update.summary {
                raw.insert("summary".to_string(), serde_json::to_value(summary)?);
            }
            raw.insert("updated_at".to_string(), serde_json::to_value(Utc::now())?);

            let mut updated = decode(raw)?;
            updated.id = slot.id.clone();
            updated.created_at = slot.created_at;
            *slot = updated.clone();
            Ok(Some(updated))
        })
    }

    /// # Returns
    /// `false` when `id` does not exist.
    pub fn delete(&self, id: &str) -> Result<bool, AppError> {
        self.collection.modify(no_migration, |records| {
            let before = records.len();
            records.retain(|contest| contest.id != id);
            Ok(records.len() != before)
        })
    }
}

//! Scraper payloads, staged import snapshots, and commit reports.
//!
//! The bookmarklet posts three shapes: a dashboard problem batch, a
//! standings statistics merge, and a whole-contest snapshot. Each has an
//! explicit schema here and is validated before it can touch staged state.

use super::contest::{ContestProblem, ContestProblemInput, ContestStatus, CreateContestRequest};
use super::problem::{CreateProblemRequest, UnsolvedStage};
use super::validation::{validate_letter, validate_link, validate_not_blank};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Accept contest ids sent either as JSON strings or numbers.
fn deserialize_contest_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text.trim().to_string(),
        RawId::Number(number) => number.to_string(),
    })
}

/// One problem as scraped from a contest dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ScrapedProblem {
    #[validate(custom(function = "validate_letter"))]
    pub letter: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub title: String,
    #[validate(custom(function = "validate_link"))]
    pub link: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub solved: bool,
    pub unsolved_stage: Option<String>,
    pub unsolved_custom_label: Option<String>,
    pub pass_count: Option<u32>,
    pub attempt_count: Option<u32>,
    pub notes: Option<String>,
}

/// Dashboard scrape: the problem list of one external contest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProblemBatchSubmission {
    #[serde(
        rename = "contestId",
        alias = "contest_id",
        deserialize_with = "deserialize_contest_id"
    )]
    #[validate(custom(function = "validate_not_blank"))]
    pub contest_id: String,
    #[serde(default)]
    pub source: Option<String>,
    #[validate(nested)]
    pub problems: Vec<ScrapedProblem>,
}

/// Pass/attempt counts scraped from a standings page for one letter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterStats {
    #[serde(default)]
    pub pass_count: Option<u32>,
    #[serde(default)]
    pub attempt_count: Option<u32>,
}

/// Standings scrape: statistics keyed by problem letter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct StandingsSubmission {
    #[serde(
        rename = "contestId",
        alias = "contest_id",
        deserialize_with = "deserialize_contest_id"
    )]
    #[validate(custom(function = "validate_not_blank"))]
    pub contest_id: String,
    pub stats: BTreeMap<String, LetterStats>,
}

/// Standings scrape of a whole contest, including the team's own results.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ContestSnapshotSubmission {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,
    #[serde(default)]
    pub total_problems: Option<i64>,
    #[serde(default)]
    pub problems: Vec<ContestProblemInput>,
    #[serde(default, alias = "rank_str")]
    pub user_rank: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// A scraped problem after intake normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedProblem {
    pub letter: String,
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub solved: bool,
    #[serde(default)]
    pub unsolved_stage: Option<UnsolvedStage>,
    #[serde(default)]
    pub unsolved_custom_label: Option<String>,
    #[serde(default)]
    pub pass_count: Option<u32>,
    #[serde(default)]
    pub attempt_count: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl StagedProblem {
    /// Apply the team's contest result to this problem's solved state.
    ///
    /// `Unsubmitted` leaves the dashboard-inferred state untouched.
    pub fn apply_contest_status(&mut self, status: ContestStatus) {
        match status {
            ContestStatus::Ac => {
                self.solved = true;
                self.unsolved_stage = None;
                self.unsolved_custom_label = None;
            }
            ContestStatus::Attempted => {
                self.solved = false;
                self.unsolved_stage = Some(UnsolvedStage::ApproachKnown);
            }
            ContestStatus::Unsubmitted => {}
        }
    }

    /// Build the create payload committed to the problem collection.
    ///
    /// `attempt_count` and the letter have no place on a problem record.
    pub fn to_create_request(&self) -> CreateProblemRequest {
        CreateProblemRequest {
            title: self.title.clone(),
            link: self.link.clone(),
            source: self.source.clone(),
            tags: self.tags.clone(),
            assignee: None,
            solved: self.solved,
            unsolved_stage: self.unsolved_stage.map(|stage| stage.as_str().to_string()),
            unsolved_custom_label: self.unsolved_custom_label.clone(),
            pass_count: self.pass_count,
            notes: self.notes.clone(),
        }
    }
}

/// The staged problem batch of one external contest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemBatch {
    #[serde(rename = "contestId")]
    pub contest_id: String,
    pub source: Option<String>,
    pub problems: Vec<StagedProblem>,
    pub staged_at: DateTime<Utc>,
    /// Set once a standings merge has landed on this batch.
    #[serde(default)]
    pub stats_merged: bool,
}

/// A staged whole-contest snapshot, already length-normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingContest {
    pub name: String,
    pub total_problems: usize,
    pub problems: Vec<ContestProblem>,
    pub rank_str: Option<String>,
    pub summary: Option<String>,
    pub staged_at: DateTime<Utc>,
}

impl PendingContest {
    /// The team's status on `letter`, if the snapshot has that letter.
    pub fn status_for(&self, letter: &str) -> Option<ContestStatus> {
        let letter = letter.trim();
        self.problems
            .iter()
            .find(|problem| problem.letter.eq_ignore_ascii_case(letter))
            .map(|problem| problem.my_status)
    }

    /// Build the create payload committed to the contest collection.
    pub fn to_create_request(&self) -> CreateContestRequest {
        CreateContestRequest {
            name: self.name.clone(),
            total_problems: Some(self.total_problems as i64),
            problems: self.problems.iter().map(ContestProblemInput::from).collect(),
            rank_str: self.rank_str.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// Everything currently staged, as returned by the import status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingImport {
    pub contest: Option<PendingContest>,
    pub problems: Option<ProblemBatch>,
}

/// One staged problem that could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFailure {
    pub letter: String,
    pub title: String,
    pub error: String,
}

/// Outcome of committing a staged problem batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCommitReport {
    #[serde(rename = "contestId")]
    pub contest_id: String,
    pub success_count: usize,
    pub fail_count: usize,
    /// Ids of the problems created, in batch order.
    pub created: Vec<String>,
    pub failures: Vec<CommitFailure>,
}

/// Outcome of committing the staged contest snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestCommitReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contest_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of the combined confirm; a half is `None` when nothing was staged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedCommitReport {
    pub contest: Option<ContestCommitReport>,
    pub problems: Option<BatchCommitReport>,
}

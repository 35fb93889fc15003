//! Contest records and per-letter statistics.

use super::deserialize_some;
use super::validation::validate_not_blank;
use crate::constants::{CONTEST_LETTERS, MAX_CONTEST_PROBLEMS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

/// The team's own result on one contest problem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    Ac,
    Attempted,
    #[default]
    Unsubmitted,
}

impl ContestStatus {
    /// Canonical wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ac => "ac",
            Self::Attempted => "attempted",
            Self::Unsubmitted => "unsubmitted",
        }
    }

    /// Parse a wire label, ignoring case and surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "ac" => Some(Self::Ac),
            "attempted" => Some(Self::Attempted),
            "unsubmitted" => Some(Self::Unsubmitted),
            _ => None,
        }
    }
}

/// Letter for the problem at `index` (0 → `A`).
///
/// # Returns
/// `None` when `index` is past the last letter.
pub fn letter_at_index(index: usize) -> Option<char> {
    CONTEST_LETTERS.chars().nth(index)
}

/// Clamp a requested problem count into `1..=26`.
pub fn clamp_total_problems(total: i64) -> usize {
    total.clamp(1, MAX_CONTEST_PROBLEMS as i64) as usize
}

/// Per-letter statistics inside a contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestProblem {
    pub letter: String,
    #[serde(default)]
    pub pass_count: u32,
    #[serde(default)]
    pub attempt_count: u32,
    #[serde(default)]
    pub my_status: ContestStatus,
}

impl ContestProblem {
    /// Default row for position `index`.
    pub fn placeholder(index: usize) -> Self {
        Self {
            letter: letter_at_index(index).map(String::from).unwrap_or_default(),
            pass_count: 0,
            attempt_count: 0,
            my_status: ContestStatus::Unsubmitted,
        }
    }
}

/// Persisted contest record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    pub id: String,
    pub name: String,
    pub total_problems: usize,
    pub problems: Vec<ContestProblem>,
    #[serde(default)]
    pub rank_str: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contest {
    /// Number of problems the team accepted.
    pub fn solved_count(&self) -> usize {
        self.problems
            .iter()
            .filter(|problem| problem.my_status == ContestStatus::Ac)
            .count()
    }

    /// Statistics row for `letter`, matched case-insensitively.
    pub fn problem_by_letter(&self, letter: &str) -> Option<&ContestProblem> {
        let letter = letter.trim();
        self.problems
            .iter()
            .find(|problem| problem.letter.eq_ignore_ascii_case(letter))
    }
}

/// Loose per-letter input; the letter is accepted but positions decide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestProblemInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_status: Option<ContestStatus>,
}

impl From<&ContestProblem> for ContestProblemInput {
    fn from(value: &ContestProblem) -> Self {
        Self {
            letter: Some(value.letter.clone()),
            pass_count: Some(value.pass_count),
            attempt_count: Some(value.attempt_count),
            my_status: Some(value.my_status),
        }
    }
}

/// Request payload for creating a contest.
///
/// A missing `total_problems` falls back to the number of supplied rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateContestRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,
    #[serde(default)]
    pub total_problems: Option<i64>,
    #[serde(default)]
    pub problems: Vec<ContestProblemInput>,
    #[serde(default)]
    pub rank_str: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Partial update payload for a contest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateContestRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_problems: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problems: Option<Vec<ContestProblemInput>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub rank_str: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub summary: Option<Option<String>>,
}

impl Validate for UpdateContestRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(Err(err)) = self.name.as_deref().map(validate_not_blank) {
            errors.add("name".into(), err);
        }
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

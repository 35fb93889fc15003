//! Problem records, the unsolved-stage enumeration, and request payloads.

use super::deserialize_some;
use super::validation::{validate_link, validate_not_blank};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

/// How far a team got on a problem it has not solved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnsolvedStage {
    #[serde(rename = "not viewed")]
    NotViewed,
    #[serde(rename = "viewed no idea")]
    ViewedNoIdea,
    #[serde(rename = "approach known not implemented")]
    ApproachKnown,
}

impl UnsolvedStage {
    /// Every stage, in the order a problem normally moves through them.
    pub const ALL: [UnsolvedStage; 3] = [
        UnsolvedStage::NotViewed,
        UnsolvedStage::ViewedNoIdea,
        UnsolvedStage::ApproachKnown,
    ];

    /// Canonical wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotViewed => "not viewed",
            Self::ViewedNoIdea => "viewed no idea",
            Self::ApproachKnown => "approach known not implemented",
        }
    }

    /// Parse an exact canonical label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.as_str() == label)
    }

    /// Map a stage label written by earlier tracker releases.
    pub fn from_legacy_label(label: &str) -> Option<Self> {
        match label.trim() {
            "未看题" => Some(Self::NotViewed),
            "已看题无思路" => Some(Self::ViewedNoIdea),
            "知道做法未实现" => Some(Self::ApproachKnown),
            _ => None,
        }
    }
}

/// Persisted problem record.
///
/// The derived `has_solution` flag is never stored; see [`ProblemEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub solved: bool,
    #[serde(default)]
    pub unsolved_stage: Option<UnsolvedStage>,
    #[serde(default)]
    pub unsolved_custom_label: Option<String>,
    #[serde(default)]
    pub pass_count: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Problem as returned by the API, with the solution flag computed at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemEntry {
    #[serde(flatten)]
    pub problem: Problem,
    pub has_solution: bool,
}

/// Request payload for creating a problem.
///
/// `unsolved_stage` stays a free string so unknown labels are coerced to
/// `null` by the normalizer instead of failing the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateProblemRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub title: String,
    #[validate(custom(function = "validate_link"))]
    pub link: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub assignee: Option<String>,
    #[serde(default)]
    pub solved: bool,
    pub unsolved_stage: Option<String>,
    pub unsolved_custom_label: Option<String>,
    pub pass_count: Option<u32>,
    pub notes: Option<String>,
}

/// Partial update payload for a problem.
///
/// Absent fields keep their stored value; explicit `null` clears optional
/// fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProblemRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub link: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub assignee: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solved: Option<bool>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub unsolved_stage: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub unsolved_custom_label: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub pass_count: Option<Option<u32>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<Option<String>>,
}

impl Validate for UpdateProblemRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(Err(err)) = self.title.as_deref().map(validate_not_blank) {
            errors.add("title".into(), err);
        }
        let link = self.link.as_ref().and_then(|link| link.as_deref());
        if let Some(Err(err)) = link.map(validate_link) {
            errors.add("link".into(), err);
        }
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl UpdateProblemRequest {
    /// Whether the payload carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.link.is_none()
            && self.source.is_none()
            && self.tags.is_none()
            && self.assignee.is_none()
            && self.solved.is_none()
            && self.unsolved_stage.is_none()
            && self.unsolved_custom_label.is_none()
            && self.pass_count.is_none()
            && self.notes.is_none()
    }
}

/// Which problems a listing keeps, by solved state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Solved,
    Unsolved,
}

impl StatusFilter {
    /// Whether `problem` passes this filter.
    pub fn matches(self, problem: &Problem) -> bool {
        match self {
            Self::All => true,
            Self::Solved => problem.solved,
            Self::Unsolved => !problem.solved,
        }
    }
}

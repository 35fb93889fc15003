//! Status and calendar-day filters for collection listings.

use crate::models::contest::Contest;
use crate::models::problem::{Problem, StatusFilter};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive calendar-day range over `created_at`.
///
/// Both bounds are whole UTC days: `to = 2024-01-31` keeps everything up to
/// `2024-01-31T23:59:59.999`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Whether neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Whether `timestamp` falls on a day inside the range.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let day = timestamp.date_naive();
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }
}

/// Listing filter for problems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemFilter {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(flatten)]
    pub range: DateRange,
}

impl ProblemFilter {
    pub fn matches(&self, problem: &Problem) -> bool {
        self.status.matches(problem) && self.range.contains(problem.created_at)
    }
}

/// Listing filter for contests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestFilter {
    #[serde(flatten)]
    pub range: DateRange,
}

impl ContestFilter {
    pub fn matches(&self, contest: &Contest) -> bool {
        self.range.contains(contest.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn end_bound_covers_the_whole_day() {
        let range = DateRange::new(None, Some(day(2024, 1, 31)));
        assert!(range.contains(at(2024, 1, 31, 23, 59, 0)));
        assert!(!range.contains(at(2024, 2, 1, 0, 0, 1)));
    }

    #[test]
    fn start_bound_is_inclusive_from_midnight() {
        let range = DateRange::new(Some(day(2024, 1, 10)), Some(day(2024, 1, 12)));
        assert!(!range.contains(at(2024, 1, 9, 23, 59, 59)));
        assert!(range.contains(at(2024, 1, 10, 0, 0, 0)));
        assert!(range.contains(at(2024, 1, 12, 12, 0, 0)));
    }

    #[test]
    fn unbounded_range_keeps_everything() {
        let range = DateRange::default();
        assert!(range.is_unbounded());
        assert!(range.contains(at(1999, 12, 31, 0, 0, 0)));
    }

    #[test]
    fn inverted_range_keeps_nothing() {
        let range = DateRange::new(Some(day(2024, 2, 1)), Some(day(2024, 1, 1)));
        assert!(!range.contains(at(2024, 1, 15, 0, 0, 0)));
    }

    #[test]
    fn problem_filter_deserializes_from_flat_query_shape() {
        let filter: ProblemFilter = serde_json::from_value(serde_json::json!({
            "status": "unsolved",
            "to": "2024-01-31"
        }))
        .expect("filter");
        assert_eq!(filter.status, StatusFilter::Unsolved);
        assert_eq!(filter.range.to, Some(day(2024, 1, 31)));
        assert_eq!(filter.range.from, None);
    }
}

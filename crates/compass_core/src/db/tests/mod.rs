//! Storage integration tests.

use super::*;
use crate::filter::{ContestFilter, DateRange, ProblemFilter};
use crate::models::contest::*;
use crate::models::problem::*;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

fn setup_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path().join("data")).unwrap();
    (db, temp_dir)
}

fn problem_request(title: &str) -> CreateProblemRequest {
    CreateProblemRequest {
        title: title.to_string(),
        ..Default::default()
    }
}

mod recovery;

//! Backing stores for staged import state.

use crate::models::import::{PendingContest, PendingImport, ProblemBatch};
use std::sync::{Mutex, PoisonError};

/// Where staged scrapes live between submission and confirm.
///
/// Implementations only hold state; sequencing of read-modify-write spans is
/// done by [`super::ImportStaging`].
pub trait StagingStore: Send + Sync {
    fn contest(&self) -> Option<PendingContest>;

    fn set_contest(&self, contest: Option<PendingContest>);

    fn problems(&self) -> Option<ProblemBatch>;

    fn set_problems(&self, batch: Option<ProblemBatch>);

    /// Both halves at once.
    fn snapshot(&self) -> PendingImport {
        PendingImport {
            contest: self.contest(),
            problems: self.problems(),
        }
    }
}

/// Process-lifetime staging store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStagingStore {
    state: Mutex<PendingImport>,
}

impl MemoryStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PendingImport) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

impl StagingStore for MemoryStagingStore {
    fn contest(&self) -> Option<PendingContest> {
        self.with_state(|state| state.contest.clone())
    }

    fn set_contest(&self, contest: Option<PendingContest>) {
        self.with_state(|state| state.contest = contest);
    }

    fn problems(&self) -> Option<ProblemBatch> {
        self.with_state(|state| state.problems.clone())
    }

    fn set_problems(&self, batch: Option<ProblemBatch>) {
        self.with_state(|state| state.problems = batch);
    }

    fn snapshot(&self) -> PendingImport {
        self.with_state(|state| state.clone())
    }
}

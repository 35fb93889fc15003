//! Two-phase import staging for scraped contest data.
//!
//! A dashboard scrape stages a problem batch keyed by the external contest
//! id. A standings scrape for the same id then merges pass/attempt counts
//! into it, and confirm hands every staged problem to an [`ImportSink`].
//! Independently, a whole-contest snapshot can be staged and confirmed, or
//! both halves can be committed together, in which case the snapshot's
//! per-letter results backfill the staged problems.
//!
//! Staged state is held by a [`StagingStore`]. Between two tabs scraping
//! different contests the last submission wins.

mod intake;
mod store;

#[cfg(test)]
mod tests;

pub use store::{MemoryStagingStore, StagingStore};

use crate::error::AppError;
use crate::models::contest::{Contest, CreateContestRequest};
use crate::models::import::{
    BatchCommitReport, CombinedCommitReport, CommitFailure, ContestCommitReport,
    ContestSnapshotSubmission, PendingContest, PendingImport, ProblemBatch,
    ProblemBatchSubmission, StandingsSubmission,
};
use crate::models::problem::{CreateProblemRequest, Problem};
use intake::canonical_letter;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Where confirmed imports are committed.
pub trait ImportSink {
    fn create_problem(&self, request: &CreateProblemRequest) -> Result<Problem, AppError>;

    fn create_contest(&self, request: &CreateContestRequest) -> Result<Contest, AppError>;
}

/// The staging area: a [`StagingStore`] plus the operations over it.
pub struct ImportStaging {
    store: Box<dyn StagingStore>,
    op_lock: Mutex<()>,
}

impl Default for ImportStaging {
    fn default() -> Self {
        Self::new(MemoryStagingStore::new())
    }
}

impl std::fmt::Debug for ImportStaging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportStaging")
            .field("pending", &self.store.snapshot())
            .finish()
    }
}

impl ImportStaging {
    pub fn new(store: impl StagingStore + 'static) -> Self {
        Self::with_store(Box::new(store))
    }

    pub fn with_store(store: Box<dyn StagingStore>) -> Self {
        Self {
            store,
            op_lock: Mutex::new(()),
        }
    }

    fn serialize_ops(&self) -> MutexGuard<'_, ()> {
        self.op_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Everything currently staged. Reading never consumes.
    pub fn pending(&self) -> PendingImport {
        self.store.snapshot()
    }

    /// Stage a whole-contest snapshot, replacing any earlier one.
    ///
    /// # Errors
    /// Returns [`AppError::Validation`] and leaves staged state untouched
    /// when the payload is invalid.
    pub fn submit_contest(
        &self,
        submission: &ContestSnapshotSubmission,
    ) -> Result<PendingContest, AppError> {
        let pending = intake::pending_contest(submission)?;
        let _ops = self.serialize_ops();
        self.store.set_contest(Some(pending.clone()));
        tracing::info!(
            "Staged contest snapshot '{}' ({} problems)",
            pending.name,
            pending.total_problems
        );
        Ok(pending)
    }

    pub fn contest(&self) -> Option<PendingContest> {
        self.store.contest()
    }

    /// Discard the staged contest snapshot.
    ///
    /// # Returns
    /// `true` when something was staged.
    pub fn clear_contest(&self) -> bool {
        let _ops = self.serialize_ops();
        let had = self.store.contest().is_some();
        self.store.set_contest(None);
        had
    }

    /// Stage a dashboard problem batch, replacing any earlier batch.
    ///
    /// # Errors
    /// Returns [`AppError::Validation`] and leaves staged state untouched
    /// when the payload is invalid.
    pub fn submit_problems(
        &self,
        submission: &ProblemBatchSubmission,
    ) -> Result<ProblemBatch, AppError> {
        let batch = intake::problem_batch(submission)?;
        let _ops = self.serialize_ops();
        if let Some(previous) = self.store.problems() {
            if previous.contest_id != batch.contest_id {
                tracing::info!(
                    "Replacing staged batch for contest {} with contest {}",
                    previous.contest_id,
                    batch.contest_id
                );
            }
        }
        self.store.set_problems(Some(batch.clone()));
        tracing::info!(
            "Staged {} problem(s) for contest {}",
            batch.problems.len(),
            batch.contest_id
        );
        Ok(batch)
    }

    pub fn problems(&self) -> Option<ProblemBatch> {
        self.store.problems()
    }

    /// Discard the staged problem batch.
    ///
    /// # Returns
    /// `true` when something was staged.
    pub fn clear_problems(&self) -> bool {
        let _ops = self.serialize_ops();
        let had = self.store.problems().is_some();
        self.store.set_problems(None);
        had
    }

    /// Merge standings statistics into the staged batch.
    ///
    /// Letters are matched case-insensitively; stats for letters the batch
    /// does not have are ignored. A present `pass_count`/`attempt_count`
    /// overwrites the staged value; an absent one leaves it.
    ///
    /// # Errors
    /// - [`AppError::NothingStaged`] when no batch is staged.
    /// - [`AppError::ImportMismatch`] when the batch belongs to another contest.
    ///
    /// Neither error alters the staged batch.
    pub fn merge_stats(&self, submission: &StandingsSubmission) -> Result<ProblemBatch, AppError> {
        use validator::Validate;
        submission.validate()?;

        let _ops = self.serialize_ops();
        let Some(mut batch) = self.store.problems() else {
            return Err(AppError::NothingStaged("no problem batch is staged"));
        };
        let submitted = submission.contest_id.trim();
        if batch.contest_id != submitted {
            return Err(AppError::ImportMismatch {
                staged: batch.contest_id,
                submitted: submitted.to_string(),
            });
        }

        let stats: BTreeMap<String, _> = submission
            .stats
            .iter()
            .map(|(letter, stats)| (canonical_letter(letter), *stats))
            .collect();
        let mut matched = 0usize;
        for problem in &mut batch.problems {
            let Some(stats) = stats.get(&problem.letter) else {
                continue;
            };
            if let Some(pass_count) = stats.pass_count {
                problem.pass_count = Some(pass_count);
            }
            if let Some(attempt_count) = stats.attempt_count {
                problem.attempt_count = Some(attempt_count);
            }
            matched += 1;
        }
        if matched < stats.len() {
            tracing::debug!(
                "Ignored {} standings letter(s) with no staged problem",
                stats.len() - matched
            );
        }

        batch.stats_merged = true;
        self.store.set_problems(Some(batch.clone()));
        tracing::info!(
            "Merged standings into contest {} ({} of {} letters matched)",
            batch.contest_id,
            matched,
            batch.problems.len()
        );
        Ok(batch)
    }

    /// Commit the staged contest snapshot; it is cleared only on success.
    ///
    /// # Errors
    /// [`AppError::NothingStaged`] when no snapshot is staged, or the sink's
    /// error when the create fails.
    pub fn confirm_contest(&self, sink: &dyn ImportSink) -> Result<Contest, AppError> {
        let _ops = self.serialize_ops();
        let Some(pending) = self.store.contest() else {
            return Err(AppError::NothingStaged("no contest snapshot is staged"));
        };
        self.commit_contest(sink, &pending)
    }

    /// Commit every staged problem, then clear the batch.
    ///
    /// Problems are created one by one; failures are counted, not retried.
    ///
    /// # Errors
    /// [`AppError::NothingStaged`] when no batch is staged.
    pub fn confirm_problems(&self, sink: &dyn ImportSink) -> Result<BatchCommitReport, AppError> {
        let _ops = self.serialize_ops();
        let Some(batch) = self.store.problems() else {
            return Err(AppError::NothingStaged("no problem batch is staged"));
        };
        Ok(self.commit_batch(sink, batch, None))
    }

    /// Commit the staged contest snapshot, then the staged problem batch.
    ///
    /// The snapshot's per-letter results backfill matching staged problems.
    /// Each half clears its own state on its own success and a failure in
    /// one half does not stop the other.
    ///
    /// # Errors
    /// [`AppError::NothingStaged`] when neither half is staged.
    pub fn confirm_all(&self, sink: &dyn ImportSink) -> Result<CombinedCommitReport, AppError> {
        let _ops = self.serialize_ops();
        let pending = self.store.snapshot();
        if pending.contest.is_none() && pending.problems.is_none() {
            return Err(AppError::NothingStaged("nothing is staged"));
        }

        let contest = pending.contest.as_ref().map(|snapshot| {
            match self.commit_contest(sink, snapshot) {
                Ok(created) => ContestCommitReport {
                    success: true,
                    contest_id: Some(created.id),
                    error: None,
                },
                Err(err) => ContestCommitReport {
                    success: false,
                    contest_id: None,
                    error: Some(err.to_string()),
                },
            }
        });
        let problems = pending
            .problems
            .map(|batch| self.commit_batch(sink, batch, pending.contest.as_ref()));

        Ok(CombinedCommitReport { contest, problems })
    }

    fn commit_contest(
        &self,
        sink: &dyn ImportSink,
        pending: &PendingContest,
    ) -> Result<Contest, AppError> {
        match sink.create_contest(&pending.to_create_request()) {
            Ok(contest) => {
                self.store.set_contest(None);
                tracing::info!("Committed staged contest '{}' as {}", contest.name, contest.id);
                Ok(contest)
            }
            Err(err) => {
                tracing::warn!("Staged contest '{}' was not committed: {}", pending.name, err);
                Err(err)
            }
        }
    }

    fn commit_batch(
        &self,
        sink: &dyn ImportSink,
        batch: ProblemBatch,
        backfill: Option<&PendingContest>,
    ) -> BatchCommitReport {
        let mut report = BatchCommitReport {
            contest_id: batch.contest_id.clone(),
            ..Default::default()
        };

        for mut problem in batch.problems {
            if let Some(status) = backfill.and_then(|contest| contest.status_for(&problem.letter)) {
                problem.apply_contest_status(status);
            }
            match sink.create_problem(&problem.to_create_request()) {
                Ok(created) => {
                    report.success_count += 1;
                    report.created.push(created.id);
                }
                Err(err) => {
                    tracing::warn!(
                        "Staged problem {} '{}' was not committed: {}",
                        problem.letter,
                        problem.title,
                        err
                    );
                    report.fail_count += 1;
                    report.failures.push(CommitFailure {
                        letter: problem.letter,
                        title: problem.title,
                        error: err.to_string(),
                    });
                }
            }
        }

        self.store.set_problems(None);
        tracing::info!(
            "Committed staged batch for contest {}: {} created, {} failed",
            report.contest_id,
            report.success_count,
            report.fail_count
        );
        report
    }
}

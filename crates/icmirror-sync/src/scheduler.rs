//! Draining-barrier batch scheduling
//!
//! Tasks are admitted in batches of at most `jobs_batch`; a new batch
//! starts only after every task of the previous one has finished
//! (success or exhausted retries). This is deliberately coarser than a
//! sliding window; it keeps run ordering easy to reason about.
//!
//! Failure isolation: a task that fails is logged and counted; its
//! siblings and the remaining batches proceed unaffected.

use std::path::PathBuf;

use icmirror_core::SyncError;
use tokio::task::JoinSet;
use tracing::error;

use crate::engine::{SyncTask, TaskOutcome};

type TaskResult = (PathBuf, Result<TaskOutcome, SyncError>);

/// Per-decision counters for one run
///
/// Derived from task outcomes for the caller's convenience; the log
/// stream remains the only operator-facing report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Files sent that had no remote counterpart
    pub uploaded: u64,
    /// Stale remote files replaced
    pub overwritten: u64,
    /// Files already current remotely
    pub skipped: u64,
    /// Directories resolved or created
    pub directories: u64,
    /// Tasks that failed after exhausting their retries
    pub failed: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Uploaded => self.uploaded += 1,
            TaskOutcome::Overwritten => self.overwritten += 1,
            TaskOutcome::Skipped => self.skipped += 1,
            TaskOutcome::DirectoryEnsured => self.directories += 1,
        }
    }
}

/// Runs every task, at most `jobs_batch` in flight, draining each
/// batch completely before admitting the next
pub async fn run_batches(tasks: Vec<SyncTask>, jobs_batch: usize) -> RunSummary {
    let jobs_batch = jobs_batch.max(1);
    let mut summary = RunSummary::default();
    let mut batch = JoinSet::new();

    for task in tasks {
        let label = task.label();
        batch.spawn(async move { (label, task.run().await) });

        if batch.len() >= jobs_batch {
            drain(&mut batch, &mut summary).await;
        }
    }
    drain(&mut batch, &mut summary).await;

    summary
}

/// Waits for every task in the batch, recording outcomes and isolating
/// failures
async fn drain(batch: &mut JoinSet<TaskResult>, summary: &mut RunSummary) {
    while let Some(joined) = batch.join_next().await {
        match joined {
            Ok((_, Ok(outcome))) => summary.record(outcome),
            Ok((label, Err(err))) => {
                error!(path = %label.display(), error = %err, "sync task failed");
                summary.failed += 1;
            }
            Err(join_err) => {
                error!(error = %join_err, "sync task panicked");
                summary.failed += 1;
            }
        }
    }
}

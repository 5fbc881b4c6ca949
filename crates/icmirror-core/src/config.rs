//! Sync engine configuration
//!
//! [`SyncOptions`] carries the knobs the engine honors. Defaults: five
//! jobs per batch, one-second creation polling, and no ceilings (both
//! the visibility poll and the per-task retry loop run until they
//! succeed). Ceilings are opt-in;
//! when set, exhaustion surfaces as a distinguishable give-up error
//! instead of hanging forever.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How many sync tasks run concurrently in one draining batch
pub const DEFAULT_JOBS_BATCH: usize = 5;

/// How long the resolver sleeps between visibility polls after a
/// directory creation
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long the retry wrapper sleeps before re-running a task that
/// failed with a transient remote error
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(3);

/// Base names never mirrored (filesystem metadata sentinels)
pub const DEFAULT_IGNORED_NAMES: &[&str] = &[".DS_Store"];

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Maximum number of concurrently running sync tasks; a new batch
    /// is admitted only after the previous one fully drains
    pub jobs_batch: usize,

    /// Sleep between visibility polls while waiting for a just-created
    /// directory to appear
    pub poll_interval: Duration,

    /// Sleep before re-running a task after a transient remote error
    pub retry_backoff: Duration,

    /// Ceiling on visibility polls per created directory; `None` polls
    /// until the node appears
    pub max_poll_attempts: Option<u64>,

    /// Ceiling on task re-runs after transient errors; `None` retries
    /// until the task succeeds or fails fatally
    pub max_task_retries: Option<u64>,

    /// Base names excluded from enumeration
    pub ignored_names: Vec<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            jobs_batch: DEFAULT_JOBS_BATCH,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            max_poll_attempts: None,
            max_task_retries: None,
            ignored_names: DEFAULT_IGNORED_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl SyncOptions {
    /// Returns options with the batch size replaced
    ///
    /// A zero batch size would never admit any task, so it is clamped
    /// to one.
    pub fn with_jobs_batch(mut self, jobs: usize) -> Self {
        self.jobs_batch = jobs.max(1);
        self
    }

    /// True when `name` must not be mirrored
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored_names.iter().any(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unbounded_and_batch_five() {
        let opts = SyncOptions::default();
        assert_eq!(opts.jobs_batch, 5);
        assert_eq!(opts.poll_interval, Duration::from_secs(1));
        assert!(opts.max_poll_attempts.is_none());
        assert!(opts.max_task_retries.is_none());
        assert!(opts.is_ignored(".DS_Store"));
        assert!(!opts.is_ignored("notes.txt"));
    }

    #[test]
    fn jobs_batch_is_clamped_to_one() {
        let opts = SyncOptions::default().with_jobs_batch(0);
        assert_eq!(opts.jobs_batch, 1);
    }

    #[test]
    fn serde_roundtrip_with_partial_input() {
        // Unknown-field-free partial input fills the rest from defaults.
        let opts: SyncOptions = serde_json::from_str(r#"{"jobs_batch": 8}"#).unwrap();
        assert_eq!(opts.jobs_batch, 8);
        assert_eq!(opts.poll_interval, DEFAULT_POLL_INTERVAL);
    }
}

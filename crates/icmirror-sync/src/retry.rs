//! Task-level retry wrapper
//!
//! Wraps one task's execution and re-runs the whole task - not merely
//! the failing call - whenever it fails with a transient remote error.
//! Every step of a task is an idempotent re-derivation, so restarting
//! from the top is always safe. Non-transient errors propagate
//! immediately.
//!
//! By default retries never stop; the remote service makes no promise
//! about how long a transient condition lasts. A configured
//! `max_task_retries` turns exhaustion into [`SyncError::GaveUp`].

use std::future::Future;

use icmirror_core::{SyncError, SyncOptions};
use tracing::warn;

/// Runs `task` until it succeeds or fails non-transiently
///
/// `label` identifies the task in retry logs. `max_task_retries`
/// bounds the number of *re-runs* after the first attempt; `None`
/// retries indefinitely.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    options: &SyncOptions,
    mut task: F,
) -> Result<T, SyncError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    let mut failures: u64 = 0;

    loop {
        match task().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                failures += 1;
                warn!(
                    task = %label,
                    attempt = failures,
                    error = %err,
                    "transient remote error, re-running task"
                );

                if let Some(max) = options.max_task_retries {
                    if failures > max {
                        return Err(SyncError::GaveUp {
                            attempts: failures,
                            reason: format!("syncing {label}"),
                        });
                    }
                }

                tokio::time::sleep(options.retry_backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}

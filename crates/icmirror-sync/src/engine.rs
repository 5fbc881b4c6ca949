//! The per-entry sync task and the engine entry point
//!
//! A [`SyncTask`] carries everything one local entry needs to reach the
//! remote tree: plan the destination, resolve (creating) the remote
//! directory, decide upload/overwrite/skip, and act. Tasks are fully
//! independent except for the remote directories they may race to
//! create; that race is absorbed by the resolver.
//!
//! [`Mirror`] is the run-level facade: enumerate once, hand every entry
//! to the scheduler as a task, report the summary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use icmirror_core::{
    decide, LocalEntry, LocalTree, RemoteNodeRef, SyncDecision, SyncError, SyncOptions,
};
use tracing::{debug, info, warn};

use crate::{planner, resolver, retry, scheduler, scheduler::RunSummary};

/// What one task did with its entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// File had no remote counterpart and was sent
    Uploaded,
    /// Stale remote counterpart was deleted and the file re-sent
    Overwritten,
    /// Remote counterpart was current; nothing sent
    Skipped,
    /// Entry is a directory; its remote path now exists
    DirectoryEnsured,
}

/// The engine: mirrors a local tree into a remote tree, one way
pub struct Mirror {
    remote_root: RemoteNodeRef,
    local: Arc<dyn LocalTree>,
    options: Arc<SyncOptions>,
}

impl Mirror {
    /// Creates an engine over an authenticated remote root
    pub fn new(remote_root: RemoteNodeRef, local: Arc<dyn LocalTree>, options: SyncOptions) -> Self {
        Self {
            remote_root,
            local,
            options: Arc::new(options),
        }
    }

    /// Mirrors everything under `source_root` into `dest_root`
    ///
    /// Enumerates the source tree once, then dispatches one task per
    /// entry in draining batches of at most `jobs_batch`. Individual
    /// task failures are logged and isolated; only enumeration failure
    /// aborts the run.
    pub async fn run(&self, source_root: &Path, dest_root: &str) -> anyhow::Result<RunSummary> {
        info!(
            source = %source_root.display(),
            dest = %dest_root,
            "mirroring local tree into remote destination"
        );

        let entries = self
            .local
            .enumerate(source_root, &self.options.ignored_names)
            .await
            .context("failed to enumerate source tree")?;
        info!(count = entries.len(), "found source entries");

        let source_root: Arc<Path> = Arc::from(source_root);
        let dest_root: Arc<str> = Arc::from(dest_root);

        let tasks: Vec<SyncTask> = entries
            .into_iter()
            .map(|entry| SyncTask {
                entry,
                remote_root: self.remote_root.clone(),
                local: self.local.clone(),
                source_root: source_root.clone(),
                dest_root: dest_root.clone(),
                options: self.options.clone(),
            })
            .collect();

        let summary = scheduler::run_batches(tasks, self.options.jobs_batch).await;
        info!(
            uploaded = summary.uploaded,
            overwritten = summary.overwritten,
            skipped = summary.skipped,
            directories = summary.directories,
            failed = summary.failed,
            "run complete"
        );
        Ok(summary)
    }
}

/// One unit of work: a local entry plus the shared roots
pub struct SyncTask {
    entry: LocalEntry,
    remote_root: RemoteNodeRef,
    local: Arc<dyn LocalTree>,
    source_root: Arc<Path>,
    dest_root: Arc<str>,
    options: Arc<SyncOptions>,
}

impl SyncTask {
    /// The entry this task mirrors
    pub fn entry(&self) -> &LocalEntry {
        &self.entry
    }

    /// Runs the task to completion under the retry wrapper
    ///
    /// A transient remote error anywhere in the task restarts it from
    /// the planning step; the whole derivation is idempotent.
    pub async fn run(self) -> Result<TaskOutcome, SyncError> {
        let label = self.entry.relative().display().to_string();
        retry::with_retry(&label, &self.options, || self.execute_once()).await
    }

    /// One full pass: plan, resolve, decide, act
    async fn execute_once(&self) -> Result<TaskOutcome, SyncError> {
        let plan = planner::plan(&self.source_root, &self.dest_root, &self.entry)?;
        debug!(
            entry = %self.entry.relative().display(),
            components = ?plan.dir_components,
            "resolving destination directory"
        );

        let dir =
            resolver::resolve(self.remote_root.clone(), &plan.dir_components, &self.options)
                .await?;

        if self.entry.is_dir() {
            info!(path = %self.entry.relative().display(), "directory ensured");
            return Ok(TaskOutcome::DirectoryEnsured);
        }

        match dir.child(&plan.file_name).await? {
            None => {
                info!(path = %self.entry.relative().display(), "uploading");
                let data = self.read_local().await?;
                dir.upload(&plan.file_name, data).await?;
                Ok(TaskOutcome::Uploaded)
            }
            Some(node) if node.is_dir() => {
                // A remote directory shadowing a local file is a
                // conflict this tool does not resolve.
                warn!(
                    path = %self.entry.relative().display(),
                    "remote directory shadows local file, keeping remote"
                );
                Ok(TaskOutcome::Skipped)
            }
            Some(node) => match decide(&self.entry, Some(&node.file_meta())) {
                SyncDecision::Skip => {
                    info!(path = %self.entry.relative().display(), "keeping");
                    Ok(TaskOutcome::Skipped)
                }
                SyncDecision::Upload | SyncDecision::Overwrite => {
                    info!(path = %self.entry.relative().display(), "overwriting");
                    // Delete-then-upload; there is no atomic replace.
                    // A failure in between leaves the file absent until
                    // the retry wrapper re-runs the task, which then
                    // takes the plain upload path.
                    node.delete().await?;
                    let data = self.read_local().await?;
                    dir.upload(&plan.file_name, data).await?;
                    Ok(TaskOutcome::Overwritten)
                }
            },
        }
    }

    async fn read_local(&self) -> Result<Vec<u8>, SyncError> {
        self.local
            .read_file(&self.entry)
            .await
            .map_err(SyncError::Local)
    }

    /// Relative path used for log labels
    pub(crate) fn label(&self) -> PathBuf {
        self.entry.relative().to_path_buf()
    }
}

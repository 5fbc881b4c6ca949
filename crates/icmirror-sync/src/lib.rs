//! Concurrent tree-sync engine for icmirror
//!
//! Maps a local filesystem tree onto a lazily-materialized remote tree:
//! plans destination paths, resolves (and creates) remote directories
//! under concurrent workers, decides upload-vs-skip-vs-overwrite per
//! file, and retries tasks on transient remote errors.
//!
//! ## Module layout
//!
//! - [`planner`] - pure destination-path arithmetic
//! - [`resolver`] - walk/create remote directories, poll until visible
//! - [`engine`] - the per-entry task: plan, resolve, decide, act
//! - [`retry`] - re-runs a whole task on transient remote errors
//! - [`scheduler`] - draining-barrier batches of concurrent tasks
//! - [`walker`] - local tree enumeration ([`LocalTree`] adapter)
//!
//! [`LocalTree`]: icmirror_core::LocalTree

pub mod engine;
pub mod planner;
pub mod resolver;
pub mod retry;
pub mod scheduler;
pub mod walker;

pub use engine::{Mirror, TaskOutcome};
pub use planner::{plan, DestinationPlan};
pub use scheduler::RunSummary;
pub use walker::FsTreeWalker;

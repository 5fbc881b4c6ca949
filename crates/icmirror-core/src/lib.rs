//! Core domain logic for icmirror
//!
//! This crate contains the pure domain model of the one-way mirror:
//! local tree entries, the upload/overwrite/skip decision, the error
//! taxonomy, and the port traits that the drive adapter and the sync
//! engine plug into. It performs no I/O itself.

pub mod config;
pub mod domain;
pub mod ports;

pub use config::SyncOptions;
pub use domain::{
    decide, EntryKind, LocalEntry, PlanError, RemoteError, RemoteFileMeta, SyncDecision, SyncError,
};
pub use ports::{LocalTree, RemoteNode, RemoteNodeRef};

//! Domain model for the one-way mirror
//!
//! Pure types and decisions; no I/O. The sync engine and the drive
//! adapter both depend on this module, never the other way around.

pub mod decision;
pub mod entry;
pub mod errors;

pub use decision::{decide, RemoteFileMeta, SyncDecision};
pub use entry::{EntryKind, LocalEntry};
pub use errors::{PlanError, RemoteError, SyncError};

//! The upload / overwrite / skip decision
//!
//! Compares a local file snapshot against what the remote tree reports
//! for the same name. Size wins over mtime: a size mismatch always
//! overwrites, regardless of which side looks newer. Equal sizes only
//! overwrite when the local copy is strictly newer.

use chrono::{DateTime, Utc};

use super::entry::LocalEntry;

/// What to do with one local file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// No remote counterpart; send the file
    Upload,
    /// Remote counterpart is stale; delete it, then send the file
    Overwrite,
    /// Remote counterpart is current; do nothing
    Skip,
}

/// Metadata observed on a remote file node
///
/// Fields are optional because a listing may omit them; an unknown
/// size is treated as stale (overwrite), an unknown mtime as current
/// (skip) when sizes already match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteFileMeta {
    /// Size in bytes, if the listing reported one
    pub size: Option<u64>,
    /// Last-modified timestamp, if the listing reported one
    pub modified: Option<DateTime<Utc>>,
}

/// Decides the action for one local file given the remote observation
///
/// `remote` is `None` when no node of that name exists in the remote
/// directory. Directories never reach this function; they are only
/// resolved or created.
pub fn decide(local: &LocalEntry, remote: Option<&RemoteFileMeta>) -> SyncDecision {
    let Some(remote) = remote else {
        return SyncDecision::Upload;
    };

    if remote.size != Some(local.size()) {
        return SyncDecision::Overwrite;
    }

    match remote.modified {
        Some(remote_mtime) if local.modified() > remote_mtime => SyncDecision::Overwrite,
        _ => SyncDecision::Skip,
    }
}

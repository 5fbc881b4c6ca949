//! Local tree entries
//!
//! A [`LocalEntry`] is an immutable snapshot of one path under the
//! source root, taken once at enumeration time and never revalidated.
//! If the file changes on disk mid-run, the mirror acts on the snapshot.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a local entry is a file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file; carries size and mtime that matter for the decision
    File,
    /// Directory; only ever resolved/created remotely, never compared
    Directory,
}

/// Immutable snapshot of one local path discovered under the source root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEntry {
    /// Absolute path on disk
    path: PathBuf,
    /// Path relative to the source root
    relative: PathBuf,
    /// File or directory
    kind: EntryKind,
    /// Size in bytes (0 for directories)
    size: u64,
    /// Last-modified timestamp at enumeration time
    modified: DateTime<Utc>,
}

impl LocalEntry {
    /// Creates an entry snapshot
    pub fn new(
        path: PathBuf,
        relative: PathBuf,
        kind: EntryKind,
        size: u64,
        modified: DateTime<Utc>,
    ) -> Self {
        Self {
            path,
            relative,
            kind,
            size,
            modified,
        }
    }

    /// Absolute path on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to the source root
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// File or directory
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Size in bytes at enumeration time
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Last-modified timestamp at enumeration time
    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    /// True for regular files
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// True for directories
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Base name, if it is valid UTF-8
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

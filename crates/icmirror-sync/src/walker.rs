//! Local tree enumeration (secondary/driven adapter)
//!
//! Implements [`LocalTree`] using `tokio::fs`. The walk is read-only:
//! nothing under the source root is ever mutated. Entries are
//! snapshotted once; later on-disk changes are invisible to the run.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use icmirror_core::{EntryKind, LocalEntry, LocalTree};
use tracing::{debug, instrument};

/// Adapter that walks the real filesystem
#[derive(Debug, Clone, Default)]
pub struct FsTreeWalker;

impl FsTreeWalker {
    /// Create a new `FsTreeWalker`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl LocalTree for FsTreeWalker {
    #[instrument(skip(self, ignored), fields(root = %root.display()))]
    async fn enumerate(&self, root: &Path, ignored: &[String]) -> anyhow::Result<Vec<LocalEntry>> {
        let mut entries = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut listing = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("failed to read directory {}", dir.display()))?;

            while let Some(dirent) = listing
                .next_entry()
                .await
                .with_context(|| format!("failed to iterate directory {}", dir.display()))?
            {
                let path = dirent.path();
                let name = dirent.file_name();
                if name
                    .to_str()
                    .is_some_and(|n| ignored.iter().any(|i| i == n))
                {
                    debug!(path = %path.display(), "skipping ignored name");
                    continue;
                }

                let metadata = dirent
                    .metadata()
                    .await
                    .with_context(|| format!("failed to stat {}", path.display()))?;

                let relative = path
                    .strip_prefix(root)
                    .with_context(|| format!("entry escaped the root: {}", path.display()))?
                    .to_path_buf();

                let modified: DateTime<Utc> = metadata
                    .modified()
                    .with_context(|| format!("no mtime for {}", path.display()))?
                    .into();

                let (kind, size) = if metadata.is_dir() {
                    (EntryKind::Directory, 0)
                } else {
                    (EntryKind::File, metadata.len())
                };

                if metadata.is_dir() {
                    pending.push(path.clone());
                }

                entries.push(LocalEntry::new(path, relative, kind, size, modified));
            }
        }

        // Stable order so runs (and tests) are deterministic.
        entries.sort_by(|a, b| a.relative().cmp(b.relative()));

        debug!(count = entries.len(), "enumeration complete");
        Ok(entries)
    }

    #[instrument(skip(self, entry), fields(path = %entry.path().display()))]
    async fn read_file(&self, entry: &LocalEntry) -> anyhow::Result<Vec<u8>> {
        tokio::fs::read(entry.path())
            .await
            .with_context(|| format!("failed to read {}", entry.path().display()))
    }
}

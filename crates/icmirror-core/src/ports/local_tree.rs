//! Local filesystem port (driven/secondary port)
//!
//! Uses `anyhow::Result` because errors at this boundary are
//! adapter-specific and never retried; the engine treats them as
//! fatal to the affected task only.

use std::path::Path;

use crate::domain::LocalEntry;

/// Read-only view of the local source tree
#[async_trait::async_trait]
pub trait LocalTree: Send + Sync {
    /// Enumerates every path under `root`, depth-first, skipping any
    /// entry whose base name appears in `ignored`
    ///
    /// The returned snapshots are taken once and never revalidated.
    async fn enumerate(&self, root: &Path, ignored: &[String]) -> anyhow::Result<Vec<LocalEntry>>;

    /// Reads the full content of one previously enumerated file
    async fn read_file(&self, entry: &LocalEntry) -> anyhow::Result<Vec<u8>>;
}

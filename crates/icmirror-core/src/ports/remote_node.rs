//! Remote tree port (driven/secondary port)
//!
//! [`RemoteNode`] is a capability over one node of the remote drive
//! tree. The primary implementation targets iCloud Drive, but the
//! trait hides every provider detail the engine does not need.
//!
//! ## Eventual consistency
//!
//! `create_child_dir` does **not** guarantee the new child is visible
//! to a subsequent `child()` call, on this or any other handle: drive
//! listings are cached per node and the service itself may lag behind
//! its own writes. Callers that just created a child must call
//! [`invalidate`](RemoteNode::invalidate) and re-read, possibly more
//! than once. The directory resolver in the sync engine is built
//! around exactly this loop.
//!
//! Every node owns its listing cache; invalidation is an explicit
//! operation any caller can trigger, never a shared hidden field.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{RemoteError, RemoteFileMeta};

/// Shared handle to a remote tree node
pub type RemoteNodeRef = Arc<dyn RemoteNode>;

impl std::fmt::Debug for dyn RemoteNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteNode")
            .field("name", &self.name())
            .field("is_dir", &self.is_dir())
            .finish_non_exhaustive()
    }
}

/// Capability over one directory or file in the remote tree
#[async_trait::async_trait]
pub trait RemoteNode: Send + Sync {
    /// Node name (base name within its parent)
    fn name(&self) -> &str;

    /// Whether this node is a directory
    fn is_dir(&self) -> bool;

    /// File size in bytes, as last observed (files only)
    fn size(&self) -> Option<u64>;

    /// Last-modified timestamp, as last observed (files only)
    fn modified(&self) -> Option<DateTime<Utc>>;

    /// Metadata bundle for the sync decision
    fn file_meta(&self) -> RemoteFileMeta {
        RemoteFileMeta {
            size: self.size(),
            modified: self.modified(),
        }
    }

    /// Looks up a named child against the (possibly cached) listing
    ///
    /// Returns `Ok(None)` when no child of that name is visible. A
    /// just-created child may legitimately be invisible here until the
    /// cache is invalidated and the service catches up.
    async fn child(&self, name: &str) -> Result<Option<RemoteNodeRef>, RemoteError>;

    /// Issues a directory-creation request for a child of this node
    ///
    /// Visibility of the new child is eventual, not immediate. The
    /// remote service tolerates duplicate creation requests from
    /// racing workers without corrupting the tree.
    async fn create_child_dir(&self, name: &str) -> Result<(), RemoteError>;

    /// Discards the cached child listing so the next `child()` call
    /// forces a fresh remote read
    async fn invalidate(&self);

    /// Uploads a file's bytes as a child of this directory node
    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<(), RemoteError>;

    /// Deletes this node (used on stale remote files before re-upload)
    async fn delete(&self) -> Result<(), RemoteError>;
}

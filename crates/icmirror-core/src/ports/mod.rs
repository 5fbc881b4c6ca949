//! Ports (trait boundaries) for the mirror
//!
//! Driven-side interfaces the engine consumes: the remote drive tree
//! and the local filesystem. Adapters live in sibling crates.

pub mod local_tree;
pub mod remote_node;

pub use local_tree::LocalTree;
pub use remote_node::{RemoteNode, RemoteNodeRef};

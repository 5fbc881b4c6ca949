//! iCloud Drive adapter for icmirror
//!
//! Implements the [`RemoteNode`](icmirror_core::RemoteNode) port
//! against the iCloud web services: cookie-session authentication
//! (login, two-factor verification, session trust), folder listings
//! with per-node caches, folder creation, the two-step document
//! upload, and trash deletion.
//!
//! The service is eventually consistent: a created folder may not show
//! up in listings for a while, even on the connection that created it.
//! This crate never papers over that - callers own the
//! invalidate-and-poll loop.

pub mod client;
pub mod node;
pub mod session;
pub mod upload;

pub use client::DriveClient;
pub use node::DriveNode;
pub use session::{Session, SessionBuilder};

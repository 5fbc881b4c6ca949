//! Error taxonomy for the mirror
//!
//! Three layers, mirroring how errors flow through the system:
//! [`PlanError`] from pure path planning, [`RemoteError`] from drive
//! calls (with a transient/fatal split that drives the retry wrapper),
//! and [`SyncError`] as the per-task union the engine reports.

use thiserror::Error;

/// Errors from planning a destination path for a local entry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// The entry cannot be expressed relative to the source root
    #[error("path not within source root: {0}")]
    OutsideSourceRoot(String),

    /// A path component is not representable as a remote name
    #[error("invalid path component in: {0}")]
    InvalidComponent(String),
}

/// Errors surfaced by remote drive operations
///
/// The [`is_transient`](RemoteError::is_transient) split is the contract
/// the retry wrapper relies on: transient errors restart the whole
/// task, everything else aborts it.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Service-side failure reported with an HTTP status
    #[error("remote API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the service
        status: u16,
        /// Service-provided reason, if any
        message: String,
    },

    /// Transport-level failure (connection, timeout, TLS)
    #[error("network error: {0}")]
    Network(String),

    /// Login or two-factor verification failed; fatal to the run
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Session trust request was declined; the run proceeds
    #[error("session trust not granted: {0}")]
    TrustNotGranted(String),

    /// The service answered with a shape we do not understand
    #[error("unexpected response: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// Whether a retry of the enclosing task is expected to succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Network(_) => true,
            RemoteError::Api { status, .. } => matches!(status, 408 | 429 | 500..=599),
            _ => false,
        }
    }
}

/// Per-task error union reported by the sync engine
#[derive(Debug, Error)]
pub enum SyncError {
    /// Destination path could not be planned
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// A remote call failed
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Reading the local file failed
    #[error("local filesystem error: {0}")]
    Local(#[source] anyhow::Error),

    /// A configured retry or poll ceiling was exhausted
    #[error("gave up after {attempts} attempts: {reason}")]
    GaveUp {
        /// How many attempts were made before giving up
        attempts: u64,
        /// What was being attempted
        reason: String,
    },
}

impl SyncError {
    /// Whether the retry wrapper should re-run the task
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Remote(e) if e.is_transient())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        for status in [408, 429, 500, 502, 503] {
            let err = RemoteError::Api {
                status,
                message: "boom".into(),
            };
            assert!(err.is_transient(), "status {status} should be transient");
        }
        assert!(RemoteError::Network("reset by peer".into()).is_transient());
    }

    #[test]
    fn auth_and_client_errors_are_fatal() {
        assert!(!RemoteError::Auth("bad password".into()).is_transient());
        assert!(!RemoteError::Api {
            status: 404,
            message: "missing".into()
        }
        .is_transient());
        assert!(!RemoteError::Protocol("no items field".into()).is_transient());
    }

    #[test]
    fn sync_error_transience_follows_remote() {
        let transient = SyncError::Remote(RemoteError::Network("blip".into()));
        assert!(transient.is_transient());

        let fatal = SyncError::Plan(PlanError::OutsideSourceRoot("/etc".into()));
        assert!(!fatal.is_transient());

        let gave_up = SyncError::GaveUp {
            attempts: 3,
            reason: "resolving sub".into(),
        };
        assert!(!gave_up.is_transient());
    }

    #[test]
    fn error_display() {
        let err = PlanError::OutsideSourceRoot("/tmp/x".into());
        assert_eq!(err.to_string(), "path not within source root: /tmp/x");

        let err = RemoteError::Api {
            status: 503,
            message: "maintenance".into(),
        };
        assert_eq!(err.to_string(), "remote API error (503): maintenance");
    }
}

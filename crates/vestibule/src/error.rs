//! Error types for the session core.

use thiserror::Error;
use vestibule_client::ClientError;
use vestibule_core::SessionStatus;
use vestibule_store::StoreError;

/// Errors that can occur while establishing or supervising a session.
///
/// Construction and validation failures always follow a rollback to a
/// clean unauthenticated state; degraded-but-running conditions
/// (encryption init, cache warm-up) are logged instead and never appear
/// here.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Bootstrap was requested with no homeserver selected.
    #[error("no homeserver selected")]
    NoHomeserverSelected,

    /// The selected homeserver is unreachable or non-compliant.
    #[error("homeserver {name} is unreachable or not compatible")]
    InvalidHomeserver {
        /// Display name of the rejected homeserver.
        name: String,
    },

    /// Local client setup failed before the server was ever consulted.
    #[error("client construction failed: {0}")]
    ClientConstructionFailed(#[source] ClientError),

    /// The persisted credential was rejected on resume.
    #[error("authentication expired")]
    AuthenticationExpired,

    /// A bootstrap is already in flight; the new request was rejected
    /// rather than raced.
    #[error("bootstrap already in progress (status: {0})")]
    BootstrapInProgress(SessionStatus),

    /// The operation needs a constructed client session and none exists.
    #[error("no active client session")]
    NoActiveSession,

    /// Identity store failure.
    #[error("identity store error: {0}")]
    Store(#[from] StoreError),

    /// Protocol client failure outside the cases above.
    #[error("client error: {0}")]
    Client(ClientError),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

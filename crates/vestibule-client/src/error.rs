//! Error types for the protocol-client seam.

use thiserror::Error;

/// Errors reported by a protocol client or its factory.
///
/// Clone + PartialEq so mock behaviors can be scripted and asserted on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The server could not be reached or the connection broke.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered, but not with anything this client understands.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The server rejected the credential attached to the request.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Local resource setup failed (stores, crypto state, client wiring).
    #[error("client setup failed: {0}")]
    Setup(String),

    /// The operation needs a capability the client was built without.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl ClientError {
    /// Whether this error means the access credential was rejected.
    ///
    /// The session layer maps these to an expired-authentication failure
    /// and clears the persisted credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

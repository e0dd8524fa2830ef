//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during identity store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record serialization error.
    ///
    /// Deserialization of persisted records never produces this: corrupt
    /// data degrades to a fallback value instead of failing the load.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Background task running a blocking database call failed.
    #[error("background task failed: {0}")]
    Task(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

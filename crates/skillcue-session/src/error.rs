//! Session-specific error types.

use thiserror::Error;

/// Errors that can occur during session operations.
///
/// A missing or corrupt record is never an error; it reads as a fresh session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid session id '{id}'")]
    InvalidSessionId { id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

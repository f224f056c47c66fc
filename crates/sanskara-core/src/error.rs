//! Error types for Sanskara core library.

use thiserror::Error;

/// Result type alias using Sanskara Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Sanskara operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or unrecognisable client frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! Responder error types.

/// Errors raised at the backend boundary.
///
/// The `Display` text is what the reconnect classifier inspects, so variants
/// carry the transport's own message verbatim.
#[derive(Debug, thiserror::Error)]
pub enum ResponderError {
    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Stream closed: {0}")]
    Closed(String),
}

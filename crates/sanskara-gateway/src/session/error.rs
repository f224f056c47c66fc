//! Session error types.

/// Errors that end a session, or a task within it.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Client connection closed")]
    ClientClosed,

    #[error("Upstream stream failed: {message}")]
    Upstream { message: String, transient: bool },

    #[error("{0} queue closed")]
    Queue(&'static str),

    #[error("Task failed: {0}")]
    Task(String),
}

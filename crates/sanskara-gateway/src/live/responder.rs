//! The backend contract driven by a session.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::{Map, Value};

use super::error::ResponderError;
use super::request_queue::LiveRequestQueue;
use super::types::LiveEvent;

/// Backend event stream for one physical connection.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<LiveEvent, ResponderError>> + Send>>;

/// Everything a responder needs to open (or re-open) a live stream.
#[derive(Debug, Clone)]
pub struct LiveContext {
    pub session_id: String,
    pub user_id: String,
    /// Snapshot of the session state at open time.
    pub state: Map<String, Value>,
    /// Most recent resumable handle, if the backend issued one.
    pub resumption_handle: Option<String>,
}

/// A realtime generative backend.
///
/// `run_live` may be called repeatedly for the same session after a stream
/// error; each call attaches to the same request queue, so requests pushed
/// while no stream was open are delivered once a new one is.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Register a new conversation. Returns the backend's session id, if it
    /// assigns one.
    async fn create_session(&self, user_id: &str) -> Result<Option<String>, ResponderError>;

    /// Open a live stream that drains `requests` and yields backend events.
    async fn run_live(
        &self,
        ctx: LiveContext,
        requests: LiveRequestQueue,
    ) -> Result<EventStream, ResponderError>;
}

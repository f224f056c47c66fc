//! Response dispatcher: backend events to typed client messages.
//!
//! Turn state machine:
//! ```text
//! Listening → (Content)* → TurnComplete | Interrupted → Listening
//! ```
//! Exactly one terminal notification reaches the client per turn.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use sanskara_core::protocol::ServerMessage;

use crate::live::{LiveEvent, Part, Role};
use crate::session::turn::Turn;
use crate::session::{SessionError, SessionState, keys};

const INTERRUPTED_TEXT: &str = "Response interrupted by user input";

/// Consumes backend events for one session, in arrival order.
///
/// Outlives individual backend streams, so a turn that spans a reconnect is
/// still closed exactly once.
pub struct ResponseDispatcher {
    state: SessionState,
    outbound: mpsc::Sender<ServerMessage>,
    turn: Turn,
    /// Session id reported with `turn_complete`; replaced by each new
    /// resumption handle.
    current_session_id: String,
}

impl ResponseDispatcher {
    pub fn new(
        session_id: impl Into<String>,
        state: SessionState,
        outbound: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            state,
            outbound,
            turn: Turn::default(),
            current_session_id: session_id.into(),
        }
    }

    pub fn current_session_id(&self) -> &str {
        &self.current_session_id
    }

    /// Handle one event. Fails only when the client has gone away.
    pub async fn dispatch(&mut self, event: LiveEvent) -> Result<(), SessionError> {
        match event {
            LiveEvent::Resumption(update) => {
                if let Some(handle) = update.usable_handle() {
                    let handle = handle.to_string();
                    debug!(handle = %handle, "Resumption handle updated");
                    self.state
                        .set(keys::RESUMPTION_HANDLE, Value::String(handle.clone()))
                        .await;
                    self.current_session_id.clone_from(&handle);
                    self.send(ServerMessage::SessionId { data: handle }).await?;
                }
            }
            LiveEvent::Content {
                role,
                parts,
                partial,
            } => {
                for part in parts {
                    self.dispatch_part(role, part, partial).await?;
                }
            }
            LiveEvent::Interrupted => {
                if self.turn.mark_interrupted() {
                    info!("Response interrupted by user input");
                    self.send(ServerMessage::Interrupted {
                        data: INTERRUPTED_TEXT.to_string(),
                    })
                    .await?;
                }
            }
            LiveEvent::TurnComplete => {
                let interrupted = self.turn.is_interrupted();
                if !interrupted {
                    self.send(ServerMessage::TurnComplete {
                        session_id: Some(self.current_session_id.clone()),
                    })
                    .await?;
                }
                let turn = self.state.increment(keys::TURN_COUNT).await;
                info!(
                    turn,
                    interrupted,
                    input = %self.turn.input_transcript(),
                    output = %self.turn.output_transcript(),
                    "Turn complete"
                );
                self.turn.reset();
            }
        }
        Ok(())
    }

    async fn dispatch_part(
        &mut self,
        role: Role,
        part: Part,
        partial: bool,
    ) -> Result<(), SessionError> {
        match part {
            Part::Inline(blob) => {
                self.send(ServerMessage::media(&blob.data, &blob.mime_type))
                    .await
            }
            Part::Text(text) if text.is_empty() => Ok(()),
            // Echo of the user's own speech; kept for the turn log only.
            Part::Text(text) if role == Role::User => {
                self.turn.push_input(&text);
                Ok(())
            }
            Part::Text(text) if partial => {
                self.turn.push_output(&text);
                self.send(ServerMessage::Text { data: text }).await
            }
            Part::Text(_) => Ok(()),
        }
    }

    async fn send(&self, msg: ServerMessage) -> Result<(), SessionError> {
        self.outbound
            .send(msg)
            .await
            .map_err(|_| SessionError::ClientClosed)
    }
}

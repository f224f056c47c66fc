//! Reconnection supervisor: keeps the backend event stream flowing into the
//! response dispatcher across transient failures.
//!
//! ```text
//! Idle → Streaming → Streaming   (clean end, attempts reset)
//!                  → Backoff → Streaming
//!                  → Failed
//! ```

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use sanskara_core::protocol::{ReconnectingInfo, ServerMessage};

use super::classify::classify;
use super::policy::ReconnectPolicy;
use crate::dispatch::ResponseDispatcher;
use crate::live::{EventStream, LiveContext, LiveRequestQueue, Responder, ResponderError};
use crate::session::{SessionError, SessionState, keys};

/// Terminal message sent when the stream cannot be recovered.
pub const TERMINAL_ERROR_TEXT: &str = "connection closed, please resend";

enum StreamOutcome {
    /// The backend ended the stream normally.
    Ended { delivered: bool },
    Failed(ResponderError),
}

/// Drives `open → drain` with bounded retries for one session.
pub struct ReconnectSupervisor {
    responder: Arc<dyn Responder>,
    requests: LiveRequestQueue,
    policy: ReconnectPolicy,
    outbound: mpsc::Sender<ServerMessage>,
    session_id: String,
    user_id: String,
    state: SessionState,
}

impl ReconnectSupervisor {
    pub fn new(
        responder: Arc<dyn Responder>,
        requests: LiveRequestQueue,
        policy: ReconnectPolicy,
        outbound: mpsc::Sender<ServerMessage>,
        session_id: String,
        user_id: String,
        state: SessionState,
    ) -> Self {
        Self {
            responder,
            requests,
            policy,
            outbound,
            session_id,
            user_id,
            state,
        }
    }

    /// Run until the request queue closes, the client goes away, or a
    /// failure is fatal or exhausts the retry budget.
    ///
    /// Transient failures never escape this loop.
    pub async fn run(self, mut dispatcher: ResponseDispatcher) -> Result<(), SessionError> {
        let mut attempts: u32 = 0;

        loop {
            if self.requests.is_closed() {
                debug!("Request queue closed, supervisor exiting");
                return Ok(());
            }

            let ctx = self.live_context().await;
            let outcome = match self.responder.run_live(ctx, self.requests.clone()).await {
                Ok(stream) => Self::drain(stream, &mut dispatcher, &mut attempts).await?,
                Err(e) => StreamOutcome::Failed(e),
            };

            match outcome {
                StreamOutcome::Ended { delivered } => {
                    attempts = 0;
                    if delivered || self.requests.is_closed() {
                        debug!("Live stream ended, re-opening");
                        tokio::task::yield_now().await;
                    } else {
                        // An empty stream that ends at once would otherwise spin.
                        debug!(
                            delay_ms = self.policy.initial_delay.as_millis(),
                            "Live stream ended without events, re-opening after delay"
                        );
                        sleep(self.policy.initial_delay).await;
                    }
                }
                StreamOutcome::Failed(e) => {
                    let message = e.to_string();
                    let class = classify(&message);

                    if class.is_transient() && self.policy.should_retry(attempts) {
                        attempts += 1;
                        let delay = self.policy.delay_for_attempt(attempts - 1);
                        warn!(
                            error = %message,
                            attempt = attempts,
                            delay_ms = delay.as_millis(),
                            "Transient live stream failure, reconnecting"
                        );
                        self.send(ServerMessage::Reconnecting {
                            data: ReconnectingInfo {
                                attempt: attempts,
                                retry_in: delay.as_secs_f64(),
                            },
                        })
                        .await?;
                        sleep(delay).await;
                        continue;
                    }

                    error!(
                        error = %message,
                        transient = class.is_transient(),
                        attempts,
                        "Live stream failed"
                    );
                    // The client may already be gone; the session ends either way.
                    let _ = self.send(ServerMessage::error(TERMINAL_ERROR_TEXT)).await;
                    return Err(SessionError::Upstream {
                        message,
                        transient: class.is_transient(),
                    });
                }
            }
        }
    }

    /// Feed one stream into the dispatcher. Every delivered event resets the
    /// attempt counter.
    async fn drain(
        mut stream: EventStream,
        dispatcher: &mut ResponseDispatcher,
        attempts: &mut u32,
    ) -> Result<StreamOutcome, SessionError> {
        let mut delivered = false;
        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    delivered = true;
                    if *attempts > 0 {
                        info!(attempts = *attempts, "Live stream recovered");
                        *attempts = 0;
                    }
                    dispatcher.dispatch(event).await?;
                }
                Err(e) => return Ok(StreamOutcome::Failed(e)),
            }
        }
        Ok(StreamOutcome::Ended { delivered })
    }

    async fn live_context(&self) -> LiveContext {
        LiveContext {
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            resumption_handle: self.state.get_str(keys::RESUMPTION_HANDLE).await,
            state: self.state.snapshot().await,
        }
    }

    async fn send(&self, msg: ServerMessage) -> Result<(), SessionError> {
        self.outbound
            .send(msg)
            .await
            .map_err(|_| SessionError::ClientClosed)
    }
}

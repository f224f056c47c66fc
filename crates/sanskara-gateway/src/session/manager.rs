//! Session lifecycle manager.
//!
//! Owns one connection end to end: handshake, wedding resolution, context
//! priming, the five-task group, and teardown.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, info_span, warn};

use sanskara_core::Config;
use sanskara_core::protocol::ServerMessage;

use super::error::SessionError;
use super::priming::prime_context;
use super::types::{Lifecycle, Session, keys};
use crate::artifacts::ArtifactStore;
use crate::channel::{
    AudioForwarder, ChannelReceivers, InputMultiplexer, TextForwarder, VideoForwarder,
    channel_queues,
};
use crate::dispatch::ResponseDispatcher;
use crate::live::{LiveRequestQueue, Responder};
use crate::reconnect::{ReconnectPolicy, ReconnectSupervisor};
use crate::storage::{Store, resolve_wedding};

/// Sent after `ready` when the user has no wedding yet.
pub const NO_WEDDING_TEXT: &str = "No wedding found for your user ID. Please complete onboarding.";

type TaskResult = (&'static str, Result<(), SessionError>);

/// Per-session settings taken from the gateway config.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub send_sample_rate: u32,
    pub default_video_mode: String,
    pub list_caps: HashMap<String, usize>,
    pub reconnect: ReconnectPolicy,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            send_sample_rate: config.live.send_sample_rate,
            default_video_mode: config.session.default_video_mode.clone(),
            list_caps: config.session.list_caps.clone(),
            reconnect: ReconnectPolicy::from(&config.reconnect),
        }
    }
}

/// Creates and runs sessions. Shared by every connection.
pub struct SessionManager {
    responder: Arc<dyn Responder>,
    store: Arc<dyn Store>,
    artifacts: Arc<dyn ArtifactStore>,
    settings: SessionSettings,
    active: Arc<AtomicUsize>,
}

impl SessionManager {
    pub fn new(
        responder: Arc<dyn Responder>,
        store: Arc<dyn Store>,
        artifacts: Arc<dyn ArtifactStore>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            responder,
            store,
            artifacts,
            settings,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sessions currently between handshake and teardown.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Serve one connection until it ends.
    ///
    /// `inbound` carries raw client text frames; `outbound` is the client
    /// writer. A client that simply goes away is not an error.
    pub async fn serve(
        &self,
        user_id: String,
        inbound: mpsc::Receiver<String>,
        outbound: mpsc::Sender<ServerMessage>,
    ) -> Result<(), SessionError> {
        let _active = ActiveGuard::enter(Arc::clone(&self.active));

        let mut session = self.open(user_id, &outbound).await?;
        let span = info_span!(
            "session",
            session_id = %session.session_id,
            user_id = %session.user_id
        );

        async {
            self.prime(&mut session, &outbound).await?;
            let result = self.run(&mut session, inbound, outbound).await;
            let turns = session.state.get(keys::TURN_COUNT).await;
            info!(turns = ?turns, "Session closed");
            match result {
                Err(SessionError::ClientClosed) => Ok(()),
                other => other,
            }
        }
        .instrument(span)
        .await
    }

    /// Create the backend session and send the handshake.
    async fn open(
        &self,
        user_id: String,
        outbound: &mpsc::Sender<ServerMessage>,
    ) -> Result<Session, SessionError> {
        let session_id = match self.responder.create_session(&user_id).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                let id = uuid::Uuid::new_v4().to_string();
                warn!(session_id = %id, "Backend returned no session id, using a local one");
                id
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to create session");
                let _ = outbound
                    .send(ServerMessage::error(format!("Failed to create session: {e}")))
                    .await;
                return Err(SessionError::Handshake(e.to_string()));
            }
        };

        let session = Session::new(session_id, user_id);
        send(
            outbound,
            ServerMessage::Session {
                session_id: session.session_id.clone(),
            },
        )
        .await?;
        send(outbound, ServerMessage::Ready).await?;
        info!(
            session_id = %session.session_id,
            user_id = %session.user_id,
            "Session ready"
        );
        Ok(session)
    }

    /// Resolve the wedding and write the baseline context.
    async fn prime(
        &self,
        session: &mut Session,
        outbound: &mpsc::Sender<ServerMessage>,
    ) -> Result<(), SessionError> {
        let membership = match resolve_wedding(self.store.as_ref(), &session.user_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Wedding lookup failed");
                None
            }
        };

        match &membership {
            Some(m) => {
                info!(wedding_id = %m.wedding_id, role = %m.role, "Wedding resolved");
                session.wedding_id = Some(m.wedding_id.clone());
            }
            None => {
                warn!("No wedding for user");
                send(outbound, ServerMessage::error(NO_WEDDING_TEXT)).await?;
            }
        }

        let context = prime_context(
            self.store.as_ref(),
            self.artifacts.as_ref(),
            &session.user_id,
            membership.as_ref(),
            &self.settings.list_caps,
        )
        .await;
        debug!(keys = context.len(), "Context primed");
        session.state.extend(context).await;
        session.advance(Lifecycle::ContextPrimed);
        Ok(())
    }

    /// Run the task group until its first member finishes, then tear down
    /// the rest.
    async fn run(
        &self,
        session: &mut Session,
        inbound: mpsc::Receiver<String>,
        outbound: mpsc::Sender<ServerMessage>,
    ) -> Result<(), SessionError> {
        let requests = LiveRequestQueue::new();
        let (senders, receivers) = channel_queues();
        let ChannelReceivers {
            audio: audio_rx,
            video: video_rx,
            text: text_rx,
        } = receivers;
        let dispatcher =
            ResponseDispatcher::new(&session.session_id, session.state.clone(), outbound.clone());
        let supervisor = ReconnectSupervisor::new(
            Arc::clone(&self.responder),
            requests.clone(),
            self.settings.reconnect.clone(),
            outbound,
            session.session_id.clone(),
            session.user_id.clone(),
            session.state.clone(),
        );

        let mut tasks: JoinSet<TaskResult> = JoinSet::new();
        let mux = InputMultiplexer::new(senders, &self.settings.default_video_mode);
        tasks.spawn(async move { ("multiplexer", mux.run(inbound).await) }.in_current_span());

        let audio = AudioForwarder::new(requests.clone(), self.settings.send_sample_rate);
        tasks.spawn(async move { ("audio", audio.run(audio_rx).await) }.in_current_span());

        let video = VideoForwarder::new(requests.clone());
        tasks.spawn(async move { ("video", video.run(video_rx).await) }.in_current_span());

        let text = TextForwarder::new(requests.clone(), Arc::clone(&self.artifacts));
        tasks.spawn(async move { ("text", text.run(text_rx).await) }.in_current_span());

        tasks.spawn(
            async move { ("supervisor", supervisor.run(dispatcher).await) }.in_current_span(),
        );

        session.advance(Lifecycle::Streaming);

        let result = match tasks.join_next().await {
            Some(Ok((task, result))) => {
                match &result {
                    Ok(()) => info!(task, "Session task finished"),
                    Err(e) => warn!(task, error = %e, "Session task failed"),
                }
                result
            }
            Some(Err(e)) => {
                error!(error = %e, "Session task panicked");
                Err(SessionError::Task(e.to_string()))
            }
            None => Ok(()),
        };

        requests.close();
        tasks.shutdown().await;
        session.advance(Lifecycle::Closed);
        result
    }
}

async fn send(
    outbound: &mpsc::Sender<ServerMessage>,
    msg: ServerMessage,
) -> Result<(), SessionError> {
    outbound
        .send(msg)
        .await
        .map_err(|_| SessionError::ClientClosed)
}

/// Counts a session as active for its lifetime.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

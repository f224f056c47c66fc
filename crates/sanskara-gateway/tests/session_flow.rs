#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! End-to-end session scenarios driven through `SessionManager::serve`,
//! with a scripted backend standing in for the live model.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use sanskara_core::Config;
use sanskara_core::protocol::ServerMessage;
use sanskara_gateway::artifacts::{ArtifactStore, InMemoryArtifactStore};
use sanskara_gateway::live::{LiveEvent, Part};
use sanskara_gateway::reconnect::TERMINAL_ERROR_TEXT;
use sanskara_gateway::session::{NO_WEDDING_TEXT, SessionError, SessionManager, SessionSettings};
use sanskara_gateway::storage::{Params, SqliteStore, Store};

use common::{FixtureStore, ScriptedResponder, text_frame};

struct Harness {
    inbound: mpsc::Sender<String>,
    outbound: mpsc::Receiver<ServerMessage>,
    handle: JoinHandle<Result<(), SessionError>>,
    manager: Arc<SessionManager>,
}

impl Harness {
    fn start(
        responder: Arc<ScriptedResponder>,
        store: Arc<dyn Store>,
        artifacts: Arc<dyn ArtifactStore>,
        user_id: &str,
    ) -> Self {
        let manager = Arc::new(SessionManager::new(
            responder,
            store,
            artifacts,
            SessionSettings::from(&Config::default()),
        ));
        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        let serving = Arc::clone(&manager);
        let user_id = user_id.to_string();
        let handle =
            tokio::spawn(async move { serving.serve(user_id, inbound_rx, outbound_tx).await });
        Self {
            inbound: inbound_tx,
            outbound: outbound_rx,
            handle,
            manager,
        }
    }

    async fn next(&mut self) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(30), self.outbound.recv())
            .await
            .unwrap()
            .unwrap()
    }

    async fn handshake(&mut self) {
        assert_eq!(
            self.next().await,
            ServerMessage::Session {
                session_id: "s-1".into()
            }
        );
        assert_eq!(self.next().await, ServerMessage::Ready);
    }

    async fn say(&self, text: &str) {
        self.inbound.send(text_frame(text)).await.unwrap();
    }

    async fn finish(self) -> Result<(), SessionError> {
        drop(self.inbound);
        self.handle.await.unwrap()
    }
}

fn member_store() -> Arc<dyn Store> {
    Arc::new(FixtureStore::member("u1", "w1", "bride"))
}

#[tokio::test]
async fn text_turn_streams_partial_text_then_turn_complete() {
    let responder = Arc::new(ScriptedResponder::echo());
    let mut h = Harness::start(
        Arc::clone(&responder),
        member_store(),
        Arc::new(InMemoryArtifactStore::new()),
        "u1",
    );

    h.handshake().await;
    h.say("Hello").await;

    assert_eq!(
        h.next().await,
        ServerMessage::Text {
            data: "You said: Hello".into()
        }
    );
    assert_eq!(
        h.next().await,
        ServerMessage::TurnComplete {
            session_id: Some("s-1".into())
        }
    );

    h.finish().await.unwrap();
    assert_eq!(responder.turns()[0].parts, vec![Part::Text("Hello".into())]);

    let contexts = responder.contexts.lock().unwrap();
    assert_eq!(contexts[0].state["current_wedding_id"], "w1");
    assert_eq!(contexts[0].state["current_user_role"], "bride");
}

#[tokio::test]
async fn sqlite_store_primes_the_backend_context() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    for sql in [
        "INSERT INTO users (user_id, display_name) VALUES ('u1', 'Asha')",
        "INSERT INTO weddings (wedding_id, wedding_name) VALUES ('w1', 'Asha & Ravi')",
        "INSERT INTO wedding_members VALUES ('w1', 'u1', 'bride')",
        "INSERT INTO tasks (task_id, wedding_id, title, due_date) \
         VALUES ('t1', 'w1', 'Book venue', date('now', '+3 days'))",
    ] {
        store.execute(sql, &Params::new()).await.unwrap();
    }

    let responder = Arc::new(ScriptedResponder::echo());
    let mut h = Harness::start(
        Arc::clone(&responder),
        Arc::new(store),
        Arc::new(InMemoryArtifactStore::new()),
        "u1",
    );
    h.handshake().await;
    h.say("What is left?").await;
    assert!(matches!(h.next().await, ServerMessage::Text { .. }));
    h.finish().await.unwrap();

    let contexts = responder.contexts.lock().unwrap();
    let state = &contexts[0].state;
    assert_eq!(state["user_display_name"], "Asha");
    assert_eq!(state["wedding_data"]["wedding_name"], "Asha & Ravi");
    assert_eq!(state["urgent_tasks"][0]["title"], "Book venue");
    assert_eq!(state["timeline_summary"]["urgent_count"], 1);
}

#[tokio::test]
async fn missing_wedding_is_reported_but_session_continues() {
    let responder = Arc::new(ScriptedResponder::echo());
    let mut h = Harness::start(
        Arc::clone(&responder),
        Arc::new(FixtureStore::empty()),
        Arc::new(InMemoryArtifactStore::new()),
        "ghost",
    );

    h.handshake().await;
    assert_eq!(h.next().await, ServerMessage::error(NO_WEDDING_TEXT));

    h.say("Are you there?").await;
    assert_eq!(
        h.next().await,
        ServerMessage::Text {
            data: "You said: Are you there?".into()
        }
    );
    h.finish().await.unwrap();

    let contexts = responder.contexts.lock().unwrap();
    assert!(contexts[0].state["current_wedding_id"].is_null());
    assert_eq!(contexts[0].state["current_user_id"], "ghost");
}

#[tokio::test]
async fn referenced_artifacts_are_attached_and_missing_ones_skipped() {
    let responder = Arc::new(ScriptedResponder::echo());
    let artifacts = Arc::new(InMemoryArtifactStore::new());
    artifacts
        .add("w1", Some("u1"), "venue.png", vec![9, 9], "image/png", None)
        .await;
    let mut h = Harness::start(Arc::clone(&responder), member_store(), artifacts, "u1");

    h.handshake().await;
    h.say("Compare these [FILES: venue.png, nope.png]").await;
    assert_eq!(
        h.next().await,
        ServerMessage::Text {
            data: "You said: Compare these".into()
        }
    );
    h.finish().await.unwrap();

    let parts = &responder.turns()[0].parts;
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0], Part::Text("Compare these".into()));
    assert!(matches!(&parts[1], Part::Inline(blob) if blob.data == vec![9, 9]));
}

#[tokio::test]
async fn repeated_interruptions_produce_one_notice_and_no_turn_complete() {
    let responder = Arc::new(ScriptedResponder::replying(|_| {
        vec![
            LiveEvent::model_text("Let me check"),
            LiveEvent::Interrupted,
            LiveEvent::Interrupted,
            LiveEvent::Interrupted,
            LiveEvent::TurnComplete,
            LiveEvent::model_text("Next turn"),
            LiveEvent::TurnComplete,
        ]
    }));
    let mut h = Harness::start(
        responder,
        member_store(),
        Arc::new(InMemoryArtifactStore::new()),
        "u1",
    );

    h.handshake().await;
    h.say("Book the florist").await;

    assert!(matches!(h.next().await, ServerMessage::Text { .. }));
    assert!(matches!(h.next().await, ServerMessage::Interrupted { .. }));
    // The interrupted turn is closed silently; the next one completes.
    assert_eq!(
        h.next().await,
        ServerMessage::Text {
            data: "Next turn".into()
        }
    );
    assert!(matches!(h.next().await, ServerMessage::TurnComplete { .. }));
    h.finish().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn transient_failures_retry_then_end_with_terminal_error() {
    let responder = Arc::new(ScriptedResponder::failing("503 Service Unavailable"));
    let mut h = Harness::start(
        Arc::clone(&responder),
        member_store(),
        Arc::new(InMemoryArtifactStore::new()),
        "u1",
    );

    h.handshake().await;
    for expected in 1..=3 {
        match h.next().await {
            ServerMessage::Reconnecting { data } => assert_eq!(data.attempt, expected),
            other => panic!("expected reconnecting, got {other:?}"),
        }
    }
    assert_eq!(h.next().await, ServerMessage::error(TERMINAL_ERROR_TEXT));

    let err = h.handle.await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::Upstream { transient: true, .. }));
    assert_eq!(responder.opens(), 4);
}

#[tokio::test(start_paused = true)]
async fn text_sent_during_backoff_reaches_the_reopened_stream_once() {
    let responder = Arc::new(ScriptedResponder::flaky("Connection reset by peer", 1));
    let mut h = Harness::start(
        Arc::clone(&responder),
        member_store(),
        Arc::new(InMemoryArtifactStore::new()),
        "u1",
    );

    h.handshake().await;
    assert!(matches!(
        h.next().await,
        ServerMessage::Reconnecting { data } if data.attempt == 1
    ));
    h.say("Are you still there?").await;

    assert_eq!(
        h.next().await,
        ServerMessage::Text {
            data: "You said: Are you still there?".into()
        }
    );
    assert!(matches!(h.next().await, ServerMessage::TurnComplete { .. }));

    h.finish().await.unwrap();
    assert_eq!(responder.opens(), 2);
    assert_eq!(responder.turns().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn fatal_failure_ends_without_retrying() {
    let responder = Arc::new(ScriptedResponder::failing("API key not valid"));
    let mut h = Harness::start(
        Arc::clone(&responder),
        member_store(),
        Arc::new(InMemoryArtifactStore::new()),
        "u1",
    );

    h.handshake().await;
    assert_eq!(h.next().await, ServerMessage::error(TERMINAL_ERROR_TEXT));

    let err = h.handle.await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::Upstream { transient: false, .. }));
    assert_eq!(responder.opens(), 1);
}

#[tokio::test]
async fn client_disconnect_tears_the_session_down() {
    let mut h = Harness::start(
        Arc::new(ScriptedResponder::echo()),
        member_store(),
        Arc::new(InMemoryArtifactStore::new()),
        "u1",
    );
    h.handshake().await;
    assert_eq!(h.manager.active_sessions(), 1);

    let manager = Arc::clone(&h.manager);
    h.finish().await.unwrap();
    assert_eq!(manager.active_sessions(), 0);
}

#[tokio::test]
async fn failed_session_creation_is_reported() {
    let responder = Arc::new(ScriptedResponder {
        create_error: Some("quota exceeded"),
        ..ScriptedResponder::echo()
    });
    let mut h = Harness::start(
        responder,
        member_store(),
        Arc::new(InMemoryArtifactStore::new()),
        "u1",
    );

    assert!(matches!(h.next().await, ServerMessage::Error { data } if data.contains("quota exceeded")));
    let err = h.handle.await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::Handshake(_)));
}

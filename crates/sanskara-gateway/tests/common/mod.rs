//! Shared fixtures: a scripted backend and a fixed-answer store.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;

use sanskara_gateway::live::{
    Content, EventStream, LiveContext, LiveEvent, LiveRequest, LiveRequestQueue, Part, Responder,
    ResponderError,
};
use sanskara_gateway::storage::{Params, Row, Store, StoreError};

pub type Reply = Arc<dyn Fn(&str) -> Vec<LiveEvent> + Send + Sync>;

/// Backend that answers each user turn with a scripted list of events.
pub struct ScriptedResponder {
    pub session_id: Option<String>,
    pub create_error: Option<&'static str>,
    pub open_error: Option<&'static str>,
    /// How many leading opens fail with `open_error`; `None` fails them all.
    pub failing_opens: Option<usize>,
    pub reply: Reply,
    pub opens: AtomicUsize,
    pub contexts: Mutex<Vec<LiveContext>>,
    pub turns: Arc<Mutex<Vec<Content>>>,
}

impl ScriptedResponder {
    pub fn replying(reply: impl Fn(&str) -> Vec<LiveEvent> + Send + Sync + 'static) -> Self {
        Self {
            session_id: Some("s-1".into()),
            create_error: None,
            open_error: None,
            failing_opens: None,
            reply: Arc::new(reply),
            opens: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
            turns: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Echoes the turn text back as one partial fragment, then completes.
    pub fn echo() -> Self {
        Self::replying(|text| {
            vec![
                LiveEvent::model_text(format!("You said: {text}")),
                LiveEvent::TurnComplete,
            ]
        })
    }

    /// Every connection attempt fails with `message`.
    pub fn failing(message: &'static str) -> Self {
        Self {
            open_error: Some(message),
            ..Self::echo()
        }
    }

    /// The first `count` connection attempts fail with `message`, later ones echo.
    pub fn flaky(message: &'static str, count: usize) -> Self {
        Self {
            open_error: Some(message),
            failing_opens: Some(count),
            ..Self::echo()
        }
    }

    pub fn turns(&self) -> Vec<Content> {
        self.turns.lock().unwrap().clone()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn create_session(&self, _user_id: &str) -> Result<Option<String>, ResponderError> {
        match self.create_error {
            Some(msg) => Err(ResponderError::Connect(msg.into())),
            None => Ok(self.session_id.clone()),
        }
    }

    async fn run_live(
        &self,
        ctx: LiveContext,
        requests: LiveRequestQueue,
    ) -> Result<EventStream, ResponderError> {
        let attempt = self.opens.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(ctx);
        if let Some(msg) = self.open_error
            && self.failing_opens.is_none_or(|count| attempt < count)
        {
            return Err(ResponderError::Connect(msg.into()));
        }

        let turns = Arc::clone(&self.turns);
        let reply = Arc::clone(&self.reply);
        let stream = futures::stream::unfold(requests, move |queue| {
            let turns = Arc::clone(&turns);
            let reply = Arc::clone(&reply);
            async move {
                loop {
                    match queue.recv().await? {
                        LiveRequest::Content(content) => {
                            let text = content
                                .parts
                                .iter()
                                .filter_map(Part::as_text)
                                .collect::<Vec<_>>()
                                .join(" ");
                            turns.lock().unwrap().push(content);
                            return Some((reply(&text), queue));
                        }
                        LiveRequest::Close => return None,
                        LiveRequest::Realtime(_) => {}
                    }
                }
            }
        })
        .flat_map(|events| futures::stream::iter(events.into_iter().map(Ok)));
        Ok(Box::pin(stream))
    }
}

/// Store that knows a single membership and returns no rows otherwise.
pub struct FixtureStore {
    membership: Option<(&'static str, &'static str, &'static str)>,
}

impl FixtureStore {
    pub const fn member(user_id: &'static str, wedding_id: &'static str, role: &'static str) -> Self {
        Self {
            membership: Some((user_id, wedding_id, role)),
        }
    }

    pub const fn empty() -> Self {
        Self { membership: None }
    }
}

#[async_trait]
impl Store for FixtureStore {
    async fn execute(&self, query: &str, params: &Params) -> Result<Vec<Row>, StoreError> {
        let Some((user_id, wedding_id, role)) = self.membership else {
            return Ok(Vec::new());
        };
        if query.contains("FROM wedding_members") && params.get("user_id") == Some(&json!(user_id))
        {
            let row = json!({ "wedding_id": wedding_id, "role": role });
            return Ok(row.as_object().into_iter().cloned().collect());
        }
        Ok(Vec::new())
    }
}

pub fn text_frame(text: &str) -> String {
    json!({ "type": "text", "data": text }).to_string()
}

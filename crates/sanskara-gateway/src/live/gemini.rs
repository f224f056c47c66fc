//! Gemini Live responder over a WebSocket.
//!
//! One `run_live` call is one physical connection: a `setup` message, a wait
//! for `setupComplete`, then a writer task draining the request queue while
//! the returned stream decodes server messages into [`LiveEvent`]s.

use async_trait::async_trait;
use futures::{Sink, SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, info, warn};

use sanskara_core::config::LiveConfig;
use sanskara_core::protocol::{decode_base64, encode_base64};

use super::error::ResponderError;
use super::instruction::render_instruction;
use super::request_queue::LiveRequestQueue;
use super::responder::{EventStream, LiveContext, Responder};
use super::types::{Blob, LiveEvent, LiveRequest, Part, ResumptionUpdate, Role};

/// [`Responder`] backed by the Gemini Live `BidiGenerateContent` endpoint.
pub struct GeminiLiveResponder {
    config: LiveConfig,
    instruction_template: String,
}

impl GeminiLiveResponder {
    pub fn new(config: LiveConfig, instruction_template: String) -> Self {
        // tokio-tungstenite picks up the process-wide rustls provider.
        let _ = rustls::crypto::ring::default_provider().install_default();
        Self {
            config,
            instruction_template,
        }
    }

    fn url(&self) -> Result<String, ResponderError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ResponderError::Connect("missing API key for live endpoint".into()))?;
        let sep = if self.config.endpoint.contains('?') { '&' } else { '?' };
        Ok(format!("{}{sep}key={key}", self.config.endpoint))
    }

    /// Build the `setup` message for a (re-)opened connection.
    pub fn setup_message(&self, ctx: &LiveContext) -> Value {
        let model = if self.config.model.starts_with("models/") {
            self.config.model.clone()
        } else {
            format!("models/{}", self.config.model)
        };
        let resumption = ctx
            .resumption_handle
            .as_ref()
            .map_or_else(|| json!({}), |handle| json!({ "handle": handle }));

        json!({
            "setup": {
                "model": model,
                "generationConfig": {
                    "responseModalities": self.config.response_modalities,
                    "speechConfig": {
                        "voiceConfig": {
                            "prebuiltVoiceConfig": { "voiceName": self.config.voice_name }
                        }
                    }
                },
                "systemInstruction": {
                    "parts": [{ "text": render_instruction(&self.instruction_template, &ctx.state) }]
                },
                "inputAudioTranscription": {},
                "outputAudioTranscription": {},
                "sessionResumption": resumption,
            }
        })
    }
}

#[async_trait]
impl Responder for GeminiLiveResponder {
    async fn create_session(&self, user_id: &str) -> Result<Option<String>, ResponderError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        debug!(app = %self.config.app_name, user_id, session_id = %session_id, "Created live session");
        Ok(Some(session_id))
    }

    async fn run_live(
        &self,
        ctx: LiveContext,
        requests: LiveRequestQueue,
    ) -> Result<EventStream, ResponderError> {
        let url = self.url()?;
        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| ResponderError::Connect(e.to_string()))?;
        let (mut sink, mut source) = ws.split();

        sink.send(Message::Text(self.setup_message(&ctx).to_string().into()))
            .await
            .map_err(|e| ResponderError::Stream(e.to_string()))?;

        // Wait for the backend to acknowledge the setup.
        loop {
            match source.next().await {
                Some(Ok(msg)) => {
                    if let Some(text) = message_text(&msg)
                        && serde_json::from_str::<Value>(&text)
                            .is_ok_and(|v| v.get("setupComplete").is_some())
                    {
                        break;
                    }
                    if let Message::Close(frame) = msg {
                        return Err(close_error(frame.as_ref()).unwrap_or_else(|| {
                            ResponderError::Closed("closed before setup completed".into())
                        }));
                    }
                }
                Some(Err(e)) => return Err(ResponderError::Stream(e.to_string())),
                None => {
                    return Err(ResponderError::Closed(
                        "stream ended before setup completed".into(),
                    ));
                }
            }
        }
        info!(
            session_id = %ctx.session_id,
            resumed = ctx.resumption_handle.is_some(),
            "Live stream open"
        );

        let writer = WriterGuard(tokio::spawn(pump_requests(sink, requests)));
        let stream = async_stream::stream! {
            let _writer = writer;
            while let Some(msg) = source.next().await {
                match msg {
                    Ok(Message::Close(frame)) => {
                        if let Some(err) = close_error(frame.as_ref()) {
                            yield Err(err);
                        } else {
                            debug!("Live stream closed normally");
                        }
                        break;
                    }
                    Ok(msg) => {
                        let Some(text) = message_text(&msg) else { continue };
                        match decode_server_message(&text) {
                            Ok(events) => {
                                for event in events {
                                    yield Ok(event);
                                }
                            }
                            Err(e) => {
                                yield Err(e);
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(ResponderError::Stream(e.to_string()));
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

/// Aborts the request writer when the event stream is dropped.
struct WriterGuard(JoinHandle<()>);

impl Drop for WriterGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Drain the request queue into the socket until the close sentinel.
///
/// A request whose write fails, or whose write is cut short by the task
/// being aborted, is put back at the front of the queue for the next stream.
async fn pump_requests<S>(mut sink: S, requests: LiveRequestQueue)
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(unacked) = requests.recv_unacked().await {
        let Some(payload) = encode_request(unacked.request()) else {
            unacked.ack();
            debug!("Request queue closed, closing live stream");
            let _ = sink.send(Message::Close(None)).await;
            return;
        };
        if let Err(e) = sink.send(Message::Text(payload.to_string().into())).await {
            warn!(error = %e, "Live request write failed, keeping request for the next stream");
            return;
        }
        unacked.ack();
    }
}

fn message_text(msg: &Message) -> Option<String> {
    match msg {
        Message::Text(text) => Some(text.as_str().to_owned()),
        Message::Binary(bytes) => String::from_utf8(bytes.to_vec()).ok(),
        _ => None,
    }
}

/// Map an abnormal close to an error; a normal close (or none) is a clean end.
fn close_error(frame: Option<&CloseFrame>) -> Option<ResponderError> {
    let frame = frame?;
    (frame.code != CloseCode::Normal).then(|| {
        ResponderError::Closed(format!(
            "close code {}: {}",
            u16::from(frame.code),
            frame.reason
        ))
    })
}

/// Encode a request for the wire. `None` for the close sentinel.
pub fn encode_request(request: &LiveRequest) -> Option<Value> {
    match request {
        LiveRequest::Realtime(blob) => Some(json!({
            "realtimeInput": { "mediaChunks": [inline_data(blob)] }
        })),
        LiveRequest::Content(content) => {
            let parts: Vec<Value> = content
                .parts
                .iter()
                .map(|part| match part {
                    Part::Text(text) => json!({ "text": text }),
                    Part::Inline(blob) => json!({ "inlineData": inline_data(blob) }),
                })
                .collect();
            Some(json!({
                "clientContent": {
                    "turns": [{ "role": content.role.as_str(), "parts": parts }],
                    "turnComplete": true,
                }
            }))
        }
        LiveRequest::Close => None,
    }
}

fn inline_data(blob: &Blob) -> Value {
    json!({ "mimeType": blob.mime_type, "data": encode_base64(&blob.data) })
}

/// Decode one server message into events.
///
/// `goAway` is reported as an error so the supervisor re-opens the stream
/// with the latest resumption handle.
pub fn decode_server_message(text: &str) -> Result<Vec<LiveEvent>, ResponderError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ResponderError::Protocol(format!("invalid server message: {e}")))?;

    if let Some(go_away) = value.get("goAway") {
        let time_left = go_away
            .get("timeLeft")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        return Err(ResponderError::Closed(format!(
            "server sent goAway (time left {time_left}), close code 1011"
        )));
    }

    let mut events = Vec::new();

    if let Some(update) = value.get("sessionResumptionUpdate") {
        events.push(LiveEvent::Resumption(ResumptionUpdate {
            new_handle: update
                .get("newHandle")
                .and_then(Value::as_str)
                .map(String::from),
            resumable: update
                .get("resumable")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }));
    }

    if let Some(content) = value.get("serverContent") {
        if let Some(text) = transcription(content, "inputTranscription") {
            events.push(LiveEvent::user_text(text));
        }
        if let Some(parts) = content.pointer("/modelTurn/parts").and_then(Value::as_array) {
            let parts: Vec<Part> = parts.iter().filter_map(decode_part).collect();
            if !parts.is_empty() {
                events.push(LiveEvent::Content {
                    role: Role::Model,
                    parts,
                    partial: true,
                });
            }
        }
        if let Some(text) = transcription(content, "outputTranscription") {
            events.push(LiveEvent::model_text(text));
        }
        if flag(content, "interrupted") {
            events.push(LiveEvent::Interrupted);
        }
        if flag(content, "turnComplete") {
            events.push(LiveEvent::TurnComplete);
        }
    }

    if events.is_empty() {
        debug!(keys = ?value.as_object().map(|o| o.keys().collect::<Vec<_>>()), "Ignoring server message");
    }
    Ok(events)
}

fn transcription(content: &Value, key: &str) -> Option<String> {
    content
        .get(key)
        .and_then(|t| t.get("text"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

fn flag(content: &Value, key: &str) -> bool {
    content.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn decode_part(part: &Value) -> Option<Part> {
    if let Some(text) = part.get("text").and_then(Value::as_str) {
        return Some(Part::Text(text.to_string()));
    }
    let inline = part.get("inlineData")?;
    let mime = inline.get("mimeType").and_then(Value::as_str)?;
    let data = inline.get("data").and_then(Value::as_str).unwrap_or_default();
    match decode_base64(data) {
        Ok(bytes) => Some(Part::Inline(Blob::new(bytes, mime))),
        Err(e) => {
            warn!(mime, error = %e, "Dropping undecodable inline part");
            None
        }
    }
}

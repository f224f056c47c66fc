//! `GET /ws`: bridges one WebSocket to one session.
//!
//! A reader task feeds client text frames to the session; a writer task
//! serialises outbound messages until the session drops its senders.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use sanskara_core::protocol::ServerMessage;

use super::AppState;

const INBOUND_BUFFER: usize = 256;
const OUTBOUND_BUFFER: usize = 256;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub user_id: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Response {
    let user_id = params
        .user_id
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| state.default_user_id.clone());

    ws.max_message_size(state.max_frame_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: String) {
    info!(user_id = %user_id, "Client connected");
    let (mut sink, mut stream) = socket.split();
    let (inbound_tx, inbound_rx) = mpsc::channel::<String>(INBOUND_BUFFER);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);

    let reader = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            let text = match msg {
                Ok(Message::Text(text)) => text.as_str().to_owned(),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("Dropping non-UTF-8 binary frame");
                        continue;
                    }
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!(error = %e, "WebSocket read failed");
                    break;
                }
            };
            if inbound_tx.send(text).await.is_err() {
                break;
            }
        }
    });

    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, "Failed to serialise server message");
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    if let Err(e) = state.manager.serve(user_id.clone(), inbound_rx, outbound_tx).await {
        warn!(user_id = %user_id, error = %e, "Session ended with error");
    }

    reader.abort();
    let _ = writer.await;
    info!(user_id = %user_id, "Client disconnected");
}

//! Client frame parser.
//!
//! Implements tolerant reader pattern: unknown fields ignored, unknown types surfaced.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use super::types::ClientFrame;
use crate::error::{Error, Result};

/// Parse a single JSON text frame from the client.
pub fn parse_frame(text: &str) -> Result<ClientFrame> {
    let raw: Value = serde_json::from_str(text)?;
    parse_frame_value(&raw)
}

/// Parse a JSON value into a client frame.
pub fn parse_frame_value(raw: &Value) -> Result<ClientFrame> {
    let frame_type = raw
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Protocol("Missing 'type' field".into()))?;

    match frame_type {
        "audio" => Ok(ClientFrame::Audio {
            data: binary_payload(raw)?,
        }),
        "video" => Ok(ClientFrame::Video {
            data: binary_payload(raw)?,
            mode: raw
                .get("mode")
                .and_then(|v| v.as_str())
                .filter(|m| !m.is_empty())
                .map(String::from),
        }),
        "text" => Ok(ClientFrame::Text {
            data: text_payload(raw.get("data")),
        }),
        "end" => Ok(ClientFrame::End),
        other => Ok(ClientFrame::Unknown {
            frame_type: other.to_string(),
        }),
    }
}

fn binary_payload(raw: &Value) -> Result<Vec<u8>> {
    let encoded = raw.get("data").and_then(|v| v.as_str()).unwrap_or("");
    decode_base64(encoded)
}

fn text_payload(data: Option<&Value>) -> String {
    match data {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Decode a standard base64 payload.
pub fn decode_base64(input: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(input.trim())
        .map_err(|e| Error::Protocol(format!("Invalid base64 payload: {e}")))
}

/// Encode bytes as standard base64.
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

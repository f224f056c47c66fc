//! Message types for the client-facing session protocol.

use serde::{Deserialize, Serialize};

/// Default video mode when a frame omits `mode`.
pub const DEFAULT_VIDEO_MODE: &str = "webcam";

/// Inbound frame from a connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// Raw PCM audio chunk (already base64-decoded).
    Audio { data: Vec<u8> },
    /// JPEG video frame plus the capture mode (`webcam`, `screen`, ...).
    Video { data: Vec<u8>, mode: Option<String> },
    /// User text, possibly containing `[FILES: ...]` markup.
    Text { data: String },
    /// Client-side end-of-turn marker.
    End,
    /// Frame with a `type` this server does not understand.
    Unknown { frame_type: String },
}

impl ClientFrame {
    /// The wire discriminant, used for logging.
    pub fn kind(&self) -> &str {
        match self {
            Self::Audio { .. } => "audio",
            Self::Video { .. } => "video",
            Self::Text { .. } => "text",
            Self::End => "end",
            Self::Unknown { frame_type } => frame_type,
        }
    }
}

/// Outbound message to a connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Handshake: the session identifier assigned to this connection.
    Session { session_id: String },
    /// Handshake: the server is ready to accept frames.
    Ready,
    /// A user-visible error. Sent for handshake problems and terminal stream failures.
    Error { data: String },
    /// Incremental model text.
    Text { data: String },
    /// Model audio (base64).
    Audio { data: String, mime: String },
    /// Model image (base64).
    Image { data: String, mime: String },
    /// Any other binary part (base64).
    Blob { data: String, mime: String },
    /// The current model response was interrupted by user input.
    Interrupted { data: String },
    /// The model finished its turn.
    TurnComplete { session_id: Option<String> },
    /// A new resumption handle was issued by the backend.
    SessionId { data: String },
    /// The backend stream failed transiently and is being re-opened.
    Reconnecting { data: ReconnectingInfo },
}

/// Payload of [`ServerMessage::Reconnecting`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectingInfo {
    pub attempt: u32,
    /// Seconds until the next attempt.
    pub retry_in: f64,
}

/// Classification of an outbound binary part by MIME prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Image,
    Blob,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("audio/") {
            Self::Audio
        } else if mime.starts_with("image/") {
            Self::Image
        } else {
            Self::Blob
        }
    }
}

impl ServerMessage {
    /// Build the message for a binary part, picking the variant from its MIME type.
    pub fn media(bytes: &[u8], mime: &str) -> Self {
        let data = super::encode_base64(bytes);
        let mime = mime.to_string();
        match MediaKind::from_mime(&mime) {
            MediaKind::Audio => Self::Audio { data, mime },
            MediaKind::Image => Self::Image { data, mime },
            MediaKind::Blob => Self::Blob { data, mime },
        }
    }

    pub fn error(data: impl Into<String>) -> Self {
        Self::Error { data: data.into() }
    }

    /// Whether this message ends a logical turn from the client's point of view.
    pub const fn is_turn_terminal(&self) -> bool {
        matches!(self, Self::TurnComplete { .. } | Self::Interrupted { .. })
    }
}

//! Request and event types exchanged with the realtime backend.

/// Binary payload tagged with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl Blob {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }
}

/// One part of a structured turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Inline(Blob),
}

impl Part {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Inline(_) => None,
        }
    }
}

/// Speaker of a content event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// A structured turn sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub const fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }
}

/// Item on the backend request stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveRequest {
    /// Realtime media (audio chunk or video frame).
    Realtime(Blob),
    /// A complete user turn.
    Content(Content),
    /// End of the request stream.
    Close,
}

/// Resumption handle update issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumptionUpdate {
    pub new_handle: Option<String>,
    pub resumable: bool,
}

impl ResumptionUpdate {
    /// The handle to store, if the update carries a usable one.
    pub fn usable_handle(&self) -> Option<&str> {
        self.new_handle
            .as_deref()
            .filter(|h| self.resumable && !h.is_empty())
    }
}

/// Backend event, decoded once at the stream boundary.
///
/// A single backend message that carries several flags is decoded into
/// several events in this order: resumption, content, interrupted,
/// turn complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Content parts from one speaker. `partial` marks streaming fragments.
    Content {
        role: Role,
        parts: Vec<Part>,
        partial: bool,
    },
    /// The model response was cut off by user input.
    Interrupted,
    /// The model finished its turn.
    TurnComplete,
    /// New resumption handle.
    Resumption(ResumptionUpdate),
}

impl LiveEvent {
    /// Short name for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Content { .. } => "content",
            Self::Interrupted => "interrupted",
            Self::TurnComplete => "turn_complete",
            Self::Resumption(_) => "resumption",
        }
    }

    /// Partial model text fragment.
    pub fn model_text(text: impl Into<String>) -> Self {
        Self::Content {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
            partial: true,
        }
    }

    /// User speech transcription fragment.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::Content {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
            partial: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resumption_handle_requires_resumable() {
        let update = ResumptionUpdate {
            new_handle: Some("h-1".into()),
            resumable: false,
        };
        assert_eq!(update.usable_handle(), None);

        let update = ResumptionUpdate {
            new_handle: Some("h-1".into()),
            resumable: true,
        };
        assert_eq!(update.usable_handle(), Some("h-1"));
    }

    #[test]
    fn empty_handle_is_not_usable() {
        let update = ResumptionUpdate {
            new_handle: Some(String::new()),
            resumable: true,
        };
        assert_eq!(update.usable_handle(), None);
    }

    #[test]
    fn text_helpers_mark_partial() {
        let LiveEvent::Content { role, partial, .. } = LiveEvent::model_text("hi") else {
            panic!("expected content");
        };
        assert_eq!(role, Role::Model);
        assert!(partial);
    }
}

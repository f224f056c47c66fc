//! Session data model.

use tracing::debug;

use super::state::SessionState;

/// Well-known session state keys.
pub mod keys {
    pub const CURRENT_WEDDING_ID: &str = "current_wedding_id";
    pub const CURRENT_USER_ID: &str = "current_user_id";
    pub const CURRENT_USER_ROLE: &str = "current_user_role";
    /// Latest resumption handle. Written only by the response dispatcher.
    pub const RESUMPTION_HANDLE: &str = "adk_session_id";
    /// Completed turns. Written only by the response dispatcher.
    pub const TURN_COUNT: &str = "turn_count";
}

/// Where a session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    Created,
    ContextPrimed,
    Streaming,
    Closed,
}

/// One client connection's conversation.
#[derive(Debug)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    /// Resolved once at creation; `None` when the user has no wedding yet.
    pub wedding_id: Option<String>,
    pub state: SessionState,
    lifecycle: Lifecycle,
}

impl Session {
    pub fn new(session_id: String, user_id: String) -> Self {
        Self {
            session_id,
            user_id,
            wedding_id: None,
            state: SessionState::default(),
            lifecycle: Lifecycle::Created,
        }
    }

    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Move forward to `next`. Returns `false` (and stays put) for a
    /// transition that would go backwards.
    pub fn advance(&mut self, next: Lifecycle) -> bool {
        if next <= self.lifecycle {
            return false;
        }
        debug!(
            session_id = %self.session_id,
            from = ?self.lifecycle,
            to = ?next,
            "Session lifecycle"
        );
        self.lifecycle = next;
        true
    }
}

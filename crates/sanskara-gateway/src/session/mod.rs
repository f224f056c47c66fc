//! Sessions: data model, shared state, per-turn bookkeeping, context priming
//! and the lifecycle manager.

mod error;
mod manager;
pub mod priming;
mod state;
pub mod turn;
mod types;

pub use error::SessionError;
pub use manager::{NO_WEDDING_TEXT, SessionManager, SessionSettings};
pub use state::SessionState;
pub use types::{Lifecycle, Session, keys};

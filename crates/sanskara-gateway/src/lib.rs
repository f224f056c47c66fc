//! Sanskara Gateway Library
//!
//! Realtime multimodal session orchestration for the wedding-planning
//! assistant:
//! - Per-connection session lifecycle with context priming
//! - Audio, video and text channel routing into the live backend
//! - Backend event dispatch to typed client messages
//! - Bounded reconnection across transient backend failures
//! - Relational and artifact storage, and the HTTP/WebSocket surface

pub mod artifacts;
pub mod channel;
pub mod dispatch;
pub mod live;
pub mod reconnect;
pub mod server;
pub mod session;
pub mod storage;

//! Sanskara Core Library
//!
//! Shared functionality for Sanskara components:
//! - Client-facing wire protocol for the realtime session socket
//! - Configuration resolution and hierarchy
//! - SQLite pool helpers
//! - Common error types and tracing bootstrap

pub mod config;
pub mod db;
pub mod error;
pub mod protocol;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};

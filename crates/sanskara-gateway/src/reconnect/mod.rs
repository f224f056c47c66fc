//! Backend stream recovery.

mod classify;
mod policy;
mod supervisor;

pub use classify::{FailureClass, classify};
pub use policy::ReconnectPolicy;
pub use supervisor::{ReconnectSupervisor, TERMINAL_ERROR_TEXT};

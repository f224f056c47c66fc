//! Backend boundary: the request queue feeding a realtime generative
//! backend and the events it streams back.

mod error;
pub mod gemini;
pub mod instruction;
mod request_queue;
mod responder;
mod types;

pub use error::ResponderError;
pub use gemini::GeminiLiveResponder;
pub use request_queue::{LiveRequestQueue, QueueClosed};
pub use responder::{EventStream, LiveContext, Responder};
pub use types::{Blob, Content, LiveEvent, LiveRequest, Part, ResumptionUpdate, Role};

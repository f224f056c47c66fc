//! Wire protocol for the realtime session socket.
//!
//! Client frames arrive as JSON text frames carrying a `type` discriminant;
//! server messages are serialised back the same way. Parsing follows a
//! tolerant reader pattern: unknown frame types are surfaced as
//! [`ClientFrame::Unknown`] rather than rejected.

mod parser;
mod types;

pub use parser::{decode_base64, encode_base64, parse_frame, parse_frame_value};
pub use types::*;

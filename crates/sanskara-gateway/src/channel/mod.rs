//! Client input path: per-modality queues, the multiplexer feeding them and
//! the forwarders draining them into the backend request stream.

pub mod artifact_refs;
mod forwarder;
mod multiplexer;
mod queue;

pub use artifact_refs::{ExtractedRefs, build_user_turn, extract_references};
pub use forwarder::{AudioForwarder, TextForwarder, VideoForwarder};
pub use multiplexer::{InputMultiplexer, MultiplexerStats};
pub use queue::{
    AudioChunk, ChannelReceivers, ChannelSenders, TextMessage, VideoFrame, channel_queues,
};

//! Per-modality input queues.
//!
//! Each modality gets its own unbounded FIFO, so ordering holds within a
//! channel and a slow channel never blocks another.

use tokio::sync::mpsc;

/// Decoded PCM audio chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk(pub Vec<u8>);

/// Decoded JPEG frame and its capture mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub mode: String,
}

/// User text, possibly carrying artifact references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage(pub String);

/// Producer ends of the three channel queues.
#[derive(Clone)]
pub struct ChannelSenders {
    pub audio: mpsc::UnboundedSender<AudioChunk>,
    pub video: mpsc::UnboundedSender<VideoFrame>,
    pub text: mpsc::UnboundedSender<TextMessage>,
}

/// Consumer ends of the three channel queues.
pub struct ChannelReceivers {
    pub audio: mpsc::UnboundedReceiver<AudioChunk>,
    pub video: mpsc::UnboundedReceiver<VideoFrame>,
    pub text: mpsc::UnboundedReceiver<TextMessage>,
}

/// Create the audio, video and text queues for one session.
pub fn channel_queues() -> (ChannelSenders, ChannelReceivers) {
    let (audio_tx, audio_rx) = mpsc::unbounded_channel();
    let (video_tx, video_rx) = mpsc::unbounded_channel();
    let (text_tx, text_rx) = mpsc::unbounded_channel();
    (
        ChannelSenders {
            audio: audio_tx,
            video: video_tx,
            text: text_tx,
        },
        ChannelReceivers {
            audio: audio_rx,
            video: video_rx,
            text: text_rx,
        },
    )
}

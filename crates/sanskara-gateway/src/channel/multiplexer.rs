//! Routes inbound client frames into the channel queues.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use sanskara_core::protocol::{ClientFrame, parse_frame};

use super::queue::{AudioChunk, ChannelSenders, TextMessage, VideoFrame};
use crate::session::SessionError;

/// Frame counters for one session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MultiplexerStats {
    pub audio: u64,
    pub video: u64,
    pub text: u64,
    pub end: u64,
    pub dropped: u64,
}

/// Classifies raw client frames and pushes them onto the matching queue.
pub struct InputMultiplexer {
    senders: ChannelSenders,
    default_video_mode: String,
    stats: MultiplexerStats,
}

impl InputMultiplexer {
    pub fn new(senders: ChannelSenders, default_video_mode: impl Into<String>) -> Self {
        Self {
            senders,
            default_video_mode: default_video_mode.into(),
            stats: MultiplexerStats::default(),
        }
    }

    pub const fn stats(&self) -> MultiplexerStats {
        self.stats
    }

    /// Route one raw frame.
    ///
    /// Malformed and unknown frames are logged and dropped. Only a closed
    /// queue is an error, since it means the forwarder behind it is gone.
    pub fn route(&mut self, raw: &str) -> Result<(), SessionError> {
        let frame = match parse_frame(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Dropping malformed client frame");
                self.stats.dropped += 1;
                return Ok(());
            }
        };

        match frame {
            ClientFrame::Audio { data } => {
                self.senders
                    .audio
                    .send(AudioChunk(data))
                    .map_err(|_| SessionError::Queue("audio"))?;
                self.stats.audio += 1;
            }
            ClientFrame::Video { data, mode } => {
                let mode = mode.unwrap_or_else(|| self.default_video_mode.clone());
                self.senders
                    .video
                    .send(VideoFrame { data, mode })
                    .map_err(|_| SessionError::Queue("video"))?;
                self.stats.video += 1;
            }
            ClientFrame::Text { data } => {
                debug!(len = data.len(), "Text frame");
                self.senders
                    .text
                    .send(TextMessage(data))
                    .map_err(|_| SessionError::Queue("text"))?;
                self.stats.text += 1;
            }
            ClientFrame::End => {
                debug!("Client signalled end of turn");
                self.stats.end += 1;
            }
            ClientFrame::Unknown { frame_type } => {
                warn!(frame_type = %frame_type, "Dropping frame of unknown type");
                self.stats.dropped += 1;
            }
        }
        Ok(())
    }

    /// Consume client frames until the connection closes.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<String>) -> Result<(), SessionError> {
        while let Some(raw) = inbound.recv().await {
            self.route(&raw)?;
        }
        let stats = self.stats;
        info!(
            audio = stats.audio,
            video = stats.video,
            text = stats.text,
            dropped = stats.dropped,
            "Client input closed"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::channel::queue::channel_queues;

    #[test]
    fn frames_route_to_their_queues() {
        let (senders, mut receivers) = channel_queues();
        let mut mux = InputMultiplexer::new(senders, "webcam");

        mux.route(r#"{"type":"audio","data":"AAE="}"#).unwrap();
        mux.route(r#"{"type":"video","data":"/9j/"}"#).unwrap();
        mux.route(r#"{"type":"video","data":"/9j/","mode":"screen"}"#).unwrap();
        mux.route(r#"{"type":"text","data":"Hello"}"#).unwrap();
        mux.route(r#"{"type":"end"}"#).unwrap();

        assert_eq!(receivers.audio.try_recv().unwrap(), AudioChunk(vec![0, 1]));
        assert_eq!(receivers.video.try_recv().unwrap().mode, "webcam");
        assert_eq!(receivers.video.try_recv().unwrap().mode, "screen");
        assert_eq!(
            receivers.text.try_recv().unwrap(),
            TextMessage("Hello".into())
        );
        assert!(receivers.text.try_recv().is_err());

        let stats = mux.stats();
        assert_eq!((stats.audio, stats.video, stats.text, stats.end), (1, 2, 1, 1));
    }

    #[test]
    fn bad_frames_are_dropped_without_error() {
        let (senders, mut receivers) = channel_queues();
        let mut mux = InputMultiplexer::new(senders, "webcam");

        mux.route("not json").unwrap();
        mux.route(r#"{"data":"no type"}"#).unwrap();
        mux.route(r#"{"type":"audio","data":"%%%"}"#).unwrap();
        mux.route(r#"{"type":"ping"}"#).unwrap();
        mux.route(r#"{"type":"text","data":"still here"}"#).unwrap();

        assert_eq!(mux.stats().dropped, 4);
        assert_eq!(
            receivers.text.try_recv().unwrap(),
            TextMessage("still here".into())
        );
    }

    #[test]
    fn closed_queue_is_an_error() {
        let (senders, receivers) = channel_queues();
        drop(receivers);
        let mut mux = InputMultiplexer::new(senders, "webcam");
        let err = mux.route(r#"{"type":"text","data":"x"}"#).unwrap_err();
        assert!(matches!(err, SessionError::Queue("text")));
    }

    #[tokio::test]
    async fn run_ends_when_client_closes() {
        let (senders, mut receivers) = channel_queues();
        let (tx, rx) = mpsc::channel(8);
        tx.send(r#"{"type":"text","data":"one"}"#.to_string())
            .await
            .unwrap();
        drop(tx);

        InputMultiplexer::new(senders, "webcam")
            .run(rx)
            .await
            .unwrap();
        assert_eq!(receivers.text.recv().await, Some(TextMessage("one".into())));
    }
}

//! Channel forwarders: drain one queue each into the backend request stream.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use super::artifact_refs::build_user_turn;
use super::queue::{AudioChunk, TextMessage, VideoFrame};
use crate::artifacts::ArtifactStore;
use crate::live::{Blob, LiveRequestQueue};
use crate::session::SessionError;

const VIDEO_MIME: &str = "image/jpeg";

/// Forwards PCM chunks as realtime blobs.
pub struct AudioForwarder {
    requests: LiveRequestQueue,
    mime: String,
}

impl AudioForwarder {
    pub fn new(requests: LiveRequestQueue, sample_rate: u32) -> Self {
        Self {
            requests,
            mime: format!("audio/pcm;rate={sample_rate}"),
        }
    }

    pub async fn run(self, mut queue: UnboundedReceiver<AudioChunk>) -> Result<(), SessionError> {
        let mut forwarded = 0u64;
        while let Some(AudioChunk(data)) = queue.recv().await {
            self.requests
                .send_realtime(Blob::new(data, self.mime.clone()))
                .map_err(|_| SessionError::Queue("live request"))?;
            forwarded += 1;
        }
        debug!(forwarded, "Audio channel drained");
        Ok(())
    }
}

/// Forwards video frames as realtime JPEG blobs.
pub struct VideoForwarder {
    requests: LiveRequestQueue,
}

impl VideoForwarder {
    pub const fn new(requests: LiveRequestQueue) -> Self {
        Self { requests }
    }

    pub async fn run(self, mut queue: UnboundedReceiver<VideoFrame>) -> Result<(), SessionError> {
        let mut forwarded = 0u64;
        while let Some(VideoFrame { data, mode }) = queue.recv().await {
            if forwarded == 0 {
                info!(mode = %mode, "Video stream started");
            }
            self.requests
                .send_realtime(Blob::new(data, VIDEO_MIME))
                .map_err(|_| SessionError::Queue("live request"))?;
            forwarded += 1;
        }
        debug!(forwarded, "Video channel drained");
        Ok(())
    }
}

/// Forwards text as structured user turns, attaching referenced artifacts.
pub struct TextForwarder {
    requests: LiveRequestQueue,
    artifacts: Arc<dyn ArtifactStore>,
}

impl TextForwarder {
    pub fn new(requests: LiveRequestQueue, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self {
            requests,
            artifacts,
        }
    }

    pub async fn run(self, mut queue: UnboundedReceiver<TextMessage>) -> Result<(), SessionError> {
        while let Some(TextMessage(text)) = queue.recv().await {
            let Some(turn) = build_user_turn(&text, self.artifacts.as_ref()).await else {
                debug!("Skipping empty text message");
                continue;
            };
            debug!(parts = turn.parts.len(), "Forwarding user turn");
            self.requests
                .send_content(turn)
                .map_err(|_| SessionError::Queue("live request"))?;
        }
        debug!("Text channel drained");
        Ok(())
    }
}

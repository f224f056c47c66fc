//! Artifact storage: files a user uploaded that text turns can reference by
//! name.

mod fs;
mod memory;

use async_trait::async_trait;
use serde::Serialize;

use crate::live::Blob;

pub use fs::FsArtifactStore;
pub use memory::InMemoryArtifactStore;

/// Artifact storage errors.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid artifact name: {0}")]
    InvalidName(String),
}

/// Artifact metadata, without the content bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactMeta {
    pub artifact_id: String,
    pub wedding_id: String,
    pub user_id: Option<String>,
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
    pub caption: Option<String>,
    pub created_at: i64,
}

/// Named binary artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Load an artifact by filename. `Ok(None)` when no such artifact exists.
    async fn load(&self, filename: &str) -> Result<Option<Blob>, ArtifactError>;

    /// Most recent artifacts of a wedding, newest first.
    async fn recent(
        &self,
        _wedding_id: &str,
        _limit: usize,
    ) -> Result<Vec<ArtifactMeta>, ArtifactError> {
        Ok(Vec::new())
    }
}

/// Guess a MIME type from the file extension.
pub fn mime_for_name(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

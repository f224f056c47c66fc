//! Directory-backed artifact store.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::{ArtifactError, ArtifactStore, mime_for_name};
use crate::live::Blob;

/// Loads artifacts from files directly under a root directory.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf, ArtifactError> {
        if filename.is_empty()
            || filename.contains(['/', '\\'])
            || filename == "."
            || filename.contains("..")
        {
            return Err(ArtifactError::InvalidName(filename.to_string()));
        }
        Ok(self.root.join(filename))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn load(&self, filename: &str) -> Result<Option<Blob>, ArtifactError> {
        let path = self.path_for(filename)?;
        match tokio::fs::read(&path).await {
            Ok(data) => {
                debug!(path = %path.display(), size = data.len(), "Artifact loaded");
                Ok(Some(Blob::new(data, mime_for_name(filename))))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

//! Process-local artifact store for tests and embedders that upload
//! through [`InMemoryArtifactStore::add`]. The gateway binary serves a
//! directory instead.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use sanskara_core::db::unix_timestamp;

use super::{ArtifactError, ArtifactMeta, ArtifactStore};
use crate::live::Blob;

struct StoredArtifact {
    meta: ArtifactMeta,
    content: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    artifacts: HashMap<String, StoredArtifact>,
    /// wedding id -> artifact ids in insertion order
    by_wedding: HashMap<String, Vec<String>>,
    /// filename -> latest artifact id
    by_name: HashMap<String, String>,
}

/// Artifacts kept in memory for the lifetime of the process.
#[derive(Default)]
pub struct InMemoryArtifactStore {
    inner: RwLock<Inner>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an upload. A later upload with the same filename shadows earlier
    /// ones for [`ArtifactStore::load`].
    pub async fn add(
        &self,
        wedding_id: &str,
        user_id: Option<&str>,
        filename: &str,
        content: Vec<u8>,
        mime_type: &str,
        caption: Option<&str>,
    ) -> ArtifactMeta {
        let meta = ArtifactMeta {
            artifact_id: uuid::Uuid::new_v4().to_string(),
            wedding_id: wedding_id.to_string(),
            user_id: user_id.map(String::from),
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            size: content.len(),
            caption: caption.map(String::from),
            created_at: unix_timestamp(),
        };

        let mut inner = self.inner.write().await;
        inner
            .by_wedding
            .entry(meta.wedding_id.clone())
            .or_default()
            .push(meta.artifact_id.clone());
        inner
            .by_name
            .insert(meta.filename.clone(), meta.artifact_id.clone());
        inner.artifacts.insert(
            meta.artifact_id.clone(),
            StoredArtifact {
                meta: meta.clone(),
                content,
            },
        );
        drop(inner);

        info!(
            filename,
            size = meta.size,
            wedding_id,
            artifact_id = %meta.artifact_id,
            "Artifact stored"
        );
        meta
    }

    /// Raw content of an artifact by id.
    pub async fn bytes(&self, artifact_id: &str) -> Result<Vec<u8>, ArtifactError> {
        self.inner
            .read()
            .await
            .artifacts
            .get(artifact_id)
            .map(|a| a.content.clone())
            .ok_or_else(|| ArtifactError::NotFound(artifact_id.to_string()))
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn load(&self, filename: &str) -> Result<Option<Blob>, ArtifactError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_name
            .get(filename)
            .and_then(|id| inner.artifacts.get(id))
            .map(|a| Blob::new(a.content.clone(), a.meta.mime_type.clone())))
    }

    async fn recent(
        &self,
        wedding_id: &str,
        limit: usize,
    ) -> Result<Vec<ArtifactMeta>, ArtifactError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_wedding
            .get(wedding_id)
            .map(|ids| {
                ids.iter()
                    .rev()
                    .filter_map(|id| inner.artifacts.get(id))
                    .take(limit)
                    .map(|a| a.meta.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

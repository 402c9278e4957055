use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::store::artifact_store::{compute_digests, ArtifactStore, AssetDigests};

/// In-memory artifact store, neither optimized nor particularly robust - for
/// testing purposes.
pub struct TransientArtifactStore {
    data: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl TransientArtifactStore {
    pub fn new() -> TransientArtifactStore {
        TransientArtifactStore {
            data: Default::default(),
        }
    }

    /// All stored paths, sorted - convenient for assertions.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.data.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl Default for TransientArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactStore for TransientArtifactStore {
    async fn get(&self, path: &str) -> anyhow::Result<Option<Bytes>> {
        Ok(self.data.lock().unwrap().get(path).cloned())
    }

    async fn put(
        &self,
        path: &str,
        data: Bytes,
        _content_type: &str,
    ) -> anyhow::Result<AssetDigests> {
        let digests = compute_digests(&data);
        self.data.lock().unwrap().insert(path.to_string(), data);
        Ok(digests)
    }

    async fn delete(&self, path: &str, subordinates: &[String]) -> anyhow::Result<bool> {
        let mut data = self.data.lock().unwrap();
        let existed = data.remove(path).is_some();
        for subordinate in subordinates {
            data.remove(subordinate);
        }
        Ok(existed)
    }
}

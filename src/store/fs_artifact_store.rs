use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::fs::{create_dir_all, remove_file, rename, try_exists, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::trace;
use uuid::Uuid;

use crate::store::artifact_store::{compute_digests, ArtifactStore, AssetDigests};

/// Per-path attribute sidecar, stored outside the content tree.
#[derive(Serialize, Deserialize)]
struct AssetAttributes {
    content_type: String,
    sha1: String,
    md5: String,
}

/// File-system backed artifact store.
///
/// Content lives under `<root>/content/<repository path>`, attributes under
/// `<root>/attributes/<repository path>.json`. Writes go to a temp file that
/// is renamed into place so that readers never observe partial content.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: PathBuf) -> FsArtifactStore {
        FsArtifactStore { root }
    }

    fn content_path(&self, path: &str) -> PathBuf {
        self.root.join("content").join(path)
    }

    fn attributes_path(&self, path: &str) -> PathBuf {
        self.root.join("attributes").join(format!("{}.json", path))
    }

    async fn write_atomically(target: &Path, data: &[u8]) -> anyhow::Result<()> {
        let parent = target
            .parent()
            .ok_or_else(|| anyhow::anyhow!("path without parent: {}", target.display()))?;
        create_dir_all(parent).await?;

        let temp_path = parent.join(format!(".{}.writing", Uuid::new_v4().as_hyphenated()));
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;
        drop(file);

        rename(&temp_path, target).await?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn get(&self, path: &str) -> anyhow::Result<Option<Bytes>> {
        let content_path = self.content_path(path);
        trace!("getting {} from {}", path, content_path.display());
        match tokio::fs::read(&content_path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> anyhow::Result<AssetDigests> {
        let digests = compute_digests(&data);
        trace!("putting {} ({} bytes)", path, data.len());

        Self::write_atomically(&self.content_path(path), &data).await?;

        let attributes = AssetAttributes {
            content_type: content_type.to_string(),
            sha1: digests[&crate::maven::coordinates::HashType::Sha1].clone(),
            md5: digests[&crate::maven::coordinates::HashType::Md5].clone(),
        };
        let attributes_json = serde_json::to_vec(&attributes)?;
        Self::write_atomically(&self.attributes_path(path), &attributes_json).await?;

        Ok(digests)
    }

    async fn delete(&self, path: &str, subordinates: &[String]) -> anyhow::Result<bool> {
        let mut existed = false;
        let mut targets = vec![path.to_string()];
        targets.extend_from_slice(subordinates);

        for (i, target) in targets.iter().enumerate() {
            for file in [self.content_path(target), self.attributes_path(target)] {
                if try_exists(&file).await? {
                    trace!("deleting {}", file.display());
                    remove_file(&file).await?;
                    if i == 0 {
                        existed = true;
                    }
                }
            }
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::maven::coordinates::HashType;

    fn temp_store() -> FsArtifactStore {
        let root = std::env::temp_dir().join(format!("arti-metadata-test-{}", Uuid::new_v4()));
        FsArtifactStore::new(root)
    }

    #[tokio::test]
    async fn test_put_get_delete_round_trip() {
        let store = temp_store();
        let path = "org/acme/a/1.0/a-1.0.jar";

        assert!(store.get(path).await.unwrap().is_none());

        let digests = store
            .put(path, Bytes::from_static(b"payload"), "application/java-archive")
            .await
            .unwrap();
        assert!(digests.contains_key(&HashType::Sha1));
        assert!(digests.contains_key(&HashType::Md5));

        let read_back = store.get(path).await.unwrap().unwrap();
        assert_eq!(&read_back[..], b"payload");

        assert!(store.delete(path, &[]).await.unwrap());
        assert!(store.get(path).await.unwrap().is_none());
        assert!(!store.delete(path, &[]).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_subordinates() {
        let store = temp_store();
        let path = "org/acme/maven-metadata.xml";
        let sha1_path = format!("{}.sha1", path);

        store
            .put(path, Bytes::from_static(b"<metadata/>"), "application/xml")
            .await
            .unwrap();
        store
            .put(&sha1_path, Bytes::from_static(b"abc"), "text/plain")
            .await
            .unwrap();

        assert!(store.delete(path, &[sha1_path.clone()]).await.unwrap());
        assert!(store.get(&sha1_path).await.unwrap().is_none());
    }
}

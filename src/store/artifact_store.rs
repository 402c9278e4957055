use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use md5::Context as Md5Context;
use sha1::{Digest, Sha1};

use crate::maven::coordinates::HashType;

/// Lowercase hex digests of stored content, one per supported algorithm.
pub type AssetDigests = HashMap<HashType, String>;

/// Content-addressable artifact store, keyed by repository-relative path.
///
/// `put` computes and returns the digests of the bytes just written; callers
/// derive checksum side-files from those, never from stale values.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn get(&self, path: &str) -> anyhow::Result<Option<Bytes>>;

    async fn put(&self, path: &str, data: Bytes, content_type: &str)
        -> anyhow::Result<AssetDigests>;

    /// Deletes the content at `path` together with the given subordinate
    /// side-file paths. Returns whether the primary path existed.
    async fn delete(&self, path: &str, subordinates: &[String]) -> anyhow::Result<bool>;
}

pub fn compute_digests(data: &[u8]) -> AssetDigests {
    let mut sha1_hasher: Sha1 = Default::default();
    sha1_hasher.update(data);
    let mut md5_hasher = Md5Context::new();
    md5_hasher.consume(data);

    let mut digests = AssetDigests::new();
    digests.insert(HashType::Sha1, hex::encode(sha1_hasher.finalize()));
    digests.insert(HashType::Md5, hex::encode(*md5_hasher.compute()));
    digests
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_compute_digests() {
        let digests = compute_digests(b"hello");
        assert_eq!(
            digests.get(&HashType::Sha1).unwrap(),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
        assert_eq!(
            digests.get(&HashType::Md5).unwrap(),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::maven::coordinates::{HashType, MavenPath};
use crate::maven::metadata::MavenMetadata;
use crate::maven::metadata_xml::{self, MetadataDoc, Plugins, SnapshotVersions, Versioning, Versions};
use crate::maven::versioning::Version;
use crate::maven::{CHECKSUM_CONTENT_TYPE, METADATA_CONTENT_TYPE};
use crate::store::artifact_store::ArtifactStore;

/// Writes repository metadata documents to the artifact store, either merging
/// into or replacing what is already there, and keeps the checksum side-files
/// in sync with every write.
pub struct MetadataUpdater {
    store: Arc<dyn ArtifactStore>,
}

impl MetadataUpdater {
    pub fn new(store: Arc<dyn ArtifactStore>) -> MetadataUpdater {
        MetadataUpdater { store }
    }

    /// Writes metadata, merging the existing document at `path` if there is
    /// one. Corrupted existing metadata is discarded and overwritten.
    pub async fn update(&self, path: &MavenPath, metadata: &MavenMetadata) -> anyhow::Result<()> {
        let new_doc = metadata_xml::from_model(metadata);
        match self.read(path).await? {
            None => self.write(path, &new_doc).await,
            Some(old_doc) => self.write(path, &merge(old_doc, new_doc)).await,
        }
    }

    /// Writes metadata, replacing any existing document at `path`.
    pub async fn replace(&self, path: &MavenPath, metadata: &MavenMetadata) -> anyhow::Result<()> {
        self.write(path, &metadata_xml::from_model(metadata)).await
    }

    /// Deletes the document at `path` and its checksum side-files.
    pub async fn delete(&self, path: &MavenPath) -> anyhow::Result<()> {
        let subordinates: Vec<String> = HashType::ALL
            .iter()
            .map(|ht| path.hash(*ht).path().to_string())
            .collect();
        self.store.delete(path.path(), &subordinates).await?;
        Ok(())
    }

    async fn read(&self, path: &MavenPath) -> anyhow::Result<Option<MetadataDoc>> {
        let bytes = match self.store.get(path.path()).await? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        match metadata_xml::read(&bytes) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                debug!("existing metadata at {} is corrupted, discarding: {}", path.path(), e);
                Ok(None)
            }
        }
    }

    async fn write(&self, path: &MavenPath, doc: &MetadataDoc) -> anyhow::Result<()> {
        let bytes = Bytes::from(metadata_xml::write(doc));
        let digests = self
            .store
            .put(path.path(), bytes, METADATA_CONTENT_TYPE)
            .await?;

        for hash_type in HashType::ALL {
            if let Some(digest) = digests.get(&hash_type) {
                self.store
                    .put(
                        path.hash(hash_type).path(),
                        Bytes::from(digest.clone()),
                        CHECKSUM_CONTENT_TYPE,
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

/// Merges an existing document with a freshly generated one; the new document
/// wins wherever entries collide, except that version history accumulates.
fn merge(old: MetadataDoc, new: MetadataDoc) -> MetadataDoc {
    MetadataDoc {
        groupId: new.groupId.or(old.groupId),
        artifactId: new.artifactId.or(old.artifactId),
        version: new.version.or(old.version),
        versioning: merge_versioning(old.versioning, new.versioning),
        plugins: merge_plugins(old.plugins, new.plugins),
    }
}

fn merge_versioning(old: Option<Versioning>, new: Option<Versioning>) -> Option<Versioning> {
    let (old, new) = match (old, new) {
        (None, None) => return None,
        (Some(old), None) => return Some(old),
        (None, Some(new)) => return Some(new),
        (Some(old), Some(new)) => (old, new),
    };

    let versions = merge_versions(&old, &new);
    let (latest, release) = match &versions {
        Some(versions) => latest_and_release(&versions.version),
        None => (None, None),
    };

    Some(Versioning {
        latest: latest.or(new.latest).or(old.latest),
        release,
        snapshot: merge_snapshot_block(old.snapshot, new.snapshot),
        versions,
        lastUpdated: max_option(old.lastUpdated, new.lastUpdated),
        snapshotVersions: merge_snapshot_versions(old.snapshotVersions, new.snapshotVersions),
    })
}

/// Union of the version lists, deduplicated and re-sorted by version order;
/// unparseable strings go last, in encounter order.
fn merge_versions(old: &Versioning, new: &Versioning) -> Option<Versions> {
    let mut seen = std::collections::HashSet::new();
    let mut parseable: Vec<(Version, String)> = Vec::new();
    let mut unparseable: Vec<String> = Vec::new();

    for versions in old.versions.iter().chain(new.versions.iter()) {
        for raw in &versions.version {
            if !seen.insert(raw.clone()) {
                continue;
            }
            match Version::parse(raw) {
                Ok(version) => parseable.push((version, raw.clone())),
                Err(_) => unparseable.push(raw.clone()),
            }
        }
    }

    if parseable.is_empty() && unparseable.is_empty() {
        return None;
    }

    parseable.sort_by(|a, b| a.0.cmp(&b.0));
    let mut version: Vec<String> = parseable.into_iter().map(|(_, raw)| raw).collect();
    version.extend(unparseable);
    Some(Versions { version })
}

/// Recomputes latest/release as the maxima over an already sorted union.
fn latest_and_release(sorted_versions: &[String]) -> (Option<String>, Option<String>) {
    let latest = sorted_versions
        .iter()
        .rev()
        .find(|v| Version::parse(v).is_ok())
        .cloned();
    let release = sorted_versions
        .iter()
        .rev()
        .find(|v| !v.contains("SNAPSHOT") && Version::parse(v).is_ok())
        .cloned();
    (latest, release)
}

fn merge_snapshot_block(
    old: Option<metadata_xml::SnapshotBlock>,
    new: Option<metadata_xml::SnapshotBlock>,
) -> Option<metadata_xml::SnapshotBlock> {
    match (old, new) {
        (None, None) => None,
        (Some(old), None) => Some(old),
        (None, Some(new)) => Some(new),
        (Some(old), Some(new)) => {
            // dotted timestamps are fixed-width, lexical comparison is
            // chronological; ties go to the higher build number, then new
            let newer = match (&old.timestamp, &new.timestamp) {
                (Some(o), Some(n)) if o > n => old,
                (Some(o), Some(n)) if o == n && old.buildNumber > new.buildNumber => old,
                (Some(_), None) => old,
                _ => new,
            };
            Some(newer)
        }
    }
}

/// Union keyed by (extension, classifier); the entry with the newer
/// `updated` timestamp wins, new winning ties.
fn merge_snapshot_versions(
    old: Option<SnapshotVersions>,
    new: Option<SnapshotVersions>,
) -> Option<SnapshotVersions> {
    if old.is_none() && new.is_none() {
        return None;
    }

    let mut by_key: BTreeMap<(String, String), metadata_xml::SnapshotVersion> = BTreeMap::new();
    for entry in old
        .into_iter()
        .chain(new)
        .flat_map(|sv| sv.snapshotVersion)
    {
        let key = (
            entry.extension.clone().unwrap_or_default(),
            entry.classifier.clone().unwrap_or_default(),
        );
        match by_key.get(&key) {
            Some(existing) if existing.updated > entry.updated => {}
            _ => {
                by_key.insert(key, entry);
            }
        }
    }

    Some(SnapshotVersions {
        snapshotVersion: by_key.into_values().collect(),
    })
}

/// Union keyed by artifactId, new entries overriding old ones in place.
fn merge_plugins(old: Option<Plugins>, new: Option<Plugins>) -> Option<Plugins> {
    let (old, new) = match (old, new) {
        (None, None) => return None,
        (Some(old), None) => return Some(old),
        (None, Some(new)) => return Some(new),
        (Some(old), Some(new)) => (old, new),
    };

    let mut merged = old.plugin;
    for plugin in new.plugin {
        match merged
            .iter_mut()
            .find(|p| p.artifactId == plugin.artifactId)
        {
            Some(existing) => *existing = plugin,
            None => merged.push(plugin),
        }
    }
    Some(Plugins { plugin: merged })
}

fn max_option(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a > b { a } else { b }),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::maven::metadata::{BaseVersions, Plugin};
    use crate::maven::paths::metadata_path;
    use crate::store::artifact_store::compute_digests;
    use crate::store::transient_artifact_store::TransientArtifactStore;
    use chrono::{TimeZone, Utc};

    fn artifact_metadata(versions: &[&str], latest: &str, release: Option<&str>) -> MavenMetadata {
        MavenMetadata::Artifact {
            last_updated: Utc.with_ymd_and_hms(2015, 1, 20, 12, 0, 0).unwrap(),
            group_id: "org.acme".to_string(),
            artifact_id: "tool".to_string(),
            base_versions: BaseVersions {
                latest: latest.to_string(),
                release: release.map(|r| r.to_string()),
                versions: versions.iter().map(|v| v.to_string()).collect(),
            },
        }
    }

    fn group_metadata() -> MavenMetadata {
        MavenMetadata::Group {
            last_updated: Utc.with_ymd_and_hms(2015, 1, 20, 12, 0, 0).unwrap(),
            group_id: "org.acme".to_string(),
            plugins: vec![Plugin::new("tool", "to", Some("Tool"))],
        }
    }

    #[tokio::test]
    async fn test_update_with_non_existing() {
        let store = Arc::new(TransientArtifactStore::new());
        let updater = MetadataUpdater::new(store.clone());
        let path = metadata_path("org.acme", Some("tool"), None);

        updater
            .update(&path, &artifact_metadata(&["1.0"], "1.0", Some("1.0")))
            .await
            .unwrap();

        let written = store.get(path.path()).await.unwrap().unwrap();
        let doc = metadata_xml::read(&written).unwrap();
        assert_eq!(doc.versioning.unwrap().versions.unwrap().version, vec!["1.0"]);

        // checksum side-files derive from the freshly written bytes
        let expected = compute_digests(&written);
        for hash_type in HashType::ALL {
            let side = store
                .get(path.hash(hash_type).path())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(&side[..], expected[&hash_type].as_bytes());
        }
    }

    #[tokio::test]
    async fn test_update_merges_existing() {
        let store = Arc::new(TransientArtifactStore::new());
        let updater = MetadataUpdater::new(store.clone());
        let path = metadata_path("org.acme", Some("tool"), None);

        updater
            .replace(&path, &artifact_metadata(&["1.0"], "1.0", Some("1.0")))
            .await
            .unwrap();
        updater
            .update(&path, &artifact_metadata(&["1.1"], "1.1", Some("1.1")))
            .await
            .unwrap();

        let written = store.get(path.path()).await.unwrap().unwrap();
        let versioning = metadata_xml::read(&written).unwrap().versioning.unwrap();
        assert_eq!(versioning.versions.unwrap().version, vec!["1.0", "1.1"]);
        assert_eq!(versioning.latest.as_deref(), Some("1.1"));
        assert_eq!(versioning.release.as_deref(), Some("1.1"));
    }

    #[tokio::test]
    async fn test_update_overwrites_corrupted_existing() {
        let store = Arc::new(TransientArtifactStore::new());
        let updater = MetadataUpdater::new(store.clone());
        let path = metadata_path("org.acme", Some("tool"), None);

        store
            .put(path.path(), Bytes::from_static(b"ThisIsNotAnXml"), METADATA_CONTENT_TYPE)
            .await
            .unwrap();
        updater
            .update(&path, &artifact_metadata(&["1.0"], "1.0", Some("1.0")))
            .await
            .unwrap();

        let written = store.get(path.path()).await.unwrap().unwrap();
        let doc = metadata_xml::read(&written).unwrap();
        assert_eq!(doc.versioning.unwrap().versions.unwrap().version, vec!["1.0"]);
    }

    #[tokio::test]
    async fn test_replace_discards_existing() {
        let store = Arc::new(TransientArtifactStore::new());
        let updater = MetadataUpdater::new(store.clone());
        let path = metadata_path("org.acme", Some("tool"), None);

        updater
            .replace(&path, &artifact_metadata(&["1.0"], "1.0", Some("1.0")))
            .await
            .unwrap();
        updater
            .replace(&path, &artifact_metadata(&["2.0"], "2.0", Some("2.0")))
            .await
            .unwrap();

        let written = store.get(path.path()).await.unwrap().unwrap();
        let doc = metadata_xml::read(&written).unwrap();
        assert_eq!(doc.versioning.unwrap().versions.unwrap().version, vec!["2.0"]);
    }

    #[tokio::test]
    async fn test_delete_removes_side_files() {
        let store = Arc::new(TransientArtifactStore::new());
        let updater = MetadataUpdater::new(store.clone());
        let path = metadata_path("org.acme", None, None);

        updater.replace(&path, &group_metadata()).await.unwrap();
        assert_eq!(store.paths().len(), 3);

        updater.delete(&path).await.unwrap();
        assert!(store.paths().is_empty());
    }

    #[test]
    fn test_merge_plugin_override() {
        let old = Plugins {
            plugin: vec![metadata_xml::Plugin {
                name: Some("Old".to_string()),
                prefix: Some("old".to_string()),
                artifactId: Some("a".to_string()),
            }],
        };
        let new = Plugins {
            plugin: vec![metadata_xml::Plugin {
                name: Some("New".to_string()),
                prefix: Some("new".to_string()),
                artifactId: Some("a".to_string()),
            }],
        };
        let merged = merge_plugins(Some(old), Some(new)).unwrap();
        assert_eq!(merged.plugin.len(), 1);
        assert_eq!(merged.plugin[0].prefix.as_deref(), Some("new"));
    }

    #[test]
    fn test_merge_snapshot_versions_newer_wins() {
        let old = SnapshotVersions {
            snapshotVersion: vec![metadata_xml::SnapshotVersion {
                classifier: None,
                extension: Some("jar".to_string()),
                value: Some("1.0-20150101.120000-1".to_string()),
                updated: Some("20150101120000".to_string()),
            }],
        };
        let new = SnapshotVersions {
            snapshotVersion: vec![metadata_xml::SnapshotVersion {
                classifier: None,
                extension: Some("jar".to_string()),
                value: Some("1.0-20150102.120000-2".to_string()),
                updated: Some("20150102120000".to_string()),
            }],
        };
        let merged = merge_snapshot_versions(Some(old), Some(new)).unwrap();
        assert_eq!(merged.snapshotVersion.len(), 1);
        assert_eq!(
            merged.snapshotVersion[0].value.as_deref(),
            Some("1.0-20150102.120000-2")
        );
    }

    #[test]
    fn test_merge_versions_resorts_union() {
        let old = Versioning {
            versions: Some(Versions {
                version: vec!["2.0".to_string(), "1.0".to_string()],
            }),
            ..Default::default()
        };
        let new = Versioning {
            versions: Some(Versions {
                version: vec!["1.5".to_string(), "3.0-SNAPSHOT".to_string()],
            }),
            ..Default::default()
        };
        let merged = merge_versioning(Some(old), Some(new)).unwrap();
        assert_eq!(
            merged.versions.unwrap().version,
            vec!["1.0", "1.5", "2.0", "3.0-SNAPSHOT"]
        );
        assert_eq!(merged.latest.as_deref(), Some("3.0-SNAPSHOT"));
        assert_eq!(merged.release.as_deref(), Some("2.0"));
    }
}

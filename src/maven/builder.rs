use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::maven::coordinates::{Coordinates, MavenPath};
use crate::maven::error::MetadataError;
use crate::maven::metadata::{BaseVersions, MavenMetadata, Plugin, Snapshot, Snapshots};
use crate::maven::versioning::Version;

/// The (extension, classifier) pair identifying one snapshot slot.
type SnapshotKey = (String, Option<String>);

#[derive(Debug, Clone)]
struct VersionCoordinates {
    version: Version,
    coordinates: Coordinates,
}

/// Streaming accumulator for repository metadata.
///
/// One instance is driven through a scan that is sorted by
/// (groupId, artifactId, baseVersion): the caller enters and exits scopes as
/// boundaries are crossed, and each exit emits the finished document for that
/// scope (or `None` when the absence rules say there is nothing to write).
///
/// Scopes nest group > artifact > baseVersion and must be exited bottom-up;
/// calls out of nesting order are driver bugs and fail with
/// [`MetadataError::InvalidState`]. The accumulator is single-threaded state
/// owned by exactly one rebuild run.
pub struct MetadataBuilder {
    clock: fn() -> DateTime<Utc>,

    group_id: Option<String>,
    artifact_id: Option<String>,
    base_version: Option<String>,

    // group level
    plugins: Vec<Plugin>,

    // artifact level
    base_versions: BTreeSet<Version>,

    // baseVersion level
    latest_per_pair: BTreeMap<SnapshotKey, VersionCoordinates>,
    latest: Option<VersionCoordinates>,
}

impl MetadataBuilder {
    pub fn new() -> MetadataBuilder {
        Self::with_clock(Utc::now)
    }

    /// A fixed clock makes emitted `lastUpdated` fields reproducible.
    pub fn with_clock(clock: fn() -> DateTime<Utc>) -> MetadataBuilder {
        MetadataBuilder {
            clock,
            group_id: None,
            artifact_id: None,
            base_version: None,
            plugins: Vec::new(),
            base_versions: BTreeSet::new(),
            latest_per_pair: BTreeMap::new(),
            latest: None,
        }
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    pub fn artifact_id(&self) -> Option<&str> {
        self.artifact_id.as_deref()
    }

    pub fn base_version(&self) -> Option<&str> {
        self.base_version.as_deref()
    }

    /// Returns `false` when the group is already active (no-op).
    pub fn enter_group_id(&mut self, group_id: &str) -> Result<bool, MetadataError> {
        if self.group_id.as_deref() == Some(group_id) {
            return Ok(false);
        }
        if self.artifact_id.is_some() {
            return Err(MetadataError::InvalidState(
                "artifact scope still active, exit it before entering a group",
            ));
        }
        self.group_id = Some(group_id.to_string());
        self.plugins.clear();
        Ok(true)
    }

    /// Emits the group-level document, or `None` when no plugin was added
    /// since the matching enter.
    pub fn exit_group_id(&mut self) -> Result<Option<MavenMetadata>, MetadataError> {
        let group_id = self
            .group_id
            .take()
            .ok_or(MetadataError::InvalidState("no group scope active"))?;
        if self.artifact_id.is_some() {
            return Err(MetadataError::InvalidState(
                "artifact scope still active, exit it before exiting the group",
            ));
        }
        if self.plugins.is_empty() {
            debug!("no plugins in group {}", group_id);
            return Ok(None);
        }
        Ok(Some(MavenMetadata::Group {
            last_updated: (self.clock)(),
            group_id,
            plugins: self.plugins.clone(),
        }))
    }

    /// Upserts a plugin entry keyed by artifact id; returns whether the
    /// collection changed.
    pub fn add_plugin(&mut self, prefix: &str, artifact_id: &str, name: Option<&str>) -> bool {
        let plugin = Plugin::new(artifact_id, prefix, name);
        if let Some(existing) = self.plugins.iter_mut().find(|p| p.key_equals(&plugin)) {
            if *existing == plugin {
                return false;
            }
            *existing = plugin;
            return true;
        }
        self.plugins.push(plugin);
        true
    }

    pub fn enter_artifact_id(&mut self, artifact_id: &str) -> Result<bool, MetadataError> {
        if self.group_id.is_none() {
            return Err(MetadataError::InvalidState("no group scope active"));
        }
        if self.artifact_id.as_deref() == Some(artifact_id) {
            return Ok(false);
        }
        if self.base_version.is_some() {
            return Err(MetadataError::InvalidState(
                "baseVersion scope still active, exit it before entering an artifact",
            ));
        }
        self.artifact_id = Some(artifact_id.to_string());
        self.base_versions.clear();
        Ok(true)
    }

    /// Emits the artifact-level document, or `None` when the version set is
    /// empty.
    pub fn exit_artifact_id(&mut self) -> Result<Option<MavenMetadata>, MetadataError> {
        let artifact_id = self
            .artifact_id
            .take()
            .ok_or(MetadataError::InvalidState("no artifact scope active"))?;
        if self.base_version.is_some() {
            return Err(MetadataError::InvalidState(
                "baseVersion scope still active, exit it before exiting the artifact",
            ));
        }
        let group_id = self
            .group_id
            .clone()
            .ok_or(MetadataError::InvalidState("no group scope active"))?;
        if self.base_versions.is_empty() {
            debug!("nothing to generate for {}:{}", group_id, artifact_id);
            return Ok(None);
        }

        let mut descending = self.base_versions.iter().rev();
        let latest = descending.next().map(|v| v.as_str().to_string());
        let latest = match latest {
            Some(latest) => latest,
            None => return Ok(None),
        };
        let mut release = Some(latest.clone());
        while let Some(candidate) = release.as_ref() {
            if !candidate.contains("SNAPSHOT") {
                break;
            }
            release = descending.next().map(|v| v.as_str().to_string());
        }

        Ok(Some(MavenMetadata::Artifact {
            last_updated: (self.clock)(),
            group_id,
            artifact_id,
            base_versions: BaseVersions {
                latest,
                release,
                versions: self
                    .base_versions
                    .iter()
                    .map(|v| v.as_str().to_string())
                    .collect(),
            },
        }))
    }

    /// Folds a base version string into the current artifact's version set.
    /// Unparseable strings are logged and skipped, never fatal.
    pub fn add_base_version(&mut self, base_version: &str) {
        match Version::parse(base_version) {
            Ok(version) => {
                self.base_versions.insert(version);
            }
            Err(e) => {
                warn!("skipping unparseable base version: {}", e);
            }
        }
    }

    pub fn enter_base_version(&mut self, base_version: &str) -> Result<bool, MetadataError> {
        if self.artifact_id.is_none() {
            return Err(MetadataError::InvalidState("no artifact scope active"));
        }
        if self.base_version.as_deref() == Some(base_version) {
            return Ok(false);
        }
        self.base_version = Some(base_version.to_string());
        self.latest_per_pair.clear();
        self.latest = None;
        Ok(true)
    }

    /// Emits the baseVersion-level document. Release base versions never
    /// carry one, and neither does a snapshot base version without a single
    /// concrete timestamped observation.
    pub fn exit_base_version(&mut self) -> Result<Option<MavenMetadata>, MetadataError> {
        let base_version = self
            .base_version
            .take()
            .ok_or(MetadataError::InvalidState("no baseVersion scope active"))?;
        let group_id = self
            .group_id
            .clone()
            .ok_or(MetadataError::InvalidState("no group scope active"))?;
        let artifact_id = self
            .artifact_id
            .clone()
            .ok_or(MetadataError::InvalidState("no artifact scope active"))?;

        let latest = match &self.latest {
            Some(latest) if base_version.ends_with("SNAPSHOT") => latest,
            _ => {
                debug!(
                    "not a snapshot or nothing to generate: {}:{}:{}",
                    group_id, artifact_id, base_version
                );
                return Ok(None);
            }
        };

        let now = (self.clock)();
        let snapshots = self
            .latest_per_pair
            .values()
            .map(|vc| Snapshot {
                last_updated: vc.coordinates.timestamp.unwrap_or(now),
                extension: vc.coordinates.extension.clone(),
                classifier: vc.coordinates.classifier.clone(),
                version: vc.coordinates.version.clone(),
            })
            .collect();

        Ok(Some(MavenMetadata::BaseVersion {
            last_updated: now,
            group_id,
            artifact_id,
            base_version,
            snapshots: Snapshots {
                snapshot_timestamp: latest.coordinates.timestamp.unwrap_or(now),
                snapshot_build_number: latest.coordinates.build_number.unwrap_or(1),
                snapshots,
            },
        }))
    }

    /// Folds one scanned artifact file into the current baseVersion scope.
    ///
    /// Subordinate files and paths without coordinates are ignored. The base
    /// version always lands in the artifact's version set; concrete
    /// timestamped snapshots additionally update the per-(extension,
    /// classifier) latest map and the cross-pair latest slot, strictly-newer
    /// versions winning.
    pub fn add_artifact_version(&mut self, maven_path: &MavenPath) -> Result<(), MetadataError> {
        if maven_path.is_subordinate() {
            return Ok(());
        }
        let coordinates = match maven_path.coordinates() {
            Some(c) => c.clone(),
            None => return Ok(()),
        };

        if self.base_version.is_none() {
            return Err(MetadataError::InvalidState("no baseVersion scope active"));
        }
        if self.group_id.as_deref() != Some(coordinates.group_id.as_str())
            || self.artifact_id.as_deref() != Some(coordinates.artifact_id.as_str())
            || self.base_version.as_deref() != Some(coordinates.base_version.as_str())
        {
            return Err(MetadataError::ContextMismatch {
                expected: format!(
                    "{}:{}:{}",
                    self.group_id.as_deref().unwrap_or("-"),
                    self.artifact_id.as_deref().unwrap_or("-"),
                    self.base_version.as_deref().unwrap_or("-"),
                ),
                actual: format!(
                    "{}:{}:{}",
                    coordinates.group_id, coordinates.artifact_id, coordinates.base_version
                ),
            });
        }

        self.add_base_version(&coordinates.base_version);

        if !coordinates.is_snapshot() {
            return Ok(());
        }
        if coordinates.version == coordinates.base_version {
            warn!("non-timestamped snapshot, ignoring it: {}", maven_path.path());
            return Ok(());
        }

        let version = match Version::parse(&coordinates.version) {
            Ok(version) => version,
            Err(e) => {
                warn!("skipping snapshot with unparseable version: {}", e);
                return Ok(());
            }
        };
        let key = (coordinates.extension.clone(), coordinates.classifier.clone());
        let version_coordinates = VersionCoordinates {
            version,
            coordinates,
        };

        if self
            .latest
            .as_ref()
            .map(|l| l.version < version_coordinates.version)
            .unwrap_or(true)
        {
            self.latest = Some(version_coordinates.clone());
        }

        match self.latest_per_pair.get(&key) {
            Some(existing) if existing.version >= version_coordinates.version => {}
            _ => {
                self.latest_per_pair.insert(key, version_coordinates);
            }
        }

        Ok(())
    }
}

impl Default for MetadataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

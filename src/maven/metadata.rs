use chrono::{DateTime, Utc};

/// Entry of a group-level plugin list, unique by `artifact_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    pub artifact_id: String,
    pub prefix: String,
    pub name: String,
}

impl Plugin {
    /// An empty or missing name falls back to the artifact id.
    pub fn new(artifact_id: &str, prefix: &str, name: Option<&str>) -> Plugin {
        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => artifact_id.to_string(),
        };
        Plugin {
            artifact_id: artifact_id.to_string(),
            prefix: prefix.to_string(),
            name,
        }
    }

    pub fn key_equals(&self, other: &Plugin) -> bool {
        self.artifact_id == other.artifact_id
    }
}

/// Artifact-level version aggregate: all observed base versions in ascending
/// version order, `latest` the maximum, `release` the maximum non-snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseVersions {
    pub latest: String,
    pub release: Option<String>,
    pub versions: Vec<String>,
}

/// The most recently observed concrete snapshot for one
/// (extension, classifier) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub last_updated: DateTime<Utc>,
    pub extension: String,
    pub classifier: Option<String>,
    pub version: String,
}

/// BaseVersion-level snapshot aggregate; timestamp and build number come from
/// the globally newest observation across all pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshots {
    pub snapshot_timestamp: DateTime<Utc>,
    pub snapshot_build_number: u32,
    pub snapshots: Vec<Snapshot>,
}

/// A repository metadata document at one of the three granularities.
///
/// Absence rules (no plugins => no group document, and so on) are enforced by
/// the accumulator emitting `None` instead of constructing an empty document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MavenMetadata {
    Group {
        last_updated: DateTime<Utc>,
        group_id: String,
        plugins: Vec<Plugin>,
    },
    Artifact {
        last_updated: DateTime<Utc>,
        group_id: String,
        artifact_id: String,
        base_versions: BaseVersions,
    },
    BaseVersion {
        last_updated: DateTime<Utc>,
        group_id: String,
        artifact_id: String,
        base_version: String,
        snapshots: Snapshots,
    },
}

impl MavenMetadata {
    pub fn group_id(&self) -> &str {
        match self {
            MavenMetadata::Group { group_id, .. } => group_id,
            MavenMetadata::Artifact { group_id, .. } => group_id,
            MavenMetadata::BaseVersion { group_id, .. } => group_id,
        }
    }
}

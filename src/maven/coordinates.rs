use chrono::{DateTime, Utc};

/// Checksum side-file flavors kept next to every primary artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashType {
    Sha1,
    Md5,
}

impl HashType {
    pub const ALL: [HashType; 2] = [HashType::Sha1, HashType::Md5];

    pub fn extension(&self) -> &'static str {
        match self {
            HashType::Sha1 => ".sha1",
            HashType::Md5 => ".md5",
        }
    }
}

/// Parsed identity of a stored artifact.
///
/// For releases `version == base_version`. For timestamped snapshots
/// `base_version` keeps the `-SNAPSHOT` suffix while `version` carries the
/// concrete `<timestamp>-<buildNumber>` form; `timestamp`/`build_number` hold
/// the same data parsed out. A non-timestamped snapshot file (legacy layout)
/// parses with `version == base_version` and no timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub base_version: String,
    pub version: String,
    pub extension: String,
    pub classifier: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub build_number: Option<u32>,
}

impl Coordinates {
    pub fn is_snapshot(&self) -> bool {
        self.base_version.ends_with("-SNAPSHOT")
    }
}

/// A repository-relative path, optionally carrying artifact coordinates.
///
/// Repository index files (`maven-metadata.xml`) and subordinate side-files
/// (checksums, signatures) have no coordinates of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenPath {
    path: String,
    file_name: String,
    coordinates: Option<Coordinates>,
}

impl MavenPath {
    pub(crate) fn new(path: String, coordinates: Option<Coordinates>) -> MavenPath {
        let file_name = match path.rfind('/') {
            Some(last_slash) => path[last_slash + 1..].to_string(),
            None => path.clone(),
        };
        MavenPath {
            path,
            file_name,
            coordinates,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn coordinates(&self) -> Option<&Coordinates> {
        self.coordinates.as_ref()
    }

    /// Subordinate files are derived side-files that are never aggregated as
    /// artifact versions in their own right.
    pub fn is_subordinate(&self) -> bool {
        self.file_name.ends_with(".sha1")
            || self.file_name.ends_with(".md5")
            || self.file_name.ends_with(".asc")
    }

    pub fn is_pom(&self) -> bool {
        self.coordinates
            .as_ref()
            .map(|c| c.extension == "pom")
            .unwrap_or(false)
    }

    /// The checksum side-file path for this path.
    pub fn hash(&self, hash_type: HashType) -> MavenPath {
        MavenPath::new(format!("{}{}", self.path, hash_type.extension()), None)
    }
}

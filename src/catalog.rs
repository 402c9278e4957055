pub mod transient_catalog;

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::maven::coordinates::HashType;
use crate::maven::error::MetadataError;

/// Optional narrowing of a rebuild to a group, artifact or base version.
/// Narrower fields require their parents to be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildScope {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub base_version: Option<String>,
}

impl RebuildScope {
    pub fn all() -> RebuildScope {
        RebuildScope::default()
    }

    pub fn group(group_id: &str) -> RebuildScope {
        RebuildScope {
            group_id: Some(group_id.to_string()),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.artifact_id.is_some() && self.group_id.is_none() {
            return Err(MetadataError::InvalidScope(
                "artifactId requires groupId".to_string(),
            ));
        }
        if self.base_version.is_some() && (self.group_id.is_none() || self.artifact_id.is_none()) {
            return Err(MetadataError::InvalidScope(
                "baseVersion requires groupId and artifactId".to_string(),
            ));
        }
        Ok(())
    }

    pub fn matches(&self, group_id: &str, artifact_id: &str, base_version: &str) -> bool {
        self.group_id.as_deref().map(|g| g == group_id).unwrap_or(true)
            && self
                .artifact_id
                .as_deref()
                .map(|a| a == artifact_id)
                .unwrap_or(true)
            && self
                .base_version
                .as_deref()
                .map(|v| v == base_version)
                .unwrap_or(true)
    }
}

/// One row of the grouped component scan: an artifact with all of its
/// distinct base versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    pub group_id: String,
    pub artifact_id: String,
    pub base_versions: BTreeSet<String>,
}

/// A versioned component as recorded in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub base_version: String,
}

/// A stored file belonging to a component, with the digests the catalog has
/// on record for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub path: String,
    pub digests: HashMap<HashType, String>,
}

/// Read-side catalog of components and their assets.
///
/// `scan_groups` yields a finite, single-pass stream of rows grouped by
/// (groupId, artifactId) and ordered by groupId; the rebuild driver leans on
/// that ordering to detect group boundaries without buffering.
#[async_trait]
pub trait Catalog: Send + Sync {
    fn scan_groups(&self, scope: &RebuildScope) -> BoxStream<'static, anyhow::Result<GroupRow>>;

    async fn find_components(
        &self,
        group_id: &str,
        artifact_id: &str,
        base_version: &str,
    ) -> anyhow::Result<Vec<Component>>;

    async fn browse_assets(&self, component: &Component) -> anyhow::Result<Vec<Asset>>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scope_validation() {
        assert!(RebuildScope::all().validate().is_ok());
        assert!(RebuildScope::group("g").validate().is_ok());

        let artifact_without_group = RebuildScope {
            artifact_id: Some("a".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            artifact_without_group.validate(),
            Err(MetadataError::InvalidScope(_))
        ));

        let base_version_without_artifact = RebuildScope {
            group_id: Some("g".to_string()),
            base_version: Some("1.0".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            base_version_without_artifact.validate(),
            Err(MetadataError::InvalidScope(_))
        ));
    }

    #[test]
    fn test_scope_matching() {
        let scope = RebuildScope {
            group_id: Some("g".to_string()),
            artifact_id: Some("a".to_string()),
            base_version: None,
        };
        assert!(scope.matches("g", "a", "1.0"));
        assert!(scope.matches("g", "a", "2.0"));
        assert!(!scope.matches("g", "b", "1.0"));
        assert!(!scope.matches("h", "a", "1.0"));
    }
}

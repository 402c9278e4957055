use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::catalog::{Asset, Catalog, Component, GroupRow, RebuildScope};

/// In-memory catalog - for testing purposes. Rows come out grouped by
/// (groupId, artifactId) and ordered by groupId, like the real scan.
pub struct TransientCatalog {
    components: Arc<Mutex<Vec<(Component, Vec<Asset>)>>>,
}

impl TransientCatalog {
    pub fn new() -> TransientCatalog {
        TransientCatalog {
            components: Default::default(),
        }
    }

    pub fn insert(&self, component: Component, assets: Vec<Asset>) {
        self.components.lock().unwrap().push((component, assets));
    }
}

impl Default for TransientCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Catalog for TransientCatalog {
    fn scan_groups(&self, scope: &RebuildScope) -> BoxStream<'static, anyhow::Result<GroupRow>> {
        let mut rows: BTreeMap<(String, String), GroupRow> = BTreeMap::new();
        for (component, _) in self.components.lock().unwrap().iter() {
            if !scope.matches(
                &component.group_id,
                &component.artifact_id,
                &component.base_version,
            ) {
                continue;
            }
            rows.entry((component.group_id.clone(), component.artifact_id.clone()))
                .or_insert_with(|| GroupRow {
                    group_id: component.group_id.clone(),
                    artifact_id: component.artifact_id.clone(),
                    base_versions: Default::default(),
                })
                .base_versions
                .insert(component.base_version.clone());
        }
        stream::iter(rows.into_values().map(Ok).collect::<Vec<_>>()).boxed()
    }

    async fn find_components(
        &self,
        group_id: &str,
        artifact_id: &str,
        base_version: &str,
    ) -> anyhow::Result<Vec<Component>> {
        Ok(self
            .components
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| {
                c.group_id == group_id
                    && c.artifact_id == artifact_id
                    && c.base_version == base_version
            })
            .map(|(c, _)| c.clone())
            .collect())
    }

    async fn browse_assets(&self, component: &Component) -> anyhow::Result<Vec<Asset>> {
        Ok(self
            .components
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == component)
            .flat_map(|(_, assets)| assets.iter().cloned())
            .collect())
    }
}

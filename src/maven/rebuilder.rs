use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, RebuildScope};
use crate::maven::builder::MetadataBuilder;
use crate::maven::coordinates::{HashType, MavenPath};
use crate::maven::error::MetadataError;
use crate::maven::metadata::MavenMetadata;
use crate::maven::paths::{metadata_path, parse_maven_path};
use crate::maven::updater::MetadataUpdater;
use crate::maven::versioning::Version;
use crate::maven::CHECKSUM_CONTENT_TYPE;
use crate::store::artifact_store::ArtifactStore;
use crate::util::digest::digest_matches;

lazy_static! {
    static ref MAVEN_PART: Regex = Regex::new("-?maven-?").unwrap();
    static ref PLUGIN_PART: Regex = Regex::new("-?plugin-?").unwrap();
}

const PLUGIN_PACKAGING: &str = "maven-plugin";
const DEFAULT_PACKAGING: &str = "jar";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildMode {
    /// Merge generated documents into existing ones; absent documents stay
    /// absent, existing documents at boundaries with nothing to generate are
    /// left untouched.
    Update,
    /// Overwrite existing documents; boundaries with nothing to generate have
    /// their stale documents deleted.
    Replace,
}

/// Counters reported back to the caller after a rebuild run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub groups: u32,
    pub artifacts: u32,
    pub base_versions: u32,
    pub checksum_repairs: u32,
}

/// Drives a full or scoped metadata rebuild: one pass over the catalog's
/// grouped component scan, feeding a [`MetadataBuilder`] and persisting each
/// finished document through a [`MetadataUpdater`] as boundaries are crossed.
pub struct MetadataRebuilder {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ArtifactStore>,
    clock: fn() -> DateTime<Utc>,
}

impl MetadataRebuilder {
    pub fn new(catalog: Arc<dyn Catalog>, store: Arc<dyn ArtifactStore>) -> MetadataRebuilder {
        Self::with_clock(catalog, store, Utc::now)
    }

    /// A fixed clock makes rebuild output reproducible.
    pub fn with_clock(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn ArtifactStore>,
        clock: fn() -> DateTime<Utc>,
    ) -> MetadataRebuilder {
        MetadataRebuilder {
            catalog,
            store,
            clock,
        }
    }

    pub async fn rebuild(
        &self,
        scope: &RebuildScope,
        mode: RebuildMode,
    ) -> Result<RebuildStats, MetadataError> {
        scope.validate()?;
        info!("rebuilding metadata, scope {:?}, mode {:?}", scope, mode);

        // fresh accumulator and updater per run - no state is shared between
        // rebuilds, concurrent runs over disjoint scopes do not interfere
        let mut builder = MetadataBuilder::with_clock(self.clock);
        let updater = MetadataUpdater::new(self.store.clone());
        let mut stats = RebuildStats::default();

        let mut rows = self.catalog.scan_groups(scope);
        while let Some(row) = rows.next().await {
            let row = row?;

            if builder.group_id() != Some(row.group_id.as_str()) {
                if let Some(previous_group) = builder.group_id().map(|g| g.to_string()) {
                    let document = builder.exit_group_id()?;
                    self.persist(&updater, &metadata_path(&previous_group, None, None), document, mode)
                        .await?;
                }
                builder.enter_group_id(&row.group_id)?;
                stats.groups += 1;
            }

            builder.enter_artifact_id(&row.artifact_id)?;
            stats.artifacts += 1;

            for base_version in order_base_versions(&row.base_versions) {
                builder.enter_base_version(&base_version)?;
                stats.base_versions += 1;

                self.process_base_version(
                    &mut builder,
                    &row.group_id,
                    &row.artifact_id,
                    &base_version,
                    &mut stats,
                )
                .await?;

                let document = builder.exit_base_version()?;
                self.persist(
                    &updater,
                    &metadata_path(&row.group_id, Some(&row.artifact_id), Some(&base_version)),
                    document,
                    mode,
                )
                .await?;
            }

            let document = builder.exit_artifact_id()?;
            self.persist(
                &updater,
                &metadata_path(&row.group_id, Some(&row.artifact_id), None),
                document,
                mode,
            )
            .await?;
        }

        if let Some(last_group) = builder.group_id().map(|g| g.to_string()) {
            let document = builder.exit_group_id()?;
            self.persist(&updater, &metadata_path(&last_group, None, None), document, mode)
                .await?;
        }

        info!("metadata rebuild finished: {:?}", stats);
        Ok(stats)
    }

    /// Feeds every asset of every component under one baseVersion into the
    /// accumulator, repairing checksum side-files and picking up plugin
    /// descriptors along the way.
    async fn process_base_version(
        &self,
        builder: &mut MetadataBuilder,
        group_id: &str,
        artifact_id: &str,
        base_version: &str,
        stats: &mut RebuildStats,
    ) -> Result<(), MetadataError> {
        let components = self
            .catalog
            .find_components(group_id, artifact_id, base_version)
            .await?;

        for component in &components {
            for asset in self.catalog.browse_assets(component).await? {
                let maven_path = match parse_maven_path(&asset.path) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("skipping asset with unparseable path: {}", e);
                        continue;
                    }
                };
                if maven_path.is_subordinate() {
                    continue;
                }

                builder.add_artifact_version(&maven_path)?;

                for hash_type in HashType::ALL {
                    if let Some(recorded) = asset.digests.get(&hash_type) {
                        if self.may_update_checksum(&maven_path, hash_type, recorded).await? {
                            stats.checksum_repairs += 1;
                        }
                    }
                }

                if maven_path.is_pom() {
                    self.process_pom(builder, &maven_path).await?;
                }
            }
        }
        Ok(())
    }

    /// Writes the recorded digest as the asset's checksum side-file unless the
    /// stored side-file already matches it. Returns whether a repair happened.
    async fn may_update_checksum(
        &self,
        path: &MavenPath,
        hash_type: HashType,
        recorded: &str,
    ) -> Result<bool, MetadataError> {
        let side_path = path.hash(hash_type);

        let existing = match self.store.get(side_path.path()).await {
            Ok(existing) => existing,
            Err(e) => {
                debug!("cannot read checksum file {}, repairing: {}", side_path.path(), e);
                None
            }
        };
        if let Some(bytes) = existing {
            if let Ok(text) = std::str::from_utf8(&bytes) {
                if digest_matches(recorded, text) {
                    return Ok(false);
                }
            }
            debug!("checksum file {} does not match catalog, repairing", side_path.path());
        }

        self.store
            .put(
                side_path.path(),
                Bytes::from(recorded.to_ascii_lowercase()),
                CHECKSUM_CONTENT_TYPE,
            )
            .await?;
        Ok(true)
    }

    /// Reads the project descriptor and, for plugin packaging, registers a
    /// plugin entry with the current group.
    async fn process_pom(
        &self,
        builder: &mut MetadataBuilder,
        path: &MavenPath,
    ) -> Result<(), MetadataError> {
        let bytes = match self.store.get(path.path()).await? {
            Some(bytes) => bytes,
            None => {
                debug!("descriptor {} has no stored content", path.path());
                return Ok(());
            }
        };
        let project = match parse_project(&bytes) {
            Ok(project) => project,
            Err(e) => {
                debug!("cannot parse descriptor {}: {}", path.path(), e);
                return Ok(());
            }
        };

        if project.packaging.as_deref().unwrap_or(DEFAULT_PACKAGING) == PLUGIN_PACKAGING {
            if let Some(coordinates) = path.coordinates() {
                let prefix = plugin_prefix(&coordinates.artifact_id);
                builder.add_plugin(&prefix, &coordinates.artifact_id, project.name.as_deref());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
struct Project {
    packaging: Option<String>,
    name: Option<String>,
}

fn parse_project(bytes: &[u8]) -> anyhow::Result<Project> {
    let text = std::str::from_utf8(bytes)?;
    Ok(serde_xml_rs::from_str(text)?)
}

/// Derives a plugin's goal prefix from its artifact id by stripping the
/// `maven` and `plugin` parts, e.g. `acme-maven-plugin` -> `acme`. The
/// conventionally named `maven-plugin-plugin` maps to `plugin`, and an id
/// that mangles away completely stays as it is.
fn plugin_prefix(artifact_id: &str) -> String {
    if artifact_id == "maven-plugin-plugin" {
        return "plugin".to_string();
    }
    let without_maven = MAVEN_PART.replace_all(artifact_id, "");
    let prefix = PLUGIN_PART.replace_all(&without_maven, "").to_string();
    if prefix.is_empty() {
        artifact_id.to_string()
    }
    else {
        prefix
    }
}

/// Base versions of one scan row, ascending by version order; unparseable
/// strings go last, in input order, and are still visited.
fn order_base_versions(base_versions: &BTreeSet<String>) -> Vec<String> {
    let mut parseable: Vec<(Version, String)> = Vec::new();
    let mut unparseable: Vec<String> = Vec::new();
    for base_version in base_versions {
        match Version::parse(base_version) {
            Ok(version) => parseable.push((version, base_version.clone())),
            Err(_) => unparseable.push(base_version.clone()),
        }
    }
    parseable.sort_by(|a, b| a.0.cmp(&b.0));
    parseable
        .into_iter()
        .map(|(_, raw)| raw)
        .chain(unparseable)
        .collect()
}

impl MetadataRebuilder {
    async fn persist(
        &self,
        updater: &MetadataUpdater,
        path: &MavenPath,
        document: Option<MavenMetadata>,
        mode: RebuildMode,
    ) -> Result<(), MetadataError> {
        match (document, mode) {
            (Some(document), RebuildMode::Update) => updater.update(path, &document).await?,
            (Some(document), RebuildMode::Replace) => updater.replace(path, &document).await?,
            (None, RebuildMode::Replace) => updater.delete(path).await?,
            (None, RebuildMode::Update) => {}
        }
        Ok(())
    }
}

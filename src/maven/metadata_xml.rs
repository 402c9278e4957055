#![allow(non_snake_case)]

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::maven::metadata::MavenMetadata;

/// Wire model of `maven-metadata.xml`, shaped after the Maven
/// repository-metadata XSD. All fields are optional on read so that partial
/// or hand-edited documents still parse; the writer only emits what is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataDoc {
    #[serde(default)]
    pub groupId: Option<String>,
    #[serde(default)]
    pub artifactId: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub versioning: Option<Versioning>,
    #[serde(default)]
    pub plugins: Option<Plugins>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Versioning {
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub snapshot: Option<SnapshotBlock>,
    #[serde(default)]
    pub versions: Option<Versions>,
    #[serde(default)]
    pub lastUpdated: Option<String>,
    #[serde(default)]
    pub snapshotVersions: Option<SnapshotVersions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Versions {
    #[serde(default)]
    pub version: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotBlock {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub buildNumber: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotVersions {
    #[serde(default)]
    pub snapshotVersion: Vec<SnapshotVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotVersion {
    #[serde(default)]
    pub classifier: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plugins {
    #[serde(default)]
    pub plugin: Vec<Plugin>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub artifactId: Option<String>,
}

/// Compact `lastUpdated` / per-snapshot `updated` form.
pub fn format_compact(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y%m%d%H%M%S").to_string()
}

/// Dotted form used by the snapshot block's own timestamp field.
pub fn format_dotted(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y%m%d.%H%M%S").to_string()
}

pub fn read(bytes: &[u8]) -> anyhow::Result<MetadataDoc> {
    let text = std::str::from_utf8(bytes)?;
    let doc = serde_xml_rs::from_str(text)?;
    Ok(doc)
}

/// Renders a document as UTF-8 XML.
///
/// The output is canonical: element order and indentation are fixed, so equal
/// documents serialize to identical bytes. Metadata rebuilds rely on this to
/// be idempotent at the byte level.
pub fn write(doc: &MetadataDoc) -> Vec<u8> {
    let mut out = String::with_capacity(512);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<metadata>\n");
    write_text_element(&mut out, 1, "groupId", doc.groupId.as_deref());
    write_text_element(&mut out, 1, "artifactId", doc.artifactId.as_deref());
    write_text_element(&mut out, 1, "version", doc.version.as_deref());
    if let Some(versioning) = &doc.versioning {
        write_versioning(&mut out, versioning);
    }
    if let Some(plugins) = &doc.plugins {
        write_plugins(&mut out, plugins);
    }
    out.push_str("</metadata>\n");
    out.into_bytes()
}

fn write_versioning(out: &mut String, versioning: &Versioning) {
    out.push_str("  <versioning>\n");
    write_text_element(out, 2, "latest", versioning.latest.as_deref());
    write_text_element(out, 2, "release", versioning.release.as_deref());
    if let Some(snapshot) = &versioning.snapshot {
        out.push_str("    <snapshot>\n");
        write_text_element(out, 3, "timestamp", snapshot.timestamp.as_deref());
        if let Some(build_number) = snapshot.buildNumber {
            let _ = writeln!(out, "      <buildNumber>{}</buildNumber>", build_number);
        }
        out.push_str("    </snapshot>\n");
    }
    if let Some(versions) = &versioning.versions {
        out.push_str("    <versions>\n");
        for version in &versions.version {
            write_text_element(out, 3, "version", Some(version));
        }
        out.push_str("    </versions>\n");
    }
    write_text_element(out, 2, "lastUpdated", versioning.lastUpdated.as_deref());
    if let Some(snapshot_versions) = &versioning.snapshotVersions {
        out.push_str("    <snapshotVersions>\n");
        for sv in &snapshot_versions.snapshotVersion {
            out.push_str("      <snapshotVersion>\n");
            write_text_element(out, 4, "classifier", sv.classifier.as_deref());
            write_text_element(out, 4, "extension", sv.extension.as_deref());
            write_text_element(out, 4, "value", sv.value.as_deref());
            write_text_element(out, 4, "updated", sv.updated.as_deref());
            out.push_str("      </snapshotVersion>\n");
        }
        out.push_str("    </snapshotVersions>\n");
    }
    out.push_str("  </versioning>\n");
}

fn write_plugins(out: &mut String, plugins: &Plugins) {
    out.push_str("  <plugins>\n");
    for plugin in &plugins.plugin {
        out.push_str("    <plugin>\n");
        write_text_element(out, 3, "name", plugin.name.as_deref());
        write_text_element(out, 3, "prefix", plugin.prefix.as_deref());
        write_text_element(out, 3, "artifactId", plugin.artifactId.as_deref());
        out.push_str("    </plugin>\n");
    }
    out.push_str("  </plugins>\n");
}

fn write_text_element(out: &mut String, indent: usize, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        for _ in 0..indent {
            out.push_str("  ");
        }
        let _ = writeln!(out, "<{}>{}</{}>", name, escape_text(value), name);
    }
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Converts an aggregated document into its wire form, formatting all
/// timestamps.
pub fn from_model(metadata: &MavenMetadata) -> MetadataDoc {
    match metadata {
        MavenMetadata::Group {
            group_id, plugins, ..
        } => MetadataDoc {
            groupId: Some(group_id.clone()),
            plugins: Some(Plugins {
                plugin: plugins
                    .iter()
                    .map(|p| Plugin {
                        name: Some(p.name.clone()),
                        prefix: Some(p.prefix.clone()),
                        artifactId: Some(p.artifact_id.clone()),
                    })
                    .collect(),
            }),
            ..Default::default()
        },
        MavenMetadata::Artifact {
            last_updated,
            group_id,
            artifact_id,
            base_versions,
        } => MetadataDoc {
            groupId: Some(group_id.clone()),
            artifactId: Some(artifact_id.clone()),
            versioning: Some(Versioning {
                latest: Some(base_versions.latest.clone()),
                release: base_versions.release.clone(),
                versions: Some(Versions {
                    version: base_versions.versions.clone(),
                }),
                lastUpdated: Some(format_compact(*last_updated)),
                ..Default::default()
            }),
            ..Default::default()
        },
        MavenMetadata::BaseVersion {
            last_updated,
            group_id,
            artifact_id,
            base_version,
            snapshots,
        } => MetadataDoc {
            groupId: Some(group_id.clone()),
            artifactId: Some(artifact_id.clone()),
            version: Some(base_version.clone()),
            versioning: Some(Versioning {
                snapshot: Some(SnapshotBlock {
                    timestamp: Some(format_dotted(snapshots.snapshot_timestamp)),
                    buildNumber: Some(snapshots.snapshot_build_number),
                }),
                lastUpdated: Some(format_compact(*last_updated)),
                snapshotVersions: Some(SnapshotVersions {
                    snapshotVersion: snapshots
                        .snapshots
                        .iter()
                        .map(|s| SnapshotVersion {
                            classifier: s.classifier.clone(),
                            extension: Some(s.extension.clone()),
                            value: Some(s.version.clone()),
                            updated: Some(format_compact(s.last_updated)),
                        })
                        .collect(),
                }),
                ..Default::default()
            }),
            ..Default::default()
        },
    }
}

use anyhow::anyhow;
use chrono::{DateTime, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::maven::coordinates::{Coordinates, MavenPath};
use crate::maven::METADATA_FILENAME;

lazy_static! {
    static ref TIMESTAMP_REGEX: Regex = Regex::new(r"-\d{8}\.\d{6}").unwrap();
}

const DOTTED_TIMESTAMP_FORMAT: &str = "%Y%m%d.%H%M%S";

/// Parses a repository-relative path (with or without a leading '/') into a
/// [`MavenPath`].
///
/// Artifact files yield full coordinates. Repository index files
/// (`maven-metadata.xml`) and subordinate side-files parse successfully but
/// carry no coordinates. Anything else that does not look like
/// `<group>/<artifactId>/<version>/<fileName>` is an error.
pub fn parse_maven_path(path: &str) -> anyhow::Result<MavenPath> {
    let path = path.trim_start_matches('/');

    let last_slash = path
        .rfind('/')
        .ok_or_else(|| anyhow!("not a valid Maven artifact path: {:?}", path))?;
    let (without_filename, file_name) = path.split_at(last_slash);
    let file_name = &file_name[1..];

    if file_name == METADATA_FILENAME
        || file_name.ends_with(".sha1")
        || file_name.ends_with(".md5")
        || file_name.ends_with(".asc")
    {
        return Ok(MavenPath::new(path.to_string(), None));
    }

    if let Some(last_slash) = without_filename.rfind('/') {
        let (without_version, version) = without_filename.split_at(last_slash);
        let version = &version[1..];

        if let Some(last_slash) = without_version.rfind('/') {
            let (group_path, artifact_id) = without_version.split_at(last_slash);
            let artifact_id = &artifact_id[1..];

            let parsed = parse_maven_filename(file_name, artifact_id, version)?;
            let coordinates = to_coordinates(
                group_path.replace('/', "."),
                artifact_id.to_string(),
                version,
                parsed,
            )?;

            return Ok(MavenPath::new(path.to_string(), Some(coordinates)));
        }
    }

    Err(anyhow!("not a valid Maven artifact path: {:?}", path))
}

/// Assembles the path of a repository metadata document at group, artifact or
/// baseVersion granularity.
pub fn metadata_path(
    group_id: &str,
    artifact_id: Option<&str>,
    base_version: Option<&str>,
) -> MavenPath {
    let mut path = group_id.replace('.', "/");
    if let Some(artifact_id) = artifact_id {
        path.push('/');
        path.push_str(artifact_id);
        if let Some(base_version) = base_version {
            path.push('/');
            path.push_str(base_version);
        }
    }
    path.push('/');
    path.push_str(METADATA_FILENAME);
    MavenPath::new(path, None)
}

#[derive(Debug, Eq, PartialEq)]
struct ParsedFilename<'a> {
    classifier: Option<&'a str>,
    extension: &'a str, // without leading '.'
    /// dotted timestamp and optional build number, for timestamped snapshots
    snapshot: Option<(&'a str, Option<u32>)>,
}

fn to_coordinates(
    group_id: String,
    artifact_id: String,
    version_dir: &str,
    parsed: ParsedFilename<'_>,
) -> anyhow::Result<Coordinates> {
    let (version, timestamp, build_number) = match parsed.snapshot {
        Some((raw_timestamp, build_number)) => {
            let timestamp = parse_dotted_timestamp(raw_timestamp).ok_or_else(|| {
                anyhow!("not a valid snapshot timestamp: {}", raw_timestamp)
            })?;
            // "1.0-SNAPSHOT" -> "1.0-<timestamp>[-<buildNumber>]"
            let stem = &version_dir[..version_dir.len() - "SNAPSHOT".len()];
            let version = match build_number {
                Some(n) => format!("{}{}-{}", stem, raw_timestamp, n),
                None => format!("{}{}", stem, raw_timestamp),
            };
            (version, Some(timestamp), build_number)
        }
        None => (version_dir.to_string(), None, None),
    };

    Ok(Coordinates {
        group_id,
        artifact_id,
        base_version: version_dir.to_string(),
        version,
        extension: parsed.extension.to_string(),
        classifier: parsed.classifier.map(|c| c.to_string()),
        timestamp,
        build_number,
    })
}

fn parse_dotted_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, DOTTED_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_maven_filename<'a>(
    file_name: &'a str,
    artifact_id: &str,
    version_string: &str,
) -> anyhow::Result<ParsedFilename<'a>> {
    let full_file_name = file_name;
    if file_name.len() < artifact_id.len() + version_string.len() + 2 {
        return Err(anyhow!("not a valid maven file name: {}", full_file_name));
    }

    if !file_name.starts_with(artifact_id) || file_name.as_bytes()[artifact_id.len()] != b'-' {
        return Err(anyhow!(
            "{} is not a valid maven file name: expected to start with artifact id {}",
            full_file_name, artifact_id
        ));
    }
    let file_name = &file_name[artifact_id.len() + 1..];

    if !file_name.starts_with(version_string) {
        return Err(anyhow!(
            "{} is not a valid maven file name: expected to have version string {}",
            full_file_name, version_string
        ));
    }
    let file_name = &file_name[version_string.len()..];

    let (file_name, extension) = match file_name.rfind('.') {
        Some(last_dot) => (&file_name[..last_dot], &file_name[last_dot + 1..]),
        None => (file_name, ""),
    };

    if version_string.ends_with("-SNAPSHOT") {
        // <artifactId>-<baseVersion>[-<classifier>]-<timestamp>[-<buildNumber>].<extension>
        //
        // NB: classifier is optional and can contain any number of '-' characters
        // NB: build number is optional

        if let Ok((classifier, timestamp)) = parse_classifier_and_timestamp(file_name) {
            return Ok(ParsedFilename {
                classifier,
                extension,
                snapshot: Some((timestamp, None)),
            });
        }

        // try the last segment as a build number
        if let Some(last_dash) = file_name.rfind('-') {
            if let Ok(build_number) = file_name[last_dash + 1..].parse::<u32>() {
                if let Ok((classifier, timestamp)) =
                    parse_classifier_and_timestamp(&file_name[..last_dash])
                {
                    return Ok(ParsedFilename {
                        classifier,
                        extension,
                        snapshot: Some((timestamp, Some(build_number))),
                    });
                }
            }
        }

        // non-timestamped snapshot file; aggregation warns about these and
        // skips them, but they still must parse
        let classifier = parse_classifier(file_name, full_file_name)?;
        Ok(ParsedFilename {
            classifier,
            extension,
            snapshot: None,
        })
    }
    else {
        // <artifactId>-<version>[-<classifier>].<extension>
        let classifier = parse_classifier(file_name, full_file_name)?;
        Ok(ParsedFilename {
            classifier,
            extension,
            snapshot: None,
        })
    }
}

fn parse_classifier<'a>(
    file_name: &'a str,
    full_file_name: &str,
) -> anyhow::Result<Option<&'a str>> {
    if file_name.is_empty() {
        Ok(None)
    }
    else if let Some(classifier) = file_name.strip_prefix('-') {
        Ok(Some(classifier))
    }
    else {
        Err(anyhow!(
            "not a valid maven file name - invalid classifier format: {}",
            full_file_name
        ))
    }
}

fn parse_classifier_and_timestamp(file_name: &str) -> anyhow::Result<(Option<&str>, &str)> {
    if file_name.len() < 16 {
        return Err(anyhow!("snapshot without timestamp: {}", file_name));
    }

    if !TIMESTAMP_REGEX.is_match(&file_name[file_name.len() - 16..]) {
        return Err(anyhow!("snapshot without timestamp: {}", file_name));
    }
    let raw_classifier = &file_name[..file_name.len() - 16];
    let timestamp = &file_name[file_name.len() - 15..];

    let classifier = match raw_classifier.strip_prefix('-') {
        Some(c) => Some(c),
        None if raw_classifier.is_empty() => None,
        None => return Err(anyhow!("snapshot without timestamp: {}", file_name)),
    };

    Ok((classifier, timestamp))
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Expected {
        version: &'static str,
        classifier: Option<&'static str>,
        extension: &'static str,
        build_number: Option<u32>,
    }

    fn expected(
        version: &'static str,
        classifier: Option<&'static str>,
        extension: &'static str,
        build_number: Option<u32>,
    ) -> Option<Expected> {
        Some(Expected { version, classifier, extension, build_number })
    }

    #[rstest]
    #[case::release("com/acme/a/1.0.0/a-1.0.0.jar", expected("1.0.0", None, "jar", None))]
    #[case::release_artifact_with_dash("com/acme/x-y/1.0.0/x-y-1.0.0.jar", expected("1.0.0", None, "jar", None))]
    #[case::release_version_with_dash("com/acme/x/1.0.0-y/x-1.0.0-y.jar", expected("1.0.0-y", None, "jar", None))]
    #[case::release_extension("com/acme/q/1.0.0/q-1.0.0.abc", expected("1.0.0", None, "abc", None))]
    #[case::release_classifier("com/acme/a/1.0.0/a-1.0.0-cla.jar", expected("1.0.0", Some("cla"), "jar", None))]
    #[case::release_classifier_with_dash("com/acme/a/1.0.0/a-1.0.0-cla-rst.jar", expected("1.0.0", Some("cla-rst"), "jar", None))]
    #[case::release_pom("com/acme/a/1.0.0/a-1.0.0.pom", expected("1.0.0", None, "pom", None))]
    #[case::release_invalid_wrong_artifact("com/acme/b/1.0.0/a-1.0.0.jar", None)]
    #[case::release_invalid_no_dash_after_artifact("com/acme/a/1.0.0/a1.0.0.jar", None)]
    #[case::release_invalid_wrong_version("com/acme/a/1.0.1/a-1.0.0.jar", None)]
    #[case::release_invalid_no_version("com/acme/a/1.0.0/a.jar", None)]
    #[case::release_invalid_no_dash_before_classifier("com/acme/a/1.0.0/a-1.0.0xyz.jar", None)]
    #[case::snapshot(
        "com/acme/a/1.0.0-SNAPSHOT/a-1.0.0-SNAPSHOT-20150120.123456.jar",
        expected("1.0.0-20150120.123456", None, "jar", None)
    )]
    #[case::snapshot_build_number(
        "com/acme/a/1.0.0-SNAPSHOT/a-1.0.0-SNAPSHOT-20150120.123456-5.jar",
        expected("1.0.0-20150120.123456-5", None, "jar", Some(5))
    )]
    #[case::snapshot_classifier(
        "com/acme/a/1.0.0-SNAPSHOT/a-1.0.0-SNAPSHOT-cla-20150120.123456-5.jar",
        expected("1.0.0-20150120.123456-5", Some("cla"), "jar", Some(5))
    )]
    #[case::snapshot_classifier_with_dash(
        "com/acme/a/1.0.0-SNAPSHOT/a-1.0.0-SNAPSHOT-a-b-c-20150120.123456-5.jar",
        expected("1.0.0-20150120.123456-5", Some("a-b-c"), "jar", Some(5))
    )]
    #[case::snapshot_classifier_like_timestamp(
        "com/acme/a/1.0.0-SNAPSHOT/a-1.0.0-SNAPSHOT-20150101.111111-20150120.123456-5.jar",
        expected("1.0.0-20150120.123456-5", Some("20150101.111111"), "jar", Some(5))
    )]
    #[case::snapshot_non_timestamped(
        "com/acme/a/1.0.0-SNAPSHOT/a-1.0.0-SNAPSHOT.jar",
        expected("1.0.0-SNAPSHOT", None, "jar", None)
    )]
    #[case::snapshot_non_timestamped_classifier(
        "com/acme/a/1.0.0-SNAPSHOT/a-1.0.0-SNAPSHOT-sources.jar",
        expected("1.0.0-SNAPSHOT", Some("sources"), "jar", None)
    )]
    #[case::snapshot_invalid_wrong_artifact("com/acme/b/1.0.0-SNAPSHOT/a-1.0.0-SNAPSHOT-20150120.123456.jar", None)]
    #[case::snapshot_invalid_bogus_timestamp("com/acme/a/1.0.0-SNAPSHOT/a-1.0.0-SNAPSHOT-20159999.123456.jar", None)]
    fn test_parse_maven_path(#[case] path: &str, #[case] expected: Option<Expected>) {
        let actual = parse_maven_path(path);

        if let Some(expected) = expected {
            let actual = actual.unwrap();
            let coordinates = actual.coordinates().unwrap();
            assert_eq!(coordinates.group_id, "com.acme");
            assert_eq!(coordinates.version, expected.version);
            assert_eq!(coordinates.classifier.as_deref(), expected.classifier);
            assert_eq!(coordinates.extension, expected.extension);
            assert_eq!(coordinates.build_number, expected.build_number);
        }
        else {
            assert!(actual.is_err(), "expected parse failure, got {:?}", actual);
        }
    }

    #[rstest]
    #[case::metadata("org/acme/maven-metadata.xml")]
    #[case::metadata_sha1("org/acme/maven-metadata.xml.sha1")]
    #[case::artifact_checksum("org/acme/a/1.0/a-1.0.jar.md5")]
    #[case::signature("org/acme/a/1.0/a-1.0.jar.asc")]
    fn test_parse_without_coordinates(#[case] path: &str) {
        let parsed = parse_maven_path(path).unwrap();
        assert!(parsed.coordinates().is_none());
    }

    #[rstest]
    #[case::subordinate_sha1("org/acme/a/1.0/a-1.0.jar.sha1", true)]
    #[case::subordinate_asc("org/acme/a/1.0/a-1.0.jar.asc", true)]
    #[case::primary("org/acme/a/1.0/a-1.0.jar", false)]
    #[case::metadata("org/acme/maven-metadata.xml", false)]
    fn test_is_subordinate(#[case] path: &str, #[case] subordinate: bool) {
        assert_eq!(parse_maven_path(path).unwrap().is_subordinate(), subordinate);
    }

    #[rstest]
    #[case::group("org.acme", None, None, "org/acme/maven-metadata.xml")]
    #[case::artifact("org.acme", Some("tool"), None, "org/acme/tool/maven-metadata.xml")]
    #[case::base_version("org.acme", Some("tool"), Some("1.0-SNAPSHOT"), "org/acme/tool/1.0-SNAPSHOT/maven-metadata.xml")]
    fn test_metadata_path(
        #[case] group_id: &str,
        #[case] artifact_id: Option<&str>,
        #[case] base_version: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(metadata_path(group_id, artifact_id, base_version).path(), expected);
    }

    #[test]
    fn test_hash_path() {
        let path = parse_maven_path("org/acme/a/1.0/a-1.0.jar").unwrap();
        let hash = path.hash(crate::maven::coordinates::HashType::Sha1);
        assert_eq!(hash.path(), "org/acme/a/1.0/a-1.0.jar.sha1");
        assert!(hash.is_subordinate());
    }
}

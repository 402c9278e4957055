pub mod builder;
pub mod coordinates;
pub mod error;
pub mod metadata;
pub mod metadata_xml;
pub mod paths;
pub mod rebuilder;
pub mod updater;
pub mod versioning;

/// The well-known file name of a repository metadata document.
pub const METADATA_FILENAME: &str = "maven-metadata.xml";

pub const METADATA_CONTENT_TYPE: &str = "application/xml";
pub const CHECKSUM_CONTENT_TYPE: &str = "text/plain";

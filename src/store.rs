pub mod artifact_store;
pub mod fs_artifact_store;
pub mod transient_artifact_store;

use thiserror::Error;

/// Errors raised by the metadata rebuild machinery.
///
/// `InvalidState` and `ContextMismatch` indicate a driver bug (calls out of
/// nesting order, or a scanned asset that does not belong to the active
/// group/artifact/baseVersion) and abort the rebuild. `Store` wraps I/O
/// failures of the artifact store or catalog and is likewise fatal to the
/// operation in progress. Per-asset parse problems are not represented here:
/// they are logged and skipped locally.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("invalid metadata builder state: {0}")]
    InvalidState(&'static str),

    #[error("coordinates {actual} do not match active context {expected}")]
    ContextMismatch { expected: String, actual: String },

    #[error("invalid rebuild scope: {0}")]
    InvalidScope(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

//! Error types for the legacy pointer store.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for pointer store operations.
pub type PointerDbResult<T> = Result<T, PointerDbError>;

/// Pointer store error types.
#[derive(Debug, Error, Diagnostic)]
pub enum PointerDbError {
    /// sled error
    #[error("Pointer store error: {0}")]
    #[diagnostic(code(metainfo_pointerdb::store))]
    Sled(#[from] sled::Error),

    /// A key requested by an explicit fetch is absent
    #[error("Key not found: {key}")]
    #[diagnostic(
        code(metainfo_pointerdb::key_not_found),
        help("A segment referenced by its object is missing from the pointer store")
    )]
    KeyNotFound { key: String },
}

impl PointerDbError {
    /// Create a key not found error.
    pub fn key_not_found(key: &[u8]) -> Self {
        Self::KeyNotFound {
            key: String::from_utf8_lossy(key).into_owned(),
        }
    }
}

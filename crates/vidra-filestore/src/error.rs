//! Error types for blob storage.

use thiserror::Error;

/// Errors produced by filestore operations.
#[derive(Debug, Error)]
pub enum FilestoreError {
    /// Object absent at the given key.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Underlying object store failure.
    #[error("object store error: {0}")]
    ObjectStore(String),

    /// Key would escape the layout (traversal, separators).
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    /// Local filesystem failure while staging.
    #[error("io error: {0}")]
    Io(String),
}

impl From<object_store::Error> for FilestoreError {
    fn from(e: object_store::Error) -> Self {
        match e {
            object_store::Error::NotFound { path, .. } => FilestoreError::NotFound(path),
            other => FilestoreError::ObjectStore(other.to_string()),
        }
    }
}

impl From<std::io::Error> for FilestoreError {
    fn from(e: std::io::Error) -> Self {
        FilestoreError::Io(e.to_string())
    }
}

pub type FilestoreResult<T> = Result<T, FilestoreError>;

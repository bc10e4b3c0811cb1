//! Snapshot error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the write paths and catalog loading. Read paths log and fall
/// back to empty collections instead.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Task {0} not found")]
    TaskNotFound(String),
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SnapshotError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        SnapshotError::Json {
            path: path.into(),
            source,
        }
    }
}

/// Result type for snapshot operations.
pub type Result<T> = std::result::Result<T, SnapshotError>;

//! Storage error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by `DataStorage` operations.
///
/// A missing entity is not an error: lookups return `Option`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A required field was missing or blank; nothing was created.
    #[error("Missing required field '{field}'")]
    Validation { field: &'static str },

    /// An id was already present in its collection. Ids are random UUIDs,
    /// so this indicates a broken invariant rather than user error.
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    /// I/O error while reading or writing the snapshot
    #[error("Snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    /// The snapshot exists but cannot be decoded into a consistent store.
    #[error("Corrupt snapshot at {path}: {reason}")]
    CorruptSnapshot { path: PathBuf, reason: String },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        StorageError::CorruptSnapshot {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, StorageError::Validation { .. })
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

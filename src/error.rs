//! Error types for the snapshot store.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The index file exists but could not be parsed. Never repaired automatically.
    #[error("index file {} is corrupt: {source}", path.display())]
    IndexCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A label (or id) did not resolve to any snapshot.
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// Import was given something that is not a usable archive.
    #[error("invalid archive {}: {reason}", path.display())]
    ArchiveInvalid { path: PathBuf, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn archive_invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ArchiveInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Attaches a human-readable context to `std::io` results.
pub(crate) trait IoContext<T> {
    fn io_context<F, S>(self, f: F) -> StoreResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context<F, S>(self, f: F) -> StoreResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| StoreError::io(f(), e))
    }
}

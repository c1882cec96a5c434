//! Database error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for record store operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Errors surfaced by the record store
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Database enabled without a directory
    #[error("database is enabled but no path is configured; set [database] path")]
    MissingPath,

    /// Filesystem operation failed
    #[error("database I/O failed for '{}': {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Record could not be serialized
    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DatabaseError {
    /// Create an Io error for `path`
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

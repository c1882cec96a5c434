//! Storage error types

use thiserror::Error;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by [`SessionFiles`](crate::SessionFiles)
///
/// I/O failures during lineage discovery and clearing are swallowed and
/// logged; only misuse of a cleared session or a failed marker write
/// reaches the caller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session has already been cleared, its names are gone
    #[error("session '{id}' ({timestamp}) has been cleared")]
    Cleared {
        /// Session id
        id: String,
        /// Session start timestamp
        timestamp: i64,
    },

    /// Failed to write the session marker during initialization
    #[error("failed to write session marker '{path}': {source}")]
    Marker {
        /// Marker path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A session without an id cannot be named or found again
    #[error("session id must not be empty (timestamp {timestamp})")]
    EmptyId {
        /// Session start timestamp
        timestamp: i64,
    },

    /// A prefix ending with the separator cannot be decoded unambiguously
    #[error("file prefix '{prefix}' must not end with '_'")]
    InvalidPrefix {
        /// Offending prefix
        prefix: String,
    },
}

impl SessionError {
    /// Create a Cleared error
    pub fn cleared(id: impl Into<String>, timestamp: i64) -> Self {
        Self::Cleared {
            id: id.into(),
            timestamp,
        }
    }

    /// Create a Marker error
    pub fn marker(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Marker {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleared_error() {
        let err = SessionError::cleared("abc", 42);
        assert!(err.to_string().contains("abc"));
        assert!(err.to_string().contains("cleared"));
    }

    #[test]
    fn test_empty_id_error() {
        let err = SessionError::EmptyId { timestamp: 7 };
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_marker_error() {
        let err = SessionError::marker(
            "dir/bt-session_abc_1",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("bt-session_abc_1"));
        assert!(err.to_string().contains("denied"));
    }
}

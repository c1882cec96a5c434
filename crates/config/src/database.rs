//! Pending record database configuration

use serde::Deserialize;

/// Pending record database configuration
///
/// # Example
///
/// ```toml
/// [database]
/// enabled = true
/// path = "backlog/database"
/// create_database_directory = true
/// maximum_number_of_records = 8
/// deduplication = ["callstack", "message"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Whether undelivered records are persisted
    /// Default: false
    pub enabled: bool,

    /// Record directory, required when enabled
    pub path: Option<String>,

    /// Create the directory on start when missing
    /// Default: true
    pub create_database_directory: bool,

    /// Records kept on disk; the oldest are evicted to make room
    /// Default: 8
    pub maximum_number_of_records: usize,

    /// Report content hashed into the deduplication key
    /// Default: none (no deduplication)
    pub deduplication: Vec<DeduplicationKey>,
}

/// Part of a report that contributes to its deduplication key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeduplicationKey {
    /// Main thread stack
    Callstack,
    /// Exception classifiers
    Classifier,
    /// Error message attribute
    Message,
    /// Everything above
    All,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: None,
            create_database_directory: true,
            maximum_number_of_records: 8,
            deduplication: Vec::new(),
        }
    }
}

impl DatabaseConfig {
    /// Enabled config rooted at `path`
    pub fn at(path: impl Into<String>) -> Self {
        Self {
            enabled: true,
            path: Some(path.into()),
            ..Self::default()
        }
    }
}

//! Session namespace configuration

use serde::Deserialize;

/// Session namespace configuration
///
/// # Example
///
/// ```toml
/// [session]
/// directory = "backlog"
/// max_previous_locked_sessions = 2
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory shared by every session generation
    /// Default: "backlog"
    pub directory: String,

    /// Previous generations a harvester may lock at once
    /// Default: 2
    pub max_previous_locked_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            directory: "backlog".into(),
            max_previous_locked_sessions: 2,
        }
    }
}

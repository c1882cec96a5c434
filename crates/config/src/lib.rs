//! Backlog Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a valid configuration; only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use backlog_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[session]\ndirectory = \"/var/lib/agent\"").unwrap();
//! assert_eq!(config.session.directory, "/var/lib/agent");
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "debug"
//!
//! [session]
//! directory = "backlog"
//! max_previous_locked_sessions = 2
//!
//! [breadcrumbs]
//! maximum_breadcrumbs = 100
//!
//! [database]
//! enabled = true
//! path = "backlog/database"
//!
//! [chunks]
//! max_length = 1048576
//! whole_lines = "break"
//! ```

mod breadcrumbs;
mod chunks;
mod database;
mod error;
mod logging;
mod session;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use breadcrumbs::BreadcrumbsConfig;
pub use chunks::{ChunksConfig, WholeLinesMode};
pub use database::{DatabaseConfig, DeduplicationKey};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use session::SessionConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Session namespace
    pub session: SessionConfig,

    /// Breadcrumb log pair
    pub breadcrumbs: BreadcrumbsConfig,

    /// Pending record database
    pub database: DatabaseConfig,

    /// Chunked file output
    pub chunks: ChunksConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        validation::validate_config(&config)?;
        Ok(config)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

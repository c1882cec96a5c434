//! Configuration validation
//!
//! Validates config consistency:
//! - Required fields are present for enabled components
//! - Capacities are non-zero

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_breadcrumbs(config)?;
    validate_database(config)?;
    validate_chunks(config)?;
    Ok(())
}

fn validate_breadcrumbs(config: &Config) -> Result<()> {
    if config.breadcrumbs.maximum_breadcrumbs == 0 {
        return Err(ConfigError::invalid_value(
            "breadcrumbs",
            "maximum_breadcrumbs",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_database(config: &Config) -> Result<()> {
    let database = &config.database;
    if !database.enabled {
        return Ok(());
    }

    if database.maximum_number_of_records == 0 {
        return Err(ConfigError::invalid_value(
            "database",
            "maximum_number_of_records",
            "must be greater than 0",
        ));
    }

    match database.path.as_deref() {
        None | Some("") => Err(ConfigError::missing_field("database", "path")),
        Some(_) => Ok(()),
    }
}

fn validate_chunks(config: &Config) -> Result<()> {
    if config.chunks.max_length == 0 {
        return Err(ConfigError::invalid_value(
            "chunks",
            "max_length",
            "must be greater than 0",
        ));
    }
    if config.chunks.max_files == 0 {
        return Err(ConfigError::invalid_value(
            "chunks",
            "max_files",
            "must be greater than 0",
        ));
    }
    Ok(())
}

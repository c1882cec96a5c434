//! Breadcrumb records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Origin of a breadcrumb
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreadcrumbType {
    /// Added explicitly by the application (default)
    #[default]
    Manual,
    Log,
    Navigation,
    Http,
    System,
    User,
    Configuration,
}

impl BreadcrumbType {
    /// Name as persisted
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Log => "log",
            Self::Navigation => "navigation",
            Self::Http => "http",
            Self::System => "system",
            Self::User => "user",
            Self::Configuration => "configuration",
        }
    }
}

/// Severity of a breadcrumb
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreadcrumbLogLevel {
    Verbose,
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl BreadcrumbLogLevel {
    /// Name as persisted
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verbose => "verbose",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Breadcrumb as handed in by the application
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBreadcrumb {
    pub message: String,
    pub level: BreadcrumbLogLevel,
    pub breadcrumb_type: BreadcrumbType,
    pub attributes: Option<Map<String, Value>>,
}

impl RawBreadcrumb {
    /// Manual info breadcrumb with `message`
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Set the level
    pub fn with_level(mut self, level: BreadcrumbLogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the type
    pub fn with_type(mut self, breadcrumb_type: BreadcrumbType) -> Self {
        self.breadcrumb_type = breadcrumb_type;
        self
    }

    /// Attach one attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Breadcrumb as persisted, one JSON object per line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub id: u64,
    pub message: String,

    /// Epoch milliseconds
    pub timestamp: i64,

    #[serde(rename = "type")]
    pub breadcrumb_type: BreadcrumbType,

    pub level: BreadcrumbLogLevel,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
}

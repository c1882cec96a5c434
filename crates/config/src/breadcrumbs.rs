//! Breadcrumb storage configuration

use serde::Deserialize;

/// Breadcrumb log pair configuration
///
/// Both limits span the main and fallback files together; each file gets
/// half.
///
/// # Example
///
/// ```toml
/// [breadcrumbs]
/// maximum_breadcrumbs = 100
/// maximum_total_size = 65536
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BreadcrumbsConfig {
    /// Whether breadcrumbs are persisted
    /// Default: true
    pub enabled: bool,

    /// Breadcrumbs kept across both files
    /// Default: 100
    pub maximum_breadcrumbs: u64,

    /// Bytes kept across both files, unbounded when absent
    pub maximum_total_size: Option<u64>,
}

impl Default for BreadcrumbsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            maximum_breadcrumbs: 100,
            maximum_total_size: None,
        }
    }
}

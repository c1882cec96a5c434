//! Chunked file output configuration

use serde::Deserialize;

/// How a length-bounded chunk treats line boundaries
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WholeLinesMode {
    /// Cut exactly at the length limit
    None,
    /// Cut at the last newline; force-split lines longer than a chunk (default)
    #[default]
    Break,
    /// Cut at the last newline; drop lines longer than a chunk
    Skip,
}

/// Chunked file output configuration
///
/// # Example
///
/// ```toml
/// [chunks]
/// max_length = 1048576
/// max_files = 4
/// whole_lines = "break"
/// allow_empty_chunks = false
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunksConfig {
    /// Bytes per chunk
    /// Default: 1048576 (1MB)
    pub max_length: usize,

    /// Chunk files retained
    /// Default: 4
    pub max_files: usize,

    /// Line boundary policy
    /// Default: break
    pub whole_lines: WholeLinesMode,

    /// Surface zero-length chunks to the sink
    /// Default: false
    pub allow_empty_chunks: bool,
}

impl Default for ChunksConfig {
    fn default() -> Self {
        Self {
            max_length: 1024 * 1024,
            max_files: 4,
            whole_lines: WholeLinesMode::Break,
            allow_empty_chunks: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_whole_lines_modes() {
        for (s, expected) in [
            ("none", WholeLinesMode::None),
            ("break", WholeLinesMode::Break),
            ("skip", WholeLinesMode::Skip),
        ] {
            let config: ChunksConfig = toml::from_str(&format!("whole_lines = \"{s}\"")).unwrap();
            assert_eq!(config.whole_lines, expected);
        }
    }

    #[test]
    fn test_defaults() {
        let config: ChunksConfig = toml::from_str("").unwrap();
        assert_eq!(config.max_length, 1024 * 1024);
        assert_eq!(config.whole_lines, WholeLinesMode::Break);
        assert!(!config.allow_empty_chunks);
    }
}

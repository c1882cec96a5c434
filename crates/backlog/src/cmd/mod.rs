//! Command implementations for the backlog CLI

pub mod capture;
pub mod harvest;
pub mod records;
pub mod sessions;
pub mod split;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use backlog_config::{Config, WholeLinesMode};
use backlog_sinks::{BreadcrumbLimits, WholeLines};
use backlog_storage::{FileSystem, NativeFileSystem, SessionFiles, SessionId, SessionOptions};
use chrono::{TimeZone, Utc};

/// Settings shared by every command
#[derive(Debug)]
pub struct Env {
    /// Loaded configuration
    pub config: Config,

    /// Session directory
    pub dir: PathBuf,
}

impl Env {
    /// Resolve the session directory: `--dir` > `[session] directory`
    pub fn new(config: Config, dir: Option<PathBuf>) -> Self {
        let dir = dir.unwrap_or_else(|| PathBuf::from(&config.session.directory));
        Self { config, dir }
    }

    /// Filesystem every command works on
    pub fn file_system(&self) -> Arc<dyn FileSystem> {
        Arc::new(NativeFileSystem::default())
    }

    /// Session options from `[session]`
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            max_previous_locked_sessions: self.config.session.max_previous_locked_sessions,
            lockable: true,
        }
    }

    /// Breadcrumb capacity from `[breadcrumbs]`
    pub fn breadcrumb_limits(&self) -> BreadcrumbLimits {
        BreadcrumbLimits {
            maximum_breadcrumbs: self.config.breadcrumbs.maximum_breadcrumbs,
            maximum_total_size: self.config.breadcrumbs.maximum_total_size,
        }
    }

    /// Handle newer than every stored session, used to walk all of them
    ///
    /// Never initialized, so it leaves no marker behind.
    pub fn scan_session(&self) -> Result<SessionFiles> {
        Ok(SessionFiles::new(
            self.file_system(),
            &self.dir,
            SessionId::new("scan", i64::MAX),
            self.session_options(),
        )?)
    }
}

/// Map the configured line policy onto the splitter's
pub fn whole_lines(mode: WholeLinesMode) -> WholeLines {
    match mode {
        WholeLinesMode::None => WholeLines::None,
        WholeLinesMode::Break => WholeLines::Break,
        WholeLinesMode::Skip => WholeLines::Skip,
    }
}

/// Epoch milliseconds as RFC 3339, or the raw number when out of range
pub fn format_millis(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(time) => time.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        None => millis.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_flag_overrides_config() {
        let config: Config = "[session]\ndirectory = \"/var/agent\"".parse().unwrap();

        let env = Env::new(config.clone(), None);
        assert_eq!(env.dir, PathBuf::from("/var/agent"));

        let env = Env::new(config, Some(PathBuf::from("/tmp/other")));
        assert_eq!(env.dir, PathBuf::from("/tmp/other"));
    }

    #[test]
    fn test_options_from_config() {
        let config: Config = "[session]\nmax_previous_locked_sessions = 5\n[breadcrumbs]\nmaximum_breadcrumbs = 8\nmaximum_total_size = 512"
            .parse()
            .unwrap();
        let env = Env::new(config, None);

        assert_eq!(env.session_options().max_previous_locked_sessions, 5);
        assert_eq!(env.breadcrumb_limits().maximum_breadcrumbs, 8);
        assert_eq!(env.breadcrumb_limits().maximum_total_size, Some(512));
    }

    #[test]
    fn test_whole_lines_mapping() {
        assert_eq!(whole_lines(WholeLinesMode::None), WholeLines::None);
        assert_eq!(whole_lines(WholeLinesMode::Break), WholeLines::Break);
        assert_eq!(whole_lines(WholeLinesMode::Skip), WholeLines::Skip);
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(format_millis(i64::MAX), i64::MAX.to_string());
    }
}

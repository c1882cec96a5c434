//! Harvest command - Print what previous sessions left behind
//!
//! Locks the previous sessions while reading so a clear cannot remove files
//! mid-read, prints their breadcrumbs oldest first, then releases the locks.
//!
//! Locks live in this process only. They order the harvest against its own
//! `--clear`; another process clearing the same directory is not held off.
//! Only sessions within the lock budget are read, so `-n` past
//! `[session] max_previous_locked_sessions` is clamped.
//!
//! # Usage
//!
//! ```bash
//! backlog harvest                 # newest previous sessions per config
//! backlog harvest -n 5 --json     # five sessions, JSON output
//! backlog harvest --clear         # print, then delete every previous session
//! ```

use std::io::{self, Write};

use anyhow::Result;
use backlog_sinks::{BreadcrumbsStorage, read_breadcrumbs};
use backlog_storage::SessionFiles;
use clap::Args;
use serde_json::json;

use super::{Env, format_millis};

/// Harvest command arguments
#[derive(Args, Debug)]
pub struct HarvestArgs {
    /// Number of previous sessions to read, newest first
    /// (default and maximum: `[session] max_previous_locked_sessions`)
    #[arg(short = 'n', long)]
    pub sessions: Option<usize>,

    /// Delete every previous session after printing
    #[arg(long)]
    pub clear: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the harvest command
pub async fn run(args: HarvestArgs, env: &Env) -> Result<()> {
    let mut out = io::stdout().lock();
    let harvested = harvest(&args, env, &mut out)?;
    tracing::info!(sessions = harvested, cleared = args.clear, "harvest finished");
    Ok(())
}

fn harvest(args: &HarvestArgs, env: &Env, out: &mut impl Write) -> Result<usize> {
    let scan = env.scan_session()?;
    let budget = env.config.session.max_previous_locked_sessions;
    let wanted = args.sessions.unwrap_or(budget);

    let lock_id = scan.lock_previous_sessions(None);
    let locked: Vec<SessionFiles> = scan
        .get_previous_sessions(wanted)
        .into_iter()
        .take_while(|session| session.lock_count() > 0)
        .collect();
    if wanted > budget {
        tracing::warn!(
            requested = wanted,
            budget,
            "harvest limited to the sessions the lock budget covers"
        );
    }

    let printed = print_sessions(args, env, &locked, out);
    scan.unlock_previous_sessions(&lock_id);

    let printed = printed?;
    if args.clear {
        scan.clear_previous_sessions();
    }
    Ok(printed)
}

fn print_sessions(
    args: &HarvestArgs,
    env: &Env,
    sessions: &[SessionFiles],
    out: &mut impl Write,
) -> Result<usize> {
    let fs = env.file_system();
    let mut harvested = Vec::new();

    for session in sessions {
        let id = session.session_id();
        let files = BreadcrumbsStorage::session_files(session)?;
        let breadcrumbs = read_breadcrumbs(fs.as_ref(), &files);

        if args.json {
            harvested.push(json!({
                "session": id.id,
                "timestamp": id.timestamp,
                "breadcrumbs": breadcrumbs,
            }));
            continue;
        }

        writeln!(out, "== session {} ({})", id.id, format_millis(id.timestamp))?;
        for breadcrumb in &breadcrumbs {
            writeln!(
                out,
                "{} {} {:<7} {:<13} {}",
                breadcrumb.id,
                format_millis(breadcrumb.timestamp),
                breadcrumb.level.as_str(),
                breadcrumb.breadcrumb_type.as_str(),
                breadcrumb.message
            )?;
        }
    }

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&harvested)?)?;
    }

    Ok(sessions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use backlog_config::Config;
    use backlog_sinks::RawBreadcrumb;
    use backlog_storage::SessionId;
    use tempfile::TempDir;

    fn env(dir: &TempDir) -> Env {
        Env::new(Config::default(), Some(dir.path().to_path_buf()))
    }

    fn session_with(env: &Env, id: &str, timestamp: i64, messages: &[&str]) {
        let session = SessionFiles::new(
            env.file_system(),
            &env.dir,
            SessionId::new(id, timestamp),
            env.session_options(),
        )
        .unwrap();
        session.initialize().unwrap();
        let storage = BreadcrumbsStorage::create(&session, env.breadcrumb_limits()).unwrap();
        for message in messages {
            storage.add(RawBreadcrumb::new(*message)).unwrap();
        }
    }

    fn args(sessions: Option<usize>, clear: bool, json: bool) -> HarvestArgs {
        HarvestArgs {
            sessions,
            clear,
            json,
        }
    }

    fn output(args: &HarvestArgs, env: &Env) -> String {
        let mut out = Vec::new();
        harvest(args, env, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_prints_newest_sessions() {
        let dir = TempDir::new().unwrap();
        let env = env(&dir);
        session_with(&env, "a", 1_000, &["a1"]);
        session_with(&env, "b", 2_000, &["b1", "b2"]);
        session_with(&env, "c", 3_000, &["c1"]);

        let text = output(&args(Some(2), false, false), &env);
        let headers: Vec<&str> = text.lines().filter(|l| l.starts_with("==")).collect();

        assert_eq!(headers.len(), 2);
        assert!(headers[0].starts_with("== session c "));
        assert!(headers[1].starts_with("== session b "));
        assert!(text.contains(" b1"));
        assert!(text.contains(" b2"));
        assert!(!text.contains(" a1"));
    }

    #[test]
    fn test_session_count_clamped_to_lock_budget() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.session.max_previous_locked_sessions = 1;
        let env = Env::new(config, Some(dir.path().to_path_buf()));
        session_with(&env, "a", 1_000, &["a1"]);
        session_with(&env, "b", 2_000, &["b1"]);
        session_with(&env, "c", 3_000, &["c1"]);

        let text = output(&args(Some(3), false, false), &env);
        let headers: Vec<&str> = text.lines().filter(|l| l.starts_with("==")).collect();

        assert_eq!(headers.len(), 1);
        assert!(headers[0].starts_with("== session c "));
        assert!(!text.contains(" b1"));
    }

    #[test]
    fn test_locks_released_after_harvest() {
        let dir = TempDir::new().unwrap();
        let env = env(&dir);
        session_with(&env, "a", 1_000, &["a1"]);

        output(&args(None, true, false), &env);

        assert!(env.scan_session().unwrap().get_previous_session().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_without_clear_keeps_files() {
        let dir = TempDir::new().unwrap();
        let env = env(&dir);
        session_with(&env, "a", 1_000, &["a1"]);

        output(&args(None, false, false), &env);
        output(&args(None, false, false), &env);

        assert!(env.scan_session().unwrap().get_previous_session().is_some());
    }

    #[test]
    fn test_json_output() {
        let dir = TempDir::new().unwrap();
        let env = env(&dir);
        session_with(&env, "a", 1_000, &["first", "second"]);

        let text = output(&args(None, false, true), &env);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value[0]["session"], "a");
        assert_eq!(value[0]["breadcrumbs"][1]["message"], "second");
        assert_eq!(value[0]["breadcrumbs"][1]["type"], "manual");
    }

    #[test]
    fn test_nothing_to_harvest() {
        let dir = TempDir::new().unwrap();
        let env = env(&dir);

        assert_eq!(output(&args(None, true, false), &env), "");
    }
}

//! Capture command - Record stdin lines as breadcrumbs
//!
//! Starts a new session in the session directory, the way an agent does on
//! startup, and writes one breadcrumb per input line. A later `harvest`
//! finds them as the previous session's residue.
//!
//! # Usage
//!
//! ```bash
//! tail -f app.log | backlog capture --type log --level warning
//! ```

use std::io::{self, BufRead};

use anyhow::{Context, Result, bail};
use backlog_sinks::{BreadcrumbLogLevel, BreadcrumbType, BreadcrumbsStorage, RawBreadcrumb};
use backlog_storage::{SessionFiles, SessionId};
use clap::{Args, ValueEnum};

use super::Env;

/// Capture command arguments
#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// Breadcrumb type of every line
    #[arg(short = 't', long = "type", value_enum, default_value_t = TypeArg::Log)]
    pub breadcrumb_type: TypeArg,

    /// Breadcrumb level of every line
    #[arg(long, value_enum, default_value_t = LevelArg::Info)]
    pub level: LevelArg,
}

/// Breadcrumb type accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TypeArg {
    Manual,
    Log,
    Navigation,
    Http,
    System,
    User,
    Configuration,
}

impl From<TypeArg> for BreadcrumbType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Manual => Self::Manual,
            TypeArg::Log => Self::Log,
            TypeArg::Navigation => Self::Navigation,
            TypeArg::Http => Self::Http,
            TypeArg::System => Self::System,
            TypeArg::User => Self::User,
            TypeArg::Configuration => Self::Configuration,
        }
    }
}

/// Breadcrumb level accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    Verbose,
    Debug,
    Info,
    Warning,
    Error,
}

impl From<LevelArg> for BreadcrumbLogLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Verbose => Self::Verbose,
            LevelArg::Debug => Self::Debug,
            LevelArg::Info => Self::Info,
            LevelArg::Warning => Self::Warning,
            LevelArg::Error => Self::Error,
        }
    }
}

/// Run the capture command
pub async fn run(args: CaptureArgs, env: &Env) -> Result<()> {
    let (session, count) = capture(&args, env, io::stdin().lock())?;
    eprintln!("captured {} breadcrumb(s) in session {}", count, session);
    Ok(())
}

fn capture(args: &CaptureArgs, env: &Env, input: impl BufRead) -> Result<(SessionId, u64)> {
    if !env.config.breadcrumbs.enabled {
        bail!("breadcrumbs are disabled in [breadcrumbs]");
    }

    let session = SessionFiles::new(
        env.file_system(),
        &env.dir,
        SessionId::generate(),
        env.session_options(),
    )?;
    session
        .initialize()
        .with_context(|| format!("failed to start session in {}", env.dir.display()))?;
    tracing::info!(session = %session.session_id(), "capture session started");

    let storage = BreadcrumbsStorage::create(&session, env.breadcrumb_limits())?;

    let mut count = 0;
    for line in input.lines() {
        let line = line.context("failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }

        storage.add(
            RawBreadcrumb::new(line)
                .with_type(args.breadcrumb_type.into())
                .with_level(args.level.into()),
        )?;
        count += 1;
    }

    let metrics = storage.writer().metrics().snapshot();
    tracing::debug!(
        lines = metrics.lines_written,
        rotations = metrics.rotations,
        pending = storage.writer().pending(),
        "capture finished"
    );
    storage.dispose();

    Ok((session.session_id().clone(), count))
}

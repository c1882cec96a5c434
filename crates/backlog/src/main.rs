//! Backlog - Operator CLI for the session store
//!
//! # Usage
//!
//! ```bash
//! # Show stored sessions, newest first
//! backlog sessions --dir /var/lib/agent/backlog
//!
//! # Record stdin lines as breadcrumbs of a new session
//! tail -f app.log | backlog capture --config agent.toml
//!
//! # Print and drop what previous sessions left behind
//! backlog harvest --clear
//!
//! # Inspect pending records
//! backlog records
//!
//! # Split a file into bounded chunks
//! backlog split crash.dmp --out chunks/
//! ```

mod cmd;

use std::path::PathBuf;

use anyhow::{Context, Result};
use backlog_config::{Config, LogFormat};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Backlog - Durable local event queue
#[derive(Parser, Debug)]
#[command(name = "backlog")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Session directory. Overrides `[session] directory`.
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored sessions, newest first
    Sessions(cmd::sessions::SessionsArgs),

    /// Record stdin lines as breadcrumbs of a new session
    Capture(cmd::capture::CaptureArgs),

    /// Print breadcrumbs left by previous sessions
    Harvest(cmd::harvest::HarvestArgs),

    /// List, add or prune pending records
    Records(cmd::records::RecordsArgs),

    /// Split a file into bounded chunk files
    Split(cmd::split::SplitArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let log_level = resolve_log_level(cli.log_level.as_deref(), cli.config.as_ref().map(|_| &config));
    init_logging(&log_level, config.log.format)?;

    let env = cmd::Env::new(config, cli.dir);

    match cli.command {
        Command::Sessions(args) => cmd::sessions::run(args, &env).await,
        Command::Capture(args) => cmd::capture::run(args, &env).await,
        Command::Harvest(args) => cmd::harvest::run(args, &env).await,
        Command::Records(args) => cmd::records::run(args, &env).await,
        Command::Split(args) => cmd::split::run(args, &env).await,
    }
}

/// Load the config file, or defaults when none is given
fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Resolve log level: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, config: Option<&Config>) -> String {
    if let Some(level) = cli_level {
        return level.to_string();
    }

    if let Some(config) = config {
        return config.log.level.as_str().to_string();
    }

    "info".to_string()
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Console => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}

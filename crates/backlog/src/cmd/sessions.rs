//! Sessions command - List the session lineage
//!
//! # Usage
//!
//! ```bash
//! backlog sessions --dir /var/lib/agent/backlog
//! backlog sessions --json
//! ```

use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{Env, format_millis};

/// Sessions command arguments
#[derive(Args, Debug)]
pub struct SessionsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List each session's files
    #[arg(short, long)]
    pub files: bool,
}

/// Run the sessions command
pub async fn run(args: SessionsArgs, env: &Env) -> Result<()> {
    let mut out = io::stdout().lock();
    list(&args, env, &mut out)
}

fn list(args: &SessionsArgs, env: &Env, out: &mut impl Write) -> Result<()> {
    let mut listed = Vec::new();
    let mut count = 0usize;

    for session in env.scan_session()?.previous_sessions() {
        let id = session.session_id().clone();
        let files = session.get_session_files()?;
        count += 1;

        if args.json {
            listed.push(json!({
                "id": id.id,
                "timestamp": id.timestamp,
                "files": files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>(),
            }));
            continue;
        }

        writeln!(
            out,
            "{}  {}  {} file(s)",
            id.id,
            format_millis(id.timestamp),
            files.len()
        )?;
        if args.files {
            for file in &files {
                writeln!(out, "    {}", file.display())?;
            }
        }
    }

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&listed)?)?;
    } else if count == 0 {
        writeln!(out, "no sessions in {}", env.dir.display())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use backlog_config::Config;
    use backlog_storage::{SessionFiles, SessionId};
    use tempfile::TempDir;

    fn env(dir: &TempDir) -> Env {
        Env::new(Config::default(), Some(dir.path().to_path_buf()))
    }

    fn output(args: SessionsArgs, env: &Env) -> String {
        let mut out = Vec::new();
        list(&args, env, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_lists_newest_first() {
        let dir = TempDir::new().unwrap();
        let env = env(&dir);
        for (id, timestamp) in [("old", 1_000), ("new", 2_000)] {
            let session = SessionFiles::new(
                env.file_system(),
                &env.dir,
                SessionId::new(id, timestamp),
                env.session_options(),
            )
            .unwrap();
            session.initialize().unwrap();
        }

        let text = output(
            SessionsArgs {
                json: false,
                files: false,
            },
            &env,
        );
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("new  1970-01-01T00:00:02.000Z  1 file(s)"));
        assert!(lines[1].starts_with("old  "));
    }

    #[test]
    fn test_json_output() {
        let dir = TempDir::new().unwrap();
        let env = env(&dir);
        let session = SessionFiles::new(
            env.file_system(),
            &env.dir,
            SessionId::new("abc", 42),
            env.session_options(),
        )
        .unwrap();
        session.initialize().unwrap();

        let text = output(
            SessionsArgs {
                json: true,
                files: false,
            },
            &env,
        );
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value[0]["id"], "abc");
        assert_eq!(value[0]["timestamp"], 42);
        assert_eq!(value[0]["files"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let env = env(&dir);

        let text = output(
            SessionsArgs {
                json: false,
                files: false,
            },
            &env,
        );
        assert!(text.starts_with("no sessions in "));
    }
}

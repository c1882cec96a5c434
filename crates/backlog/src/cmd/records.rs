//! Records command - Inspect the pending record store
//!
//! # Usage
//!
//! ```bash
//! backlog records                       # list, oldest first
//! backlog records --add report.json     # enqueue a report
//! backlog records --prune               # list, then delete what was listed
//! backlog records --path /tmp/db --json
//! ```

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use backlog_database::{DeduplicationModel, DeduplicationStrategy, PendingRecord, RecordStore};
use clap::Args;
use serde_json::Value;

use super::{Env, format_millis};

/// Records command arguments
#[derive(Args, Debug)]
pub struct RecordsArgs {
    /// Record directory. Overrides `[database] path`.
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Enqueue the JSON report in FILE before listing
    #[arg(long, value_name = "FILE")]
    pub add: Option<PathBuf>,

    /// Delete the listed records
    #[arg(long)]
    pub prune: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the records command
pub async fn run(args: RecordsArgs, env: &Env) -> Result<()> {
    let mut out = io::stdout().lock();
    records(&args, env, &mut out).await
}

async fn records(args: &RecordsArgs, env: &Env, out: &mut impl Write) -> Result<()> {
    let store = open_store(args, env)?;

    if let Some(file) = &args.add {
        let data: Value = serde_json::from_str(
            &std::fs::read_to_string(file)
                .with_context(|| format!("failed to read {}", file.display()))?,
        )
        .with_context(|| format!("{} is not JSON", file.display()))?;
        let record = enqueue(&store, env, data).await?;
        tracing::info!(id = %record.id, count = record.count, "record enqueued");
    }

    let records = store.get().await?;

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&records)?)?;
    } else if records.is_empty() {
        writeln!(out, "no pending records in {}", store.path().display())?;
    } else {
        for record in &records {
            writeln!(
                out,
                "{}  {}  x{}  {}",
                record.id,
                format_millis(record.timestamp),
                record.count,
                if record.hash.is_empty() { "-" } else { record.hash.as_str() }
            )?;
        }
    }

    if args.prune {
        let mut pruned = 0;
        for record in &records {
            if store.delete(record).await? {
                pruned += 1;
            }
        }
        tracing::info!(pruned, "pending records pruned");
    }

    Ok(())
}

fn open_store(args: &RecordsArgs, env: &Env) -> Result<RecordStore> {
    let store = match &args.path {
        Some(path) => RecordStore::new(env.file_system(), path, false)
            .with_maximum_number_of_records(env.config.database.maximum_number_of_records),
        None => match RecordStore::create_if_valid(env.file_system(), &env.config.database)? {
            Some(store) => store,
            None => bail!("database is disabled in [database]; pass --path to inspect a directory"),
        },
    };

    if !store.start()? {
        bail!("record directory {} does not exist", store.path().display());
    }
    Ok(store)
}

/// Store `data`, folding it into a stored record with the same key
async fn enqueue(store: &RecordStore, env: &Env, data: Value) -> Result<PendingRecord> {
    let model = DeduplicationModel::new(DeduplicationStrategy::from_keys(
        &env.config.database.deduplication,
    ));
    let key = model.key(&data);

    if !key.is_empty()
        && let Some(mut existing) = store.get().await?.into_iter().find(|r| r.hash == key)
    {
        existing.count += 1;
        store.add(&existing)?;
        return Ok(existing);
    }

    let record = PendingRecord::new(data, Vec::new()).with_hash(key);
    store.add(&record)?;
    Ok(record)
}

//! Split command - Cut a file into bounded chunk files
//!
//! Chunk `n` of `crash.log` is written as `crash-n.log`. Only the newest
//! `max_files` chunks are kept.
//!
//! # Usage
//!
//! ```bash
//! backlog split app.log --out chunks/              # limits from [chunks]
//! backlog split app.log --max-length 4096 --lines 100 --max-files 8
//! ```

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use backlog_sinks::{
    ChunkSplitter, Chunkifier, CombinedChunkSplitter, FileChunkSink, LengthChunkSplitter,
    LineChunkSplitter,
};
use clap::Args;

use super::{Env, whole_lines};

/// Split command arguments
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// File to split
    pub input: PathBuf,

    /// Directory for chunk files (default: next to the input)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Bytes per chunk. Overrides `[chunks] max_length`.
    #[arg(long)]
    pub max_length: Option<usize>,

    /// Also end a chunk after this many lines
    #[arg(long)]
    pub lines: Option<usize>,

    /// Chunk files retained. Overrides `[chunks] max_files`.
    #[arg(long)]
    pub max_files: Option<usize>,
}

/// Run the split command
pub async fn run(args: SplitArgs, env: &Env) -> Result<()> {
    let mut out = io::stdout().lock();
    split(&args, env, &mut out)
}

fn split(args: &SplitArgs, env: &Env, out: &mut impl Write) -> Result<()> {
    let chunks = &env.config.chunks;
    let max_length = args.max_length.unwrap_or(chunks.max_length).max(1);
    let max_files = args.max_files.unwrap_or(chunks.max_files);
    let line_policy = whole_lines(chunks.whole_lines);
    let max_lines = args.lines.filter(|&lines| lines > 0);

    let out_dir = match &args.out {
        Some(dir) => dir.clone(),
        None => args
            .input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut input =
        File::open(&args.input).with_context(|| format!("failed to open {}", args.input.display()))?;

    let (stem, extension) = chunk_name_parts(&args.input);
    let sink = FileChunkSink::new(env.file_system(), max_files, move |n| {
        out_dir.join(format!("{stem}-{n}{extension}"))
    });

    let mut chunkifier = Chunkifier::new(sink, move || -> Box<dyn ChunkSplitter> {
        let length = LengthChunkSplitter::new(max_length, line_policy);
        match max_lines {
            Some(lines) => Box::new(CombinedChunkSplitter::new(vec![
                Box::new(length),
                Box::new(LineChunkSplitter::new(lines)),
            ])),
            None => Box::new(length),
        }
    })
    .allow_empty_chunks(chunks.allow_empty_chunks);

    let copied = io::copy(&mut input, &mut chunkifier)
        .with_context(|| format!("failed to split {}", args.input.display()))?;
    let opened = chunkifier.chunks_opened();
    let sink = chunkifier.finish()?;

    tracing::info!(
        input = %args.input.display(),
        bytes = copied,
        chunks = opened,
        retained = sink.files().len(),
        "split finished"
    );
    for file in sink.files() {
        writeln!(out, "{}", file.display())?;
    }
    Ok(())
}

/// File stem and dotted extension used to name chunks of `input`
fn chunk_name_parts(input: &Path) -> (String, String) {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chunk".to_string());
    let extension = input
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    (stem, extension)
}

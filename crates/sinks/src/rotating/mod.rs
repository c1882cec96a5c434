//! Two-generation rotating log pair
//!
//! Lines are appended to a *main* file. When main reaches its capacity the
//! whole file is renamed over the *fallback* and writing continues into a
//! fresh main, so the pair always holds the newest generation in main and
//! the one before it in fallback. Both files outlive the process; they are
//! what the next session harvests after a crash.
//!
//! # Architecture
//!
//! ```text
//! write_line() ──► [queue] ──drain──► batch ──write_all──► main
//!                                       │
//!                        capacity reached? ──► flush, rename(main → fallback),
//!                                              drop stream, open fresh main
//! ```
//!
//! A single mutex guards the queue, the stream and the counters, so lines
//! reach disk in the order `write_line` was called, across rotations too.
//!
//! # Failure handling
//!
//! | Failure | Effect |
//! |---------|--------|
//! | main cannot be opened | line stays queued, retried on next call |
//! | append or flush fails | batch requeued at the front, stream buffer dropped |
//! | flush before rotation fails | rotation aborted, head requeued |
//! | rename fails | rotation skipped, writing continues on the current main |
//!
//! Nothing is discarded except by [`RotatingWriter::dispose`].

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use backlog_storage::{FileSystem, SessionFiles, WriteStream};
use parking_lot::Mutex;

use crate::common::{Result, WriterError, WriterMetrics};
use crate::util::RateLimitedLogger;

/// Per-file capacity of a rotating pair
///
/// Both limits are optional and enforced independently; with neither set
/// the writer never rotates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationLimits {
    /// Lines per file
    pub max_lines: Option<u64>,

    /// Bytes per file, newlines included
    pub max_size: Option<u64>,
}

impl RotationLimits {
    /// Rotate after `max_lines` lines
    pub fn lines(max_lines: u64) -> Self {
        Self {
            max_lines: Some(max_lines),
            max_size: None,
        }
    }

    /// Also rotate before main would reach `max_size` bytes
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_lines == Some(0) {
            return Err(WriterError::invalid_limit("max_lines"));
        }
        if self.max_size == Some(0) {
            return Err(WriterError::invalid_limit("max_size"));
        }
        Ok(())
    }

    fn must_rotate(&self, count: u64, size: u64, incoming: u64) -> bool {
        self.max_lines.is_some_and(|max| count >= max)
            || self.max_size.is_some_and(|max| size + incoming >= max)
    }

    fn fits(&self, count: u64, size: u64) -> bool {
        self.max_lines.is_none_or(|max| count <= max) && self.max_size.is_none_or(|max| size < max)
    }
}

struct WriterState {
    queue: VecDeque<String>,
    stream: Option<Box<dyn WriteStream>>,

    /// Lines in the current main
    count: u64,

    /// Bytes in the current main
    size: u64,

    disposed: bool,
}

/// Line writer over a main/fallback file pair
pub struct RotatingWriter {
    fs: Arc<dyn FileSystem>,
    main: PathBuf,
    fallback: PathBuf,
    limits: RotationLimits,
    state: Mutex<WriterState>,
    metrics: WriterMetrics,
    error_logger: RateLimitedLogger,
}

impl std::fmt::Debug for RotatingWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingWriter")
            .field("main", &self.main)
            .field("fallback", &self.fallback)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl RotatingWriter {
    /// Create a writer over `main` and `fallback`
    ///
    /// Nothing touches disk until the first line is written.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::InvalidLimit`] if a limit is zero.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        main: impl Into<PathBuf>,
        fallback: impl Into<PathBuf>,
        limits: RotationLimits,
    ) -> Result<Self> {
        limits.validate()?;

        Ok(Self {
            fs,
            main: main.into(),
            fallback: fallback.into(),
            limits,
            state: Mutex::new(WriterState {
                queue: VecDeque::new(),
                stream: None,
                count: 0,
                size: 0,
                disposed: false,
            }),
            metrics: WriterMetrics::new(),
            error_logger: RateLimitedLogger::default(),
        })
    }

    /// Create a writer whose files are named by `session`
    ///
    /// # Errors
    ///
    /// Fails if the session is cleared or a limit is zero.
    pub fn for_session(
        session: &SessionFiles,
        main_prefix: &str,
        fallback_prefix: &str,
        limits: RotationLimits,
    ) -> Result<Self> {
        let main = session.get_file_name(main_prefix)?;
        let fallback = session.get_file_name(fallback_prefix)?;
        Self::new(session.file_system(), main, fallback, limits)
    }

    /// Path of the newest generation
    pub fn main_path(&self) -> &Path {
        &self.main
    }

    /// Path of the previous generation
    pub fn fallback_path(&self) -> &Path {
        &self.fallback
    }

    /// Writer metrics
    pub fn metrics(&self) -> &WriterMetrics {
        &self.metrics
    }

    /// Lines queued in memory, not yet on disk
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Whether [`dispose`](Self::dispose) was called
    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Append one line
    ///
    /// The line is queued and the queue drained immediately. I/O failures
    /// leave the line queued for the next call and are not reported.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::Disposed`] after [`dispose`](Self::dispose).
    pub fn write_line(&self, value: impl Into<String>) -> Result<()> {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(WriterError::Disposed);
        }

        state.queue.push_back(value.into());
        self.drain(&mut state);
        Ok(())
    }

    /// Retry queued lines without adding a new one
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::Disposed`] after [`dispose`](Self::dispose).
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(WriterError::Disposed);
        }

        self.drain(&mut state);
        Ok(())
    }

    /// Close the stream and reject further writes
    ///
    /// Lines still queued are discarded.
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;

        if let Some(mut stream) = state.stream.take()
            && let Err(e) = stream.flush()
        {
            tracing::warn!(path = %self.main.display(), error = %e, "failed to flush on dispose");
        }

        if !state.queue.is_empty() {
            tracing::debug!(
                path = %self.main.display(),
                discarded = state.queue.len(),
                "rotating writer disposed with queued lines"
            );
            state.queue.clear();
        }
    }

    fn drain(&self, state: &mut WriterState) {
        while let Some(head) = state.queue.pop_front() {
            if state.stream.is_none() {
                match self.fs.create_write_stream(&self.main) {
                    Ok(stream) => {
                        state.stream = Some(stream);
                        state.count = 0;
                        state.size = 0;
                    }
                    Err(e) => {
                        self.metrics.write_error();
                        self.error_logger.error("failed to open rotating log", &e);
                        state.queue.push_front(head);
                        return;
                    }
                }
            }

            let head_bytes = line_len(&head);
            if state.count > 0
                && self.limits.must_rotate(state.count, state.size, head_bytes)
                && !self.rotate(state)
            {
                state.queue.push_front(head);
                return;
            }

            let Some(stream) = state.stream.as_mut() else {
                state.queue.push_front(head);
                return;
            };

            // Take the head, then whatever else still fits this generation
            let mut lines = 1;
            let mut bytes = head_bytes;
            let mut batch = vec![head];
            while let Some(next) = state.queue.front() {
                let next_bytes = line_len(next);
                if !self
                    .limits
                    .fits(state.count + lines + 1, state.size + bytes + next_bytes)
                {
                    break;
                }
                lines += 1;
                bytes += next_bytes;
                if let Some(next) = state.queue.pop_front() {
                    batch.push(next);
                }
            }

            let mut payload = String::with_capacity(bytes as usize);
            for line in &batch {
                payload.push_str(line);
                payload.push('\n');
            }

            // A batch counts as written only once flushed; the stream drops
            // its buffer on failure, so the requeued lines land exactly once.
            let written = stream
                .write_all(payload.as_bytes())
                .map_err(|e| ("failed to append to rotating log", e))
                .and_then(|()| {
                    stream
                        .flush()
                        .map_err(|e| ("failed to flush rotating log", e))
                });
            if let Err((message, e)) = written {
                self.metrics.write_error();
                self.error_logger.error(message, &e);
                for line in batch.into_iter().rev() {
                    state.queue.push_front(line);
                }
                return;
            }

            state.count += lines;
            state.size += bytes;
            self.metrics.batch_written(lines, bytes);
        }
    }

    /// Hand main over to fallback and open a fresh main
    ///
    /// Returns `false` when main cannot be flushed; nothing is renamed and
    /// the caller must stop draining. On rename failure the current stream
    /// is kept and main is untouched. If the fresh main cannot be opened
    /// the stream is left empty and the next drain retries.
    fn rotate(&self, state: &mut WriterState) -> bool {
        if let Some(stream) = state.stream.as_mut()
            && let Err(e) = stream.flush()
        {
            self.metrics.write_error();
            tracing::warn!(path = %self.main.display(), error = %e, "failed to flush before rotation");
            return false;
        }

        if let Err(e) = self.fs.rename(&self.main, &self.fallback) {
            self.metrics.write_error();
            self.error_logger
                .error("failed to rotate log, continuing on current file", &e);
            return true;
        }

        // The old stream must be closed before anything reopens main
        drop(state.stream.take());
        state.count = 0;
        state.size = 0;
        self.metrics.rotated();

        match self.fs.create_write_stream(&self.main) {
            Ok(stream) => {
                state.stream = Some(stream);
                tracing::debug!(
                    main = %self.main.display(),
                    fallback = %self.fallback.display(),
                    "rotated log"
                );
            }
            Err(e) => {
                self.metrics.write_error();
                self.error_logger.error("failed to open rotating log", &e);
            }
        }
        true
    }
}

fn line_len(line: &str) -> u64 {
    line.len() as u64 + 1
}

#[cfg(test)]
#[path = "rotating_test.rs"]
mod rotating_test;

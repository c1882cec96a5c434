//! Common types shared by the writers
//!
//! Error type and metrics counters used by [`RotatingWriter`](crate::RotatingWriter)
//! and [`BreadcrumbsStorage`](crate::BreadcrumbsStorage).

use std::sync::atomic::{AtomicU64, Ordering};

use backlog_storage::SessionError;
use thiserror::Error;

/// Result type for writer operations
pub type Result<T> = std::result::Result<T, WriterError>;

/// Errors surfaced by writers
///
/// I/O failures are never surfaced: they are retried or logged. Callers
/// only see misconfiguration and use after disposal.
#[derive(Debug, Error)]
pub enum WriterError {
    /// Writer was disposed
    #[error("writer has been disposed")]
    Disposed,

    /// A capacity limit is zero
    #[error("invalid {limit}: must be greater than 0")]
    InvalidLimit {
        /// Name of the limit
        limit: &'static str,
    },

    /// Session refused to name a file
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WriterError {
    /// Create an InvalidLimit error
    pub fn invalid_limit(limit: &'static str) -> Self {
        Self::InvalidLimit { limit }
    }
}

/// Counters kept by a rotating writer
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Lines appended to disk
    pub lines_written: AtomicU64,

    /// Bytes appended to disk, newlines included
    pub bytes_written: AtomicU64,

    /// Append calls issued (one per batch)
    pub batches_written: AtomicU64,

    /// Successful rotations
    pub rotations: AtomicU64,

    /// Failed appends, renames and stream creations
    pub write_errors: AtomicU64,
}

impl WriterMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            lines_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            batches_written: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
        }
    }

    /// Record a successfully appended batch
    #[inline]
    pub fn batch_written(&self, lines: u64, bytes: u64) {
        self.batches_written.fetch_add(1, Ordering::Relaxed);
        self.lines_written.fetch_add(lines, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a completed rotation
    #[inline]
    pub fn rotated(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an I/O failure
    #[inline]
    pub fn write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_written: self.lines_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of writer metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub lines_written: u64,
    pub bytes_written: u64,
    pub batches_written: u64,
    pub rotations: u64,
    pub write_errors: u64,
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;

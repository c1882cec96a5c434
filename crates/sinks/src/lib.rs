//! Backlog - Sinks
//!
//! Writers that persist what the agent must not lose across a crash.
//!
//! # Architecture
//!
//! ```text
//! write_line ──► [RotatingWriter] ──batch──► main ──rotate──► fallback
//!                      ▲
//! add ──► [BreadcrumbsStorage] (one JSON line per breadcrumb)
//!
//! io::Write ──► [Chunkifier] ──► [FileChunkSink] ──► chunk-0 .. chunk-n (newest kept)
//! ```
//!
//! | Writer | Purpose | Bounded by |
//! |--------|---------|------------|
//! | `rotating` | Two-generation line log | lines and bytes per generation |
//! | `breadcrumbs` | Breadcrumb trail of a session | breadcrumb count and total size |
//! | `chunk` | Large stream split into files | chunk length/lines and file count |
//!
//! Files are named through [`SessionFiles`](backlog_storage::SessionFiles)
//! so a later session can find and harvest them.

/// Two-generation rotating line writer
pub mod rotating;

/// Breadcrumb trail on top of the rotating writer
pub mod breadcrumbs;

/// Stream splitting into bounded chunk files
pub mod chunk;

/// Shared utilities
pub mod util;

mod common;

pub use breadcrumbs::{
    BREADCRUMBS_FILE_PREFIX, Breadcrumb, BreadcrumbLimits, BreadcrumbLogLevel, BreadcrumbType,
    BreadcrumbsStorage, RawBreadcrumb, read_breadcrumbs,
};
pub use chunk::{
    ChunkSink, ChunkSplitter, Chunkifier, CombinedChunkSplitter, FileChunk, FileChunkSink,
    LengthChunkSplitter, LineChunkSplitter, WholeLines,
};
pub use common::{MetricsSnapshot, Result, WriterError, WriterMetrics};
pub use rotating::{RotatingWriter, RotationLimits};

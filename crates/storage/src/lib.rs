//! Backlog - Storage
//!
//! Session-scoped file namespace shared by every component that persists
//! data across process restarts.
//!
//! # Architecture
//!
//! ```text
//! [RotatingWriter] ──get_file_name──┐
//! [BreadcrumbsStorage] ─────────────┼──► [SessionFiles] ──► [dyn FileSystem] ──► disk / memory
//! [Harvester] ──lock/previous/clear─┘
//! ```
//!
//! - **fs**: the narrow [`FileSystem`] capability, a native implementation
//!   and an in-memory one with fault injection
//! - **session**: session identity, lineage discovery, reference-counted
//!   locks and deferred clearing

/// Filesystem capability
pub mod fs;

/// Session identity, naming, lineage and locks
pub mod session;

mod error;

pub use error::{Result, SessionError};
pub use fs::{FaultSwitches, FileSystem, MemoryFileSystem, NativeFileSystem, WriteStream};
pub use session::{
    Lineage, SESSION_MARKER_PREFIX, SessionFiles, SessionId, SessionOptions, SessionRegistry,
};

//! Filesystem capability
//!
//! Every component touches disk through [`FileSystem`] so that production
//! code runs on [`NativeFileSystem`] while tests inject
//! [`MemoryFileSystem`] with fault switches.
//!
//! # Operations
//!
//! The trait carries exactly what the session store, rotating writer and
//! record store need. Used as a key/value store it maps as:
//!
//! | KV | FileSystem |
//! |----|------------|
//! | `get(key)` | `read_to_string` |
//! | `set(key, value)` | `write_file` |
//! | `remove(key)` | `remove_file` |
//! | `keys()` | `read_dir` |
//!
//! Append-only output goes through [`WriteStream`], created by
//! [`FileSystem::create_write_stream`]. Dropping a stream closes it.

mod memory;
mod native;

use std::io;
use std::path::Path;

pub use memory::{FaultSwitches, MemoryFileSystem};
pub use native::{DEFAULT_BUFFER_SIZE, NativeFileSystem};

/// Append-only byte stream
///
/// Object-safe so writers can hold `Box<dyn WriteStream>`. The stream is
/// closed when dropped; implementations flush what they buffered on drop.
pub trait WriteStream: Send {
    /// Write the whole buffer or fail
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Push buffered bytes down to the underlying store
    fn flush(&mut self) -> io::Result<()>;
}

/// Narrow filesystem capability
pub trait FileSystem: Send + Sync {
    /// List file names (not paths) inside `dir`
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<String>>;

    /// Read a whole file as UTF-8
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Create or replace a file with `contents`
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Remove a file
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Rename `from` to `to`, replacing `to` if it exists
    ///
    /// Atomic at the granularity of the underlying store.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Check whether a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Create a directory and all missing parents
    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    /// Open a fresh (truncated) append-only stream at `path`
    fn create_write_stream(&self, path: &Path) -> io::Result<Box<dyn WriteStream>>;
}

#[cfg(test)]
#[path = "fs_test.rs"]
mod fs_test;

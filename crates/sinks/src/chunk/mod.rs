//! Chunked output
//!
//! Splits a byte stream into bounded chunks, each written to its own sink,
//! keeping only the newest few on disk.
//!
//! # Architecture
//!
//! ```text
//! io::Write ──► [Chunkifier] ──split──► (chunk, remainder?) ──► ChunkSink::open_chunk(n)
//!                    ▲                          │
//!                    └──── remainder ───────────┘
//! ```
//!
//! A [`ChunkSplitter`] decides where a chunk ends; whenever it returns a
//! remainder the current chunk is closed and the remainder starts chunk
//! `n + 1`. [`FileChunkSink`] materializes chunks as files and evicts the
//! oldest once more than `max_files` exist.
//!
//! Concatenating every chunk in order reproduces the input, except where
//! [`WholeLines::Skip`] deliberately drops overlong lines.

mod chunkifier;
mod file_sink;
mod splitter;

use std::io;

use bytes::Bytes;

pub use chunkifier::Chunkifier;
pub use file_sink::{FileChunk, FileChunkSink};
pub use splitter::{CombinedChunkSplitter, LengthChunkSplitter, LineChunkSplitter, WholeLines};

/// Decides chunk boundaries
///
/// `split` returns the bytes that belong to the current chunk and, when the
/// chunk is complete, the remainder that starts the next one. Splitters are
/// stateful: they count what the current chunk has already seen.
pub trait ChunkSplitter: Send {
    /// Split `data` at the next chunk boundary, if it contains one
    fn split(&mut self, data: Bytes) -> (Bytes, Option<Bytes>);
}

impl<S: ChunkSplitter + ?Sized> ChunkSplitter for Box<S> {
    fn split(&mut self, data: Bytes) -> (Bytes, Option<Bytes>) {
        (**self).split(data)
    }
}

/// Opens one writer per chunk
///
/// Dropping the returned writer closes the chunk.
pub trait ChunkSink {
    /// Writer of one chunk
    type Chunk: io::Write;

    /// Open chunk number `sequence`, counting from 0
    fn open_chunk(&mut self, sequence: u64) -> io::Result<Self::Chunk>;
}

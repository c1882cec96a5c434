//! Byte stream to chunk driver

use std::io::{self, Write};

use bytes::Bytes;

use super::{ChunkSink, ChunkSplitter};

type SplitterFactory = Box<dyn FnMut() -> Box<dyn ChunkSplitter> + Send>;

struct OpenChunk<W> {
    /// `None` when the sink failed to open the chunk; its bytes are dropped
    writer: Option<W>,
    is_empty: bool,
}

impl<W: Write> OpenChunk<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.is_empty = false;
        match self.writer.as_mut() {
            Some(writer) => writer.write_all(data),
            None => Ok(()),
        }
    }
}

/// Splits everything written to it into chunks opened on a [`ChunkSink`]
///
/// A fresh splitter is created for every chunk. Zero-length chunks are
/// not opened unless [`allow_empty_chunks`](Self::allow_empty_chunks) is
/// set.
pub struct Chunkifier<K: ChunkSink> {
    sink: K,
    new_splitter: SplitterFactory,
    splitter: Option<Box<dyn ChunkSplitter>>,
    current: Option<OpenChunk<K::Chunk>>,
    allow_empty_chunks: bool,
    next_sequence: u64,
}

impl<K: ChunkSink> Chunkifier<K> {
    /// Create a chunkifier writing to `sink`, splitting with splitters made
    /// by `new_splitter`
    pub fn new<F, S>(sink: K, mut new_splitter: F) -> Self
    where
        F: FnMut() -> S + Send + 'static,
        S: ChunkSplitter + 'static,
    {
        Self {
            sink,
            new_splitter: Box::new(move || Box::new(new_splitter()) as Box<dyn ChunkSplitter>),
            splitter: None,
            current: None,
            allow_empty_chunks: false,
            next_sequence: 0,
        }
    }

    /// Open zero-length chunks too
    pub fn allow_empty_chunks(mut self, allow: bool) -> Self {
        self.allow_empty_chunks = allow;
        self
    }

    /// Number of chunks opened so far, failed opens included
    pub fn chunks_opened(&self) -> u64 {
        self.next_sequence
    }

    /// The sink chunks are opened on
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Split and write `data`
    ///
    /// # Errors
    ///
    /// Returns the first error reported by a chunk writer.
    pub fn write_bytes(&mut self, mut data: Bytes) -> io::Result<()> {
        while !data.is_empty() {
            let splitter = self.splitter.get_or_insert_with(|| (self.new_splitter)());
            let (current, remainder) = splitter.split(data);

            let Some(remainder) = remainder else {
                if current.is_empty() {
                    return Ok(());
                }
                return self.open_current().write(&current);
            };
            data = remainder;

            let closing_empty =
                current.is_empty() && self.current.as_ref().is_none_or(|chunk| chunk.is_empty);
            if closing_empty && !self.allow_empty_chunks {
                continue;
            }

            self.open_current().write(&current)?;
            self.close_current()?;
            self.splitter = None;
        }
        Ok(())
    }

    /// Close the trailing chunk and return the sink
    ///
    /// # Errors
    ///
    /// Returns an error if the trailing chunk fails to flush.
    pub fn finish(mut self) -> io::Result<K> {
        self.close_current()?;
        Ok(self.sink)
    }

    fn open_current(&mut self) -> &mut OpenChunk<K::Chunk> {
        let sink = &mut self.sink;
        let next_sequence = &mut self.next_sequence;

        self.current.get_or_insert_with(|| {
            let sequence = *next_sequence;
            *next_sequence += 1;

            let writer = match sink.open_chunk(sequence) {
                Ok(writer) => Some(writer),
                Err(e) => {
                    tracing::warn!(sequence, error = %e, "failed to open chunk, dropping its data");
                    None
                }
            };
            OpenChunk {
                writer,
                is_empty: true,
            }
        })
    }

    fn close_current(&mut self) -> io::Result<()> {
        if let Some(OpenChunk {
            writer: Some(mut writer),
            ..
        }) = self.current.take()
        {
            writer.flush()?;
        }
        Ok(())
    }
}

impl<K: ChunkSink> Write for Chunkifier<K> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(Bytes::copy_from_slice(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.current.as_mut().and_then(|chunk| chunk.writer.as_mut()) {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "chunkifier_test.rs"]
mod chunkifier_test;

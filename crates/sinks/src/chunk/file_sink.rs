//! Chunks materialized as files, newest `max_files` kept

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use backlog_storage::{FileSystem, WriteStream};
use parking_lot::Mutex;

use super::ChunkSink;

type FileNamer = Box<dyn Fn(u64) -> PathBuf + Send + Sync>;
type DeleteListener = Arc<dyn Fn(&Path) + Send + Sync>;

#[derive(Default)]
struct SinkState {
    /// Retained chunks, oldest first
    files: VecDeque<(u64, PathBuf)>,

    /// Chunks whose stream is still open
    open: HashSet<u64>,

    /// Evicted while open; deleted once their stream closes
    evicted_open: HashMap<u64, PathBuf>,

    next_id: u64,
}

struct SinkShared {
    fs: Arc<dyn FileSystem>,
    max_files: usize,
    file: FileNamer,
    state: Mutex<SinkState>,
    on_delete: Mutex<Option<DeleteListener>>,
}

impl SinkShared {
    fn delete(&self, path: &Path) {
        let listener = self.on_delete.lock().clone();
        if let Some(listener) = listener {
            listener(path);
            return;
        }

        match self.fs.remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "evicted chunk file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "failed to remove evicted chunk file");
            }
        }
    }
}

/// [`ChunkSink`] writing each chunk to its own file
///
/// At most `max_files` chunks are retained. Opening one more evicts the
/// oldest: a closed file is deleted right away, an open one once its
/// [`FileChunk`] is dropped. Deletion is best effort, and an evicted file
/// no longer counts against `max_files` even if removing it failed.
///
/// Cloning yields another handle to the same retention queue.
#[derive(Clone)]
pub struct FileChunkSink {
    shared: Arc<SinkShared>,
}

impl FileChunkSink {
    /// Create a sink naming chunk `n` with `file(n)`
    pub fn new<F>(fs: Arc<dyn FileSystem>, max_files: usize, file: F) -> Self
    where
        F: Fn(u64) -> PathBuf + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(SinkShared {
                fs,
                max_files: max_files.max(1),
                file: Box::new(file),
                state: Mutex::new(SinkState::default()),
                on_delete: Mutex::new(None),
            }),
        }
    }

    /// Hand evicted files to `listener` instead of removing them
    pub fn on_delete<L>(&self, listener: L)
    where
        L: Fn(&Path) + Send + Sync + 'static,
    {
        *self.shared.on_delete.lock() = Some(Arc::new(listener));
    }

    /// Retained chunk files, oldest first
    pub fn files(&self) -> Vec<PathBuf> {
        let state = self.shared.state.lock();
        state.files.iter().map(|(_, path)| path.clone()).collect()
    }

    /// Retention limit
    pub fn max_files(&self) -> usize {
        self.shared.max_files
    }
}

impl ChunkSink for FileChunkSink {
    type Chunk = FileChunk;

    fn open_chunk(&mut self, sequence: u64) -> io::Result<FileChunk> {
        let path = (self.shared.file)(sequence);
        let stream = self.shared.fs.create_write_stream(&path)?;

        let (id, evicted) = {
            let mut state = self.shared.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.files.push_back((id, path.clone()));
            state.open.insert(id);

            let mut evicted = Vec::new();
            while state.files.len() > self.shared.max_files {
                let Some((old_id, old_path)) = state.files.pop_front() else {
                    break;
                };
                if state.open.contains(&old_id) {
                    state.evicted_open.insert(old_id, old_path);
                } else {
                    evicted.push(old_path);
                }
            }
            (id, evicted)
        };

        for old in &evicted {
            self.shared.delete(old);
        }

        Ok(FileChunk {
            id,
            path,
            stream: Some(stream),
            shared: Arc::clone(&self.shared),
        })
    }
}

/// One open chunk file; dropping it closes the file
pub struct FileChunk {
    id: u64,
    path: PathBuf,
    stream: Option<Box<dyn WriteStream>>,
    shared: Arc<SinkShared>,
}

impl FileChunk {
    /// Path of this chunk's file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl io::Write for FileChunk {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.stream.as_mut() {
            Some(stream) => {
                stream.write_all(buf)?;
                Ok(buf.len())
            }
            None => Err(io::Error::other("chunk already closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for FileChunk {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take()
            && let Err(e) = stream.flush()
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to flush chunk file");
        }

        let deferred = {
            let mut state = self.shared.state.lock();
            state.open.remove(&self.id);
            state.evicted_open.remove(&self.id)
        };
        if let Some(path) = deferred {
            self.shared.delete(&path);
        }
    }
}

#[cfg(test)]
#[path = "file_sink_test.rs"]
mod file_sink_test;

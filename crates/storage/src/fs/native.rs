//! `std::fs` backed filesystem

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::{FileSystem, WriteStream};

/// Default write buffer size for streams (64KB)
///
/// Streams are flushed after every batch, so the buffer only coalesces
/// the pieces of a single batch.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Filesystem backed by the operating system
#[derive(Debug, Clone)]
pub struct NativeFileSystem {
    buffer_size: usize,
}

impl NativeFileSystem {
    /// Create a native filesystem with the given stream buffer size
    pub fn new(buffer_size: usize) -> Self {
        Self { buffer_size }
    }
}

impl Default for NativeFileSystem {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl FileSystem for NativeFileSystem {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                // Entry vanished between listing and stat
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }

    fn create_write_stream(&self, path: &Path) -> io::Result<Box<dyn WriteStream>> {
        let file = File::create(path)?;
        Ok(Box::new(FileStream {
            writer: Some(BufWriter::with_capacity(self.buffer_size, file)),
            capacity: self.buffer_size,
        }))
    }
}

/// Buffered file stream
///
/// A failed write or flush drops whatever is still buffered. The caller
/// keeps its own copy of an unacknowledged batch, so keeping the bytes
/// here would write them twice once the disk recovers.
struct FileStream {
    writer: Option<BufWriter<File>>,
    capacity: usize,
}

impl FileStream {
    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::other("stream is closed"))
    }

    fn discard_buffer(&mut self) {
        if let Some(writer) = self.writer.take() {
            let (file, _unwritten) = writer.into_parts();
            self.writer = Some(BufWriter::with_capacity(self.capacity, file));
        }
    }
}

impl WriteStream for FileStream {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let result = self.writer()?.write_all(data);
        if result.is_err() {
            self.discard_buffer();
        }
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.writer()?.flush();
        if result.is_err() {
            self.discard_buffer();
        }
        result
    }
}

impl Drop for FileStream {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut()
            && let Err(e) = writer.flush()
        {
            tracing::warn!(error = %e, "failed to flush stream on close");
        }
    }
}

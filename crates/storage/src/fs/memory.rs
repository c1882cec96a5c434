//! In-memory filesystem with fault injection
//!
//! Used by tests across the workspace to exercise the failure paths that
//! a real disk rarely produces on demand: a rename that fails mid-rotation,
//! a stream that cannot be created, a write callback reporting an error.
//! [`MemoryFileSystem::buffered`] streams hold writes until `flush`, the
//! way a native stream does.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{FileSystem, WriteStream};

/// Fault switches shared by a [`MemoryFileSystem`] and its open streams
#[derive(Debug, Default)]
pub struct FaultSwitches {
    fail_rename: AtomicBool,
    fail_create_stream: AtomicBool,
    fail_write: AtomicBool,
    fail_flush: AtomicBool,
    fail_remove: AtomicBool,
    fail_read_dir: AtomicBool,
    writes: AtomicUsize,
}

impl FaultSwitches {
    /// Make every `rename` fail
    pub fn set_fail_rename(&self, fail: bool) {
        self.fail_rename.store(fail, Ordering::SeqCst);
    }

    /// Make every `create_write_stream` fail
    pub fn set_fail_create_stream(&self, fail: bool) {
        self.fail_create_stream.store(fail, Ordering::SeqCst);
    }

    /// Make every stream write fail, including on already open streams
    pub fn set_fail_write(&self, fail: bool) {
        self.fail_write.store(fail, Ordering::SeqCst);
    }

    /// Make every stream flush fail
    ///
    /// A buffered stream drops its pending bytes when a flush fails.
    pub fn set_fail_flush(&self, fail: bool) {
        self.fail_flush.store(fail, Ordering::SeqCst);
    }

    /// Make every `remove_file` fail
    pub fn set_fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    /// Make every `read_dir` fail
    pub fn set_fail_read_dir(&self, fail: bool) {
        self.fail_read_dir.store(fail, Ordering::SeqCst);
    }

    /// Number of successful stream writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(flag: &AtomicBool, what: &str) -> io::Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(io::Error::other(format!("injected {what} failure")));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    open_streams: HashMap<PathBuf, usize>,
}

/// Filesystem kept entirely in memory
///
/// Cloning yields another handle to the same files.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<FaultSwitches>,
    buffered: bool,
}

impl MemoryFileSystem {
    /// Create an empty in-memory filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty filesystem whose streams buffer until flushed
    pub fn buffered() -> Self {
        Self {
            buffered: true,
            ..Self::default()
        }
    }

    /// Fault switches for this filesystem
    pub fn faults(&self) -> &FaultSwitches {
        &self.faults
    }

    /// Contents of a file as UTF-8, lossy
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let state = self.state.lock();
        state
            .files
            .get(path.as_ref())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Number of streams currently open on `path`
    pub fn open_streams(&self, path: impl AsRef<Path>) -> usize {
        let state = self.state.lock();
        state.open_streams.get(path.as_ref()).copied().unwrap_or(0)
    }

    /// All file paths, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        self.state.lock().files.keys().cloned().collect()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<String>> {
        FaultSwitches::check(&self.faults.fail_read_dir, "read_dir")?;

        let state = self.state.lock();
        let names: Vec<String> = state
            .files
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .filter_map(|path| path.file_name()?.to_str().map(str::to_string))
            .collect();

        if names.is_empty() && !state.dirs.contains(dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {}", dir.display()),
            ));
        }

        Ok(names)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let state = self.state.lock();
        let bytes = state.files.get(path).ok_or_else(|| not_found(path))?;
        String::from_utf8(bytes.clone())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        register_parent(&mut state, path);
        state.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        FaultSwitches::check(&self.faults.fail_remove, "remove")?;

        let mut state = self.state.lock();
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        FaultSwitches::check(&self.faults.fail_rename, "rename")?;

        let mut state = self.state.lock();
        let bytes = state.files.remove(from).ok_or_else(|| not_found(from))?;
        register_parent(&mut state, to);
        state.files.insert(to.to_path_buf(), bytes);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        let mut state = self.state.lock();
        for ancestor in dir.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            state.dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn create_write_stream(&self, path: &Path) -> io::Result<Box<dyn WriteStream>> {
        FaultSwitches::check(&self.faults.fail_create_stream, "create stream")?;

        let mut state = self.state.lock();
        register_parent(&mut state, path);
        state.files.insert(path.to_path_buf(), Vec::new());
        *state.open_streams.entry(path.to_path_buf()).or_default() += 1;

        Ok(Box::new(MemoryStream {
            path: path.to_path_buf(),
            state: Arc::clone(&self.state),
            faults: Arc::clone(&self.faults),
            buffer: self.buffered.then(Vec::new),
        }))
    }
}

struct MemoryStream {
    path: PathBuf,
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<FaultSwitches>,
    /// Pending bytes, `None` when writes go straight to the file
    buffer: Option<Vec<u8>>,
}

impl MemoryStream {
    fn append(&self, data: &[u8]) {
        let mut state = self.state.lock();
        // Writes to a file removed underneath the stream vanish, like an
        // unlinked inode on disk.
        if let Some(bytes) = state.files.get_mut(&self.path) {
            bytes.extend_from_slice(data);
        }
    }
}

impl WriteStream for MemoryStream {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        FaultSwitches::check(&self.faults.fail_write, "write")?;

        match &mut self.buffer {
            Some(buffer) => buffer.extend_from_slice(data),
            None => self.append(data),
        }
        self.faults.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Err(e) = FaultSwitches::check(&self.faults.fail_flush, "flush") {
            if let Some(buffer) = &mut self.buffer {
                buffer.clear();
            }
            return Err(e);
        }

        if let Some(pending) = self.buffer.as_mut().map(std::mem::take) {
            self.append(&pending);
        }
        Ok(())
    }
}

impl Drop for MemoryStream {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "failed to flush stream on close");
        }

        let mut state = self.state.lock();
        if let Some(count) = state.open_streams.get_mut(&self.path) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.open_streams.remove(&self.path);
            }
        }
    }
}

fn register_parent(state: &mut MemoryState, path: &Path) {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        state.dirs.insert(parent.to_path_buf());
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("file not found: {}", path.display()),
    )
}

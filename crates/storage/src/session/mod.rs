//! Session-scoped file namespace
//!
//! A session is one run of the host process. Every file a session owns
//! lives in a flat directory shared by all generations and is named
//! `{prefix}_{id}_{timestamp}` (see [`name`]). An empty *marker* file with
//! the reserved [`SESSION_MARKER_PREFIX`] records that the session exists;
//! on the next start, the newest marker older than the new session points
//! at the run whose residue still has to be harvested.
//!
//! # Lineage
//!
//! ```text
//! current (max_locked = 2) ──► previous (1, lockable) ──► older (0, lockable) ──► oldest (not lockable)
//! ```
//!
//! Lineage is recomputed from the directory on every walk. Lock state is
//! kept in a [`SessionRegistry`] keyed by session id, shared by every
//! handle that descends from the same root, so a harvester holding a lock
//! and a cleaner issuing a clear always see the same state.
//!
//! # Locks and clearing
//!
//! A locked session is never physically cleared. A clear requested while
//! locks are held is recorded and runs when the last lock is released.

pub mod name;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{Result, SessionError};
use crate::fs::FileSystem;

pub use name::DecodedName;

/// Reserved prefix of session marker files
pub const SESSION_MARKER_PREFIX: &str = "bt-session";

/// Identity of one process run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId {
    /// Unique id of the run
    pub id: String,
    /// Start timestamp in epoch milliseconds, the lineage sort key
    pub timestamp: i64,
}

impl SessionId {
    /// Create a session id from parts
    pub fn new(id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            timestamp,
        }
    }

    /// Generate a fresh id stamped with the current time
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string(), Utc::now().timestamp_millis())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.id, self.timestamp)
    }
}

/// Options controlling how far back sessions can be pinned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Number of previous generations `lock_previous_sessions` may lock
    pub max_previous_locked_sessions: usize,

    /// Whether this session itself accepts locks
    pub lockable: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_previous_locked_sessions: 1,
            lockable: true,
        }
    }
}

impl SessionOptions {
    /// Options for the generation before this one
    ///
    /// The lock budget decays by one per hop; the previous generation is
    /// lockable only while budget remains.
    fn previous(&self) -> Self {
        Self {
            max_previous_locked_sessions: self.max_previous_locked_sessions.saturating_sub(1),
            lockable: self.max_previous_locked_sessions > 0,
        }
    }
}

/// Lock and clear state of one session
#[derive(Debug, Default)]
struct LockState {
    /// Outstanding lock ids, one entry per `lock` call
    locks: Vec<String>,

    /// Clear requested while locked; `Some(delete_marker)`
    pending_clear: Option<bool>,

    /// Files removed, naming disabled
    cleared: bool,
}

/// Lock state arena shared by every handle of one lineage
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<Mutex<LockState>>>>,
}

impl SessionRegistry {
    fn state_for(&self, session: &SessionId) -> Arc<Mutex<LockState>> {
        let mut sessions = self.sessions.lock();
        Arc::clone(sessions.entry(session.clone()).or_default())
    }
}

/// Files owned by one session, plus lineage discovery
#[derive(Clone)]
pub struct SessionFiles {
    fs: Arc<dyn FileSystem>,
    directory: PathBuf,
    session: SessionId,
    options: SessionOptions,
    state: Arc<Mutex<LockState>>,
    registry: Arc<SessionRegistry>,
}

impl std::fmt::Debug for SessionFiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFiles")
            .field("directory", &self.directory)
            .field("session", &self.session)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SessionFiles {
    /// Create the root session handle for this process
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyId`] for an empty session id, whose
    /// files could never be decoded back into the lineage.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        directory: impl Into<PathBuf>,
        session: SessionId,
        options: SessionOptions,
    ) -> Result<Self> {
        if session.id.is_empty() {
            return Err(SessionError::EmptyId {
                timestamp: session.timestamp,
            });
        }

        Ok(Self::with_registry(
            fs,
            directory.into(),
            session,
            options,
            Arc::new(SessionRegistry::default()),
        ))
    }

    fn with_registry(
        fs: Arc<dyn FileSystem>,
        directory: PathBuf,
        session: SessionId,
        options: SessionOptions,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        let state = registry.state_for(&session);
        Self {
            fs,
            directory,
            session,
            options,
            state,
            registry,
        }
    }

    /// Session identity
    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    /// Filesystem backing the namespace
    pub fn file_system(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    /// Namespace directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Options in effect for this handle
    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Whether the session files have been cleared
    pub fn is_cleared(&self) -> bool {
        self.state.lock().cleared
    }

    /// Number of outstanding locks
    pub fn lock_count(&self) -> usize {
        self.state.lock().locks.len()
    }

    /// Write the session marker, making the session visible to lineage
    ///
    /// # Errors
    ///
    /// Returns an error if the session was cleared or the marker cannot be
    /// written.
    pub fn initialize(&self) -> Result<()> {
        let marker = self.get_file_name(SESSION_MARKER_PREFIX)?;

        if let Err(e) = self.fs.create_dir_all(&self.directory) {
            tracing::warn!(
                directory = %self.directory.display(),
                error = %e,
                "failed to create session directory"
            );
        }

        self.fs
            .write_file(&marker, b"")
            .map_err(|e| SessionError::marker(marker.display().to_string(), e))?;

        tracing::debug!(session = %self.session, marker = %marker.display(), "session initialized");
        Ok(())
    }

    /// Newest session strictly older than this one
    pub fn get_previous_session(&self) -> Option<SessionFiles> {
        let previous = self
            .session_markers()
            .into_iter()
            .filter(|marker| marker.timestamp < self.session.timestamp)
            .max_by_key(|marker| marker.timestamp)?;

        Some(Self::with_registry(
            Arc::clone(&self.fs),
            self.directory.clone(),
            SessionId::new(previous.session_id, previous.timestamp),
            self.options.previous(),
            Arc::clone(&self.registry),
        ))
    }

    /// Walk the lineage, newest first, excluding this session
    pub fn previous_sessions(&self) -> Lineage {
        Lineage {
            next: self.get_previous_session(),
        }
    }

    /// Up to `count` previous sessions, newest first
    pub fn get_previous_sessions(&self, count: usize) -> Vec<SessionFiles> {
        self.previous_sessions().take(count).collect()
    }

    /// Find a session with `id` in the lineage, this session included
    pub fn get_session_with_id(&self, id: &str) -> Option<SessionFiles> {
        if self.session.id == id {
            return Some(self.clone());
        }
        self.previous_sessions().find(|session| session.session.id == id)
    }

    /// Lock as many previous generations as the lock budget allows
    ///
    /// All locked sessions share one lock id, generated when not given.
    pub fn lock_previous_sessions(&self, lock_id: Option<String>) -> String {
        let lock_id = lock_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        for session in self.lockable_previous_sessions() {
            session.lock(Some(lock_id.clone()));
        }

        lock_id
    }

    /// Release a lock taken by [`lock_previous_sessions`](Self::lock_previous_sessions)
    pub fn unlock_previous_sessions(&self, lock_id: &str) {
        for session in self.lockable_previous_sessions() {
            session.unlock(lock_id);
        }
    }

    /// Clear every previous generation, honoring each one's locks
    pub fn clear_previous_sessions(&self) {
        let sessions: Vec<SessionFiles> = self.previous_sessions().collect();
        for session in sessions {
            session.clear_session();
        }
    }

    /// Path of the file of kind `prefix` owned by this session
    ///
    /// # Errors
    ///
    /// Fails once the session has been cleared, or when `prefix` ends with
    /// the separator.
    pub fn get_file_name(&self, prefix: &str) -> Result<PathBuf> {
        self.ensure_not_cleared()?;

        if prefix.ends_with(name::SEPARATOR) {
            return Err(SessionError::InvalidPrefix {
                prefix: prefix.to_string(),
            });
        }

        Ok(self
            .directory
            .join(name::encode(prefix, &self.session.id, self.session.timestamp)))
    }

    /// Every file in the namespace owned by this session, marker included
    ///
    /// # Errors
    ///
    /// Fails once the session has been cleared.
    pub fn get_session_files(&self) -> Result<Vec<PathBuf>> {
        self.ensure_not_cleared()?;
        Ok(self.owned_files())
    }

    /// Remove every file of this session, or defer until unlocked
    pub fn clear_session(&self) {
        self.clear(true);
    }

    /// Like [`clear_session`](Self::clear_session) but keep the marker
    pub fn clear_session_keep_marker(&self) {
        self.clear(false);
    }

    /// Take a lock on this session
    ///
    /// Returns `None` when the session is not lockable or already cleared.
    pub fn lock(&self, lock_id: Option<String>) -> Option<String> {
        if !self.options.lockable {
            return None;
        }

        let mut state = self.state.lock();
        if state.cleared {
            return None;
        }

        let lock_id = lock_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        state.locks.push(lock_id.clone());
        Some(lock_id)
    }

    /// Release one lock; runs a deferred clear when the last lock goes
    pub fn unlock(&self, lock_id: &str) {
        let mut state = self.state.lock();
        let Some(index) = state.locks.iter().position(|id| id == lock_id) else {
            return;
        };
        state.locks.remove(index);

        if state.locks.is_empty()
            && let Some(delete_marker) = state.pending_clear.take()
        {
            tracing::debug!(session = %self.session, "running deferred session clear");
            self.remove_files(&mut state, delete_marker);
        }
    }

    fn clear(&self, delete_marker: bool) {
        let mut state = self.state.lock();
        if state.cleared {
            return;
        }

        if !state.locks.is_empty() {
            // A full clear wins over a keep-marker clear requested earlier
            let merged = state
                .pending_clear
                .map_or(delete_marker, |pending| pending || delete_marker);
            state.pending_clear = Some(merged);
            tracing::debug!(
                session = %self.session,
                locks = state.locks.len(),
                "session locked, clear deferred"
            );
            return;
        }

        self.remove_files(&mut state, delete_marker);
    }

    fn remove_files(&self, state: &mut LockState, delete_marker: bool) {
        for path in self.owned_files() {
            if !delete_marker && is_marker(&path) {
                continue;
            }

            match self.fs.remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        session = %self.session,
                        path = %path.display(),
                        error = %e,
                        "failed to remove session file"
                    );
                }
            }
        }

        state.cleared = true;
        state.pending_clear = None;
        tracing::debug!(session = %self.session, "session cleared");
    }

    fn lockable_previous_sessions(&self) -> Vec<SessionFiles> {
        self.previous_sessions()
            .take_while(|session| session.options.lockable)
            .collect()
    }

    fn owned_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .decoded_files()
            .into_iter()
            .filter(|decoded| {
                decoded.session_id == self.session.id
                    && decoded.timestamp == self.session.timestamp
            })
            .map(|decoded| self.directory.join(decoded.file))
            .collect();
        files.sort();
        files
    }

    fn session_markers(&self) -> Vec<DecodedName> {
        self.decoded_files()
            .into_iter()
            .filter(|decoded| decoded.prefix == SESSION_MARKER_PREFIX)
            .collect()
    }

    fn decoded_files(&self) -> Vec<DecodedName> {
        let files = match self.fs.read_dir(&self.directory) {
            Ok(files) => files,
            Err(e) => {
                tracing::debug!(
                    directory = %self.directory.display(),
                    error = %e,
                    "session directory not readable"
                );
                return Vec::new();
            }
        };

        files.iter().filter_map(|file| name::decode(file)).collect()
    }

    fn ensure_not_cleared(&self) -> Result<()> {
        if self.state.lock().cleared {
            return Err(SessionError::cleared(
                self.session.id.clone(),
                self.session.timestamp,
            ));
        }
        Ok(())
    }
}

/// Iterator over previous sessions, newest first
pub struct Lineage {
    next: Option<SessionFiles>,
}

impl Iterator for Lineage {
    type Item = SessionFiles;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.get_previous_session();
        Some(current)
    }
}

fn is_marker(path: &Path) -> bool {
    path.file_name()
        .and_then(|file| file.to_str())
        .and_then(name::decode)
        .is_some_and(|decoded| decoded.prefix == SESSION_MARKER_PREFIX)
}

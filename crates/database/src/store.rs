//! File-backed pending record store
//!
//! # Layout
//!
//! ```text
//! {path}/
//! ├── 3f2c...-record.json       # one JSON document per record
//! └── 9a41...-record.json.tmp   # in-flight add, never loaded
//! ```
//!
//! Everything that reaches disk is retryable: records are written with
//! `locked = false` whatever their in-memory state. Files that fail to load
//! are deleted rather than retried. A `.tmp` file only outlives its `add`
//! when the process dies mid-write; [`RecordStore::start`] removes them.
//!
//! At most `maximum_number_of_records` records are kept. Adding a new one
//! past the limit evicts the oldest first.
//!
//! All I/O goes through a [`FileSystem`]; the async operations run it on
//! the blocking pool.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use backlog_config::DatabaseConfig;
use backlog_storage::FileSystem;

use crate::error::{DatabaseError, Result};
use crate::record::PendingRecord;

/// File name suffix of a stored record
pub const RECORD_SUFFIX: &str = "-record.json";

/// Records kept when no limit is configured
pub const DEFAULT_MAXIMUM_NUMBER_OF_RECORDS: usize = 8;

const TEMP_SUFFIX: &str = ".tmp";

/// Directory of pending records
#[derive(Clone)]
pub struct RecordStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    create_database_directory: bool,
    maximum_number_of_records: usize,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("path", &self.path)
            .field("create_database_directory", &self.create_database_directory)
            .field("maximum_number_of_records", &self.maximum_number_of_records)
            .finish_non_exhaustive()
    }
}

impl RecordStore {
    /// Create a store rooted at `path`
    pub fn new(
        fs: Arc<dyn FileSystem>,
        path: impl Into<PathBuf>,
        create_database_directory: bool,
    ) -> Self {
        Self {
            fs,
            path: path.into(),
            create_database_directory,
            maximum_number_of_records: DEFAULT_MAXIMUM_NUMBER_OF_RECORDS,
        }
    }

    /// Keep at most `maximum` records, at least one
    pub fn with_maximum_number_of_records(mut self, maximum: usize) -> Self {
        self.maximum_number_of_records = maximum.max(1);
        self
    }

    /// Create a store from configuration
    ///
    /// Returns `Ok(None)` when the database is disabled.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::MissingPath` when enabled without a path.
    pub fn create_if_valid(
        fs: Arc<dyn FileSystem>,
        config: &DatabaseConfig,
    ) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }

        let path = config
            .path
            .as_deref()
            .filter(|path| !path.is_empty())
            .ok_or(DatabaseError::MissingPath)?;

        Ok(Some(
            Self::new(fs, path, config.create_database_directory)
                .with_maximum_number_of_records(config.maximum_number_of_records),
        ))
    }

    /// Record directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records kept before the oldest are evicted
    pub fn maximum_number_of_records(&self) -> usize {
        self.maximum_number_of_records
    }

    /// Make sure the record directory exists and drop leftover `.tmp` files
    ///
    /// Returns `false` when it is missing and may not be created. Calling
    /// it again is harmless.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or listed.
    pub fn start(&self) -> Result<bool> {
        if !self.fs.exists(&self.path) {
            if !self.create_database_directory {
                tracing::warn!(
                    path = %self.path.display(),
                    "database directory does not exist and creation is disabled"
                );
                return Ok(false);
            }

            self.fs
                .create_dir_all(&self.path)
                .map_err(|e| DatabaseError::io(&self.path, e))?;
            tracing::debug!(path = %self.path.display(), "created database directory");
        }

        self.remove_temp_files()?;
        Ok(true)
    }

    /// Persist `record` as `{id}-record.json`
    ///
    /// The file is written under a temporary name and renamed into place.
    /// A record with a new id evicts the oldest stored records when the
    /// store is full; rewriting a stored id never does.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or written, or
    /// the directory cannot be listed to make room.
    pub fn add(&self, record: &PendingRecord) -> Result<()> {
        let stored = PendingRecord {
            locked: false,
            ..record.clone()
        };
        let json = serde_json::to_vec(&stored)?;

        let path = self.record_path(&record.id);
        if !self.fs.exists(&path) {
            self.make_room()?;
        }

        let temp = temp_path(&path);
        if let Err(e) = self.fs.write_file(&temp, &json) {
            let _ = self.fs.remove_file(&temp);
            return Err(DatabaseError::io(temp, e));
        }
        if let Err(e) = self.fs.rename(&temp, &path) {
            let _ = self.fs.remove_file(&temp);
            return Err(DatabaseError::io(path, e));
        }

        tracing::debug!(id = %record.id, "stored pending record");
        Ok(())
    }

    /// Load every stored record, oldest first
    ///
    /// Files that cannot be read or parsed are deleted and skipped. A file
    /// removed while scanning is skipped silently.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub async fn get(&self) -> Result<Vec<PendingRecord>> {
        self.blocking(|store| store.scan()).await
    }

    /// Remove `record` from disk
    ///
    /// Returns `false` when it was not stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub async fn delete(&self, record: &PendingRecord) -> Result<bool> {
        self.delete_id(&record.id).await
    }

    /// Remove the record with `id` from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub async fn delete_id(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.blocking(move |store| store.remove(&id)).await
    }

    async fn blocking<T, F>(&self, task: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(RecordStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || task(store))
            .await
            .map_err(|e| DatabaseError::io(&self.path, io::Error::other(e)))?
    }

    fn scan(&self) -> Result<Vec<PendingRecord>> {
        let mut records = Vec::new();

        for name in self.list(RECORD_SUFFIX)? {
            let path = self.path.join(&name);
            let json = match self.fs.read_to_string(&path) {
                Ok(json) => json,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable record, discarding");
                    self.discard(&path);
                    continue;
                }
            };

            match serde_json::from_str::<PendingRecord>(&json) {
                Ok(mut record) => {
                    record.locked = false;
                    records.push(record);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "corrupt record, discarding");
                    self.discard(&path);
                }
            }
        }

        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    /// Evict the oldest records until one more fits
    fn make_room(&self) -> Result<()> {
        if self.list(RECORD_SUFFIX)?.len() < self.maximum_number_of_records {
            return Ok(());
        }

        let records = self.scan()?;
        let overflow = (records.len() + 1).saturating_sub(self.maximum_number_of_records);
        for record in records.iter().take(overflow) {
            self.remove(&record.id)?;
        }

        if overflow > 0 {
            tracing::info!(
                evicted = overflow,
                maximum = self.maximum_number_of_records,
                "record limit reached, evicted oldest records"
            );
        }
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let path = self.record_path(id);
        match self.fs.remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DatabaseError::io(path, e)),
        }
    }

    fn remove_temp_files(&self) -> Result<()> {
        for name in self.list(&format!("{RECORD_SUFFIX}{TEMP_SUFFIX}"))? {
            let path = self.path.join(&name);
            tracing::warn!(path = %path.display(), "removing interrupted record write");
            self.discard(&path);
        }
        Ok(())
    }

    /// File names in the record directory ending with `suffix`
    fn list(&self, suffix: &str) -> Result<Vec<String>> {
        let names = self
            .fs
            .read_dir(&self.path)
            .map_err(|e| DatabaseError::io(&self.path, e))?;
        Ok(names
            .into_iter()
            .filter(|name| name.ends_with(suffix))
            .collect())
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = self.fs.remove_file(path)
            && e.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove discarded record");
        }
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.path.join(format!("{id}{RECORD_SUFFIX}"))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

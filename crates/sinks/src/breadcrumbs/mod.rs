//! File-backed breadcrumb storage
//!
//! Breadcrumbs are small JSON records describing what the application did
//! before a crash. They are appended to a per-session rotating pair so the
//! next session can attach them to the crash report:
//!
//! ```text
//! bt-breadcrumbs-0_{id}_{ts}   main, newest breadcrumbs
//! bt-breadcrumbs-1_{id}_{ts}   fallback, the generation before
//! ```
//!
//! The configured maximum is split evenly across the two files.

mod model;

use std::path::PathBuf;

use backlog_storage::session::name;
use backlog_storage::{FileSystem, SessionFiles};
use chrono::Utc;
use parking_lot::Mutex;

use crate::common::{Result, WriterError};
use crate::rotating::{RotatingWriter, RotationLimits};

pub use model::{Breadcrumb, BreadcrumbLogLevel, BreadcrumbType, RawBreadcrumb};

/// Prefix shared by both breadcrumb files
pub const BREADCRUMBS_FILE_PREFIX: &str = "bt-breadcrumbs";

/// Logical file name of breadcrumb file `index` (0 = main, 1 = fallback)
pub fn breadcrumbs_file_name(index: usize) -> String {
    format!("{BREADCRUMBS_FILE_PREFIX}-{index}")
}

/// Capacity of the breadcrumb pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreadcrumbLimits {
    /// Breadcrumbs across both files
    pub maximum_breadcrumbs: u64,

    /// Bytes across both files; also the largest single breadcrumb kept
    pub maximum_total_size: Option<u64>,
}

impl Default for BreadcrumbLimits {
    fn default() -> Self {
        Self {
            maximum_breadcrumbs: 100,
            maximum_total_size: None,
        }
    }
}

impl BreadcrumbLimits {
    fn rotation(&self) -> RotationLimits {
        RotationLimits {
            max_lines: Some((self.maximum_breadcrumbs / 2).max(1)),
            max_size: self.maximum_total_size.map(|size| (size / 2).max(1)),
        }
    }
}

/// Breadcrumbs of one session, persisted through a [`RotatingWriter`]
#[derive(Debug)]
pub struct BreadcrumbsStorage {
    writer: RotatingWriter,
    maximum_total_size: Option<u64>,
    /// Held while a breadcrumb is written, so ids reach disk in order
    last_id: Mutex<u64>,
}

impl BreadcrumbsStorage {
    /// Create the storage for `session`
    ///
    /// # Errors
    ///
    /// Fails if the session is cleared or `maximum_breadcrumbs` is zero.
    pub fn create(session: &SessionFiles, limits: BreadcrumbLimits) -> Result<Self> {
        if limits.maximum_breadcrumbs == 0 {
            return Err(WriterError::invalid_limit("maximum_breadcrumbs"));
        }

        let writer = RotatingWriter::for_session(
            session,
            &breadcrumbs_file_name(0),
            &breadcrumbs_file_name(1),
            limits.rotation(),
        )?;

        Ok(Self {
            writer,
            maximum_total_size: limits.maximum_total_size,
            last_id: Mutex::new(Utc::now().timestamp().max(0) as u64),
        })
    }

    /// Id of the most recently added breadcrumb
    pub fn last_breadcrumb_id(&self) -> u64 {
        *self.last_id.lock()
    }

    /// Underlying writer
    pub fn writer(&self) -> &RotatingWriter {
        &self.writer
    }

    /// Both breadcrumb files, main first
    pub fn files(&self) -> [PathBuf; 2] {
        [
            self.writer.main_path().to_path_buf(),
            self.writer.fallback_path().to_path_buf(),
        ]
    }

    /// Persist a breadcrumb and return its id
    ///
    /// A breadcrumb larger than the total size limit is dropped; its id is
    /// still consumed and returned.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::Disposed`] after [`dispose`](Self::dispose).
    pub fn add(&self, raw: RawBreadcrumb) -> Result<u64> {
        let mut last_id = self.last_id.lock();
        *last_id += 1;
        let id = *last_id;

        let breadcrumb = Breadcrumb {
            id,
            message: raw.message,
            timestamp: Utc::now().timestamp_millis(),
            breadcrumb_type: raw.breadcrumb_type,
            level: raw.level,
            attributes: raw.attributes,
        };
        let line = serde_json::to_string(&breadcrumb)?;

        if let Some(max) = self.maximum_total_size
            && line.len() as u64 > max
        {
            tracing::debug!(id, size = line.len(), max, "breadcrumb exceeds size limit, dropped");
            return Ok(id);
        }

        self.writer.write_line(line)?;
        Ok(id)
    }

    /// Close the files and reject further breadcrumbs
    pub fn dispose(&self) {
        self.writer.dispose();
    }

    /// Breadcrumb files owned by any session, main first
    ///
    /// Used to harvest the residue of a previous session.
    ///
    /// # Errors
    ///
    /// Fails if the session has been cleared.
    pub fn session_files(session: &SessionFiles) -> backlog_storage::Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = session
            .get_session_files()?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|file| file.to_str())
                    .and_then(name::decode)
                    .is_some_and(|decoded| decoded.prefix.starts_with(BREADCRUMBS_FILE_PREFIX))
            })
            .collect();
        files.sort();
        files.truncate(2);
        Ok(files)
    }
}

/// Load breadcrumbs from `files`, oldest first
///
/// Missing files and lines that are not breadcrumbs are skipped.
pub fn read_breadcrumbs(fs: &dyn FileSystem, files: &[PathBuf]) -> Vec<Breadcrumb> {
    let mut breadcrumbs = Vec::new();

    for path in files {
        let contents = match fs.read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "breadcrumb file not readable");
                continue;
            }
        };

        for line in contents.lines().filter(|line| !line.trim().is_empty()) {
            match serde_json::from_str::<Breadcrumb>(line) {
                Ok(breadcrumb) => breadcrumbs.push(breadcrumb),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping malformed breadcrumb");
                }
            }
        }
    }

    breadcrumbs.sort_by_key(|breadcrumb| breadcrumb.id);
    breadcrumbs
}

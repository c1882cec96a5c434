//! Backlog - Database
//!
//! Reports that could not be delivered are persisted here and retried after
//! a restart.
//!
//! # Example
//!
//! ```ignore
//! use backlog_database::{DeduplicationModel, DeduplicationStrategy, PendingRecord, RecordStore};
//!
//! let fs = Arc::new(NativeFileSystem::default());
//! let store = RecordStore::create_if_valid(fs, &config.database)?.expect("enabled");
//! store.start()?;
//!
//! let model = DeduplicationModel::new(DeduplicationStrategy::MESSAGE);
//! let record = PendingRecord::new(report.clone(), vec![]).with_hash(model.key(&report));
//! store.add(&record)?;
//!
//! for record in store.get().await? {
//!     // deliver, then
//!     store.delete(&record).await?;
//! }
//! ```

mod error;
mod hash;
mod record;
mod store;

pub use error::{DatabaseError, Result};
pub use hash::{CUSTOM_FINGERPRINT_ATTRIBUTE, DeduplicationModel, DeduplicationStrategy, hash};
pub use record::{AttachmentRef, PendingRecord};
pub use store::{DEFAULT_MAXIMUM_NUMBER_OF_RECORDS, RECORD_SUFFIX, RecordStore};

//! Pending record model

use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// File attached to a report, referenced by path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    /// Attachment file on disk
    pub file_path: PathBuf,
}

impl AttachmentRef {
    /// Reference the file at `file_path`
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }
}

/// A report that has not been delivered yet
///
/// Serialized as one `{id}-record.json` file. `locked` marks a record a
/// sender is working on; it is never persisted as `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRecord {
    /// Unique record id, also the file name stem
    pub id: String,

    /// Deduplication key, empty when deduplication is off
    pub hash: String,

    /// How many identical reports this record stands for
    pub count: u64,

    /// Creation time, epoch milliseconds
    pub timestamp: i64,

    /// Report payload
    pub data: Value,

    /// Attachment files sent with the report
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,

    /// Held by a sender
    #[serde(default)]
    pub locked: bool,

    /// Session that produced the report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl PendingRecord {
    /// Create an unlocked record with a fresh id
    pub fn new(data: Value, attachments: Vec<AttachmentRef>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            hash: String::new(),
            count: 1,
            timestamp: Utc::now().timestamp_millis(),
            data,
            attachments,
            locked: false,
            session_id: None,
        }
    }

    /// Set the deduplication key
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self
    }

    /// Set the producing session
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_record_defaults() {
        let record = PendingRecord::new(json!({"message": "boom"}), vec![]);

        assert_eq!(record.count, 1);
        assert!(!record.locked);
        assert!(record.hash.is_empty());
        assert!(record.timestamp > 0);
        assert!(Uuid::parse_str(&record.id).is_ok());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = PendingRecord::new(Value::Null, vec![]);
        let b = PendingRecord::new(Value::Null, vec![]);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_json_field_names() {
        let record = PendingRecord::new(json!({}), vec![AttachmentRef::new("/tmp/a.log")])
            .with_session_id("abc");
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["sessionId"], "abc");
        assert_eq!(value["attachments"][0]["filePath"], "/tmp/a.log");
        assert_eq!(value["locked"], false);
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let json = r#"{"id":"x","count":1,"timestamp":1,"data":{}}"#;
        assert!(serde_json::from_str::<PendingRecord>(json).is_err());
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{"id":"x","hash":"","count":2,"timestamp":1,"data":null}"#;
        let record: PendingRecord = serde_json::from_str(json).unwrap();

        assert!(record.attachments.is_empty());
        assert!(!record.locked);
        assert!(record.session_id.is_none());
    }
}

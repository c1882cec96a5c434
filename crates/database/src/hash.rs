//! Deduplication keys
//!
//! Reports that hash to the same key describe the same problem. The key is
//! a sha256 over the parts of the report selected by a
//! [`DeduplicationStrategy`]; a report carrying the `_mod_fingerprint`
//! attribute uses that value instead.

use std::ops::BitOr;

use backlog_config::DeduplicationKey;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Attribute that overrides the computed key
pub const CUSTOM_FINGERPRINT_ATTRIBUTE: &str = "_mod_fingerprint";

/// Lowercase hex sha256 of `input`
pub fn hash(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Set of report parts hashed into the key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeduplicationStrategy(u8);

impl DeduplicationStrategy {
    /// No deduplication
    pub const NONE: Self = Self(0);
    /// Main thread stack
    pub const CALLSTACK: Self = Self(1 << 0);
    /// Exception classifiers
    pub const CLASSIFIER: Self = Self(1 << 1);
    /// `error.message` attribute
    pub const MESSAGE: Self = Self(1 << 2);
    /// Every part
    pub const ALL: Self = Self(Self::CALLSTACK.0 | Self::CLASSIFIER.0 | Self::MESSAGE.0);

    /// Whether every part of `other` is selected
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether nothing is selected
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Strategy selecting the configured keys
    pub fn from_keys(keys: &[DeduplicationKey]) -> Self {
        keys.iter().fold(Self::NONE, |strategy, key| {
            strategy
                | match key {
                    DeduplicationKey::Callstack => Self::CALLSTACK,
                    DeduplicationKey::Classifier => Self::CLASSIFIER,
                    DeduplicationKey::Message => Self::MESSAGE,
                    DeduplicationKey::All => Self::ALL,
                }
        })
    }
}

impl BitOr for DeduplicationStrategy {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Computes deduplication keys for report payloads
///
/// Payloads are report JSON objects with `classifiers` (array of strings),
/// `threads` (object keyed by thread name), `mainThread` and `attributes`.
/// Missing parts contribute nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeduplicationModel {
    strategy: DeduplicationStrategy,
}

impl DeduplicationModel {
    /// Create a model hashing the parts selected by `strategy`
    pub fn new(strategy: DeduplicationStrategy) -> Self {
        Self { strategy }
    }

    /// Deduplication key of `data`; empty when deduplication is off and no
    /// fingerprint is set
    pub fn key(&self, data: &Value) -> String {
        if let Some(fingerprint) = data["attributes"][CUSTOM_FINGERPRINT_ATTRIBUTE].as_str()
            && !fingerprint.is_empty()
        {
            return fingerprint.to_string();
        }

        if self.strategy.is_none() {
            return String::new();
        }

        let mut payload = String::new();
        if self.strategy.contains(DeduplicationStrategy::CLASSIFIER)
            && let Some(classifiers) = data["classifiers"].as_array()
        {
            let names: Vec<&str> = classifiers.iter().filter_map(Value::as_str).collect();
            payload.push_str(&names.join(","));
        }
        if self.strategy.contains(DeduplicationStrategy::CALLSTACK)
            && let Some(main_thread) = data["mainThread"].as_str()
        {
            let stack = &data["threads"][main_thread];
            if !stack.is_null() {
                payload.push_str(&stack.to_string());
            }
        }
        if self.strategy.contains(DeduplicationStrategy::MESSAGE)
            && let Some(message) = data["attributes"]["error.message"].as_str()
        {
            payload.push_str(message);
        }

        hash(&payload)
    }
}

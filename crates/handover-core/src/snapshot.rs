//! Storage snapshots.
//!
//! A snapshot is a point-in-time copy of selected keys from a window's
//! local store. Every value carries its encoding on the wire, so the
//! receiving side never has to guess whether a string is JSON text or a
//! plain value.

use crate::store::KeyValueStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single stored value with explicit encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "value", rename_all = "snake_case")]
pub enum StorageValue {
    /// A structured value, re-encoded as JSON text when stored.
    Json(Value),
    /// An opaque string, stored verbatim.
    Raw(String),
}

impl StorageValue {
    /// The string form that goes into a key-value store.
    pub fn to_stored_string(&self) -> String {
        match self {
            StorageValue::Json(value) => value.to_string(),
            StorageValue::Raw(text) => text.clone(),
        }
    }

    /// Classify a stored string: JSON text becomes `Json`, everything else
    /// stays `Raw`.
    pub fn from_stored_string(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => StorageValue::Json(value),
            Err(_) => StorageValue::Raw(text.to_string()),
        }
    }
}

/// A point-in-time copy of selected key-value pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageSnapshot {
    entries: BTreeMap<String, StorageValue>,
}

impl StorageSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: StorageValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&StorageValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StorageValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Snapshot the given keys out of a store.
///
/// Keys that are absent or hold an empty string are omitted entirely.
/// Values that fail to decode as JSON degrade to raw strings. Never fails.
pub fn capture<S: KeyValueStore>(store: &S, keys: &[impl AsRef<str>]) -> StorageSnapshot {
    let mut snapshot = StorageSnapshot::new();
    for key in keys {
        let key = key.as_ref();
        let Some(stored) = store.get(key) else {
            continue;
        };
        if stored.is_empty() {
            continue;
        }
        let value = StorageValue::from_stored_string(&stored);
        if matches!(value, StorageValue::Raw(_)) {
            tracing::debug!("key {} is not JSON text, keeping it raw", key);
        }
        snapshot.insert(key, value);
    }
    snapshot
}

/// Write a snapshot into a store, best-effort.
///
/// A failure on one key must not abort the rest: failed keys are logged and
/// skipped. Returns the number of keys written.
pub fn apply<S: KeyValueStore>(store: &mut S, snapshot: &StorageSnapshot) -> usize {
    let mut written = 0;
    for (key, value) in snapshot.iter() {
        match store.set(key, &value.to_stored_string()) {
            Ok(()) => written += 1,
            Err(e) => tracing::warn!("skipping key {}: {}", key, e),
        }
    }
    written
}

//! Key-value store seam.
//!
//! Each window owns a flat string-keyed local store (the shape of browser
//! local storage). The transfer protocol only ever moves copies of selected
//! entries across the window boundary; it never shares a store.

use std::collections::BTreeMap;

/// A store rejected a write.
#[derive(Debug, Clone, thiserror::Error)]
#[error("store rejected key {key:?}: {reason}")]
pub struct StoreError {
    /// The key that could not be written.
    pub key: String,
    /// Backend-specific reason.
    pub reason: String,
}

/// A flat string-keyed local store.
pub trait KeyValueStore {
    /// Read the stored string for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-process store backing a simulated window.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry. Infallible convenience for setup code.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

//! In-memory store, used by tests and hosts without persistent storage.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::storage::{poisoned, used_bytes, PersistentStore, Quota};

// == Memory Store ==
/// HashMap-backed store with an optional byte quota.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Quota,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store without a quota.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Quota::new(None),
        }
    }

    /// Creates an empty store that rejects writes beyond `limit` bytes.
    pub fn with_quota(limit: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Quota::new(Some(limit)),
        }
    }

    /// Returns the number of stored keys, across all namespaces.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        let used = used_bytes(entries.iter());
        self.quota.check(used, key, entries.get(key), value)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

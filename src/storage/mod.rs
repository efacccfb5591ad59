//! Storage Module
//!
//! Persistent key/value string stores the cache engine writes through.
//! Every cache instance sharing a store sees the same keys, so all access
//! goes through `&self` with interior locking.

mod file;
mod memory;

use std::fmt;

use crate::error::{CacheError, Result};

pub use file::FileStore;
pub use memory::MemoryStore;

// == Persistent Store ==
/// Shared string key/value store with prefix enumeration.
pub trait PersistentStore: Send + Sync + fmt::Debug {
    /// Returns false when the backend is absent; callers then skip all work.
    fn is_available(&self) -> bool {
        true
    }

    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` under `key`. A failed write leaves the previous value intact.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`; removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Lists every key starting with `prefix`, in unspecified order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

// == Unavailable Store ==
/// Stand-in for a missing backend. Reads find nothing and writes fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl PersistentStore for UnavailableStore {
    fn is_available(&self) -> bool {
        false
    }

    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(CacheError::StoreUnavailable)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(CacheError::StoreUnavailable)
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Err(CacheError::StoreUnavailable)
    }

    fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
        Err(CacheError::StoreUnavailable)
    }
}

// == Quota ==
/// Byte quota shared by the map-backed stores: keys plus values.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Quota(Option<usize>);

impl Quota {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self(limit)
    }

    /// Checks that replacing `old` with `value` under `key` stays within quota.
    pub(crate) fn check(
        &self,
        used: usize,
        key: &str,
        old: Option<&String>,
        value: &str,
    ) -> Result<()> {
        let Some(limit) = self.0 else {
            return Ok(());
        };
        let freed = old.map(|v| key.len() + v.len()).unwrap_or(0);
        let needed = used - freed + key.len() + value.len();
        if needed > limit {
            return Err(CacheError::WriteFailure(format!(
                "quota exceeded: {} of {} bytes",
                needed, limit
            )));
        }
        Ok(())
    }
}

pub(crate) fn used_bytes<'a>(entries: impl Iterator<Item = (&'a String, &'a String)>) -> usize {
    entries.map(|(k, v)| k.len() + v.len()).sum()
}

pub(crate) fn poisoned() -> CacheError {
    CacheError::Internal("store lock poisoned".to_string())
}

//! Namespace scan shared by stats recomputation, eviction and sweeps.

use tracing::{debug, warn};

use crate::cache::CacheEntry;
use crate::error::Result;
use crate::storage::PersistentStore;

/// A decoded entry together with its raw store key.
#[derive(Debug, Clone)]
pub struct ScannedEntry {
    pub key: String,
    pub entry: CacheEntry,
}

/// Reads and decodes every key under `prefix`.
///
/// Keys that fail to decode are removed from the store as they are found.
pub fn scan_namespace(store: &dyn PersistentStore, prefix: &str) -> Result<Vec<ScannedEntry>> {
    let keys = store.keys_with_prefix(prefix)?;
    let mut scanned = Vec::with_capacity(keys.len());

    for key in keys {
        let Some(raw) = store.get(&key)? else {
            continue;
        };
        match CacheEntry::decode(&raw) {
            Ok(entry) => scanned.push(ScannedEntry { key, entry }),
            Err(e) => {
                debug!(key = %key, error = %e, "Purging corrupt cache entry");
                if let Err(e) = store.remove(&key) {
                    warn!(key = %key, error = %e, "Failed to purge corrupt cache entry");
                }
            }
        }
    }

    Ok(scanned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_scan_purges_corrupt_entries() {
        let store = MemoryStore::new();
        let good = CacheEntry::new(json!(1), Duration::from_secs(60)).unwrap();
        store.set("ns_good", &good.encode().unwrap()).unwrap();
        store.set("ns_bad", "{{{").unwrap();
        store.set("other_bad", "{{{").unwrap();

        let scanned = scan_namespace(&store, "ns_").unwrap();

        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].key, "ns_good");
        assert_eq!(store.get("ns_bad").unwrap(), None);
        // Outside the namespace nothing is touched
        assert!(store.get("other_bad").unwrap().is_some());
    }
}

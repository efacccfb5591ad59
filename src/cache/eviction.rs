//! Eviction Module
//!
//! Least-used eviction: one victim per call, chosen by lowest hit count.

use tracing::{debug, warn};

use crate::cache::scan::{scan_namespace, ScannedEntry};
use crate::error::Result;
use crate::storage::PersistentStore;

// == Select Victim ==
/// Picks the live entry with the fewest hits.
///
/// Ties go to whichever entry comes first in `entries`; store enumeration
/// order is unspecified, so callers must not rely on which one that is.
pub fn select_victim(entries: &[ScannedEntry], now_ms: u64) -> Option<&ScannedEntry> {
    let mut victim: Option<&ScannedEntry> = None;
    for candidate in entries.iter().filter(|e| !e.entry.is_expired_at(now_ms)) {
        match victim {
            Some(current) if candidate.entry.hit_count >= current.entry.hit_count => {}
            _ => victim = Some(candidate),
        }
    }
    victim
}

// == Evict Least Used ==
/// Scans the namespace and removes exactly one live entry holding the
/// minimum hit count.
///
/// Corrupt and expired entries met on the way are purged but are never the
/// victim. Returns the removed entry, or `None` when nothing was live.
pub fn evict_least_used(
    store: &dyn PersistentStore,
    prefix: &str,
    now_ms: u64,
) -> Result<Option<ScannedEntry>> {
    let entries = scan_namespace(store, prefix)?;

    for expired in entries.iter().filter(|e| e.entry.is_expired_at(now_ms)) {
        if let Err(e) = store.remove(&expired.key) {
            warn!(key = %expired.key, error = %e, "Failed to purge expired cache entry");
        }
    }

    let Some(victim) = select_victim(&entries, now_ms).cloned() else {
        return Ok(None);
    };
    store.remove(&victim.key)?;
    debug!(
        key = %victim.key,
        hits = victim.entry.hit_count,
        size = victim.entry.size_bytes,
        "Evicted least used entry"
    );

    Ok(Some(victim))
}

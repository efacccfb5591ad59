//! Cache Statistics Module
//!
//! Lifetime hit/miss counters persisted in the store, plus a size/count
//! snapshot recomputed by scanning the namespace.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::scan::scan_namespace;
use crate::error::Result;
use crate::storage::PersistentStore;

// == Cache Stats ==
/// Snapshot of cache usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Sum of `size_bytes` over live entries
    pub total_size_bytes: u64,
    /// Number of live entries
    pub entry_count: usize,
    /// Lifetime hits
    pub hit_count: u64,
    /// Lifetime misses
    pub miss_count: u64,
    /// 100 * hits / (hits + misses), or 0 before any lookup
    pub hit_rate_percent: f64,
}

impl CacheStats {
    /// Total lookups recorded so far.
    pub fn lookups(&self) -> u64 {
        self.hit_count.saturating_add(self.miss_count)
    }
}

// == Hit Counters ==
/// Persisted lifetime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitCounters {
    pub hits: u64,
    pub misses: u64,
}

impl HitCounters {
    // == Hit Rate ==
    /// Returns the hit rate as a percentage, or 0.0 if no lookups were made.
    pub fn hit_rate_percent(&self) -> f64 {
        let total = self.hits.saturating_add(self.misses);
        if total == 0 {
            0.0
        } else {
            100.0 * self.hits as f64 / total as f64
        }
    }
}

/// Outcome of a single `get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Miss,
}

// == Stats Tracker ==
#[derive(Debug)]
pub struct StatsTracker {
    store: Arc<dyn PersistentStore>,
    /// Entry key prefix, e.g. `app_cache_`
    prefix: String,
    /// Key holding the lifetime counters
    counters_key: String,
    snapshot: Mutex<CacheStats>,
}

impl StatsTracker {
    // == Constructor ==
    pub fn new(store: Arc<dyn PersistentStore>, prefix: String, counters_key: String) -> Self {
        Self {
            store,
            prefix,
            counters_key,
            snapshot: Mutex::new(CacheStats::default()),
        }
    }

    // == Counters ==
    /// Reads the lifetime counters. Missing or corrupt counters read as zero.
    pub fn counters(&self) -> Result<HitCounters> {
        let counters = self
            .store
            .get(&self.counters_key)?
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Ok(counters)
    }

    // == Update Stats ==
    /// Increments the counter matching `outcome` and persists it.
    pub fn update_stats(&self, outcome: Lookup) -> Result<HitCounters> {
        let mut counters = self.counters()?;
        match outcome {
            Lookup::Hit => counters.hits = counters.hits.saturating_add(1),
            Lookup::Miss => counters.misses = counters.misses.saturating_add(1),
        }
        self.store
            .set(&self.counters_key, &serde_json::to_string(&counters)?)?;

        let mut snapshot = self.lock_snapshot();
        snapshot.hit_count = counters.hits;
        snapshot.miss_count = counters.misses;
        snapshot.hit_rate_percent = counters.hit_rate_percent();
        Ok(counters)
    }

    // == Recompute Stats ==
    /// Rescans the namespace and refreshes the snapshot.
    ///
    /// Corrupt entries are purged; expired entries are left in place but
    /// not counted.
    pub fn recompute_stats(&self) -> Result<CacheStats> {
        let now = current_timestamp_ms();
        let live: Vec<_> = scan_namespace(self.store.as_ref(), &self.prefix)?
            .into_iter()
            .filter(|s| !s.entry.is_expired_at(now))
            .collect();
        let counters = self.counters()?;

        let stats = CacheStats {
            total_size_bytes: live
                .iter()
                .map(|s| s.entry.size_bytes)
                .fold(0, u64::saturating_add),
            entry_count: live.len(),
            hit_count: counters.hits,
            miss_count: counters.misses,
            hit_rate_percent: counters.hit_rate_percent(),
        };
        debug!(
            entries = stats.entry_count,
            size = stats.total_size_bytes,
            "Recomputed cache stats"
        );

        *self.lock_snapshot() = stats.clone();
        Ok(stats)
    }

    /// Zeroes size and count in the snapshot, leaving lifetime counters alone.
    pub fn reset_sizes(&self) {
        let mut snapshot = self.lock_snapshot();
        snapshot.total_size_bytes = 0;
        snapshot.entry_count = 0;
    }

    /// Returns the latest snapshot without scanning.
    pub fn snapshot(&self) -> CacheStats {
        self.lock_snapshot().clone()
    }

    fn lock_snapshot(&self) -> MutexGuard<'_, CacheStats> {
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

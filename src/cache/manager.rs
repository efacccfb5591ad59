//! Cache Manager Module
//!
//! Main cache engine: namespaced entries in a persistent store, lazy TTL
//! expiry, a soft size budget enforced by single-victim eviction, and
//! lifetime hit/miss accounting.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::eviction::evict_least_used;
use crate::cache::scan::scan_namespace;
use crate::cache::stats::{Lookup, StatsTracker};
use crate::cache::{CacheEntry, CacheStats};
use crate::config::CacheConfig;
use crate::error::{CacheError, ErrorSink, Result, TracingErrorSink};
use crate::models::events::{to_payload, CacheActionEvent};
use crate::storage::PersistentStore;
use crate::telemetry::{TelemetryReporter, TracingReporter, EVENT_CLEARED, EVENT_EVICTED};

// == Cache Manager ==
/// Key/value cache over a shared [`PersistentStore`].
///
/// Every public operation is infallible: storage and decoding failures are
/// reported to the [`ErrorSink`] and degrade to a miss, `false`, or a no-op.
pub struct CacheManager {
    store: Arc<dyn PersistentStore>,
    stats: StatsTracker,
    errors: Arc<dyn ErrorSink>,
    reporter: Arc<dyn TelemetryReporter>,
    /// Entry key prefix, `<namespace>_`
    prefix: String,
    /// Soft size budget in bytes
    max_size_bytes: u64,
    /// TTL used by `set`
    default_ttl: Duration,
    enabled: bool,
}

impl CacheManager {
    // == Constructor ==
    /// Creates a manager for `config.namespace` over `store`.
    pub fn new(config: &CacheConfig, store: Arc<dyn PersistentStore>) -> Self {
        let prefix = format!("{}_", config.namespace);
        let counters_key = format!("{}:stats", config.namespace);

        if config.enabled && !store.is_available() {
            warn!("Persistent store unavailable, cache operations will be no-ops");
        }

        Self {
            stats: StatsTracker::new(store.clone(), prefix.clone(), counters_key),
            store,
            errors: Arc::new(TracingErrorSink),
            reporter: Arc::new(TracingReporter),
            prefix,
            max_size_bytes: config.max_cache_size_bytes,
            default_ttl: config.default_ttl(),
            enabled: config.enabled,
        }
    }

    /// Routes swallowed failures to `sink` instead of the log.
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.errors = sink;
        self
    }

    /// Sends telemetry events to `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn TelemetryReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// True when the cache is enabled and its store is usable.
    pub fn is_active(&self) -> bool {
        self.enabled && self.store.is_available()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn reporter(&self) -> Arc<dyn TelemetryReporter> {
        self.reporter.clone()
    }

    // == Get ==
    /// Returns the cached value for `key`, or `None` on a miss.
    ///
    /// Missing, corrupt and expired entries all count as misses; corrupt and
    /// expired ones are purged. A hit increments and persists the entry's
    /// hit count.
    pub fn get(&self, key: &str) -> Option<Value> {
        if !self.is_active() {
            return None;
        }

        match self.try_get(key) {
            Ok(Some(value)) => {
                self.record(Lookup::Hit);
                Some(value)
            }
            Ok(None) => {
                self.record(Lookup::Miss);
                None
            }
            Err(e) => {
                self.errors.report("get", &e);
                self.record(Lookup::Miss);
                None
            }
        }
    }

    /// Like [`get`](Self::get), decoding the value into `T`.
    ///
    /// A value that does not decode as `T` is returned as `None` but still
    /// counts as a hit.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    fn try_get(&self, key: &str) -> Result<Option<Value>> {
        let raw_key = self.namespaced_key(key);
        let Some(raw) = self.store.get(&raw_key)? else {
            return Ok(None);
        };

        let mut entry = match CacheEntry::decode(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                self.errors.report("get", &e);
                self.purge(&raw_key);
                return Ok(None);
            }
        };

        if entry.is_expired() {
            debug!(key, "Cache entry expired");
            self.purge(&raw_key);
            return Ok(None);
        }

        entry.hit_count = entry.hit_count.saturating_add(1);
        // A failed write-back loses one hit increment, not the hit itself
        if let Err(e) = entry
            .encode()
            .and_then(|encoded| self.store.set(&raw_key, &encoded))
        {
            self.errors.report("get", &e);
        }

        Ok(Some(entry.value))
    }

    // == Set ==
    /// Stores `value` under `key` with the default TTL.
    ///
    /// Returns false if the value cannot be encoded or the store rejects the
    /// write.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        self.set_with_ttl(key, value, self.default_ttl)
    }

    /// Stores `value` under `key`, expiring after `ttl`.
    ///
    /// If the write would push the live size over budget, one least-used
    /// entry is evicted first. A single eviction may not be enough; the
    /// budget is soft.
    pub fn set_with_ttl<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        if !self.is_active() {
            return false;
        }

        let result = serde_json::to_value(value)
            .map_err(CacheError::from)
            .and_then(|value| self.try_set(key, value, ttl));
        self.refresh_stats();

        match result {
            Ok(()) => true,
            Err(e) => {
                self.errors.report("set", &e);
                false
            }
        }
    }

    fn try_set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value, ttl)?;
        let encoded = entry.encode()?;
        let now = current_timestamp_ms();

        let current_size = self.live_size(now)?;
        if current_size.saturating_add(entry.size_bytes) > self.max_size_bytes {
            debug!(
                key,
                current_size,
                incoming = entry.size_bytes,
                budget = self.max_size_bytes,
                "Cache over budget, evicting"
            );
            self.evict_once(now);
        }

        self.store.set(&self.namespaced_key(key), &encoded)
    }

    fn live_size(&self, now_ms: u64) -> Result<u64> {
        Ok(scan_namespace(self.store.as_ref(), &self.prefix)?
            .iter()
            .filter(|s| !s.entry.is_expired_at(now_ms))
            .map(|s| s.entry.size_bytes)
            .fold(0, u64::saturating_add))
    }

    fn evict_once(&self, now_ms: u64) {
        match evict_least_used(self.store.as_ref(), &self.prefix, now_ms) {
            Ok(Some(victim)) => {
                let event = CacheActionEvent {
                    key: Some(self.logical_key(&victim.key).to_string()),
                    entries_removed: 1,
                    bytes_removed: victim.entry.size_bytes,
                };
                self.reporter.emit(EVENT_EVICTED, to_payload(&event));
            }
            Ok(None) => {}
            Err(e) => self.errors.report("evict", &e),
        }
    }

    // == Delete ==
    /// Removes `key`. Missing keys are ignored.
    pub fn delete(&self, key: &str) {
        if !self.is_active() {
            return;
        }

        if let Err(e) = self.store.remove(&self.namespaced_key(key)) {
            self.errors.report("delete", &e);
        }
        self.refresh_stats();
    }

    // == Clear ==
    /// Removes every entry in the namespace.
    ///
    /// Size and count drop to zero; lifetime hit/miss counters are kept.
    pub fn clear(&self) {
        if !self.is_active() {
            return;
        }

        let keys = match self.store.keys_with_prefix(&self.prefix) {
            Ok(keys) => keys,
            Err(e) => {
                self.errors.report("clear", &e);
                return;
            }
        };

        let mut removed = 0;
        for key in &keys {
            match self.store.remove(key) {
                Ok(()) => removed += 1,
                Err(e) => self.errors.report("clear", &e),
            }
        }
        if removed == keys.len() {
            self.stats.reset_sizes();
        } else {
            // Some entries survived; the snapshot must still count them
            self.refresh_stats();
        }
        info!(removed, "Cache cleared");

        let event = CacheActionEvent {
            key: None,
            entries_removed: removed,
            bytes_removed: 0,
        };
        self.reporter.emit(EVENT_CLEARED, to_payload(&event));
    }

    // == Sweep Expired ==
    /// Removes expired and corrupt entries, then refreshes stats.
    ///
    /// Returns the number of expired entries removed.
    pub fn sweep_expired(&self) -> usize {
        if !self.is_active() {
            return 0;
        }

        let now = current_timestamp_ms();
        let entries = match scan_namespace(self.store.as_ref(), &self.prefix) {
            Ok(entries) => entries,
            Err(e) => {
                self.errors.report("sweep", &e);
                return 0;
            }
        };

        let mut removed = 0;
        for expired in entries.iter().filter(|s| s.entry.is_expired_at(now)) {
            match self.store.remove(&expired.key) {
                Ok(()) => removed += 1,
                Err(e) => self.errors.report("sweep", &e),
            }
        }
        self.refresh_stats();

        if removed > 0 {
            info!("Expiry sweep: removed {} expired entries", removed);
        } else {
            debug!("Expiry sweep: no expired entries found");
        }
        removed
    }

    // == Stats ==
    /// Rescans the namespace and returns fresh statistics.
    pub fn stats(&self) -> CacheStats {
        if !self.is_active() {
            return CacheStats::default();
        }
        self.refresh_stats()
    }

    /// Returns the snapshot from the most recent recomputation.
    pub fn last_stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    fn refresh_stats(&self) -> CacheStats {
        match self.stats.recompute_stats() {
            Ok(stats) => stats,
            Err(e) => {
                self.errors.report("stats", &e);
                self.stats.snapshot()
            }
        }
    }

    // == Helpers ==
    fn record(&self, outcome: Lookup) {
        if let Err(e) = self.stats.update_stats(outcome) {
            self.errors.report("stats", &e);
        }
    }

    fn purge(&self, raw_key: &str) {
        if let Err(e) = self.store.remove(raw_key) {
            self.errors.report("purge", &e);
        }
        self.refresh_stats();
    }

    fn namespaced_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn logical_key<'a>(&self, raw_key: &'a str) -> &'a str {
        raw_key.strip_prefix(&self.prefix).unwrap_or(raw_key)
    }
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("store", &self.store)
            .field("prefix", &self.prefix)
            .field("max_size_bytes", &self.max_size_bytes)
            .field("default_ttl", &self.default_ttl)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::cache::{
    DEFAULT_CRITICAL_ROUTES, DEFAULT_MAX_CACHE_SIZE_BYTES, DEFAULT_NAMESPACE, DEFAULT_TTL_MS,
};
use crate::storage::{FileStore, MemoryStore, PersistentStore, UnavailableStore};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch; when false every cache operation is a no-op
    pub enabled: bool,
    /// Prefix owning every key this cache writes
    pub namespace: String,
    /// Extra warmup candidates; only reserved-prefix routes are fetched
    pub preload_routes: Vec<String>,
    /// Routes always warmed before `preload_routes`
    pub critical_routes: Vec<String>,
    /// Auxiliary resources requested during warmup without caching
    pub warmup_assets: Vec<String>,
    /// Delay between start and warmup in milliseconds
    pub warmup_delay_ms: u64,
    /// Soft size budget in bytes
    pub max_cache_size_bytes: u64,
    /// TTL applied by `set` when none is given, in milliseconds
    pub default_ttl_ms: u64,
    /// Interval between periodic stats recomputations in seconds
    pub stats_interval_secs: u64,
    /// Base URL warmup routes are resolved against
    pub origin: String,
    /// File backing the persistent store; in-memory when unset
    pub storage_path: Option<PathBuf>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ENABLED` - Master switch (default: true)
    /// - `CACHE_NAMESPACE` - Key namespace (default: app_cache)
    /// - `CACHE_PRELOAD_ROUTES` - Comma separated warmup routes (default: none)
    /// - `CACHE_WARMUP_ASSETS` - Comma separated auxiliary resources (default: none)
    /// - `CACHE_WARMUP_DELAY_MS` - Warmup delay (default: 2000)
    /// - `CACHE_MAX_SIZE_BYTES` - Soft size budget (default: 10 MB)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL (default: 300000)
    /// - `CACHE_STATS_INTERVAL_SECS` - Stats timer period (default: 300)
    /// - `CACHE_ORIGIN` - Warmup base URL (default: http://localhost:3000)
    /// - `CACHE_STORAGE_PATH` - File store location (default: in-memory)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: parse_var("CACHE_ENABLED").unwrap_or(defaults.enabled),
            namespace: env::var("CACHE_NAMESPACE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.namespace),
            preload_routes: list_var("CACHE_PRELOAD_ROUTES").unwrap_or(defaults.preload_routes),
            critical_routes: defaults.critical_routes,
            warmup_assets: list_var("CACHE_WARMUP_ASSETS").unwrap_or(defaults.warmup_assets),
            warmup_delay_ms: parse_var("CACHE_WARMUP_DELAY_MS").unwrap_or(defaults.warmup_delay_ms),
            max_cache_size_bytes: parse_var("CACHE_MAX_SIZE_BYTES")
                .unwrap_or(defaults.max_cache_size_bytes),
            default_ttl_ms: parse_var("CACHE_DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl_ms),
            stats_interval_secs: parse_var("CACHE_STATS_INTERVAL_SECS")
                .unwrap_or(defaults.stats_interval_secs),
            origin: env::var("CACHE_ORIGIN").unwrap_or(defaults.origin),
            storage_path: env::var_os("CACHE_STORAGE_PATH").map(PathBuf::from),
        }
    }

    pub fn warmup_delay(&self) -> Duration {
        Duration::from_millis(self.warmup_delay_ms)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    /// Stats timer period; a zero setting is treated as one second.
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs.max(1))
    }

    /// Opens the persistent store this configuration describes.
    ///
    /// A file store that cannot be opened degrades to [`UnavailableStore`].
    pub fn open_store(&self) -> Arc<dyn PersistentStore> {
        match &self.storage_path {
            Some(path) => match FileStore::open(path) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Persistent store unavailable, caching disabled");
                    Arc::new(UnavailableStore)
                }
            },
            None => Arc::new(MemoryStore::new()),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: DEFAULT_NAMESPACE.to_string(),
            preload_routes: Vec::new(),
            critical_routes: DEFAULT_CRITICAL_ROUTES.iter().map(|r| r.to_string()).collect(),
            warmup_assets: Vec::new(),
            warmup_delay_ms: 2000,
            max_cache_size_bytes: DEFAULT_MAX_CACHE_SIZE_BYTES,
            default_ttl_ms: DEFAULT_TTL_MS,
            stats_interval_secs: 300,
            origin: "http://localhost:3000".to_string(),
            storage_path: None,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn list_var(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
}

//! Cache Module
//!
//! Persistent key/value caching with TTL expiration, a soft size budget
//! and least-used eviction.

mod entry;
mod eviction;
mod manager;
mod scan;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use eviction::{evict_least_used, select_victim};
pub use manager::CacheManager;
pub use scan::{scan_namespace, ScannedEntry};
pub use stats::{CacheStats, HitCounters, Lookup, StatsTracker};

// == Public Constants ==
/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "app_cache";

/// TTL applied by `set` when none is given
pub const DEFAULT_TTL_MS: u64 = 300_000; // 5 minutes

/// TTL for entries populated by warmup
pub const WARMUP_TTL_MS: u64 = 600_000; // 10 minutes

/// Default soft size budget
pub const DEFAULT_MAX_CACHE_SIZE_BYTES: u64 = 10 * 1024 * 1024; // 10 MB

/// Only routes under this prefix are eligible for warmup
pub const RESERVED_ROUTE_PREFIX: &str = "/api/";

/// Routes warmed on every start, ahead of configured preload routes
pub const DEFAULT_CRITICAL_ROUTES: &[&str] = &["/api/products", "/api/testimonials"];

//! Warm Cache - A persistent key/value cache with warmup
//!
//! Caches fetched resources in a shared persistent store with TTL
//! expiration, a soft size budget with least-used eviction, lifetime
//! hit/miss statistics and background cache warming.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod tasks;
pub mod telemetry;

pub use cache::{CacheManager, CacheStats};
pub use config::CacheConfig;
pub use error::{CacheError, ErrorSink, Result};
pub use storage::{FileStore, MemoryStore, PersistentStore, UnavailableStore};
pub use tasks::{CacheLifecycle, Visibility, WarmupReport, WarmupScheduler};
pub use telemetry::TelemetryReporter;

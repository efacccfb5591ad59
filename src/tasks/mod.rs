//! Background Tasks Module
//!
//! Contains background tasks that run alongside a live cache.
//!
//! # Tasks
//! - Stats timer: Recomputes and reports cache statistics periodically
//! - Warmup: Fetches and caches a fixed set of data routes after startup
//! - Lifecycle: Starts the above and the visibility listener, stops them all

mod lifecycle;
mod stats_timer;
mod warmup;

pub use lifecycle::{CacheLifecycle, Visibility};
pub use stats_timer::{report_performance, spawn_stats_task, MIN_STATS_INTERVAL};
pub use warmup::{WarmupReport, WarmupScheduler};

//! Stats Timer Task
//!
//! Background task that periodically recomputes cache statistics and
//! reports them to telemetry.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheManager, CacheStats};
use crate::models::events::{to_payload, PerformanceEvent};
use crate::telemetry::EVENT_PERFORMANCE;

/// Shortest period the stats task will tick at.
pub const MIN_STATS_INTERVAL: Duration = Duration::from_millis(10);

/// Spawns a background task that recomputes stats every `interval`.
///
/// Each tick rescans the namespace, correcting any drift from writes made
/// by other users of the store, and emits `cache_performance` once at
/// least one lookup has been recorded. Intervals below
/// [`MIN_STATS_INTERVAL`] are raised to it.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
pub fn spawn_stats_task(cache: Arc<CacheManager>, interval: Duration) -> JoinHandle<()> {
    let interval = interval.max(MIN_STATS_INTERVAL);
    tokio::spawn(async move {
        info!("Starting stats task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;
            report_performance(&cache);
        }
    })
}

/// Recomputes stats and emits them if any lookup has happened.
///
/// Returns the reported stats, or `None` when nothing was emitted.
pub fn report_performance(cache: &CacheManager) -> Option<CacheStats> {
    let stats = cache.stats();
    if stats.lookups() == 0 {
        debug!("Stats tick: no lookups yet, skipping report");
        return None;
    }

    cache
        .reporter()
        .emit(EVENT_PERFORMANCE, to_payload(&PerformanceEvent::from(&stats)));
    Some(stats)
}

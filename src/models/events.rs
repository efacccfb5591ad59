//! Event payloads, serialized to JSON before being handed to the reporter.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Payload for `cache_preload`, one per fetched warmup route.
#[derive(Debug, Clone, Serialize)]
pub struct PreloadEvent {
    pub route: String,
    pub success: bool,
    /// Cache size after the route was stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PreloadEvent {
    pub fn stored(route: impl Into<String>, cache_size: u64) -> Self {
        Self {
            route: route.into(),
            success: true,
            cache_size: Some(cache_size),
            error: None,
        }
    }

    pub fn failed(route: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            success: false,
            cache_size: None,
            error: Some(error.into()),
        }
    }
}

/// Payload for `cache_warmup`, emitted once warmup finishes.
#[derive(Debug, Clone, Serialize)]
pub struct WarmupEvent {
    pub routes_preloaded: usize,
    pub assets_preloaded: usize,
    pub cache_enabled: bool,
    pub stats: CacheStats,
}

/// Payload for `cache_performance`, emitted by the stats timer.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceEvent {
    pub hit_rate: f64,
    pub total_size: u64,
    pub entry_count: usize,
    pub total_hits: u64,
    pub total_misses: u64,
}

impl From<&CacheStats> for PerformanceEvent {
    fn from(stats: &CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate_percent,
            total_size: stats.total_size_bytes,
            entry_count: stats.entry_count,
            total_hits: stats.hit_count,
            total_misses: stats.miss_count,
        }
    }
}

/// Payload for ad hoc events such as `cache_cleared` and `cache_evicted`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheActionEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub entries_removed: usize,
    pub bytes_removed: u64,
}

/// Serializes a payload, falling back to `null` on failure.
pub fn to_payload<T: Serialize>(event: &T) -> Value {
    serde_json::to_value(event).unwrap_or(Value::Null)
}

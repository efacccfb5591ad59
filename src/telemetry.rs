//! Telemetry Module
//!
//! Fire-and-forget reporting of cache events to an external analytics sink.

use serde_json::Value;
use tracing::info;

// == Event Names ==
pub const EVENT_PRELOAD: &str = "cache_preload";
pub const EVENT_WARMUP: &str = "cache_warmup";
pub const EVENT_PERFORMANCE: &str = "cache_performance";
pub const EVENT_CLEARED: &str = "cache_cleared";
pub const EVENT_EVICTED: &str = "cache_evicted";

// == Telemetry Reporter ==
/// External sink for cache events. Delivery is best-effort; implementations
/// must not block or panic.
pub trait TelemetryReporter: Send + Sync {
    fn emit(&self, event: &str, payload: Value);
}

/// Logs every event at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl TelemetryReporter for TracingReporter {
    fn emit(&self, event: &str, payload: Value) {
        info!(event, %payload, "Cache telemetry");
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl TelemetryReporter for NoopReporter {
    fn emit(&self, _event: &str, _payload: Value) {}
}

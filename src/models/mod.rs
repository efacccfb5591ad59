//! Telemetry payload models
//!
//! Typed bodies for the events the cache emits through a
//! `TelemetryReporter`.

pub mod events;

pub use events::{CacheActionEvent, PerformanceEvent, PreloadEvent, WarmupEvent};

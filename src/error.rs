//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror. None of these errors
//! escape the public `CacheManager` API: they are converted to sentinel
//! return values and handed to an [`ErrorSink`].

use thiserror::Error;
use tracing::warn;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Persistent store is absent or disabled
    #[error("Persistent store unavailable")]
    StoreUnavailable,

    /// Stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store rejected a write (quota exceeded, read-only backend, ...)
    #[error("Write failed: {0}")]
    WriteFailure(String),

    /// Filesystem error from a file-backed store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Warmup fetch failed (network error, bad status, wrong content type)
    #[error("External fetch failed: {0}")]
    ExternalFetch(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        CacheError::ExternalFetch(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;

// == Error Sink ==
/// Receives failures that the public API swallows.
///
/// `operation` names the public call that degraded (`"get"`, `"set"`, ...).
pub trait ErrorSink: Send + Sync {
    fn report(&self, operation: &'static str, error: &CacheError);
}

/// Default sink: logs the failure as a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, operation: &'static str, error: &CacheError) {
        warn!(operation, error = %error, "Cache operation degraded");
    }
}

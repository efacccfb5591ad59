//! Cache Warmup Task
//!
//! Fetches a fixed allow-list of data routes after a delay and stores the
//! JSON responses, so the first real reads hit the cache.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheManager, RESERVED_ROUTE_PREFIX, WARMUP_TTL_MS};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::models::events::{to_payload, PreloadEvent, WarmupEvent};
use crate::telemetry::{EVENT_PRELOAD, EVENT_WARMUP};

// == Warmup Report ==
/// Outcome of one warmup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmupReport {
    /// Routes fetched and stored
    pub preloaded: usize,
    /// Routes already present in the cache
    pub already_cached: usize,
    /// Configured routes outside the reserved prefix
    pub skipped: usize,
    /// Routes whose fetch, validation or store failed
    pub failed: usize,
    /// Auxiliary resources requested
    pub assets_requested: usize,
}

// == Warmup Scheduler ==
#[derive(Debug)]
pub struct WarmupScheduler {
    cache: Arc<CacheManager>,
    client: reqwest::Client,
    origin: String,
    routes: Vec<String>,
    skipped: usize,
    assets: Vec<String>,
    delay: Duration,
    ttl: Duration,
}

impl WarmupScheduler {
    // == Constructor ==
    /// Builds the allow-list from critical routes followed by preload routes.
    ///
    /// Routes outside [`RESERVED_ROUTE_PREFIX`] are dropped and duplicates
    /// are kept once.
    pub fn new(cache: Arc<CacheManager>, config: &CacheConfig) -> Self {
        let mut routes: Vec<String> = Vec::new();
        let mut skipped = 0;
        for route in config.critical_routes.iter().chain(&config.preload_routes) {
            if !route.starts_with(RESERVED_ROUTE_PREFIX) {
                debug!(route = %route, "Skipping non-data route for warmup");
                skipped += 1;
            } else if !routes.contains(route) {
                routes.push(route.clone());
            }
        }

        Self {
            cache,
            client: reqwest::Client::new(),
            origin: config.origin.trim_end_matches('/').to_string(),
            routes,
            skipped,
            assets: config.warmup_assets.clone(),
            delay: config.warmup_delay(),
            ttl: Duration::from_millis(WARMUP_TTL_MS),
        }
    }

    /// Uses `client` for all warmup requests.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Routes this scheduler will warm, in order.
    pub fn routes(&self) -> &[String] {
        &self.routes
    }

    // == Spawn ==
    /// Runs [`run`](Self::run) on a background task after the configured delay.
    pub fn spawn(self) -> JoinHandle<WarmupReport> {
        tokio::spawn(async move {
            tokio::time::sleep(self.delay).await;
            self.run().await
        })
    }

    // == Run ==
    /// Warms every route once. Failures are counted and reported to
    /// telemetry, never returned.
    pub async fn run(&self) -> WarmupReport {
        let mut report = WarmupReport {
            skipped: self.skipped,
            ..WarmupReport::default()
        };
        if !self.cache.is_enabled() {
            return report;
        }

        let reporter = self.cache.reporter();
        for route in &self.routes {
            if self.cache.get(route).is_some() {
                report.already_cached += 1;
                continue;
            }

            let outcome = match self.fetch_json(route).await {
                Ok(data) if self.cache.set_with_ttl(route, &data, self.ttl) => Ok(()),
                Ok(_) => Err(CacheError::WriteFailure(format!("{} was not stored", route))),
                Err(e) => Err(e),
            };

            let event = match outcome {
                Ok(()) => {
                    report.preloaded += 1;
                    PreloadEvent::stored(route.as_str(), self.cache.last_stats().total_size_bytes)
                }
                Err(e) => {
                    debug!(route = %route, error = %e, "Failed to preload route");
                    report.failed += 1;
                    PreloadEvent::failed(route.as_str(), e.to_string())
                }
            };
            reporter.emit(EVENT_PRELOAD, to_payload(&event));
        }

        for asset in &self.assets {
            // Primes the HTTP-level cache only; the body is not kept
            if let Err(e) = self.client.get(self.url(asset)).send().await {
                debug!(asset = %asset, error = %e, "Asset preload failed");
            }
            report.assets_requested += 1;
        }

        let event = WarmupEvent {
            routes_preloaded: report.preloaded,
            assets_preloaded: report.assets_requested,
            cache_enabled: self.cache.is_enabled(),
            stats: self.cache.stats(),
        };
        reporter.emit(EVENT_WARMUP, to_payload(&event));
        info!(
            preloaded = report.preloaded,
            cached = report.already_cached,
            failed = report.failed,
            "Cache warmup complete"
        );

        report
    }

    /// Fetches `route` and parses it, accepting only successful JSON responses.
    async fn fetch_json(&self, route: &str) -> Result<Value> {
        let response = self.client.get(self.url(route)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::ExternalFetch(format!(
                "{} returned {}",
                route, status
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !content_type.starts_with("application/json") {
            return Err(CacheError::ExternalFetch(format!(
                "{} returned content type '{}'",
                route, content_type
            )));
        }

        Ok(response.json::<Value>().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }
}

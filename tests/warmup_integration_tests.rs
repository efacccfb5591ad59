//! Integration Tests for Cache Warmup
//!
//! Serves warmup routes from a local axum origin and checks what the
//! scheduler fetches, stores and reports.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{Html, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use warm_cache::{
    cache::CacheEntry, CacheConfig, CacheLifecycle, CacheManager, MemoryStore, PersistentStore,
    TelemetryReporter, WarmupReport, WarmupScheduler,
};

// == Helper Functions ==

type RequestLog = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingReporter {
    fn named(&self, name: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(event, _)| event == name)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl TelemetryReporter for RecordingReporter {
    fn emit(&self, event: &str, payload: Value) {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), payload));
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn record_path(State(log): State<RequestLog>, request: Request, next: Next) -> Response {
    log.lock().unwrap().push(request.uri().path().to_string());
    next.run(request).await
}

/// Starts an origin server and returns its base URL and request log.
async fn spawn_origin() -> anyhow::Result<(String, RequestLog)> {
    let log = RequestLog::default();
    let app = Router::new()
        .route(
            "/api/products",
            get(|| async { Json(json!([{"id": "p1", "price": 1299}])) }),
        )
        .route(
            "/api/testimonials",
            get(|| async { Json(json!([{"id": "t1", "name": "Ana"}])) }),
        )
        .route(
            "/api/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/api/html", get(|| async { Html("<p>not data</p>") }))
        .route("/about", get(|| async { Html("<h1>About</h1>") }))
        .route(
            "/hero.webp",
            get(|| async { ([(header::CONTENT_TYPE, "image/webp")], vec![0u8; 16]) }),
        )
        .layer(middleware::from_fn_with_state(log.clone(), record_path))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((format!("http://{}", addr), log))
}

fn setup(
    origin: &str,
    preload_routes: &[&str],
) -> (CacheConfig, Arc<MemoryStore>, Arc<CacheManager>, Arc<RecordingReporter>) {
    let config = CacheConfig {
        origin: origin.to_string(),
        preload_routes: preload_routes.iter().map(|r| r.to_string()).collect(),
        warmup_assets: vec!["/hero.webp".to_string()],
        warmup_delay_ms: 20,
        ..CacheConfig::default()
    };
    let store = Arc::new(MemoryStore::new());
    let reporter = Arc::new(RecordingReporter::default());
    let cache = Arc::new(CacheManager::new(&config, store.clone()).with_reporter(reporter.clone()));
    (config, store, cache, reporter)
}

fn requests_for(log: &RequestLog, path: &str) -> usize {
    log.lock().unwrap().iter().filter(|p| *p == path).count()
}

// == Warmup Tests ==

#[tokio::test]
async fn test_warmup_stores_only_valid_json_routes() -> anyhow::Result<()> {
    init_tracing();
    let (origin, log) = spawn_origin().await?;
    let (config, _store, cache, _reporter) =
        setup(&origin, &["/api/broken", "/api/html", "/about", "/api/products"]);

    let report = WarmupScheduler::new(cache.clone(), &config).run().await;

    assert_eq!(
        report,
        WarmupReport {
            preloaded: 2,
            already_cached: 0,
            skipped: 1,
            failed: 2,
            assets_requested: 1,
        }
    );
    assert_eq!(
        cache.get("/api/products"),
        Some(json!([{"id": "p1", "price": 1299}]))
    );
    assert!(cache.get("/api/testimonials").is_some());
    assert_eq!(cache.get("/api/broken"), None);
    assert_eq!(cache.get("/api/html"), None);

    // Non-reserved routes are never requested
    assert_eq!(requests_for(&log, "/about"), 0);
    assert_eq!(requests_for(&log, "/api/products"), 1);
    assert_eq!(requests_for(&log, "/hero.webp"), 1);
    Ok(())
}

#[tokio::test]
async fn test_warmup_skips_cached_routes() -> anyhow::Result<()> {
    let (origin, log) = spawn_origin().await?;
    let (config, _store, cache, _reporter) = setup(&origin, &[]);
    let warmup = WarmupScheduler::new(cache.clone(), &config);

    warmup.run().await;
    let second = warmup.run().await;

    assert_eq!(second.preloaded, 0);
    assert_eq!(second.already_cached, 2);
    assert_eq!(requests_for(&log, "/api/products"), 1);
    assert_eq!(requests_for(&log, "/api/testimonials"), 1);
    // Auxiliary assets bypass the cache and are requested every time
    assert_eq!(requests_for(&log, "/hero.webp"), 2);
    Ok(())
}

#[tokio::test]
async fn test_warmup_entries_use_ten_minute_ttl() -> anyhow::Result<()> {
    let (origin, _log) = spawn_origin().await?;
    let (config, store, cache, _reporter) = setup(&origin, &[]);

    WarmupScheduler::new(cache, &config).run().await;

    let raw = store
        .get("app_cache_/api/products")?
        .expect("products should be cached");
    let entry = CacheEntry::decode(&raw)?;
    assert_eq!(entry.expires_at - entry.created_at, 600_000);
    assert_eq!(entry.hit_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_warmup_reports_telemetry() -> anyhow::Result<()> {
    let (origin, _log) = spawn_origin().await?;
    let (config, _store, cache, reporter) = setup(&origin, &["/api/broken"]);

    WarmupScheduler::new(cache, &config).run().await;

    let preloads = reporter.named("cache_preload");
    assert_eq!(preloads.len(), 3);
    assert_eq!(preloads[0]["route"], "/api/products");
    assert_eq!(preloads[0]["success"], true);
    assert!(preloads[0]["cache_size"].as_u64().unwrap() > 0);
    assert_eq!(preloads[2]["route"], "/api/broken");
    assert_eq!(preloads[2]["success"], false);
    assert!(preloads[2]["error"].as_str().unwrap().contains("500"));

    let warmups = reporter.named("cache_warmup");
    assert_eq!(warmups.len(), 1);
    assert_eq!(warmups[0]["routes_preloaded"], 2);
    assert_eq!(warmups[0]["assets_preloaded"], 1);
    assert_eq!(warmups[0]["stats"]["entry_count"], 2);
    Ok(())
}

#[tokio::test]
async fn test_warmup_survives_write_failures() -> anyhow::Result<()> {
    let (origin, _log) = spawn_origin().await?;
    let config = CacheConfig {
        origin,
        ..CacheConfig::default()
    };
    // Too small for any entry
    let store = Arc::new(MemoryStore::with_quota(16));
    let cache = Arc::new(CacheManager::new(&config, store));

    let report = WarmupScheduler::new(cache, &config).run().await;

    assert_eq!(report.preloaded, 0);
    assert_eq!(report.failed, 2);
    Ok(())
}

// == Lifecycle Tests ==

#[tokio::test]
async fn test_lifecycle_runs_delayed_warmup() -> anyhow::Result<()> {
    init_tracing();
    let (origin, log) = spawn_origin().await?;
    let (config, _store, cache, _reporter) = setup(&origin, &["/api/html"]);

    let mut lifecycle = CacheLifecycle::start(cache.clone(), &config);
    // Nothing is fetched before the delay elapses
    assert_eq!(requests_for(&log, "/api/products"), 0);

    let report = lifecycle.wait_for_warmup().await.expect("warmup should finish");
    assert_eq!(report.preloaded, 2);
    assert_eq!(report.failed, 1);
    assert!(lifecycle.is_running());

    lifecycle.stop().await;
    assert_eq!(cache.stats().entry_count, 2);
    Ok(())
}

#[tokio::test]
async fn test_lifecycle_stop_cancels_pending_warmup() -> anyhow::Result<()> {
    let (origin, log) = spawn_origin().await?;
    let config = CacheConfig {
        origin,
        warmup_delay_ms: 60_000,
        ..CacheConfig::default()
    };
    let cache = Arc::new(CacheManager::new(&config, Arc::new(MemoryStore::new())));

    let lifecycle = CacheLifecycle::start(cache, &config);
    lifecycle.stop().await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(log.lock().unwrap().is_empty());
    Ok(())
}

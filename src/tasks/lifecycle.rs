//! Cache Lifecycle
//!
//! Owns the background work attached to a running cache: the stats timer,
//! the visibility listener and the delayed warmup. Dropping the lifecycle
//! aborts all of it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheManager;
use crate::config::CacheConfig;
use crate::tasks::stats_timer::spawn_stats_task;
use crate::tasks::warmup::{WarmupReport, WarmupScheduler};

/// Host visibility, as reported by the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

// == Cache Lifecycle ==
#[derive(Debug)]
pub struct CacheLifecycle {
    stats_task: Option<JoinHandle<()>>,
    visibility_task: Option<JoinHandle<()>>,
    warmup_task: Option<JoinHandle<WarmupReport>>,
    visibility_tx: Option<mpsc::UnboundedSender<Visibility>>,
}

impl CacheLifecycle {
    // == Start ==
    /// Starts the background tasks for `cache`. Must be called from within
    /// a tokio runtime.
    ///
    /// A disabled cache starts nothing.
    pub fn start(cache: Arc<CacheManager>, config: &CacheConfig) -> Self {
        let scheduler = WarmupScheduler::new(cache.clone(), config);
        Self::start_with_warmup(cache, config, scheduler)
    }

    /// Like [`start`](Self::start), with a custom warmup scheduler.
    pub fn start_with_warmup(
        cache: Arc<CacheManager>,
        config: &CacheConfig,
        warmup: WarmupScheduler,
    ) -> Self {
        if !cache.is_enabled() {
            info!("Cache disabled, lifecycle not started");
            return Self {
                stats_task: None,
                visibility_task: None,
                warmup_task: None,
                visibility_tx: None,
            };
        }

        // Initial stats so the first timer tick has a baseline
        cache.stats();

        let (visibility_tx, visibility_rx) = mpsc::unbounded_channel();
        let lifecycle = Self {
            stats_task: Some(spawn_stats_task(cache.clone(), config.stats_interval())),
            visibility_task: Some(spawn_visibility_listener(cache, visibility_rx)),
            warmup_task: Some(warmup.spawn()),
            visibility_tx: Some(visibility_tx),
        };
        info!("Cache lifecycle started");
        lifecycle
    }

    /// Forwards a visibility change. Regaining visibility sweeps expired
    /// entries.
    pub fn visibility_changed(&self, visibility: Visibility) {
        if let Some(tx) = &self.visibility_tx {
            // A closed channel means the lifecycle is stopping
            let _ = tx.send(visibility);
        }
    }

    /// True while the stats timer or visibility listener is alive.
    pub fn is_running(&self) -> bool {
        [&self.stats_task, &self.visibility_task]
            .into_iter()
            .flatten()
            .any(|task| !task.is_finished())
    }

    /// Waits for warmup to finish and returns its report.
    ///
    /// Returns `None` if warmup was never started, already awaited, or
    /// aborted.
    pub async fn wait_for_warmup(&mut self) -> Option<WarmupReport> {
        self.warmup_task.take()?.await.ok()
    }

    // == Stop ==
    /// Aborts every background task and waits for them to wind down.
    pub async fn stop(mut self) {
        self.visibility_tx = None;
        if let Some(task) = self.stats_task.take() {
            task.abort();
            let _ = task.await;
        }
        if let Some(task) = self.visibility_task.take() {
            task.abort();
            let _ = task.await;
        }
        if let Some(task) = self.warmup_task.take() {
            task.abort();
            let _ = task.await;
        }
        info!("Cache lifecycle stopped");
    }
}

impl Drop for CacheLifecycle {
    fn drop(&mut self) {
        if let Some(task) = self.stats_task.take() {
            task.abort();
        }
        if let Some(task) = self.visibility_task.take() {
            task.abort();
        }
        if let Some(task) = self.warmup_task.take() {
            task.abort();
        }
    }
}

fn spawn_visibility_listener(
    cache: Arc<CacheManager>,
    mut visibility_rx: mpsc::UnboundedReceiver<Visibility>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(visibility) = visibility_rx.recv().await {
            if visibility == Visibility::Visible {
                let removed = cache.sweep_expired();
                debug!(removed, "Visibility regained, swept expired entries");
            }
        }
    })
}

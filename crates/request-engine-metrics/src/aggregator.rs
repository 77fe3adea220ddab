//! Periodic snapshot aggregation and publication (§4.7).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use request_engine_cache::CacheStore;
use request_engine_config::{CacheConfig, NetworkConfig};
use request_engine_core::{EngineError, ErrorCode, Spawner, TokioSpawner};
use request_engine_interceptor::InterceptorChain;
use request_engine_queue::RequestQueue;

use crate::snapshot::{ConfigSnapshot, InterceptorSnapshot, Snapshot};

/// Callback invoked with every published snapshot.
pub type Subscriber = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// How often [`Metrics`] recomputes and publishes a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct MetricsConfig {
    pub interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

struct Inner {
    queue: RequestQueue,
    cache: CacheStore,
    interceptors: Arc<InterceptorChain>,
    config: RwLock<ConfigSnapshot>,
    subscribers: RwLock<Vec<Subscriber>>,
    last: RwLock<Option<Snapshot>>,
    disposed: AtomicBool,
}

/// Aggregates snapshots from the queue, cache, interceptor chain, and
/// config on a configurable interval and publishes them to subscribers.
///
/// Snapshots are advisory, not transactional (see [`Snapshot`]'s doc).
/// Cheaply cloneable: internally an `Arc`.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<Inner>,
}

fn config_snapshot(network: &NetworkConfig, cache: &CacheConfig) -> ConfigSnapshot {
    ConfigSnapshot {
        base_url: network.base_url.clone(),
        environment: network.environment,
        enable_logging: network.enable_logging,
        enable_cache: network.enable_cache,
        max_retries: network.max_retries,
        enable_memory_cache: cache.enable_memory,
        enable_disk_cache: cache.enable_disk,
    }
}

impl Metrics {
    pub fn new(queue: RequestQueue, cache: CacheStore, interceptors: Arc<InterceptorChain>, network: &NetworkConfig, cache_config: &CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue,
                cache,
                interceptors,
                config: RwLock::new(config_snapshot(network, cache_config)),
                subscribers: RwLock::new(Vec::new()),
                last: RwLock::new(None),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Registers a subscriber that is called with every snapshot published
    /// by the background tick or an explicit [`Metrics::snapshot`] call.
    pub fn subscribe(&self, callback: Subscriber) -> Result<(), EngineError> {
        self.check_disposed()?;
        self.inner.subscribers.write().push(callback);
        Ok(())
    }

    /// Records a config change so the next snapshot reflects it (§4.7
    /// "Config (current values)"); called by the facade when the engine's
    /// runtime config is replaced.
    pub fn update_config(&self, network: &NetworkConfig, cache_config: &CacheConfig) {
        *self.inner.config.write() = config_snapshot(network, cache_config);
    }

    /// Computes a fresh snapshot, publishes it to every subscriber, and
    /// returns it.
    pub fn snapshot(&self) -> Result<Snapshot, EngineError> {
        self.check_disposed()?;

        let queue = self.inner.queue.statistics();
        let cache = self.inner.cache.statistics();
        let interceptors = self
            .inner
            .interceptors
            .metrics()
            .all()
            .into_iter()
            .map(|(name, hook, metrics)| InterceptorSnapshot { name, hook, metrics })
            .collect();
        let config = self.inner.config.read().clone();

        let snapshot = Snapshot {
            taken_at: SystemTime::now(),
            queue,
            cache,
            interceptors,
            config,
        };

        #[cfg(feature = "metrics")]
        {
            metrics::gauge!("request_engine_snapshot_queue_success_rate").set(snapshot.queue.success_rate());
            metrics::gauge!("request_engine_snapshot_cache_hit_rate").set(snapshot.cache.hit_rate());
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            queue_success_rate = snapshot.queue.success_rate(),
            cache_hit_rate = snapshot.cache.hit_rate(),
            "published metrics snapshot"
        );

        for subscriber in self.inner.subscribers.read().iter() {
            subscriber(&snapshot);
        }
        *self.inner.last.write() = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// The most recently published snapshot, if any has been taken yet.
    pub fn last_snapshot(&self) -> Option<Snapshot> {
        self.inner.last.read().clone()
    }

    /// Resets every underlying component's counters. Config and subscribers
    /// are left untouched.
    pub fn reset(&self) {
        self.inner.cache.reset_statistics();
        *self.inner.last.write() = None;
    }

    /// Spawns a background task that calls [`Metrics::snapshot`] on
    /// `config.interval` until [`Metrics::dispose`] is called.
    pub fn start(&self, config: MetricsConfig) {
        let metrics = self.clone();
        let spawner = TokioSpawner;
        spawner.spawn(Box::pin(async move {
            let mut ticker = tokio::time::interval(config.interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                if metrics.snapshot().is_err() {
                    break;
                }
            }
        }));
    }

    /// Stops accepting further use. Idempotent; the background tick loop
    /// observes this and exits at its next interval.
    pub fn dispose(&self) -> Result<(), EngineError> {
        self.inner.disposed.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    fn check_disposed(&self) -> Result<(), EngineError> {
        if self.is_disposed() {
            return Err(EngineError::new(ErrorCode::OperationFailed, "metrics aggregator has been disposed"));
        }
        Ok(())
    }
}

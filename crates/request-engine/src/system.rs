//! `System`: binds `Config`/`CacheStore`/`RequestQueue`/`InterceptorChain`/
//! `Transport`/`Executor`/`Metrics` into the one handle an application holds
//! (§6, §9).

use std::sync::Arc;

use parking_lot::RwLock;
use request_engine_cache::CacheStore;
use request_engine_config::{CacheConfig, NetworkConfig};
use request_engine_core::{EngineError, Logger, NoopLogger};
use request_engine_executor::{Executor, ExecutorConfig};
use request_engine_interceptor::InterceptorChain;
use request_engine_metrics::{Metrics, MetricsConfig};
use request_engine_queue::{QueueConfig, RequestQueue};
use request_engine_transport::Transport;

use crate::config::Config;

struct Inner {
    network: RwLock<NetworkConfig>,
    cache_config: RwLock<CacheConfig>,
    cache: CacheStore,
    queue: RequestQueue,
    interceptors: Arc<InterceptorChain>,
    transport: Arc<dyn Transport>,
    executor: RwLock<Executor>,
    metrics: Metrics,
}

/// The whole engine, bound together. Cheaply cloneable: internally an
/// `Arc`, so every clone shares the same cache, queue, and metrics.
#[derive(Clone)]
pub struct System {
    inner: Arc<Inner>,
}

impl System {
    /// Opens the cache, starts the queue and metrics aggregator, and binds
    /// an executor over `transport`. `cache_config.enable_disk` determines
    /// whether the disk tier opens under the platform cache directory.
    pub async fn new(network: NetworkConfig, cache_config: CacheConfig, transport: Arc<dyn Transport>) -> Result<Self, EngineError> {
        Self::with_logger(network, cache_config, transport, Arc::new(NoopLogger)).await
    }

    pub async fn with_logger(
        network: NetworkConfig,
        cache_config: CacheConfig,
        transport: Arc<dyn Transport>,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, EngineError> {
        let cache = CacheStore::open_with_logger(cache_config.clone(), None, Arc::clone(&logger)).await?;
        let queue = RequestQueue::new(QueueConfig::default());
        let interceptors = Arc::new(InterceptorChain::new());

        let executor_config = ExecutorConfig::from_network_config(&network);
        let executor = Executor::with_observability(
            executor_config,
            cache.clone(),
            queue.clone(),
            Arc::clone(&interceptors),
            Arc::clone(&transport),
            Arc::clone(&logger),
            Default::default(),
        );

        let metrics = Metrics::new(queue.clone(), cache.clone(), Arc::clone(&interceptors), &network, &cache_config);
        metrics.start(MetricsConfig::default());

        Ok(Self {
            inner: Arc::new(Inner {
                network: RwLock::new(network),
                cache_config: RwLock::new(cache_config),
                cache,
                queue,
                interceptors,
                transport,
                executor: RwLock::new(executor),
                metrics,
            }),
        })
    }

    /// The executor bound to this system's current config. Cheaply
    /// cloneable; a reference taken before a [`Config::apply_preset`] or
    /// [`Config::set_runtime`] call keeps running against the config it was
    /// handed out under.
    pub fn executor(&self) -> Executor {
        self.inner.executor.read().clone()
    }

    pub fn cache(&self) -> CacheStore {
        self.inner.cache.clone()
    }

    pub fn queue(&self) -> RequestQueue {
        self.inner.queue.clone()
    }

    pub fn interceptors(&self) -> Arc<InterceptorChain> {
        Arc::clone(&self.inner.interceptors)
    }

    pub fn metrics(&self) -> Metrics {
        self.inner.metrics.clone()
    }

    /// The `Config` facade bound to this system (§6).
    pub fn config(&self) -> Config<'_> {
        Config { system: self }
    }

    pub(crate) fn network_config(&self) -> NetworkConfig {
        self.inner.network.read().clone()
    }

    pub(crate) fn cache_config(&self) -> CacheConfig {
        self.inner.cache_config.read().clone()
    }

    /// Rebuilds the executor around `network`/`cache_config` and swaps it
    /// in; the cache, queue, and interceptor chain (and their accumulated
    /// state) carry over unchanged, since only the executor's view of
    /// timeouts/retries/headers is config-dependent.
    pub(crate) fn reconfigure(&self, network: NetworkConfig, cache_config: CacheConfig) {
        let executor_config = ExecutorConfig::from_network_config(&network);
        let executor = Executor::new(
            executor_config,
            self.inner.cache.clone(),
            self.inner.queue.clone(),
            Arc::clone(&self.inner.interceptors),
            Arc::clone(&self.inner.transport),
        );

        self.inner.metrics.update_config(&network, &cache_config);
        *self.inner.network.write() = network;
        *self.inner.cache_config.write() = cache_config;
        *self.inner.executor.write() = executor;
    }

    /// Disposes every component in dependency order: the executor (stop
    /// accepting new work), the queue, the cache, then the metrics
    /// aggregator.
    pub async fn dispose(&self) {
        self.executor().dispose().await;
        self.inner.queue.dispose().await;
        self.inner.cache.dispose().await;
        let _ = self.inner.metrics.dispose();
    }
}

//! The aggregate snapshot published to subscribers (§4.7).

use std::time::SystemTime;

use request_engine_config::Environment;
use request_engine_interceptor::{HookKind, HookMetricsSnapshot};
use request_engine_cache::CacheStatisticsSnapshot;
use request_engine_queue::QueueStatisticsSnapshot;

use crate::band::EfficiencyBand;

/// The "current values" slice of §4.7's Config aggregate. Deliberately a
/// plain copy rather than a reference into `NetworkConfig`/`CacheConfig` so
/// a snapshot outlives the config it was taken from.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub base_url: String,
    pub environment: Environment,
    pub enable_logging: bool,
    pub enable_cache: bool,
    pub max_retries: u32,
    pub enable_memory_cache: bool,
    pub enable_disk_cache: bool,
}

/// One interceptor's counters for one hook, flattened for easy iteration by
/// subscribers that don't care about the `(name, hook)` map structure.
#[derive(Debug, Clone)]
pub struct InterceptorSnapshot {
    pub name: String,
    pub hook: HookKind,
    pub metrics: HookMetricsSnapshot,
}

/// A point-in-time aggregate of every component's statistics, as published
/// on the configured interval or returned by [`crate::Metrics::snapshot`].
///
/// Advisory, not transactional: the four sub-snapshots are not taken under
/// a shared lock, so a snapshot may show e.g. a queue `executed` count that
/// edged ahead of the cache `total_sets` it would eventually produce.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub taken_at: SystemTime,
    pub queue: QueueStatisticsSnapshot,
    pub cache: CacheStatisticsSnapshot,
    pub interceptors: Vec<InterceptorSnapshot>,
    pub config: ConfigSnapshot,
}

impl Snapshot {
    pub fn cache_efficiency(&self) -> EfficiencyBand {
        EfficiencyBand::from_hit_rate(self.cache.hit_rate())
    }
}

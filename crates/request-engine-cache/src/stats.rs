//! Cache hit/miss counters (§4.3 "Statistics").

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub(crate) struct CacheStatistics {
    total_requests: AtomicU64,
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    misses: AtomicU64,
    total_sets: AtomicU64,
}

/// A point-in-time copy of [`CacheStatistics`], safe to hand to callers
/// (e.g. the `Metrics` crate's aggregation pass) without holding a lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatisticsSnapshot {
    pub total_requests: u64,
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub misses: u64,
    pub total_sets: u64,
}

impl CacheStatisticsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        (self.memory_hits + self.disk_hits) as f64 / self.total_requests as f64
    }

    pub fn memory_hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.memory_hits as f64 / self.total_requests as f64
    }

    pub fn disk_hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.disk_hits as f64 / self.total_requests as f64
    }
}

impl CacheStatistics {
    pub(crate) fn record_memory_hit(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_disk_hit(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.disk_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_set(&self) {
        self.total_sets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.memory_hits.store(0, Ordering::Relaxed);
        self.disk_hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.total_sets.store(0, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStatisticsSnapshot {
        CacheStatisticsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            total_sets: self.total_sets.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_combines_both_tiers() {
        let stats = CacheStatistics::default();
        stats.record_memory_hit();
        stats.record_disk_hit();
        stats.record_miss();
        let snap = stats.snapshot();
        assert_eq!(snap.total_requests, 3);
        assert!((snap.hit_rate() - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn reset_clears_all_counters() {
        let stats = CacheStatistics::default();
        stats.record_memory_hit();
        stats.record_set();
        stats.reset();
        let snap = stats.snapshot();
        assert_eq!(snap, CacheStatisticsSnapshot::default());
    }
}

//! Queue-level counters (§4.7's "Queue" snapshot fields).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Default)]
pub(crate) struct QueueStatistics {
    enqueued: AtomicU64,
    executed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    retried: AtomicU64,
    duplicated: AtomicU64,
    expired: AtomicU64,
    cancelled: AtomicU64,
    total_execution_ns: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatisticsSnapshot {
    pub enqueued: u64,
    pub executed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub retried: u64,
    pub duplicated: u64,
    pub expired: u64,
    pub cancelled: u64,
    pub total_execution_ns: u64,
}

impl QueueStatisticsSnapshot {
    pub fn success_rate(&self) -> f64 {
        if self.executed == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.executed as f64
    }

    pub fn average_execution_time(&self) -> Duration {
        if self.executed == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.total_execution_ns / self.executed)
    }
}

impl QueueStatistics {
    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_duplicate(&self) {
        self.duplicated.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_executed(&self, elapsed: Duration) {
        self.executed.fetch_add(1, Ordering::Relaxed);
        self.total_execution_ns.fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }
    pub(crate) fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_timeout(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_retry(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> QueueStatisticsSnapshot {
        QueueStatisticsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            duplicated: self.duplicated.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            total_execution_ns: self.total_execution_ns.load(Ordering::Relaxed),
        }
    }
}

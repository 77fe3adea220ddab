//! Per-(interceptor × hook) execution counters (§4.4).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Request,
    Response,
    Error,
}

#[derive(Default)]
struct Counters {
    total_executions: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    total_duration_ns: AtomicU64,
}

/// A point-in-time copy of one interceptor/hook pair's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookMetricsSnapshot {
    pub total_executions: u64,
    pub successful: u64,
    pub failed: u64,
    pub total_duration_ns: u64,
}

#[derive(Default)]
pub struct InterceptorMetrics {
    counters: RwLock<HashMap<(String, HookKind), Counters>>,
}

#[cfg(feature = "metrics")]
fn hook_label(hook: HookKind) -> &'static str {
    match hook {
        HookKind::Request => "request",
        HookKind::Response => "response",
        HookKind::Error => "error",
    }
}

impl InterceptorMetrics {
    pub(crate) fn record(&self, name: &str, hook: HookKind, success: bool, elapsed: Duration) {
        #[cfg(feature = "metrics")]
        {
            let outcome = if success { "success" } else { "failure" };
            metrics::counter!(
                "request_engine_interceptor_executions_total",
                "name" => name.to_string(),
                "hook" => hook_label(hook),
                "outcome" => outcome,
            )
            .increment(1);
            metrics::histogram!(
                "request_engine_interceptor_duration_seconds",
                "name" => name.to_string(),
                "hook" => hook_label(hook),
            )
            .record(elapsed.as_secs_f64());
        }
        {
            let counters = self.counters.read();
            if let Some(entry) = counters.get(&(name.to_string(), hook)) {
                entry.total_executions.fetch_add(1, Ordering::Relaxed);
                if success {
                    entry.successful.fetch_add(1, Ordering::Relaxed);
                } else {
                    entry.failed.fetch_add(1, Ordering::Relaxed);
                }
                entry
                    .total_duration_ns
                    .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
                return;
            }
        }
        let mut counters = self.counters.write();
        let entry = counters.entry((name.to_string(), hook)).or_default();
        entry.total_executions.fetch_add(1, Ordering::Relaxed);
        if success {
            entry.successful.fetch_add(1, Ordering::Relaxed);
        } else {
            entry.failed.fetch_add(1, Ordering::Relaxed);
        }
        entry
            .total_duration_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self, name: &str, hook: HookKind) -> HookMetricsSnapshot {
        let counters = self.counters.read();
        match counters.get(&(name.to_string(), hook)) {
            Some(c) => HookMetricsSnapshot {
                total_executions: c.total_executions.load(Ordering::Relaxed),
                successful: c.successful.load(Ordering::Relaxed),
                failed: c.failed.load(Ordering::Relaxed),
                total_duration_ns: c.total_duration_ns.load(Ordering::Relaxed),
            },
            None => HookMetricsSnapshot::default(),
        }
    }

    pub fn all(&self) -> Vec<(String, HookKind, HookMetricsSnapshot)> {
        self.counters
            .read()
            .iter()
            .map(|((name, hook), c)| {
                (
                    name.clone(),
                    *hook,
                    HookMetricsSnapshot {
                        total_executions: c.total_executions.load(Ordering::Relaxed),
                        successful: c.successful.load(Ordering::Relaxed),
                        failed: c.failed.load(Ordering::Relaxed),
                        total_duration_ns: c.total_duration_ns.load(Ordering::Relaxed),
                    },
                )
            })
            .collect()
    }
}

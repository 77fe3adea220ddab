//! Queue sizing and scheduling configuration (§4.5).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of requests in the "executing" set at once (§3
    /// invariant 4).
    pub max_concurrent: usize,
    /// Total pending + executing requests allowed before `enqueue` rejects
    /// with an operational error (§8 boundary behavior).
    pub max_queue_size: usize,
    /// A pending request older than this is dropped with a cancellation
    /// error before execution (§4.5 "Expiry-while-queued"). `None` disables
    /// the check.
    pub max_queue_time: Option<Duration>,
    /// Interval of the periodic processing tick; `enqueue` also triggers an
    /// immediate tick (§4.5).
    pub processing_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 6,
            max_queue_size: 1000,
            max_queue_time: Some(Duration::from_secs(60)),
            processing_interval: Duration::from_millis(50),
        }
    }
}

impl QueueConfig {
    pub fn builder() -> QueueConfigBuilder {
        QueueConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct QueueConfigBuilder {
    config: OptionalConfig,
}

#[derive(Default)]
struct OptionalConfig {
    max_concurrent: Option<usize>,
    max_queue_size: Option<usize>,
    max_queue_time: Option<Option<Duration>>,
    processing_interval: Option<Duration>,
}

impl QueueConfigBuilder {
    pub fn max_concurrent(mut self, value: usize) -> Self {
        self.config.max_concurrent = Some(value);
        self
    }

    pub fn max_queue_size(mut self, value: usize) -> Self {
        self.config.max_queue_size = Some(value);
        self
    }

    pub fn max_queue_time(mut self, value: Option<Duration>) -> Self {
        self.config.max_queue_time = Some(value);
        self
    }

    pub fn processing_interval(mut self, value: Duration) -> Self {
        self.config.processing_interval = Some(value);
        self
    }

    pub fn build(self) -> QueueConfig {
        let defaults = QueueConfig::default();
        QueueConfig {
            max_concurrent: self.config.max_concurrent.unwrap_or(defaults.max_concurrent),
            max_queue_size: self.config.max_queue_size.unwrap_or(defaults.max_queue_size),
            max_queue_time: self.config.max_queue_time.unwrap_or(defaults.max_queue_time),
            processing_interval: self.config.processing_interval.unwrap_or(defaults.processing_interval),
        }
    }
}

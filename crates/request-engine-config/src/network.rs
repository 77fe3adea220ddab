//! Network-level configuration: endpoint, timeouts, retry policy, and the
//! handful of engine-wide toggles (`enableLogging`, `enableCache`).

use std::time::Duration;

use crate::environment::Environment;

/// Configuration governing how requests are sent and retried.
///
/// Constructed via [`NetworkConfigBuilder`]; see [`crate::presets`] for
/// ready-made configurations tuned for common deployment scenarios.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub receive_timeout: Duration,
    pub send_timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub enable_exponential_backoff: bool,
    pub enable_logging: bool,
    pub enable_cache: bool,
    pub default_cache_duration: Duration,
    pub environment: Environment,
}

impl NetworkConfig {
    pub fn builder(base_url: impl Into<String>) -> NetworkConfigBuilder {
        NetworkConfigBuilder::new(base_url)
    }
}

/// Builder for [`NetworkConfig`]. Mirrors the defaults of the `production`
/// preset in [`crate::presets`].
pub struct NetworkConfigBuilder {
    base_url: String,
    connect_timeout: Duration,
    receive_timeout: Duration,
    send_timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    enable_exponential_backoff: bool,
    enable_logging: bool,
    enable_cache: bool,
    default_cache_duration: Duration,
    environment: Environment,
}

impl NetworkConfigBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(10),
            receive_timeout: Duration::from_secs(30),
            send_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            enable_exponential_backoff: true,
            enable_logging: false,
            enable_cache: true,
            default_cache_duration: Duration::from_secs(300),
            environment: Environment::Production,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn enable_exponential_backoff(mut self, enabled: bool) -> Self {
        self.enable_exponential_backoff = enabled;
        self
    }

    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    pub fn enable_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    pub fn default_cache_duration(mut self, duration: Duration) -> Self {
        self.default_cache_duration = duration;
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn build(self) -> NetworkConfig {
        NetworkConfig {
            base_url: self.base_url,
            connect_timeout: self.connect_timeout,
            receive_timeout: self.receive_timeout,
            send_timeout: self.send_timeout,
            max_retries: self.max_retries,
            retry_base_delay: self.retry_base_delay,
            enable_exponential_backoff: self.enable_exponential_backoff,
            enable_logging: self.enable_logging,
            enable_cache: self.enable_cache,
            default_cache_duration: self.default_cache_duration,
            environment: self.environment,
        }
    }
}

//! Static factory presets tuned for common deployment scenarios.
//!
//! Each preset returns a matched `(NetworkConfig, CacheConfig)` pair. These
//! are plain values, not a loader: reading a preset name from environment
//! variables or a config file is left to the host application.

use std::time::Duration;

use crate::cache::CacheConfig;
use crate::environment::Environment;
use crate::network::NetworkConfig;

fn pair(network: NetworkConfig, cache: CacheConfig) -> (NetworkConfig, CacheConfig) {
    (network, cache)
}

/// Short timeouts, verbose logging, no exponential backoff, small cache —
/// optimized for fast feedback during local development.
pub fn development(base_url: impl Into<String>) -> (NetworkConfig, CacheConfig) {
    pair(
        NetworkConfig::builder(base_url)
            .connect_timeout(Duration::from_secs(5))
            .receive_timeout(Duration::from_secs(10))
            .send_timeout(Duration::from_secs(10))
            .max_retries(1)
            .enable_exponential_backoff(false)
            .enable_logging(true)
            .environment(Environment::Development)
            .build(),
        CacheConfig::builder()
            .max_memory_bytes(5 * 1024 * 1024)
            .max_disk_bytes(20 * 1024 * 1024)
            .default_ttl(Duration::from_secs(30))
            .build(),
    )
}

/// Deterministic: retries disabled, caching disabled, so repeated test runs
/// observe exactly one transport call per request.
pub fn testing(base_url: impl Into<String>) -> (NetworkConfig, CacheConfig) {
    pair(
        NetworkConfig::builder(base_url)
            .connect_timeout(Duration::from_secs(2))
            .receive_timeout(Duration::from_secs(2))
            .send_timeout(Duration::from_secs(2))
            .max_retries(0)
            .enable_exponential_backoff(false)
            .enable_cache(false)
            .environment(Environment::Testing)
            .build(),
        CacheConfig::builder()
            .enable_memory(false)
            .enable_disk(false)
            .build(),
    )
}

/// Production-like timeouts and retry policy, but with logging enabled for
/// pre-release verification.
pub fn staging(base_url: impl Into<String>) -> (NetworkConfig, CacheConfig) {
    pair(
        NetworkConfig::builder(base_url)
            .enable_logging(true)
            .environment(Environment::Staging)
            .build(),
        CacheConfig::builder().build(),
    )
}

/// Conservative timeouts, exponential backoff, logging disabled.
pub fn production(base_url: impl Into<String>) -> (NetworkConfig, CacheConfig) {
    pair(
        NetworkConfig::builder(base_url)
            .environment(Environment::Production)
            .build(),
        CacheConfig::builder().build(),
    )
}

/// Minimized timeouts and an aggressive cache, for latency-sensitive
/// call sites willing to trade staleness for speed.
pub fn fast_response(base_url: impl Into<String>) -> (NetworkConfig, CacheConfig) {
    pair(
        NetworkConfig::builder(base_url)
            .connect_timeout(Duration::from_secs(3))
            .receive_timeout(Duration::from_secs(5))
            .send_timeout(Duration::from_secs(5))
            .max_retries(1)
            .default_cache_duration(Duration::from_secs(600))
            .environment(Environment::Production)
            .build(),
        CacheConfig::builder()
            .default_ttl(Duration::from_secs(600))
            .build(),
    )
}

/// Large cache tiers and a generous retry budget for bulk/batch workloads.
pub fn heavy_load(base_url: impl Into<String>) -> (NetworkConfig, CacheConfig) {
    pair(
        NetworkConfig::builder(base_url)
            .max_retries(5)
            .retry_base_delay(Duration::from_millis(1000))
            .environment(Environment::Production)
            .build(),
        CacheConfig::builder()
            .max_memory_bytes(100 * 1024 * 1024)
            .max_disk_bytes(1024 * 1024 * 1024)
            .build(),
    )
}

/// Maximizes cache lifetime and retry attempts for environments expected to
/// lose connectivity; every tier and compression option is enabled.
pub fn offline_first(base_url: impl Into<String>) -> (NetworkConfig, CacheConfig) {
    pair(
        NetworkConfig::builder(base_url)
            .max_retries(10)
            .retry_base_delay(Duration::from_millis(2000))
            .default_cache_duration(Duration::from_secs(3600))
            .environment(Environment::Production)
            .build(),
        CacheConfig::builder()
            .max_disk_bytes(500 * 1024 * 1024)
            .default_ttl(Duration::from_secs(3600 * 24))
            .enable_compression(true)
            .build(),
    )
}

/// Aggressive compression and a small memory tier, for constrained network
/// and storage environments.
pub fn low_bandwidth(base_url: impl Into<String>) -> (NetworkConfig, CacheConfig) {
    pair(
        NetworkConfig::builder(base_url)
            .connect_timeout(Duration::from_secs(20))
            .receive_timeout(Duration::from_secs(60))
            .send_timeout(Duration::from_secs(60))
            .environment(Environment::Production)
            .build(),
        CacheConfig::builder()
            .max_memory_bytes(2 * 1024 * 1024)
            .enable_compression(true)
            .compression_threshold_bytes(256)
            .build(),
    )
}

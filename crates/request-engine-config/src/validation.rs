//! Total validation over [`NetworkConfig`] and [`CacheConfig`].
//!
//! Validation never panics and never fails to produce a result: every rule
//! either pushes an error (config is unusable) or a warning (config is
//! usable but likely a mistake). The caller decides whether to reject a
//! config with warnings or proceed.

use std::time::Duration;

use crate::cache::CacheConfig;
use crate::network::NetworkConfig;

const RECOMMENDED_TIMEOUT_RANGE: (Duration, Duration) =
    (Duration::from_secs(1), Duration::from_secs(60));
const RECOMMENDED_CACHE_DURATION_RANGE: (Duration, Duration) =
    (Duration::from_secs(1), Duration::from_secs(300));

/// Outcome of validating a configuration. `is_valid` is `false` exactly when
/// `errors` is non-empty; `warnings` never affect `is_valid`.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn merge(mut self, other: ValidationResult) -> Self {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.is_valid = self.errors.is_empty();
        self
    }

    fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Validates `baseUrl`, timeout ranges, retry settings, and the
/// cache-related toggles on [`NetworkConfig`].
pub fn validate_network(config: &NetworkConfig) -> ValidationResult {
    let mut result = ValidationResult::ok();

    match url::Url::parse(&config.base_url) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result
                    .errors
                    .push(format!("base_url scheme must be http or https, got {}", url.scheme()));
            }
            if url.cannot_be_a_base() {
                result
                    .errors
                    .push("base_url must have an absolute path".to_string());
            }
        }
        Err(e) => result.errors.push(format!("base_url failed to parse: {e}")),
    }

    for (name, timeout) in [
        ("connect_timeout", config.connect_timeout),
        ("receive_timeout", config.receive_timeout),
        ("send_timeout", config.send_timeout),
    ] {
        if timeout.is_zero() {
            result.errors.push(format!("{name} must be positive"));
        } else if timeout < RECOMMENDED_TIMEOUT_RANGE.0 || timeout > RECOMMENDED_TIMEOUT_RANGE.1 {
            result.warnings.push(format!(
                "{name} of {timeout:?} is outside the recommended 1s-60s range"
            ));
        }
    }

    if config.enable_cache {
        let cache_duration = config.default_cache_duration;
        if cache_duration < RECOMMENDED_CACHE_DURATION_RANGE.0
            || cache_duration > RECOMMENDED_CACHE_DURATION_RANGE.1
        {
            result.warnings.push(format!(
                "default_cache_duration of {cache_duration:?} is outside the recommended 1s-300s range"
            ));
        }
    }

    result.is_valid = result.errors.is_empty();
    result
}

/// Validates tier sizing and TTL/cleanup-interval relationships on
/// [`CacheConfig`].
pub fn validate_cache(config: &CacheConfig) -> ValidationResult {
    let mut result = ValidationResult::ok();

    if !config.enable_memory && !config.enable_disk {
        result
            .errors
            .push("cache is enabled but both memory and disk tiers are disabled".to_string());
    }

    if config.enable_memory && config.enable_disk && config.max_memory_bytes > config.max_disk_bytes
    {
        result.errors.push(format!(
            "max_memory_bytes ({}) must not exceed max_disk_bytes ({})",
            config.max_memory_bytes, config.max_disk_bytes
        ));
    }

    if config.cleanup_interval > config.default_ttl {
        result.errors.push(format!(
            "cleanup_interval ({:?}) must not exceed default_ttl ({:?})",
            config.cleanup_interval, config.default_ttl
        ));
    }

    if config.enable_obfuscation && config.obfuscation_key.is_none() {
        result
            .errors
            .push("enable_obfuscation is set but no obfuscation_key was provided".to_string());
    }

    result.is_valid = result.errors.is_empty();
    result
}

/// Validates a `NetworkConfig`/`CacheConfig` pair together. Equivalent to
/// merging [`validate_network`] and [`validate_cache`], plus the one rule
/// that spans both: a config that enables caching at the network level but
/// disables every cache tier is rejected even though each config is valid
/// in isolation.
pub fn validate_all(network: &NetworkConfig, cache: &CacheConfig) -> ValidationResult {
    let mut result = validate_network(network).merge(validate_cache(cache));

    if network.enable_cache && !cache.enable_memory && !cache.enable_disk {
        result.errors.push(
            "network config enables caching but cache config disables both tiers".to_string(),
        );
    }

    result.is_valid = result.errors.is_empty();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use std::time::Duration;

    #[test]
    fn valid_network_config_has_no_errors() {
        let config = NetworkConfig::builder("https://api.example.com").build();
        let result = validate_network(&config);
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let config = NetworkConfig::builder("ftp://api.example.com").build();
        let result = validate_network(&config);
        assert!(!result.is_valid);
    }

    #[test]
    fn malformed_base_url_is_rejected() {
        let config = NetworkConfig::builder("not a url").build();
        let result = validate_network(&config);
        assert!(!result.is_valid);
    }

    #[test]
    fn zero_timeout_is_an_error_not_a_warning() {
        let config = NetworkConfig::builder("https://api.example.com")
            .connect_timeout(Duration::ZERO)
            .build();
        let result = validate_network(&config);
        assert!(!result.is_valid);
    }

    #[test]
    fn extreme_timeout_is_a_warning_not_an_error() {
        let config = NetworkConfig::builder("https://api.example.com")
            .connect_timeout(Duration::from_secs(600))
            .build();
        let result = validate_network(&config);
        assert!(result.is_valid);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn memory_larger_than_disk_is_rejected() {
        let cache = CacheConfig::builder()
            .max_memory_bytes(100)
            .max_disk_bytes(50)
            .build();
        let result = validate_cache(&cache);
        assert!(!result.is_valid);
    }

    #[test]
    fn cleanup_interval_longer_than_ttl_is_rejected() {
        let cache = CacheConfig::builder()
            .default_ttl(Duration::from_secs(10))
            .cleanup_interval(Duration::from_secs(60))
            .build();
        let result = validate_cache(&cache);
        assert!(!result.is_valid);
    }

    #[test]
    fn both_tiers_disabled_is_rejected() {
        let cache = CacheConfig::builder()
            .enable_memory(false)
            .enable_disk(false)
            .build();
        let result = validate_cache(&cache);
        assert!(!result.is_valid);
    }

    #[test]
    fn obfuscation_without_key_is_rejected() {
        let cache = CacheConfig::builder().enable_obfuscation(true).build();
        let result = validate_cache(&cache);
        assert!(!result.is_valid);
    }

    #[test]
    fn cache_enabled_at_network_level_but_disabled_at_tier_level_is_rejected() {
        let network = NetworkConfig::builder("https://api.example.com")
            .enable_cache(true)
            .environment(Environment::Production)
            .build();
        let cache = CacheConfig::builder()
            .enable_memory(false)
            .enable_disk(false)
            .build();
        let result = validate_all(&network, &cache);
        assert!(!result.is_valid);
    }
}

//! The `Config` facade (§6): `load`/`apply_preset`/`validate`/
//! `switch_environment`/`set_runtime`/`get_runtime`, bound to [`System`]
//! since changing a running engine's config means rebuilding its
//! [`Executor`](request_engine_executor::Executor) and telling
//! [`Metrics`](request_engine_metrics::Metrics) about the new values.

use request_engine_config::{presets, CacheConfig, Environment, NetworkConfig, ValidationResult};
use request_engine_core::{EngineError, ErrorCode};

use crate::System;

/// One of the named configuration bundles in [`request_engine_config::presets`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Development,
    Testing,
    Staging,
    Production,
    FastResponse,
    HeavyLoad,
    OfflineFirst,
    LowBandwidth,
}

impl Preset {
    fn build(self, base_url: &str) -> (NetworkConfig, CacheConfig) {
        match self {
            Preset::Development => presets::development(base_url),
            Preset::Testing => presets::testing(base_url),
            Preset::Staging => presets::staging(base_url),
            Preset::Production => presets::production(base_url),
            Preset::FastResponse => presets::fast_response(base_url),
            Preset::HeavyLoad => presets::heavy_load(base_url),
            Preset::OfflineFirst => presets::offline_first(base_url),
            Preset::LowBandwidth => presets::low_bandwidth(base_url),
        }
    }
}

/// A view onto one [`System`]'s configuration. Cheap to obtain repeatedly
/// via [`System::config`]; holds no state of its own beyond the `System`
/// handle.
pub struct Config<'a> {
    pub(crate) system: &'a System,
}

impl Config<'_> {
    /// Builds a `(NetworkConfig, CacheConfig)` pair from a named preset
    /// without applying it. Use [`Config::apply_preset`] to swap it into
    /// the running system.
    pub fn load(&self, preset: Preset, base_url: &str) -> (NetworkConfig, CacheConfig) {
        preset.build(base_url)
    }

    /// Validates `preset` for `base_url`, then — if valid — rebuilds the
    /// system's executor and metrics config around it.
    pub fn apply_preset(&self, preset: Preset, base_url: &str) -> Result<ValidationResult, EngineError> {
        let (network, cache_config) = preset.build(base_url);
        self.apply(network, cache_config)
    }

    /// Validates the system's current `NetworkConfig`/`CacheConfig` without
    /// changing anything.
    pub fn validate(&self) -> ValidationResult {
        let network = self.system.network_config();
        let cache_config = self.system.cache_config();
        request_engine_config::validate_all(&network, &cache_config)
    }

    /// Re-tags the current config with `environment` (leaving every other
    /// field as-is), validates, and rebuilds the running executor.
    pub fn switch_environment(&self, environment: Environment) -> Result<ValidationResult, EngineError> {
        let mut network = self.system.network_config();
        network.environment = environment;
        let cache_config = self.system.cache_config();
        self.apply(network, cache_config)
    }

    /// Applies an arbitrary edit to the current config (e.g. a new
    /// `max_retries` or `default_cache_duration`), validates the result,
    /// and rebuilds the running executor.
    ///
    /// Rejects the edit (and leaves the running system untouched) if the
    /// edited config fails validation.
    pub fn set_runtime(&self, edit: impl FnOnce(&mut NetworkConfig, &mut CacheConfig)) -> Result<ValidationResult, EngineError> {
        let mut network = self.system.network_config();
        let mut cache_config = self.system.cache_config();
        edit(&mut network, &mut cache_config);
        self.apply(network, cache_config)
    }

    /// The system's current `NetworkConfig`/`CacheConfig`, cloned.
    pub fn get_runtime(&self) -> (NetworkConfig, CacheConfig) {
        (self.system.network_config(), self.system.cache_config())
    }

    fn apply(&self, network: NetworkConfig, cache_config: CacheConfig) -> Result<ValidationResult, EngineError> {
        let result = request_engine_config::validate_all(&network, &cache_config);
        if !result.is_valid {
            return Err(EngineError::new(
                ErrorCode::ValidationError,
                format!("config rejected: {}", result.errors.join("; ")),
            ));
        }
        self.system.reconfigure(network, cache_config);
        Ok(result)
    }
}

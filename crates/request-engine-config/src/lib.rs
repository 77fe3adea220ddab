//! Network and cache configuration records, environment presets, and total
//! validation.
//!
//! Configuration is supplied in-process via [`NetworkConfig`]/[`CacheConfig`]
//! builders or by taking one of the [`presets`] pairs as a starting point.
//! Loading a preset by name from an environment variable or config file is a
//! host-application concern, not handled here.

pub mod backoff;
pub mod cache;
pub mod environment;
pub mod network;
pub mod presets;
pub mod validation;

pub use backoff::retry_delay;
pub use cache::{CacheConfig, CacheConfigBuilder};
pub use environment::Environment;
pub use network::{NetworkConfig, NetworkConfigBuilder};
pub use validation::{ValidationResult, validate_all, validate_cache, validate_network};

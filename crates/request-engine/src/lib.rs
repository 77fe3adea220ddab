//! A client-side HTTP request engine core: config, cache, interceptors,
//! queue, executor, and metrics, bound together behind one [`System`]
//! handle.
//!
//! This crate is the facade; the actual behavior lives in its component
//! crates, each usable standalone:
//!
//! - [`request_engine_config`] — `NetworkConfig`/`CacheConfig`, presets, and
//!   validation (§6)
//! - [`request_engine_cache`] — memory + disk response cache (§3)
//! - [`request_engine_interceptor`] — request/response/error hook chain (§2)
//! - [`request_engine_queue`] — priority queue with dedup and concurrency
//!   limits (§4)
//! - [`request_engine_executor`] — ties cache/interceptors/queue/transport
//!   into `execute`/`download` (§5)
//! - [`request_engine_metrics`] — periodic snapshot aggregation (§4.7)
//! - [`request_engine_transport`] — the `Transport` seam an application
//!   supplies (a real HTTP client is out of scope; see its docs)
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use request_engine::{Preset, System};
//! use request_engine_config::CacheConfigBuilder;
//!
//! # async fn run(transport: Arc<dyn request_engine_transport::Transport>) -> Result<(), request_engine_core::EngineError> {
//! let (network, cache_config) = request_engine::presets::development("https://api.example.com");
//! let system = System::new(network, cache_config, transport).await?;
//!
//! let executor = system.executor();
//! // executor.execute(options).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Switching environments or presets at runtime
//!
//! [`Config::apply_preset`], [`Config::switch_environment`], and
//! [`Config::set_runtime`] validate the candidate config before touching
//! anything; the running executor and metrics aggregator only get rebuilt
//! if validation passes, and the cache/queue/interceptor state underneath
//! is untouched either way.
//!
//! ```no_run
//! # async fn run(system: &request_engine::System) {
//! match system.config().apply_preset(request_engine::Preset::Production, "https://api.example.com") {
//!     Ok(result) if !result.warnings.is_empty() => {
//!         // applied, but worth a look
//!     }
//!     Ok(_) => {}
//!     Err(err) => {
//!         // rejected; the running system is still on its previous config
//!         eprintln!("config rejected: {err}");
//!     }
//! }
//! # }
//! ```

mod config;
mod system;

pub use config::{Config, Preset};
pub use system::System;

pub use request_engine_config::presets;
pub use request_engine_core::{EngineError, ErrorCode};

//! The transport seam: the narrow interface the core depends on from an
//! external HTTP client (§4.8), plus an in-memory [`MockTransport`] double
//! sufficient to drive the properties in spec §8 without a real HTTP stack.
//!
//! A real transport (reqwest, hyper, …) is explicitly out of scope (§1): it
//! is a collaborator the engine calls through this trait, never a
//! dependency the engine crates pull in directly.

mod mock;
mod options;

pub use mock::{MockTransport, RecordedCall};
pub use options::{ProgressSink, RequestOptions, TransportResult};

use async_trait::async_trait;
use request_engine_core::TransportFailure;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// The contract the executor drives every HTTP exchange through.
///
/// Implementations report failures as [`TransportFailure`], which the core
/// classifies into the unified [`request_engine_core::EngineError`]
/// taxonomy (§4.1) — the transport itself never constructs an `EngineError`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and buffers the full response body in memory.
    async fn send(
        &self,
        options: &RequestOptions,
        cancel: CancellationToken,
        progress: Option<&(dyn ProgressSink)>,
    ) -> Result<TransportResult, TransportFailure>;

    /// Sends a request and streams the response body to `save_path`,
    /// creating parent directories as needed (§4.6 "Downloads").
    async fn download(
        &self,
        options: &RequestOptions,
        save_path: &Path,
        cancel: CancellationToken,
        progress: Option<&(dyn ProgressSink)>,
    ) -> Result<TransportResult, TransportFailure>;
}

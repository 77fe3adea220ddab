//! Ordered, priority-sorted request/response/error interceptor chain
//! (§4.4).

mod builtins;
mod chain;
mod metrics;

pub use builtins::{HeaderInjectionInterceptor, LoggingInterceptor, RetryDecisionInterceptor};
pub use chain::InterceptorChain;
pub use metrics::{HookKind, HookMetricsSnapshot, InterceptorMetrics};

use async_trait::async_trait;
use request_engine_core::EngineError;
use request_engine_transport::{RequestOptions, TransportResult};

/// Outcome of a request hook: either the (possibly modified) options to
/// continue with, or a response that short-circuits the remaining chain and
/// the transport call entirely.
pub enum RequestHookOutcome {
    Continue(RequestOptions),
    ShortCircuit(TransportResult),
}

/// Outcome of an error hook: either a rewritten error to hand to the next
/// hook (or the caller, if this was the last hook), or a recovery response
/// that converts the failure into a success.
pub enum ErrorHookOutcome {
    Propagate(EngineError),
    Recovered(TransportResult),
}

/// A named, prioritized participant in the chain. `priority` is read fresh
/// on every [`InterceptorChain::reprioritize`] call, so an interceptor that
/// wants to change its own precedence can expose interior mutability over
/// the value `priority()` returns.
#[async_trait]
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &str;

    /// Smaller values run earlier in the request pass (§4.4).
    fn priority(&self) -> i32;

    async fn on_request(&self, options: RequestOptions) -> Result<RequestHookOutcome, EngineError> {
        Ok(RequestHookOutcome::Continue(options))
    }

    async fn on_response(&self, response: TransportResult) -> Result<TransportResult, EngineError> {
        Ok(response)
    }

    async fn on_error(&self, error: EngineError) -> ErrorHookOutcome {
        ErrorHookOutcome::Propagate(error)
    }
}

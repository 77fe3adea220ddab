//! Built-in interceptors shipped by the core (§4.4): logging,
//! header-injection, and a retry-decision annotator. Auth, cache-freshness,
//! and compression interceptors are left to external plugins.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use request_engine_core::{EngineError, LogContext, Logger};
use request_engine_transport::{RequestOptions, TransportResult};

use crate::{ErrorHookOutcome, Interceptor, RequestHookOutcome};

/// Logs every request/response/error pass through a [`Logger`]. Runs last
/// among request hooks and first among response hooks by default (priority
/// `i32::MAX`), so it observes the fully-resolved options and the
/// fully-processed response.
pub struct LoggingInterceptor {
    priority: i32,
    logger: Arc<dyn Logger>,
}

impl LoggingInterceptor {
    pub fn new(priority: i32, logger: Arc<dyn Logger>) -> Self {
        Self { priority, logger }
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &str {
        "logging"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn on_request(&self, options: RequestOptions) -> Result<RequestHookOutcome, EngineError> {
        let ctx = LogContext::new("interceptor.logging").with("method", options.method).with("url", &options.url);
        self.logger.info(&ctx, "request");
        Ok(RequestHookOutcome::Continue(options))
    }

    async fn on_response(&self, response: TransportResult) -> Result<TransportResult, EngineError> {
        let ctx = LogContext::new("interceptor.logging").with("status", response.status);
        self.logger.info(&ctx, "response");
        Ok(response)
    }

    async fn on_error(&self, error: EngineError) -> ErrorHookOutcome {
        let ctx = LogContext::new("interceptor.logging").with("category", error.category).with("code", error.code);
        self.logger.warn(&ctx, &error.message);
        ErrorHookOutcome::Propagate(error)
    }
}

/// Fills in headers the request doesn't already set; explicit per-request
/// headers always win (§4.6: "per-request headers last-wins").
pub struct HeaderInjectionInterceptor {
    name: String,
    priority: i32,
    defaults: HashMap<String, String>,
}

impl HeaderInjectionInterceptor {
    pub fn new(name: impl Into<String>, priority: i32, defaults: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            priority,
            defaults,
        }
    }
}

#[async_trait]
impl Interceptor for HeaderInjectionInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn on_request(&self, mut options: RequestOptions) -> Result<RequestHookOutcome, EngineError> {
        for (key, value) in &self.defaults {
            options.headers.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Ok(RequestHookOutcome::Continue(options))
    }
}

/// Annotates a terminal error with a `retryDecision` metadata hint derived
/// from `EngineError::is_retryable`. The actual retry scheduling lives in
/// the queue (§4.5); this interceptor only makes the decision visible to
/// downstream error hooks and to logs.
pub struct RetryDecisionInterceptor {
    priority: i32,
}

impl RetryDecisionInterceptor {
    pub fn new(priority: i32) -> Self {
        Self { priority }
    }
}

#[async_trait]
impl Interceptor for RetryDecisionInterceptor {
    fn name(&self) -> &str {
        "retry-decision"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn on_error(&self, error: EngineError) -> ErrorHookOutcome {
        let decision = if error.is_retryable() { "retry" } else { "terminal" };
        ErrorHookOutcome::Propagate(error.with_metadata("retryDecision", decision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use request_engine_core::{ErrorCode, NoopLogger};

    #[tokio::test]
    async fn retry_decision_marks_network_errors_retryable() {
        let interceptor = RetryDecisionInterceptor::new(0);
        let error = EngineError::new(ErrorCode::ConnectionError, "boom");
        match interceptor.on_error(error).await {
            ErrorHookOutcome::Propagate(e) => {
                assert_eq!(e.metadata.last().unwrap().1, "retry");
            }
            _ => panic!("expected propagate"),
        }
    }

    #[tokio::test]
    async fn logging_interceptor_does_not_panic() {
        let interceptor = LoggingInterceptor::new(0, Arc::new(NoopLogger));
        let options = RequestOptions::new(request_engine_core::Method::Get, "http://x/y");
        let outcome = interceptor.on_request(options).await.unwrap();
        assert!(matches!(outcome, RequestHookOutcome::Continue(_)));
    }
}

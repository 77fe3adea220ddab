//! The ordered interceptor chain (§4.4).

use std::sync::Arc;

use parking_lot::RwLock;
use request_engine_core::EngineError;
use request_engine_transport::{RequestOptions, TransportResult};

use crate::metrics::{HookKind, InterceptorMetrics};
use crate::{ErrorHookOutcome, Interceptor, RequestHookOutcome};

struct Entry {
    interceptor: Arc<dyn Interceptor>,
}

/// Holds an ordered collection of [`Interceptor`]s and runs the three hook
/// passes. Re-sorts after every mutation so `add`/`remove`/`reprioritize`
/// never leave the chain in a stale order (§4.4).
pub struct InterceptorChain {
    entries: RwLock<Vec<Entry>>,
    metrics: InterceptorMetrics,
}

impl Default for InterceptorChain {
    fn default() -> Self {
        Self::new()
    }
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            metrics: InterceptorMetrics::default(),
        }
    }

    fn resort(entries: &mut [Entry]) {
        entries.sort_by_key(|e| e.interceptor.priority());
    }

    /// Adds `interceptor`, replacing any existing interceptor with the same
    /// name. Errors if two distinct interceptors contend for the same name
    /// would otherwise silently shadow each other's metrics (§4.4: "uniquely
    /// named collection").
    pub fn add(&self, interceptor: Arc<dyn Interceptor>) {
        let mut entries = self.entries.write();
        entries.retain(|e| e.interceptor.name() != interceptor.name());
        entries.push(Entry { interceptor });
        Self::resort(&mut entries);
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.interceptor.name() != name);
        entries.len() != before
    }

    /// Re-reads and re-applies every interceptor's current `priority()` and
    /// re-sorts; used after a caller changes an interceptor's priority
    /// in-place.
    pub fn reprioritize(&self) {
        let mut entries = self.entries.write();
        Self::resort(&mut entries);
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.interceptor.name().to_string()).collect()
    }

    pub fn metrics(&self) -> &InterceptorMetrics {
        &self.metrics
    }

    /// Runs `onRequest` hooks in ascending priority order. Stops at the
    /// first short-circuit or error.
    pub async fn run_request(&self, mut options: RequestOptions) -> Result<RequestHookOutcome, EngineError> {
        let interceptors: Vec<Arc<dyn Interceptor>> = self.entries.read().iter().map(|e| Arc::clone(&e.interceptor)).collect();

        for interceptor in interceptors {
            let start = std::time::Instant::now();
            let result = interceptor.on_request(options.clone()).await;
            let elapsed = start.elapsed();
            match &result {
                Ok(_) => self.metrics.record(interceptor.name(), HookKind::Request, true, elapsed),
                Err(_) => self.metrics.record(interceptor.name(), HookKind::Request, false, elapsed),
            }
            match result? {
                RequestHookOutcome::Continue(next) => options = next,
                RequestHookOutcome::ShortCircuit(result) => return Ok(RequestHookOutcome::ShortCircuit(result)),
            }
        }
        Ok(RequestHookOutcome::Continue(options))
    }

    /// Runs `onResponse` hooks in descending priority order (the mirror of
    /// request order), exactly once per successful execution (§4.6).
    pub async fn run_response(&self, mut response: TransportResult) -> Result<TransportResult, EngineError> {
        let mut interceptors: Vec<Arc<dyn Interceptor>> =
            self.entries.read().iter().map(|e| Arc::clone(&e.interceptor)).collect();
        interceptors.reverse();

        for interceptor in interceptors {
            let start = std::time::Instant::now();
            let result = interceptor.on_response(response.clone()).await;
            let elapsed = start.elapsed();
            match &result {
                Ok(_) => self.metrics.record(interceptor.name(), HookKind::Response, true, elapsed),
                Err(_) => self.metrics.record(interceptor.name(), HookKind::Response, false, elapsed),
            }
            response = result?;
        }
        Ok(response)
    }

    /// Runs `onError` hooks in ascending priority order. The first hook that
    /// recovers short-circuits the remaining hooks and returns the recovery
    /// response; if every hook declines, the (possibly rewritten) error is
    /// returned to the caller.
    pub async fn run_error(&self, mut error: EngineError) -> ErrorHookOutcome {
        let interceptors: Vec<Arc<dyn Interceptor>> = self.entries.read().iter().map(|e| Arc::clone(&e.interceptor)).collect();

        for interceptor in interceptors {
            let start = std::time::Instant::now();
            let outcome = interceptor.on_error(error.clone()).await;
            let elapsed = start.elapsed();
            self.metrics.record(interceptor.name(), HookKind::Error, true, elapsed);
            match outcome {
                ErrorHookOutcome::Recovered(response) => return ErrorHookOutcome::Recovered(response),
                ErrorHookOutcome::Propagate(rewritten) => error = rewritten,
            }
        }
        ErrorHookOutcome::Propagate(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::HeaderInjectionInterceptor;
    use async_trait::async_trait;
    use request_engine_core::Method;
    use std::collections::HashMap;

    struct RecordingInterceptor {
        name: String,
        priority: i32,
        order: Arc<std::sync::Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Interceptor for RecordingInterceptor {
        fn name(&self) -> &str {
            &self.name
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        async fn on_request(&self, options: RequestOptions) -> Result<RequestHookOutcome, EngineError> {
            self.order.lock().unwrap().push(self.name.clone());
            Ok(RequestHookOutcome::Continue(options))
        }
        async fn on_response(&self, response: TransportResult) -> Result<TransportResult, EngineError> {
            self.order.lock().unwrap().push(self.name.clone());
            Ok(response)
        }
    }

    #[tokio::test]
    async fn request_hooks_run_ascending_response_hooks_run_descending() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let chain = InterceptorChain::new();
        chain.add(Arc::new(RecordingInterceptor {
            name: "a".into(),
            priority: 1,
            order: Arc::clone(&order),
        }));
        chain.add(Arc::new(RecordingInterceptor {
            name: "b".into(),
            priority: 2,
            order: Arc::clone(&order),
        }));

        let options = RequestOptions::new(Method::Get, "http://x/y");
        chain.run_request(options).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);

        order.lock().unwrap().clear();
        let response = TransportResult {
            status: 200,
            headers: HashMap::new(),
            body: Vec::new(),
        };
        chain.run_response(response).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn header_injection_only_fills_missing_headers() {
        let chain = InterceptorChain::new();
        let mut defaults = HashMap::new();
        defaults.insert("X-Client".to_string(), "engine".to_string());
        chain.add(Arc::new(HeaderInjectionInterceptor::new("headers", 10, defaults)));

        let options = RequestOptions::new(Method::Get, "http://x/y").with_header("X-Client", "caller");
        let outcome = chain.run_request(options).await.unwrap();
        let RequestHookOutcome::Continue(options) = outcome else {
            panic!("expected continue");
        };
        assert_eq!(options.headers.get("X-Client").unwrap(), "caller");
    }

    #[tokio::test]
    async fn metrics_record_executions_per_interceptor_and_hook() {
        let chain = InterceptorChain::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        chain.add(Arc::new(RecordingInterceptor {
            name: "a".into(),
            priority: 1,
            order,
        }));

        chain.run_request(RequestOptions::new(Method::Get, "http://x/y")).await.unwrap();
        let snapshot = chain.metrics().snapshot("a", HookKind::Request);
        assert_eq!(snapshot.total_executions, 1);
        assert_eq!(snapshot.successful, 1);
    }
}

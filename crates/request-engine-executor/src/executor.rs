//! Binds a [`Request`] through cache, dedup, the queue, the transport, the
//! interceptor chain, and parsing (§4.6).
//!
//! # Invariants upheld here
//!
//! - The interceptor chain's request hooks see the final `RequestOptions`
//!   (base URL joined, default headers merged, per-request headers
//!   last-wins).
//! - Response hooks run exactly once for successes; error hooks run for
//!   every failure path.
//! - Cache lookup, dedup, and queue submission happen in that order; a
//!   cache hit issues no transport call and invokes no interceptor.
//! - The parser runs inside the executor, never the transport; a parse
//!   failure is classified as `data/parseError`.
//! - A successful response is written to the cache under the request's key
//!   iff the request enables caching.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use request_engine_cache::{CacheStore, SetOptions};
use request_engine_core::{derive_key, EngineError, ErrorCode, EventListeners, LogContext, Logger, NoopLogger, TransportFailure};
use request_engine_interceptor::{ErrorHookOutcome, InterceptorChain, RequestHookOutcome};
use request_engine_queue::{EnqueueSpec, QueueTask, RequestQueue};
use request_engine_transport::{ProgressSink, RequestOptions, Transport, TransportResult};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::download::DownloadRequest;
use crate::lifecycle::{ExecutionEvent, ExecutionEventKind, Lifecycle};
use crate::request::{Parser, Request, RetryPolicy};
use crate::response::{DownloadOutcome, Response};

/// Engine-wide defaults the executor applies when a request doesn't
/// override them, derived from `NetworkConfig`.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub base_url: String,
    pub default_headers: HashMap<String, String>,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    pub receive_timeout: Duration,
    pub default_queue_timeout: Duration,
    pub default_max_retries: u32,
    pub default_retry_base_delay: Duration,
    pub default_exponential_backoff: bool,
    pub default_cache_duration: Duration,
}

impl ExecutorConfig {
    pub fn from_network_config(network: &request_engine_config::NetworkConfig) -> Self {
        Self {
            base_url: network.base_url.clone(),
            default_headers: HashMap::new(),
            connect_timeout: network.connect_timeout,
            send_timeout: network.send_timeout,
            receive_timeout: network.receive_timeout,
            default_queue_timeout: network.receive_timeout,
            default_max_retries: network.max_retries,
            default_retry_base_delay: network.retry_base_delay,
            default_exponential_backoff: network.enable_exponential_backoff,
            default_cache_duration: network.default_cache_duration,
        }
    }
}

struct Inner {
    config: ExecutorConfig,
    cache: CacheStore,
    queue: RequestQueue,
    interceptors: Arc<InterceptorChain>,
    transport: Arc<dyn Transport>,
    logger: Arc<dyn Logger>,
    events: EventListeners<ExecutionEvent>,
    inflight: parking_lot::Mutex<HashSet<Uuid>>,
    disposed: AtomicBool,
}

/// Binds cache, dedup/queue, the interceptor chain, and the transport into
/// `execute`/`execute_batch`/`execute_concurrent`/`download` (§4.6).
///
/// Cheaply cloneable: internally an `Arc`.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<Inner>,
}

fn operation_error(code: ErrorCode, message: impl Into<String>) -> EngineError {
    EngineError::new(code, message.into())
}

fn join_url(base: &str, path: &str, query: &[(String, String)]) -> String {
    let mut url = if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
    };
    if !query.is_empty() {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in query {
            serializer.append_pair(key, value);
        }
        url.push('?');
        url.push_str(&serializer.finish());
    }
    url
}

/// Builds the task the queue will invoke (possibly more than once, across
/// retries): runs request interceptors, calls the transport, and turns a
/// non-2xx status into a `TransportFailure` so the queue's retry and
/// idempotency filter see it as an error rather than a successful response
/// (§4.5 "retryable 5xx for a POST is treated as terminal").
fn build_task(
    interceptors: Arc<InterceptorChain>,
    transport: Arc<dyn Transport>,
    options: RequestOptions,
    cancel: CancellationToken,
    save_path: Option<std::path::PathBuf>,
    progress: Option<Arc<dyn ProgressSink>>,
) -> QueueTask {
    Arc::new(move || {
        let interceptors = Arc::clone(&interceptors);
        let transport = Arc::clone(&transport);
        let options = options.clone();
        let cancel = cancel.clone();
        let save_path = save_path.clone();
        let progress = progress.clone();
        Box::pin(async move {
            let options = match interceptors.run_request(options).await {
                Ok(RequestHookOutcome::Continue(options)) => options,
                Ok(RequestHookOutcome::ShortCircuit(result)) => return Ok(result),
                Err(e) => return Err(TransportFailure::Other { detail: e.to_string() }),
            };

            let sink: Option<&dyn ProgressSink> = progress.as_deref();
            let outcome = match &save_path {
                Some(path) => transport.download(&options, path, cancel, sink).await,
                None => transport.send(&options, cancel, sink).await,
            };

            match outcome {
                Ok(result) if result.status < 400 => match interceptors.run_response(result).await {
                    Ok(result) => Ok(result),
                    Err(e) => Err(TransportFailure::Other { detail: e.to_string() }),
                },
                Ok(result) => Err(TransportFailure::HttpStatus {
                    status: result.status,
                    message: String::from_utf8_lossy(&result.body).into_owned(),
                }),
                Err(failure) => Err(failure),
            }
        })
    })
}

impl Executor {
    pub fn new(
        config: ExecutorConfig,
        cache: CacheStore,
        queue: RequestQueue,
        interceptors: Arc<InterceptorChain>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::with_observability(config, cache, queue, interceptors, transport, Arc::new(NoopLogger), EventListeners::new())
    }

    pub fn with_observability(
        config: ExecutorConfig,
        cache: CacheStore,
        queue: RequestQueue,
        interceptors: Arc<InterceptorChain>,
        transport: Arc<dyn Transport>,
        logger: Arc<dyn Logger>,
        events: EventListeners<ExecutionEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                cache,
                queue,
                interceptors,
                transport,
                logger,
                events,
                inflight: parking_lot::Mutex::new(HashSet::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    fn check_disposed(&self) -> Result<(), EngineError> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(operation_error(ErrorCode::OperationFailed, "executor has been disposed"));
        }
        Ok(())
    }

    fn emit(&self, id: Uuid, kind: ExecutionEventKind) {
        if self.inner.events.is_empty() {
            return;
        }
        self.inner.events.emit(&ExecutionEvent {
            source: id.to_string(),
            timestamp: std::time::Instant::now(),
            kind,
        });
    }

    fn resolved_headers(&self, request_headers: &HashMap<String, String>) -> HashMap<String, String> {
        let mut headers = self.inner.config.default_headers.clone();
        for (key, value) in request_headers {
            headers.insert(key.clone(), value.clone());
        }
        headers
    }

    fn resolved_retry(&self, retry: Option<&RetryPolicy>) -> RetryPolicy {
        retry.cloned().unwrap_or_else(|| RetryPolicy {
            max_retries: self.inner.config.default_max_retries,
            base_delay: self.inner.config.default_retry_base_delay,
            exponential_backoff: self.inner.config.default_exponential_backoff,
        })
    }

    /// Runs `request` through cache → dedup → queue → transport →
    /// interceptors → parse → cache.
    pub async fn execute<T: Send + 'static>(&self, request: Request<T>) -> Result<Response<T>, EngineError> {
        self.check_disposed()?;

        let id = request.id.unwrap_or_else(Uuid::new_v4);
        self.inner.inflight.lock().insert(id);
        let result = self.execute_inner(id, request).await;
        self.inner.inflight.lock().remove(&id);
        result
    }

    async fn execute_inner<T: Send + 'static>(&self, id: Uuid, request: Request<T>) -> Result<Response<T>, EngineError> {
        let mut lifecycle = Lifecycle::start();
        self.emit(id, ExecutionEventKind::Started);

        let url = join_url(&self.inner.config.base_url, &request.path, &request.query);
        let key = request
            .dedup_key_override
            .clone()
            .unwrap_or_else(|| derive_key(request.method, &url, request.body.as_deref()));

        if request.cache.enabled {
            if let Some(entry) = self.inner.cache.get(&key).await? {
                let data = (request.parser)(&entry.payload, &HashMap::new())
                    .map_err(|e| e.with_context(format!("cached entry for {key}")))?;
                let duration = lifecycle.mark_complete();
                self.emit(id, ExecutionEventKind::Completed { success: true });
                #[cfg(feature = "metrics")]
                metrics::histogram!("request_engine_executor_duration_seconds", "from_cache" => "true")
                    .record(duration.as_secs_f64());
                return Ok(Response {
                    success: true,
                    data: Some(data),
                    status_code: 200,
                    message: "OK (from cache)".to_string(),
                    headers: HashMap::new(),
                    timestamp: SystemTime::now(),
                    duration,
                    from_cache: true,
                });
            }
        }

        let mut options = RequestOptions::new(request.method, url.clone());
        options.headers = self.resolved_headers(&request.headers);
        options.connect_timeout = self.inner.config.connect_timeout;
        options.send_timeout = self.inner.config.send_timeout;
        options.receive_timeout = self.inner.config.receive_timeout;
        if let Some(body) = request.body.clone() {
            options = options.with_body(body);
        }

        let queue_timeout = request.timeout.unwrap_or(self.inner.config.default_queue_timeout);
        let retry = self.resolved_retry(request.retry.as_ref());
        let cancel = CancellationToken::new();

        let task = build_task(
            Arc::clone(&self.inner.interceptors),
            Arc::clone(&self.inner.transport),
            options,
            cancel.clone(),
            None,
            request.progress.clone(),
        );

        let spec = EnqueueSpec {
            id: Some(id),
            priority: request.priority,
            method: request.method,
            url: url.clone(),
            dedup_key: if request.dedup_enabled { Some(key.clone()) } else { None },
            dedup_enabled: request.dedup_enabled,
            timeout: queue_timeout,
            max_retries: retry.max_retries,
            retry_base_delay: retry.base_delay,
            exponential_backoff: retry.exponential_backoff,
            task,
        };

        let receiver = self.inner.queue.enqueue(spec)?;

        let outcome = receiver
            .await
            .map_err(|_| operation_error(ErrorCode::OperationFailed, "queue dropped the completion channel"))?;

        let transport_result = match outcome {
            Ok(result) => result,
            Err(error) => {
                let error = request
                    .error_mapper
                    .as_ref()
                    .and_then(|mapper| mapper(&error))
                    .unwrap_or(error);
                match self.inner.interceptors.run_error(error).await {
                    ErrorHookOutcome::Recovered(result) => result,
                    ErrorHookOutcome::Propagate(error) => {
                        self.emit(id, ExecutionEventKind::Completed { success: false });
                        #[cfg(feature = "metrics")]
                        metrics::counter!("request_engine_executor_failure_total").increment(1);
                        return Err(error);
                    }
                }
            }
        };

        lifecycle.mark_first_bytes();
        let status_code = transport_result.status;
        let headers = transport_result.headers.clone();
        let data = match (request.parser)(&transport_result.body, &headers) {
            Ok(data) => data,
            Err(e) => {
                self.emit(id, ExecutionEventKind::Completed { success: false });
                return Err(e.with_status_code(status_code).with_context(format!("parsing response from {url}")));
            }
        };
        lifecycle.mark_parse_complete();

        if request.cache.enabled {
            let options = SetOptions {
                ttl: request.cache.ttl.or(Some(self.inner.config.default_cache_duration)),
                priority: request.cache.priority.or(Some(request.priority)),
                tags: request.cache.tags.clone(),
            };
            self.inner.cache.set(&key, transport_result.body.clone(), options).await?;
        }

        let duration = lifecycle.mark_complete();
        self.emit(id, ExecutionEventKind::Completed { success: true });
        #[cfg(feature = "metrics")]
        metrics::histogram!("request_engine_executor_duration_seconds", "from_cache" => "false")
            .record(duration.as_secs_f64());

        Ok(Response {
            success: true,
            data: Some(data),
            status_code,
            message: "OK".to_string(),
            headers,
            timestamp: SystemTime::now(),
            duration,
            from_cache: false,
        })
    }

    /// Submits every request to the queue and awaits all results. Each
    /// request may fail independently; the caller receives per-request
    /// results, never a single joined failure (§4.6).
    pub async fn execute_batch<T: Send + 'static>(&self, requests: Vec<Request<T>>) -> Vec<Result<Response<T>, EngineError>> {
        let futures = requests.into_iter().map(|request| self.execute(request));
        futures::future::join_all(futures).await
    }

    /// Splits `requests` into chunks of at most `max_concurrency` and
    /// submits each chunk to the queue sequentially (§4.6).
    pub async fn execute_concurrent<T: Send + 'static>(
        &self,
        requests: Vec<Request<T>>,
        max_concurrency: usize,
    ) -> Vec<Result<Response<T>, EngineError>> {
        let chunk_size = max_concurrency.max(1);
        let mut results = Vec::with_capacity(requests.len());
        let mut iter = requests.into_iter();
        loop {
            let chunk: Vec<_> = (&mut iter).take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            let futures = chunk.into_iter().map(|request| self.execute(request));
            results.extend(futures::future::join_all(futures).await);
        }
        results
    }

    /// Streams the response body to `request.save_path`, ensuring its
    /// parent directory exists, bypassing normal body parsing and the
    /// cache entirely (§4.6 "Downloads").
    pub async fn download(&self, request: DownloadRequest) -> Result<Response<DownloadOutcome>, EngineError> {
        self.check_disposed()?;

        let id = request.id.unwrap_or_else(Uuid::new_v4);
        self.inner.inflight.lock().insert(id);
        let result = self.download_inner(id, request).await;
        self.inner.inflight.lock().remove(&id);
        result
    }

    async fn download_inner(&self, id: Uuid, request: DownloadRequest) -> Result<Response<DownloadOutcome>, EngineError> {
        let mut lifecycle = Lifecycle::start();
        self.emit(id, ExecutionEventKind::Started);

        if let Some(parent) = request.save_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| operation_error(ErrorCode::OperationFailed, format!("creating {}: {e}", parent.display())))?;
        }

        let url = join_url(&self.inner.config.base_url, &request.path, &request.query);
        let mut options = RequestOptions::new(request.method, url.clone());
        options.headers = self.resolved_headers(&request.headers);
        options.connect_timeout = self.inner.config.connect_timeout;
        options.send_timeout = self.inner.config.send_timeout;
        options.receive_timeout = self.inner.config.receive_timeout;

        let queue_timeout = request.timeout.unwrap_or(self.inner.config.default_queue_timeout);
        let retry = self.resolved_retry(request.retry.as_ref());
        let cancel = CancellationToken::new();
        let dedup_key = request.dedup_enabled.then(|| derive_key(request.method, &url, None));

        let task = build_task(
            Arc::clone(&self.inner.interceptors),
            Arc::clone(&self.inner.transport),
            options,
            cancel.clone(),
            Some(request.save_path.clone()),
            request.progress.clone(),
        );

        let spec = EnqueueSpec {
            id: Some(id),
            priority: request.priority,
            method: request.method,
            url: url.clone(),
            dedup_key: dedup_key.clone(),
            dedup_enabled: request.dedup_enabled,
            timeout: queue_timeout,
            max_retries: retry.max_retries,
            retry_base_delay: retry.base_delay,
            exponential_backoff: retry.exponential_backoff,
            task,
        };

        let receiver = self.inner.queue.enqueue(spec)?;
        lifecycle.mark_first_bytes();

        let outcome = receiver
            .await
            .map_err(|_| operation_error(ErrorCode::OperationFailed, "queue dropped the completion channel"))?;

        let transport_result = match outcome {
            Ok(result) => result,
            Err(error) => match self.inner.interceptors.run_error(error).await {
                ErrorHookOutcome::Recovered(result) => result,
                ErrorHookOutcome::Propagate(error) => {
                    self.emit(id, ExecutionEventKind::Completed { success: false });
                    return Err(error);
                }
            },
        };

        lifecycle.mark_parse_complete();
        let duration = lifecycle.mark_complete();
        self.emit(id, ExecutionEventKind::Completed { success: true });

        Ok(Response {
            success: true,
            data: Some(DownloadOutcome {
                path: request.save_path,
                bytes_written: transport_result.body.len() as u64,
            }),
            status_code: transport_result.status,
            message: "downloaded".to_string(),
            headers: transport_result.headers,
            timestamp: SystemTime::now(),
            duration,
            from_cache: false,
        })
    }

    pub fn cancel(&self, id: Uuid) {
        self.inner.queue.cancel(id);
    }

    /// Cancels every execution currently in flight.
    pub fn cancel_all(&self) {
        let ids: Vec<Uuid> = self.inner.inflight.lock().iter().copied().collect();
        for id in ids {
            self.inner.queue.cancel(id);
        }
    }

    /// Stops accepting new executions. Idempotent; does not dispose the
    /// cache or queue, which are shared and may outlive this executor.
    pub async fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.inner
            .logger
            .info(&LogContext::new("executor"), "executor disposed");
    }
}

/// A parser that never inspects the body, for requests whose value is only
/// in their side effect (e.g. a cache warm-up) or whose type is `()`.
pub fn no_op_parser() -> Parser<()> {
    Arc::new(|_body: &[u8], _headers: &HashMap<String, String>| Ok(()))
}

/// A parser that treats the raw response body as UTF-8 text.
pub fn text_parser() -> Parser<String> {
    Arc::new(|body: &[u8], _headers: &HashMap<String, String>| {
        String::from_utf8(body.to_vec()).map_err(|e| {
            EngineError::new(ErrorCode::ParseError, format!("response body is not valid UTF-8: {e}"))
        })
    })
}

/// A parser that deserializes the response body as JSON.
#[cfg(feature = "json")]
pub fn json_parser<T>() -> Parser<T>
where
    T: serde::de::DeserializeOwned + Send + Sync + 'static,
{
    Arc::new(|body: &[u8], _headers: &HashMap<String, String>| {
        serde_json::from_slice(body).map_err(|e| EngineError::new(ErrorCode::ParseError, format!("invalid JSON: {e}")))
    })
}

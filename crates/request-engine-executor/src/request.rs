//! Typed request description handed to [`crate::Executor::execute`] (§3
//! "Request"). Concrete request shapes are values of this type, built with
//! different parsers and options, rather than subclasses (§9 "polymorphism
//! lives in data, not inheritance").

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use request_engine_core::{EngineError, Method, Priority};
use request_engine_transport::ProgressSink;
use uuid::Uuid;

/// Parses a response body plus its headers into `T`. Failure is classified
/// as `data/parseError` by the executor.
pub type Parser<T> = Arc<dyn Fn(&[u8], &HashMap<String, String>) -> Result<T, EngineError> + Send + Sync>;

/// Lets a request reinterpret a transport-level error before it reaches the
/// caller, e.g. to pull a structured error body out of a 4xx response.
pub type ErrorMapper = Arc<dyn Fn(&EngineError) -> Option<EngineError> + Send + Sync>;

/// Per-request override of the engine-wide retry defaults carried on
/// `NetworkConfig` (§4.5).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub exponential_backoff: bool,
}

/// Per-request caching behavior (§4.3, §4.6 "iff the request enables
/// caching").
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub enabled: bool,
    pub ttl: Option<Duration>,
    pub priority: Option<Priority>,
    pub tags: HashSet<String>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: None,
            priority: None,
            tags: HashSet::new(),
        }
    }
}

impl CachePolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// A fully-specified request: method, path, and everything the executor
/// needs to run it through cache, dedup, the queue, the transport, and the
/// parser.
pub struct Request<T> {
    pub id: Option<Uuid>,
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
    pub priority: Priority,
    pub retry: Option<RetryPolicy>,
    pub cache: CachePolicy,
    pub dedup_enabled: bool,
    pub dedup_key_override: Option<String>,
    pub progress: Option<Arc<dyn ProgressSink>>,
    pub parser: Parser<T>,
    pub error_mapper: Option<ErrorMapper>,
}

impl<T> Request<T> {
    pub fn new(method: Method, path: impl Into<String>, parser: Parser<T>) -> Self {
        Self {
            id: None,
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
            priority: Priority::Normal,
            retry: None,
            cache: CachePolicy::default(),
            dedup_enabled: true,
            dedup_key_override: None,
            progress: None,
            parser,
            error_mapper: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = CachePolicy::disabled();
        self
    }

    pub fn without_dedup(mut self) -> Self {
        self.dedup_enabled = false;
        self
    }

    pub fn with_dedup_key(mut self, key: impl Into<String>) -> Self {
        self.dedup_key_override = Some(key.into());
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn with_error_mapper(mut self, mapper: ErrorMapper) -> Self {
        self.error_mapper = Some(mapper);
        self
    }
}

//! Wire-level request description and result handed across the
//! [`crate::Transport`] seam.

use request_engine_core::Method;
use std::collections::HashMap;
use std::time::Duration;

/// A fully-resolved request ready to hand to the transport: base URL already
/// joined with the path, default headers merged with per-request headers
/// (per-request wins), per §4.6's request-hook invariant.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    pub receive_timeout: Duration,
}

impl RequestOptions {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            connect_timeout: Duration::from_secs(10),
            send_timeout: Duration::from_secs(30),
            receive_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// The raw result of a successful transport call, prior to classification
/// or parsing. A non-2xx status is still `Ok` here — it is the executor's
/// job (via `classify`) to decide whether `status` represents a failure.
#[derive(Debug, Clone)]
pub struct TransportResult {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Receives progress notifications during `send`/`download` (§4.6).
/// `total` is `None` when the transport can't determine content length
/// (e.g. chunked transfer encoding).
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, bytes_transferred: u64, total: Option<u64>);
}

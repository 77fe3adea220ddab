//! A request whose subtype is `Download` (§4.6): bypasses body parsing and
//! streams the response straight to `save_path`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use request_engine_core::{Method, Priority};
use request_engine_transport::ProgressSink;
use uuid::Uuid;

use crate::request::RetryPolicy;

pub struct DownloadRequest {
    pub id: Option<Uuid>,
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
    pub priority: Priority,
    pub retry: Option<RetryPolicy>,
    pub dedup_enabled: bool,
    pub save_path: PathBuf,
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl DownloadRequest {
    pub fn new(method: Method, path: impl Into<String>, save_path: impl AsRef<Path>) -> Self {
        Self {
            id: None,
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HashMap::new(),
            timeout: None,
            priority: Priority::Normal,
            retry: None,
            dedup_enabled: false,
            save_path: save_path.as_ref().to_path_buf(),
            progress: None,
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

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }
}

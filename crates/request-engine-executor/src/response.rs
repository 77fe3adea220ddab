//! The executor's output record (§3 "Response<T>").

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Parsed result of a single execution.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub success: bool,
    pub data: Option<T>,
    pub status_code: u16,
    pub message: String,
    pub headers: HashMap<String, String>,
    pub timestamp: SystemTime,
    pub duration: Duration,
    pub from_cache: bool,
}

/// Result of a `Download` request: the file the transport streamed bytes
/// into and how many bytes it wrote (§4.6 "Downloads").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub path: PathBuf,
    pub bytes_written: u64,
}

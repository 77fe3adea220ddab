//! A request as held by the queue: its task, retry/timeout configuration,
//! and completion state (§3 "QueuedRequest").

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use request_engine_core::{Method, Priority};
use request_engine_transport::TransportResult;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type TransportOutcome = Result<TransportResult, request_engine_core::TransportFailure>;

/// The unit of work a queued request performs when dequeued. Called again
/// on every retry attempt, so it must be safe to invoke more than once
/// (§3: "thunk (() → transport result)").
pub type QueueTask = std::sync::Arc<
    dyn Fn() -> Pin<Box<dyn Future<Output = TransportOutcome> + Send>> + Send + Sync,
>;

pub type CompletionResult = Result<TransportResult, request_engine_core::EngineError>;

/// What the caller hands to [`crate::RequestQueue::enqueue`].
pub struct EnqueueSpec {
    pub id: Option<Uuid>,
    pub priority: Priority,
    pub method: Method,
    pub url: String,
    pub dedup_key: Option<String>,
    pub dedup_enabled: bool,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub exponential_backoff: bool,
    pub task: QueueTask,
}

/// Internal bookkeeping for one in-flight or pending request. Shared via
/// `Arc` between the pending sub-queue, the dedup map, and the executing
/// set, so every view of a request sees the same completion state.
pub(crate) struct RequestRecord {
    pub id: Uuid,
    pub priority: Priority,
    pub method: Method,
    pub url: String,
    pub dedup_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub exponential_backoff: bool,
    pub task: QueueTask,
    pub enqueued_at: Instant,
    pub retry_count: AtomicU32,
    pub completed: AtomicBool,
    pub cancel: CancellationToken,
    primary: parking_lot::Mutex<Option<oneshot::Sender<CompletionResult>>>,
    duplicates: parking_lot::Mutex<Vec<oneshot::Sender<CompletionResult>>>,
}

impl RequestRecord {
    pub fn new(spec: &EnqueueSpec, id: Uuid, sender: oneshot::Sender<CompletionResult>) -> Self {
        Self {
            id,
            priority: spec.priority,
            method: spec.method,
            url: spec.url.clone(),
            dedup_key: spec.dedup_key.clone(),
            timeout: spec.timeout,
            max_retries: spec.max_retries,
            retry_base_delay: spec.retry_base_delay,
            exponential_backoff: spec.exponential_backoff,
            task: std::sync::Arc::clone(&spec.task),
            enqueued_at: Instant::now(),
            retry_count: AtomicU32::new(0),
            completed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            primary: parking_lot::Mutex::new(Some(sender)),
            duplicates: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn attach_duplicate(&self, sender: oneshot::Sender<CompletionResult>) {
        self.duplicates.lock().push(sender);
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicates.lock().len()
    }

    /// Atomically flips the completed flag; `true` only for the caller that
    /// wins the race (§3 invariant 5, §5 "completion flip").
    pub fn try_complete(&self) -> bool {
        self.completed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Delivers `result` to the primary slot and every attached duplicate's
    /// slot (§4.5 step 4). Must only be called by the winner of
    /// [`Self::try_complete`].
    pub fn fulfill(&self, result: CompletionResult) {
        if let Some(sender) = self.primary.lock().take() {
            let _ = sender.send(result.clone());
        }
        for sender in self.duplicates.lock().drain(..) {
            let _ = sender.send(result.clone());
        }
    }

    pub fn is_idempotent(&self) -> bool {
        self.method.is_idempotent()
    }
}

//! Priority request queue with bounded concurrency, deduplication, retry,
//! and a per-request timeout watchdog (§4.5).
//!
//! # Concurrency model (§5)
//!
//! Two locks: `queue_lock` guards the four priority sub-queues and the
//! dedup map; `executing_lock` guards the executing id set. Both are plain
//! [`parking_lot::Mutex`]es held only for the duration of a synchronous
//! bookkeeping step — never across the `await` that calls into the
//! transport task.

mod config;
mod record;
mod stats;

pub use config::{QueueConfig, QueueConfigBuilder};
pub use record::{EnqueueSpec, QueueTask, TransportOutcome};
pub use stats::QueueStatisticsSnapshot;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use request_engine_core::{classify, EngineError, ErrorCode, Priority, RequestContext, Spawner, TaskHandle, TokioSpawner};
use tokio::sync::oneshot;
use uuid::Uuid;

use record::{CompletionResult, RequestRecord};
use stats::QueueStatistics;

struct QueueState {
    sub_queues: HashMap<Priority, VecDeque<Arc<RequestRecord>>>,
    dedup_map: HashMap<String, Arc<RequestRecord>>,
    by_id: HashMap<Uuid, Arc<RequestRecord>>,
    paused: bool,
}

impl QueueState {
    fn new() -> Self {
        let mut sub_queues = HashMap::new();
        for p in Priority::ALL_DESCENDING {
            sub_queues.insert(p, VecDeque::new());
        }
        Self {
            sub_queues,
            dedup_map: HashMap::new(),
            by_id: HashMap::new(),
            paused: false,
        }
    }

    fn pending_len(&self) -> usize {
        self.sub_queues.values().map(|q| q.len()).sum()
    }
}

struct Inner {
    config: QueueConfig,
    queue_state: Mutex<QueueState>,
    executing: Mutex<HashSet<Uuid>>,
    stats: QueueStatistics,
    disposed: std::sync::atomic::AtomicBool,
    spawner: Arc<dyn Spawner>,
    processing_task: Mutex<Option<TaskHandle>>,
}

fn operation_error(code: ErrorCode, message: &str) -> EngineError {
    EngineError::new(code, message.to_string())
}

/// Priority queue binding requests to bounded concurrency, request
/// deduplication, retry with exponential backoff, and a timeout watchdog.
///
/// Cheaply cloneable: internally an `Arc`, so the background processing
/// task and callers share the same state.
#[derive(Clone)]
pub struct RequestQueue {
    inner: Arc<Inner>,
}

impl RequestQueue {
    pub fn new(config: QueueConfig) -> Self {
        let inner = Arc::new(Inner {
            config,
            queue_state: Mutex::new(QueueState::new()),
            executing: Mutex::new(HashSet::new()),
            stats: QueueStatistics::default(),
            disposed: std::sync::atomic::AtomicBool::new(false),
            spawner: Arc::new(TokioSpawner),
            processing_task: Mutex::new(None),
        });
        let queue = Self { inner };
        queue.start_processing_task();
        queue
    }

    fn start_processing_task(&self) {
        let interval = self.inner.config.processing_interval;
        let queue = self.clone();
        let handle = self.inner.spawner.spawn(Box::pin(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if queue.inner.disposed.load(std::sync::atomic::Ordering::SeqCst) {
                    return;
                }
                queue.process_tick();
            }
        }));
        *self.inner.processing_task.lock() = Some(handle);
    }

    fn check_disposed(&self) -> Result<(), EngineError> {
        if self.inner.disposed.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(operation_error(ErrorCode::OperationFailed, "queue has been disposed"));
        }
        Ok(())
    }

    /// Submits `spec` for execution, returning a receiver bound to its
    /// completion slot (§4.5 "Enqueue"). If dedup is enabled and an
    /// in-flight or pending request shares `spec.dedup_key`, the returned
    /// receiver is attached as a duplicate and no new record is scheduled.
    pub fn enqueue(&self, spec: EnqueueSpec) -> Result<oneshot::Receiver<CompletionResult>, EngineError> {
        self.check_disposed()?;

        let (tx, rx) = oneshot::channel();
        let mut state = self.inner.queue_state.lock();

        if spec.dedup_enabled {
            if let Some(key) = &spec.dedup_key {
                if let Some(existing) = state.dedup_map.get(key) {
                    existing.attach_duplicate(tx);
                    self.inner.stats.record_duplicate();
                    #[cfg(feature = "metrics")]
                    metrics::counter!("request_engine_queue_deduplicated_total").increment(1);
                    return Ok(rx);
                }
            }
        }

        let executing_count = self.inner.executing.lock().len();
        if state.pending_len() + executing_count >= self.inner.config.max_queue_size {
            #[cfg(feature = "metrics")]
            metrics::counter!("request_engine_queue_rejected_total").increment(1);
            return Err(operation_error(ErrorCode::ResourceBusy, "request queue is full"));
        }

        let id = spec.id.unwrap_or_else(Uuid::new_v4);
        let record = Arc::new(RequestRecord::new(&spec, id, tx));
        state.by_id.insert(id, Arc::clone(&record));
        if spec.dedup_enabled {
            if let Some(key) = &spec.dedup_key {
                state.dedup_map.insert(key.clone(), Arc::clone(&record));
            }
        }
        state
            .sub_queues
            .get_mut(&record.priority)
            .expect("all priorities pre-populated")
            .push_back(record);

        self.inner.stats.record_enqueued();
        #[cfg(feature = "metrics")]
        {
            metrics::counter!("request_engine_queue_enqueued_total").increment(1);
            metrics::gauge!("request_engine_queue_pending").set(state.pending_len() as f64);
        }
        drop(state);

        self.process_tick();
        Ok(rx)
    }

    /// Pops and starts as many pending requests as available concurrency
    /// allows. Called from the periodic timer and immediately after every
    /// `enqueue`/`resume` (§4.5).
    fn process_tick(&self) {
        loop {
            let record = {
                let mut state = self.inner.queue_state.lock();
                if state.paused {
                    return;
                }
                let executing_count = self.inner.executing.lock().len();
                if executing_count >= self.inner.config.max_concurrent {
                    return;
                }
                match Self::pop_next(&mut state, &self.inner.config, &self.inner.stats) {
                    Some(record) => record,
                    None => return,
                }
            };

            self.inner.executing.lock().insert(record.id);
            let queue = self.clone();
            self.inner.spawner.spawn(Box::pin(async move {
                queue.run(record).await;
            }));
        }
    }

    /// Pops the oldest request from the highest non-empty priority
    /// sub-queue, skipping (and completing as expired) any request that has
    /// been pending longer than `max_queue_time`.
    fn pop_next(state: &mut QueueState, config: &QueueConfig, stats: &QueueStatistics) -> Option<Arc<RequestRecord>> {
        loop {
            let mut found = None;
            for priority in Priority::ALL_DESCENDING {
                if let Some(queue) = state.sub_queues.get_mut(&priority) {
                    if let Some(record) = queue.pop_front() {
                        found = Some(record);
                        break;
                    }
                }
            }
            let record = found?;

            let expired = config
                .max_queue_time
                .is_some_and(|max| record.enqueued_at.elapsed() > max);
            if expired {
                Self::remove_from_dedup(state, &record);
                state.by_id.remove(&record.id);
                if record.try_complete() {
                    stats.record_expired();
                    record.fulfill(Err(EngineError::cancelled()));
                }
                continue;
            }

            return Some(record);
        }
    }

    fn remove_from_dedup(state: &mut QueueState, record: &Arc<RequestRecord>) {
        if let Some(key) = &record.dedup_key {
            if let Some(existing) = state.dedup_map.get(key) {
                if Arc::ptr_eq(existing, record) {
                    state.dedup_map.remove(key);
                }
            }
        }
    }

    /// Executes `record`, applying the timeout watchdog and the retry /
    /// idempotency-filter policy of §4.5. Retries are rescheduled onto the
    /// queue rather than looped locally, so a retried request re-competes
    /// for a concurrency slot under its original priority.
    async fn run(&self, record: Arc<RequestRecord>) {
        if record.completed.load(std::sync::atomic::Ordering::SeqCst) {
            self.finish_executing(&record);
            return;
        }

        let start = Instant::now();
        let task_future = (record.task)();
        let timed_out_error = || operation_error(ErrorCode::ReceiveTimeout, "request timed out in queue");

        let outcome: Result<TransportOutcome, ()> = tokio::select! {
            res = task_future => Ok(res),
            _ = tokio::time::sleep(record.timeout) => Err(()),
        };

        let elapsed = start.elapsed();
        self.inner.stats.record_executed(elapsed);
        #[cfg(feature = "metrics")]
        metrics::histogram!("request_engine_queue_execution_duration_seconds").record(elapsed.as_secs_f64());

        let result: CompletionResult = match outcome {
            Ok(Ok(transport_result)) => Ok(transport_result),
            Ok(Err(failure)) => Err(classify(
                failure,
                &RequestContext {
                    method: record.method.as_str().to_string(),
                    url: record.url.clone(),
                },
            )),
            Err(()) => {
                self.inner.stats.record_timeout();
                #[cfg(feature = "metrics")]
                metrics::counter!("request_engine_queue_timeout_total").increment(1);
                Err(timed_out_error())
            }
        };

        match result {
            Ok(transport_result) => {
                self.inner.stats.record_success();
                #[cfg(feature = "metrics")]
                metrics::counter!("request_engine_queue_success_total").increment(1);
                self.finish_executing(&record);
                if record.try_complete() {
                    self.remove_record(&record);
                    record.fulfill(Ok(transport_result));
                }
            }
            Err(error) => self.handle_failure(record, error).await,
        }
    }

    async fn handle_failure(&self, record: Arc<RequestRecord>, error: EngineError) {
        let retry_count = record.retry_count.load(std::sync::atomic::Ordering::SeqCst);
        let allow_retry = if record.is_idempotent() {
            error.is_retryable()
        } else {
            // Non-idempotent methods only retry when the request never
            // reached the server (§4.5 "Idempotency filter").
            matches!(error.code, ErrorCode::ConnectTimeout | ErrorCode::ConnectionError)
        };

        if allow_retry && retry_count < record.max_retries {
            record.retry_count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.stats.record_retry();
            #[cfg(feature = "metrics")]
            metrics::counter!("request_engine_queue_retry_total").increment(1);
            self.finish_executing(&record);

            let delay = request_engine_config::retry_delay(retry_count + 1, record.retry_base_delay, record.exponential_backoff);
            tokio::time::sleep(delay).await;

            if record.completed.load(std::sync::atomic::Ordering::SeqCst) {
                return;
            }
            let mut state = self.inner.queue_state.lock();
            state
                .sub_queues
                .get_mut(&record.priority)
                .expect("all priorities pre-populated")
                .push_back(record);
            drop(state);
            self.process_tick();
        } else {
            self.inner.stats.record_failure();
            #[cfg(feature = "metrics")]
            metrics::counter!("request_engine_queue_failure_total").increment(1);
            self.finish_executing(&record);
            if record.try_complete() {
                self.remove_record(&record);
                record.fulfill(Err(error));
            }
        }
    }

    fn finish_executing(&self, record: &Arc<RequestRecord>) {
        self.inner.executing.lock().remove(&record.id);
    }

    fn remove_record(&self, record: &Arc<RequestRecord>) {
        let mut state = self.inner.queue_state.lock();
        Self::remove_from_dedup(&mut state, record);
        state.by_id.remove(&record.id);
    }

    /// Removes `id` from the pending queue or, if executing, signals the
    /// task's cancellation token (best-effort: §5). Either way, the
    /// completion flip guarantees exactly-once completion with a
    /// `requestCancelled` error.
    pub fn cancel(&self, id: Uuid) {
        let record = {
            let mut state = self.inner.queue_state.lock();
            let record = state.by_id.get(&id).cloned();
            if let Some(record) = &record {
                for queue in state.sub_queues.values_mut() {
                    queue.retain(|r| r.id != id);
                }
                Self::remove_from_dedup(&mut state, record);
                state.by_id.remove(&id);
            }
            record
        };

        let Some(record) = record else { return };
        record.cancel.cancel();
        if record.try_complete() {
            self.inner.stats.record_cancelled();
            self.finish_executing(&record);
            record.fulfill(Err(EngineError::cancelled()));
        }
    }

    /// Pauses the processing tick; requests already executing are allowed
    /// to finish (§4.5 "Pause/resume/clear").
    pub fn pause(&self) {
        self.inner.queue_state.lock().paused = true;
    }

    pub fn resume(&self) {
        self.inner.queue_state.lock().paused = false;
        self.process_tick();
    }

    /// Fails every pending request (optionally restricted to `priority`)
    /// with a cancellation error and clears the dedup map entries for them.
    pub fn clear(&self, priority: Option<Priority>) {
        let drained: Vec<Arc<RequestRecord>> = {
            let mut state = self.inner.queue_state.lock();
            let priorities = match priority {
                Some(p) => vec![p],
                None => Priority::ALL_DESCENDING.to_vec(),
            };
            let mut drained = Vec::new();
            for p in priorities {
                if let Some(queue) = state.sub_queues.get_mut(&p) {
                    drained.extend(queue.drain(..));
                }
            }
            for record in &drained {
                Self::remove_from_dedup(&mut state, record);
                state.by_id.remove(&record.id);
            }
            drained
        };

        for record in drained {
            if record.try_complete() {
                record.fulfill(Err(EngineError::cancelled()));
            }
        }
    }

    pub fn statistics(&self) -> QueueStatisticsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn executing_count(&self) -> usize {
        self.inner.executing.lock().len()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.queue_state.lock().pending_len()
    }

    /// Stops the processing timer and rejects further `enqueue` calls
    /// (§5 "Resource lifecycle"). Idempotent.
    pub async fn dispose(&self) {
        self.inner.disposed.store(true, std::sync::atomic::Ordering::SeqCst);
        if let Some(handle) = self.inner.processing_task.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use request_engine_core::Method;
    use request_engine_transport::TransportResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_task(calls: Arc<AtomicUsize>, status: u16) -> QueueTask {
        Arc::new(move || {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(TransportResult {
                    status,
                    headers: HashMap::new(),
                    body: Vec::new(),
                })
            })
        })
    }

    fn spec(task: QueueTask) -> EnqueueSpec {
        EnqueueSpec {
            id: None,
            priority: Priority::Normal,
            method: Method::Get,
            url: "http://x/y".to_string(),
            dedup_key: None,
            dedup_enabled: false,
            timeout: Duration::from_secs(5),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(10),
            exponential_backoff: true,
            task,
        }
    }

    #[tokio::test]
    async fn enqueue_then_complete_succeeds() {
        let queue = RequestQueue::new(QueueConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let rx = queue.enqueue(spec(counting_task(calls, 200))).unwrap();
        let result = rx.await.unwrap();
        assert_eq!(result.unwrap().status, 200);
    }

    #[tokio::test]
    async fn s1_dedup_collapses_two_concurrent_requests() {
        let queue = RequestQueue::new(QueueConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut s1 = spec(counting_task(Arc::clone(&calls), 200));
        s1.dedup_enabled = true;
        s1.dedup_key = Some("GET:/u/1".to_string());
        let mut s2 = spec(counting_task(Arc::clone(&calls), 200));
        s2.dedup_enabled = true;
        s2.dedup_key = Some("GET:/u/1".to_string());

        let rx1 = queue.enqueue(s1).unwrap();
        let rx2 = queue.enqueue(s2).unwrap();

        let (r1, r2) = tokio::join!(rx1, rx2);
        assert_eq!(r1.unwrap().unwrap().status, r2.unwrap().unwrap().status);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.statistics().duplicated, 1);
    }

    #[tokio::test]
    async fn s4_post_with_500_is_not_retried() {
        use request_engine_core::TransportFailure;

        let queue = RequestQueue::new(QueueConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let task: QueueTask = Arc::new(move || {
            let calls = Arc::clone(&calls_clone);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TransportFailure::HttpStatus {
                    status: 500,
                    message: "internal server error".to_string(),
                })
            })
        });
        let mut s = spec(task);
        s.method = Method::Post;
        let rx = queue.enqueue(s).unwrap();
        let result = rx.await.unwrap();
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.statistics().retried, 0);
    }

    #[tokio::test]
    async fn max_queue_size_rejects_further_enqueues() {
        let config = QueueConfig::builder().max_queue_size(1).max_concurrent(0).build();
        let queue = RequestQueue::new(config);
        let calls = Arc::new(AtomicUsize::new(0));
        let _rx = queue.enqueue(spec(counting_task(Arc::clone(&calls), 200))).unwrap();
        let second = queue.enqueue(spec(counting_task(calls, 200)));
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn cancel_fails_a_pending_request() {
        let config = QueueConfig::builder().max_concurrent(0).build();
        let queue = RequestQueue::new(config);
        let calls = Arc::new(AtomicUsize::new(0));

        let id = Uuid::new_v4();
        let mut s = spec(counting_task(calls, 200));
        s.id = Some(id);
        let rx = queue.enqueue(s).unwrap();

        queue.cancel(id);
        let result = rx.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn expired_while_queued_is_dropped_before_it_ever_executes() {
        let config = QueueConfig::builder()
            .max_concurrent(1)
            .max_queue_time(Some(Duration::from_millis(20)))
            .processing_interval(Duration::from_millis(5))
            .build();
        let queue = RequestQueue::new(config);

        let slow_calls = Arc::new(AtomicUsize::new(0));
        let slow_calls_clone = Arc::clone(&slow_calls);
        let slow_task: QueueTask = Arc::new(move || {
            let calls = Arc::clone(&slow_calls_clone);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(TransportResult {
                    status: 200,
                    headers: HashMap::new(),
                    body: Vec::new(),
                })
            })
        });
        // Occupies the only concurrency slot for 100ms, long enough for the
        // second request below to sit pending past `max_queue_time`.
        let _slow_rx = queue.enqueue(spec(slow_task)).unwrap();

        let never_calls = Arc::new(AtomicUsize::new(0));
        let rx = queue.enqueue(spec(counting_task(Arc::clone(&never_calls), 200))).unwrap();

        let result = rx.await.unwrap();
        assert!(result.is_err());
        assert_eq!(never_calls.load(Ordering::SeqCst), 0);
        assert_eq!(queue.statistics().expired, 1);
    }

    #[tokio::test]
    async fn dispose_then_enqueue_returns_an_operational_error() {
        let queue = RequestQueue::new(QueueConfig::default());
        queue.dispose().await;
        let calls = Arc::new(AtomicUsize::new(0));
        assert!(queue.enqueue(spec(counting_task(calls, 200))).is_err());
    }
}

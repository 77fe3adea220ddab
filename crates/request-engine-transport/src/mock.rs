//! An in-memory [`Transport`] double used by the queue/executor test suites
//! and by any property test exercising §8 without a real HTTP stack.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use request_engine_core::TransportFailure;
use tokio_util::sync::CancellationToken;

use crate::options::{ProgressSink, RequestOptions, TransportResult};
use crate::Transport;

enum Outcome {
    Success(TransportResult),
    Failure(TransportFailure),
}

/// A request as observed by the mock, recorded for test assertions (e.g.
/// S1's "transport receives exactly one request").
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: request_engine_core::Method,
    pub url: String,
    pub body: Option<Vec<u8>>,
}

struct State {
    queued: VecDeque<Outcome>,
    default_status: u16,
    calls: Vec<RecordedCall>,
}

/// Queue up responses/failures with [`MockTransport::push_status`] etc.;
/// each `send`/`download` call pops the next queued outcome, falling back to
/// a plain 200 once the queue is empty.
pub struct MockTransport {
    state: Mutex<State>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                queued: VecDeque::new(),
                default_status: 200,
                calls: Vec::new(),
            }),
        }
    }

    pub fn push_status(&self, status: u16) -> &Self {
        self.push_response(status, Vec::new())
    }

    pub fn push_response(&self, status: u16, body: Vec<u8>) -> &Self {
        let mut state = self.state.lock().expect("mock transport lock poisoned");
        state.queued.push_back(Outcome::Success(TransportResult {
            status,
            headers: HashMap::new(),
            body,
        }));
        self
    }

    pub fn push_failure(&self, failure: TransportFailure) -> &Self {
        let mut state = self.state.lock().expect("mock transport lock poisoned");
        state.queued.push_back(Outcome::Failure(failure));
        self
    }

    pub fn set_default_status(&self, status: u16) {
        self.state.lock().expect("mock transport lock poisoned").default_status = status;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().expect("mock transport lock poisoned").calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().expect("mock transport lock poisoned").calls.len()
    }

    fn next_outcome(&self, call: RecordedCall) -> Outcome {
        let mut state = self.state.lock().expect("mock transport lock poisoned");
        state.calls.push(call);
        state.queued.pop_front().unwrap_or_else(|| {
            Outcome::Success(TransportResult {
                status: state.default_status,
                headers: HashMap::new(),
                body: Vec::new(),
            })
        })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        options: &RequestOptions,
        cancel: CancellationToken,
        progress: Option<&(dyn ProgressSink)>,
    ) -> Result<TransportResult, TransportFailure> {
        if cancel.is_cancelled() {
            return Err(TransportFailure::Cancelled);
        }
        let call = RecordedCall {
            method: options.method,
            url: options.url.clone(),
            body: options.body.clone(),
        };
        if let Some(sink) = progress {
            sink.on_progress(0, options.body.as_ref().map(|b| b.len() as u64));
        }
        match self.next_outcome(call) {
            Outcome::Success(result) => {
                if let Some(sink) = progress {
                    sink.on_progress(result.body.len() as u64, Some(result.body.len() as u64));
                }
                Ok(result)
            }
            Outcome::Failure(failure) => Err(failure),
        }
    }

    async fn download(
        &self,
        options: &RequestOptions,
        save_path: &Path,
        cancel: CancellationToken,
        progress: Option<&(dyn ProgressSink)>,
    ) -> Result<TransportResult, TransportFailure> {
        if cancel.is_cancelled() {
            return Err(TransportFailure::Cancelled);
        }
        let call = RecordedCall {
            method: options.method,
            url: options.url.clone(),
            body: options.body.clone(),
        };
        match self.next_outcome(call) {
            Outcome::Success(result) => {
                if let Some(parent) = save_path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| TransportFailure::Other { detail: e.to_string() })?;
                }
                tokio::fs::write(save_path, &result.body)
                    .await
                    .map_err(|e| TransportFailure::Other { detail: e.to_string() })?;
                if let Some(sink) = progress {
                    sink.on_progress(result.body.len() as u64, Some(result.body.len() as u64));
                }
                Ok(result)
            }
            Outcome::Failure(failure) => Err(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use request_engine_core::Method;

    #[tokio::test]
    async fn default_outcome_is_200() {
        let transport = MockTransport::new();
        let options = RequestOptions::new(Method::Get, "http://example.test/u/1");
        let result = transport.send(&options, CancellationToken::new(), None).await.unwrap();
        assert_eq!(result.status, 200);
    }

    #[tokio::test]
    async fn queued_outcomes_are_consumed_in_order() {
        let transport = MockTransport::new();
        transport.push_status(503);
        transport.push_status(503);
        transport.push_status(200);

        let options = RequestOptions::new(Method::Get, "http://example.test/u/1");
        let mut statuses = Vec::new();
        for _ in 0..3 {
            let result = transport.send(&options, CancellationToken::new(), None).await.unwrap();
            statuses.push(result.status);
        }

        assert_eq!(statuses, vec![503, 503, 200]);
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits_before_recording_a_call() {
        let transport = MockTransport::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let options = RequestOptions::new(Method::Get, "http://example.test/u/1");
        let result = transport.send(&options, cancel, None).await;
        assert!(matches!(result, Err(TransportFailure::Cancelled)));
        assert_eq!(transport.call_count(), 0);
    }
}

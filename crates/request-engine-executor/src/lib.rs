//! Binds typed `Request<T>` values through cache, dedup, the queue, the
//! transport, and the interceptor chain to produce a `Response<T>` (§4.6).
//!
//! This crate owns none of its collaborators: a [`CacheStore`], a
//! [`RequestQueue`], an [`InterceptorChain`], and a [`Transport`] are built
//! elsewhere (typically by the `request-engine` facade) and handed to
//! [`Executor::new`].
//!
//! [`CacheStore`]: request_engine_cache::CacheStore
//! [`RequestQueue`]: request_engine_queue::RequestQueue
//! [`InterceptorChain`]: request_engine_interceptor::InterceptorChain
//! [`Transport`]: request_engine_transport::Transport

mod download;
mod executor;
mod lifecycle;
mod request;
mod response;

pub use download::DownloadRequest;
pub use executor::{no_op_parser, text_parser, Executor, ExecutorConfig};
pub use lifecycle::{ExecutionEvent, ExecutionEventKind, Lifecycle};
pub use request::{CachePolicy, ErrorMapper, Parser, Request, RetryPolicy};
pub use response::{DownloadOutcome, Response};

#[cfg(feature = "json")]
pub use executor::json_parser;

#[cfg(test)]
mod tests {
    use super::*;
    use request_engine_cache::CacheStore;
    use request_engine_config::{CacheConfig, NetworkConfig};
    use request_engine_core::{Method, TransportFailure};
    use request_engine_interceptor::InterceptorChain;
    use request_engine_queue::{QueueConfig, RequestQueue};
    use request_engine_transport::MockTransport;
    use std::sync::Arc;
    use std::time::Duration;

    async fn executor_with(transport: Arc<MockTransport>) -> (Executor, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache_config = CacheConfig::builder().cleanup_interval(Duration::from_secs(3600)).build();
        let cache = CacheStore::open(cache_config, Some(dir.path().to_path_buf())).await.unwrap();
        let queue = RequestQueue::new(QueueConfig::default());
        let interceptors = Arc::new(InterceptorChain::new());
        let network = NetworkConfig::builder("http://example.test").build();
        let executor = Executor::new(ExecutorConfig::from_network_config(&network), cache, queue, interceptors, transport);
        (executor, dir)
    }

    fn text_request(path: &str) -> Request<String> {
        Request::new(Method::Get, path, text_parser())
    }

    #[tokio::test]
    async fn a_successful_get_parses_the_body_and_writes_the_cache() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, b"hello".to_vec());
        let (executor, _dir) = executor_with(Arc::clone(&transport)).await;

        let response = executor.execute(text_request("/u/1")).await.unwrap();
        assert_eq!(response.data.as_deref(), Some("hello"));
        assert!(!response.from_cache);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn a_cache_hit_never_reaches_the_transport() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, b"hello".to_vec());
        let (executor, _dir) = executor_with(Arc::clone(&transport)).await;

        executor.execute(text_request("/u/1")).await.unwrap();
        let response = executor.execute(text_request("/u/1")).await.unwrap();

        assert!(response.from_cache);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn disabling_cache_issues_a_transport_call_every_time() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, b"a".to_vec());
        transport.push_response(200, b"b".to_vec());
        let (executor, _dir) = executor_with(Arc::clone(&transport)).await;

        executor.execute(text_request("/u/1").without_cache()).await.unwrap();
        executor.execute(text_request("/u/1").without_cache()).await.unwrap();

        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn a_500_status_is_surfaced_as_a_server_error() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(500);
        let (executor, _dir) = executor_with(Arc::clone(&transport)).await;

        let err = executor
            .execute(text_request("/u/1").with_retry(RetryPolicy {
                max_retries: 0,
                base_delay: Duration::from_millis(1),
                exponential_backoff: false,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, request_engine_core::ErrorCode::InternalServerError);
    }

    #[tokio::test]
    async fn a_parse_failure_is_classified_as_data_parse_error() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, vec![0xff, 0xfe]); // not valid UTF-8
        let (executor, _dir) = executor_with(Arc::clone(&transport)).await;

        let err = executor.execute(text_request("/u/1")).await.unwrap_err();
        assert_eq!(err.code, request_engine_core::ErrorCode::ParseError);
    }

    #[tokio::test]
    async fn execute_batch_returns_one_result_per_request_even_when_some_fail() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(200);
        transport.push_status(500);
        let (executor, _dir) = executor_with(Arc::clone(&transport)).await;

        let no_retry = || RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(1),
            exponential_backoff: false,
        };
        let requests = vec![
            text_request("/u/1").without_cache().with_retry(no_retry()),
            text_request("/u/2").without_cache().with_retry(no_retry()),
        ];
        let results = executor.execute_batch(requests).await;
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[tokio::test]
    async fn download_streams_the_body_to_the_save_path() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, b"file-contents".to_vec());
        let (executor, dir) = executor_with(Arc::clone(&transport)).await;

        let save_path = dir.path().join("nested").join("out.bin");
        let response = executor
            .download(DownloadRequest::new(Method::Get, "/file", &save_path))
            .await
            .unwrap();

        let outcome = response.data.unwrap();
        assert_eq!(outcome.bytes_written, "file-contents".len() as u64);
        let written = tokio::fs::read(&save_path).await.unwrap();
        assert_eq!(written, b"file-contents");
    }

    #[tokio::test]
    async fn cancel_resolves_an_in_flight_request_exactly_once() {
        let transport = Arc::new(MockTransport::new());
        let (executor, _dir) = executor_with(Arc::clone(&transport)).await;

        let id = uuid::Uuid::new_v4();
        let request = text_request("/u/1").with_id(id).without_cache();
        let handle = tokio::spawn({
            let executor = executor.clone();
            async move { executor.execute(request).await }
        });
        executor.cancel(id);
        // Either a valid completion or a cancellation is a correct exactly-once
        // resolution; the important thing is that it resolves at all.
        let _ = handle.await.unwrap();
    }

    #[tokio::test]
    async fn a_connect_timeout_is_retried_then_surfaced() {
        let transport = Arc::new(MockTransport::new());
        transport.push_failure(TransportFailure::ConnectTimeout);
        transport.push_failure(TransportFailure::ConnectTimeout);
        let (executor, _dir) = executor_with(Arc::clone(&transport)).await;

        let err = executor
            .execute(text_request("/u/1").without_cache().with_retry(RetryPolicy {
                max_retries: 1,
                base_delay: Duration::from_millis(1),
                exponential_backoff: false,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, request_engine_core::ErrorCode::ConnectTimeout);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn dispose_rejects_further_executions() {
        let transport = Arc::new(MockTransport::new());
        let (executor, _dir) = executor_with(Arc::clone(&transport)).await;
        executor.dispose().await;
        assert!(executor.execute(text_request("/u/1")).await.is_err());
    }
}

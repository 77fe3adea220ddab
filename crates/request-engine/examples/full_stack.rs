//! A tour of the engine end to end: presets, retries, caching, downloads,
//! runtime reconfiguration, and the metrics snapshot — all against a mock
//! transport so the example needs no network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use request_engine::{presets, Preset, System};
use request_engine_core::{Method, TransportFailure};
use request_engine_executor::{json_parser, DownloadRequest, Request, RetryPolicy};
use request_engine_transport::MockTransport;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Greeting {
    message: String,
}

#[tokio::main]
async fn main() {
    println!("=== request-engine: full stack ===\n");

    demo_retry_then_success().await;
    demo_cache_hits().await;
    demo_download().await;
    demo_runtime_reconfiguration().await;
    demo_metrics_snapshot().await;

    println!("\n=== done ===");
}

async fn demo_retry_then_success() {
    println!("--- Retry: transient failures then a 200 ---");

    let transport = Arc::new(MockTransport::new());
    transport.push_failure(TransportFailure::ConnectTimeout);
    transport.push_failure(TransportFailure::SendTimeout);
    transport.push_response(200, br#"{"message":"hello after retries"}"#.to_vec());

    let (network, cache_config) = presets::development("https://api.example.com");
    let system = System::new(network, cache_config, transport.clone()).await.unwrap();

    let mut request = Request::new(Method::Get, "/greeting", json_parser::<Greeting>());
    request.retry = Some(RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(1),
        exponential_backoff: true,
    });

    let response = system.executor().execute(request).await.unwrap();
    println!(
        "  status={} attempts_seen_by_transport={} message={:?}\n",
        response.status_code,
        transport.call_count(),
        response.data.map(|g| g.message)
    );

    system.dispose().await;
}

async fn demo_cache_hits() {
    println!("--- Cache: repeat requests stop reaching the transport ---");

    let transport = Arc::new(MockTransport::new());
    transport.push_response(200, br#"{"message":"cached greeting"}"#.to_vec());

    let (network, cache_config) = presets::fast_response("https://api.example.com");
    let system = System::new(network, cache_config, transport.clone()).await.unwrap();

    for i in 1..=3 {
        let request = Request::new(Method::Get, "/greeting", json_parser::<Greeting>());
        let response = system.executor().execute(request).await.unwrap();
        println!("  call {i}: from_cache={}", response.from_cache);
    }
    println!("  transport calls: {}\n", transport.call_count());

    system.dispose().await;
}

async fn demo_download() {
    println!("--- Download: streamed to a temp file ---");

    let transport = Arc::new(MockTransport::new());
    transport.push_response(200, b"the full body of the download".to_vec());

    let (network, cache_config) = presets::development("https://api.example.com");
    let system = System::new(network, cache_config, transport).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let save_path = dir.path().join("payload.bin");
    let request = DownloadRequest::new(Method::Get, "/archive.bin", &save_path);

    let response = system.executor().download(request).await.unwrap();
    let outcome = response.data.unwrap();
    println!("  wrote {} bytes to {}\n", outcome.bytes_written, outcome.path.display());

    system.dispose().await;
}

async fn demo_runtime_reconfiguration() {
    println!("--- Config: switching presets at runtime ---");

    let transport = Arc::new(MockTransport::new());
    let (network, cache_config) = presets::development("https://api.example.com");
    let system = System::new(network, cache_config, transport).await.unwrap();

    let before = system.config().get_runtime();
    println!("  before: environment={:?}", before.0.environment);

    match system.config().apply_preset(Preset::Production, "https://api.example.com") {
        Ok(result) => {
            let after = system.config().get_runtime();
            println!(
                "  after: environment={:?} valid={} warnings={}",
                after.0.environment,
                result.is_valid,
                result.warnings.len()
            );
        }
        Err(err) => println!("  rejected: {err}"),
    }
    println!();

    system.dispose().await;
}

async fn demo_metrics_snapshot() {
    println!("--- Metrics: subscribing to periodic snapshots ---");

    let transport = Arc::new(MockTransport::new());
    transport.push_response(200, br#"{"message":"tracked"}"#.to_vec());

    let (network, cache_config) = presets::development("https://api.example.com");
    let system = System::new(network, cache_config, transport).await.unwrap();

    let snapshots_seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&snapshots_seen);
    system
        .metrics()
        .subscribe(Arc::new(move |snapshot| {
            let _ = snapshot;
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

    let request = Request::new(Method::Get, "/greeting", json_parser::<Greeting>());
    system.executor().execute(request).await.unwrap();

    let snapshot = system.metrics().snapshot().unwrap();
    println!(
        "  queue executed={} cache hit_rate={:.2} subscribers notified so far={}\n",
        snapshot.queue.executed,
        snapshot.cache.hit_rate(),
        snapshots_seen.load(Ordering::SeqCst)
    );

    system.dispose().await;
}

//! A minimal request cycle: build a `System`, fire a handful of requests
//! through a mock transport, and watch the cache pick up the repeats.

use std::sync::Arc;

use request_engine::{presets, System};
use request_engine_core::Method;
use request_engine_executor::{text_parser, Request};
use request_engine_transport::MockTransport;

#[tokio::main]
async fn main() {
    let transport = Arc::new(MockTransport::new());
    transport.push_response(200, b"hello from /greeting".to_vec());

    let (network, cache_config) = presets::development("https://api.example.com");
    let system = System::new(network, cache_config, transport.clone())
        .await
        .expect("system should build against an in-memory cache");

    let executor = system.executor();

    for attempt in 1..=3 {
        let request = Request::new(Method::Get, "/greeting", text_parser());
        let response = executor.execute(request).await.expect("mock transport never fails here");
        println!(
            "attempt {attempt}: status={} from_cache={} body={:?}",
            response.status_code, response.from_cache, response.data
        );
    }

    println!("transport saw {} call(s); the rest were cache hits", transport.call_count());

    system.dispose().await;
}

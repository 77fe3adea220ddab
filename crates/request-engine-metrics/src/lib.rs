//! In-process aggregation of queue/cache/interceptor/config state into a
//! single [`Snapshot`], published to subscribers on a configurable interval
//! (§4.7).
//!
//! This is deliberately separate from the `metrics` crate's counters/
//! histograms, which the `metrics` feature on the cache/queue/interceptor/
//! executor crates emits for external scraping. `Metrics` here is for
//! in-process subscribers that want a structured, point-in-time view
//! without standing up a scrape endpoint.

mod aggregator;
mod band;
mod snapshot;

pub use aggregator::{Metrics, MetricsConfig, Subscriber};
pub use band::EfficiencyBand;
pub use snapshot::{ConfigSnapshot, InterceptorSnapshot, Snapshot};

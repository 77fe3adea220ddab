//! Shared types used across the request engine's component crates: the
//! event system, the unified error taxonomy, the logging seam, the
//! task-spawning abstraction, and the small value types (`Priority`,
//! `Method`, request-key derivation) that every other crate depends on.

pub mod error;
pub mod events;
pub mod key;
pub mod logger;
pub mod method;
pub mod priority;
pub mod spawn;

pub use error::{EngineError, ErrorCategory, ErrorCode, RequestContext, TransportFailure, classify};
pub use events::{BoxedEventListener, EngineEvent, EventListener, EventListeners, FnListener};
pub use key::derive_key;
pub use logger::{LogContext, Logger, NoopLogger};
pub use method::Method;
pub use priority::Priority;
pub use spawn::{Spawner, TaskHandle, TokioSpawner};

#[cfg(feature = "tracing")]
pub use logger::TracingLogger;

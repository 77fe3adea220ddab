//! Per-execution lifecycle tracking (§4.6).
//!
//! A response already delivered by the transport must not be re-labelled as
//! a timeout even if the overall deadline fires after parse — the tracker
//! disambiguates by recording `complete` the moment the result is known,
//! before any later timer can race it.

use std::time::{Duration, Instant};

use request_engine_core::EngineEvent;

#[derive(Debug, Clone, Copy)]
pub enum ExecutionEventKind {
    Started,
    FirstBytes,
    ParseComplete,
    Completed { success: bool },
}

/// Emitted at each lifecycle stage of one execution; the metrics crate
/// subscribes to a stream of these to compute its aggregates.
#[derive(Debug)]
pub struct ExecutionEvent {
    pub source: String,
    pub timestamp: Instant,
    pub kind: ExecutionEventKind,
}

impl EngineEvent for ExecutionEvent {
    fn event_type(&self) -> &'static str {
        match self.kind {
            ExecutionEventKind::Started => "execution_started",
            ExecutionEventKind::FirstBytes => "execution_first_bytes",
            ExecutionEventKind::ParseComplete => "execution_parse_complete",
            ExecutionEventKind::Completed { .. } => "execution_completed",
        }
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn source_name(&self) -> &str {
        &self.source
    }
}

/// Timestamps for one execution: start, first bytes, parse complete,
/// complete. `start` to `complete` is the duration reported on `Response`.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    pub start: Instant,
    pub first_bytes: Option<Instant>,
    pub parse_complete: Option<Instant>,
    pub complete: Option<Instant>,
}

impl Lifecycle {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            first_bytes: None,
            parse_complete: None,
            complete: None,
        }
    }

    pub fn mark_first_bytes(&mut self) {
        if self.first_bytes.is_none() {
            self.first_bytes = Some(Instant::now());
        }
    }

    pub fn mark_parse_complete(&mut self) {
        self.parse_complete = Some(Instant::now());
    }

    /// Records `complete` and returns the elapsed time since `start`. A
    /// no-op past the first call, so a late watchdog can't overwrite an
    /// already-recorded completion.
    pub fn mark_complete(&mut self) -> Duration {
        let now = *self.complete.get_or_insert_with(Instant::now);
        now.duration_since(self.start)
    }
}

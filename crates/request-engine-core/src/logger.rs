//! Minimal structured-logging seam used by every component in the engine.
//!
//! Components take a `Arc<dyn Logger>` rather than calling `tracing` macros
//! directly, so a host application can redirect engine diagnostics into its
//! own logging pipeline. The default implementation forwards to `tracing`.

use std::fmt;

/// Structured context attached to a log line.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    pub component: &'static str,
    pub fields: Vec<(&'static str, String)>,
}

impl LogContext {
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            fields: Vec::new(),
        }
    }

    pub fn with(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }
}

/// Logging seam implemented by the host application or the bundled
/// `TracingLogger`.
pub trait Logger: Send + Sync {
    fn debug(&self, ctx: &LogContext, message: &str);
    fn info(&self, ctx: &LogContext, message: &str);
    fn warn(&self, ctx: &LogContext, message: &str);
    fn error(&self, ctx: &LogContext, message: &str);
}

/// A [`Logger`] that discards everything. Used as the default when no
/// logger is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _ctx: &LogContext, _message: &str) {}
    fn info(&self, _ctx: &LogContext, _message: &str) {}
    fn warn(&self, _ctx: &LogContext, _message: &str) {}
    fn error(&self, _ctx: &LogContext, _message: &str) {}
}

/// A [`Logger`] that forwards to the `tracing` crate, tagging every line
/// with the emitting component's name.
#[cfg(feature = "tracing")]
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

#[cfg(feature = "tracing")]
impl Logger for TracingLogger {
    fn debug(&self, ctx: &LogContext, message: &str) {
        tracing::debug!(component = ctx.component, fields = ?ctx.fields, "{message}");
    }

    fn info(&self, ctx: &LogContext, message: &str) {
        tracing::info!(component = ctx.component, fields = ?ctx.fields, "{message}");
    }

    fn warn(&self, ctx: &LogContext, message: &str) {
        tracing::warn!(component = ctx.component, fields = ?ctx.fields, "{message}");
    }

    fn error(&self, ctx: &LogContext, message: &str) {
        tracing::error!(component = ctx.component, fields = ?ctx.fields, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_logger_does_not_panic() {
        let logger = NoopLogger;
        let ctx = LogContext::new("test").with("key", "value");
        logger.debug(&ctx, "hi");
        logger.info(&ctx, "hi");
        logger.warn(&ctx, "hi");
        logger.error(&ctx, "hi");
    }
}

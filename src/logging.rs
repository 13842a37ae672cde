//! Logging capability
//!
//! The layout pipeline and the cache report what they do through one small
//! trait instead of a logging backend of their own. Hosts pick the sink:
//! [`NullLogger`] discards, [`TracingLogger`] forwards to `tracing`, and the
//! CLI's `Output` prints verbose lines to stderr.

use std::sync::Arc;

/// Sink for diagnostic messages
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Discards every message
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn info(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}

/// Forwards messages to the `tracing` macros under the `calplan` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "calplan", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "calplan", "{}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "calplan", "{}", message);
    }
}

/// Shared handle used by long-lived components
pub type SharedLogger = Arc<dyn Logger>;

/// Returns a shared logger that discards everything
pub fn null_logger() -> SharedLogger {
    Arc::new(NullLogger)
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryLogger;
    use super::*;

    #[test]
    fn shared_logger_forwards_to_inner() {
        let memory = Arc::new(MemoryLogger::default());
        let shared: SharedLogger = memory.clone();

        shared.info("ready");
        shared.debug("detail");
        shared.error("broken");

        assert_eq!(memory.lines(), vec!["info: ready", "debug: detail", "error: broken"]);
    }

    #[test]
    fn null_and_tracing_loggers_accept_messages() {
        null_logger().error("dropped");
        TracingLogger.info("no subscriber installed");
    }
}

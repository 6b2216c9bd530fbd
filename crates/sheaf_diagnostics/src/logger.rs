//! The logging collaborator interface.

use crate::severity::Severity;

/// Receives one record per reportable event.
///
/// Implementations must be thread-safe: a single logger is shared by every
/// request flowing through a cache or orchestrator.
pub trait Logger: Send + Sync {
    /// Records `message` at the given severity.
    fn write(&self, level: Severity, message: &str);
}

/// Forwards records to the `tracing` subscriber installed by the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn write(&self, level: Severity, message: &str) {
        match level {
            Severity::Debug => tracing::debug!(target: "sheaf", "{message}"),
            Severity::Info => tracing::info!(target: "sheaf", "{message}"),
            Severity::Warning => tracing::warn!(target: "sheaf", "{message}"),
            Severity::Error => tracing::error!(target: "sheaf", "{message}"),
        }
    }
}

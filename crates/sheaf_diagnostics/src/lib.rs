//! Severity levels and the logging collaborator used by the pipeline.
//!
//! The [`Logger`] trait is the seam through which the cache and the fallback
//! orchestrator report problems. [`TracingLogger`] forwards records to
//! `tracing`; the thread-safe [`LogSink`] keeps them in memory so callers can
//! inspect what went wrong.

#![warn(missing_docs)]

pub mod logger;
pub mod severity;
pub mod sink;

pub use logger::{Logger, TracingLogger};
pub use severity::Severity;
pub use sink::{LogRecord, LogSink};

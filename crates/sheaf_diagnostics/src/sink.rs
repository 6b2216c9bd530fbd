//! Thread-safe in-memory log accumulator.

use crate::logger::Logger;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A single record captured by a [`LogSink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    /// Severity the record was written at.
    pub level: Severity,
    /// The message text.
    pub message: String,
}

/// A thread-safe accumulator implementing [`Logger`].
///
/// Multiple threads can write concurrently. The error count is tracked
/// atomically for fast `has_errors` checks without locking the record vector.
pub struct LogSink {
    records: Mutex<Vec<LogRecord>>,
    error_count: AtomicUsize,
}

impl LogSink {
    /// Creates a new empty sink.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            error_count: AtomicUsize::new(0),
        }
    }

    /// Returns `true` if any error-severity record has been written.
    pub fn has_errors(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) > 0
    }

    /// Returns the number of error-severity records written so far.
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Takes all accumulated records, leaving the sink empty.
    pub fn take_all(&self) -> Vec<LogRecord> {
        let mut records = self.lock();
        std::mem::take(&mut *records)
    }

    /// Returns a snapshot of all accumulated records without draining.
    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogRecord>> {
        // A panic while holding the lock leaves the vector intact.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Logger for LogSink {
    fn write(&self, level: Severity, message: &str) {
        if level.is_error() {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        self.lock().push(LogRecord {
            level,
            message: message.to_string(),
        });
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

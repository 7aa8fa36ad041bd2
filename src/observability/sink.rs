//! Span sinks: where finished spans go.
//!
//! The core never knows how spans are transported. A sink receives each
//! [`SpanRecord`] once, when its span closes.

use std::sync::Mutex;

use crate::observability::span::SpanRecord;

/// Log target used by [`LogSink`].
pub const SPAN_LOG_TARGET: &str = "calculator_app::spans";

/// Destination for completed spans.
pub trait SpanSink: Send + Sync {
    /// Accept a finished span.
    fn export(&self, record: SpanRecord);

    /// Whether the backend can currently accept spans. When this is false the
    /// tracer hands out no-op spans.
    fn is_available(&self) -> bool {
        true
    }
}

/// Emits every finished span as a structured `tracing` event.
#[derive(Debug, Default)]
pub struct LogSink;

impl SpanSink for LogSink {
    fn export(&self, record: SpanRecord) {
        let payload = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(
                    target: SPAN_LOG_TARGET,
                    error = %e,
                    name = %record.name,
                    "Failed to encode span"
                );
                return;
            }
        };

        tracing::info!(
            target: SPAN_LOG_TARGET,
            name = %record.name,
            service = %record.service,
            trace_id = %record.trace_id,
            span_id = %record.span_id,
            duration_ms = record.duration_nanos as f64 / 1_000_000.0,
            error = record.error,
            span = %payload,
            "span finished"
        );
    }
}

/// Buffers finished spans in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<SpanRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything exported so far.
    pub fn records(&self) -> Vec<SpanRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// All records with the given span name.
    pub fn named(&self, name: &str) -> Vec<SpanRecord> {
        self.lock()
            .iter()
            .filter(|r| r.name == name)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SpanRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SpanSink for MemorySink {
    fn export(&self, record: SpanRecord) {
        self.lock().push(record);
    }
}

/// Discards everything and reports itself unavailable.
#[derive(Debug, Default)]
pub struct NoopSink;

impl SpanSink for NoopSink {
    fn export(&self, _record: SpanRecord) {}

    fn is_available(&self) -> bool {
        false
    }
}

//! Span recording.
//!
//! # Responsibilities
//! - Hold the tags, metrics and error state of one traced operation
//! - Emit the finished record to the sink exactly once
//! - Close on every exit path (explicit `close()` or `Drop`)

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::observability::sink::SpanSink;
use crate::observability::tracer::TracerStats;

/// Tag key set by [`ScopedSpan::mark_error`] with the failure kind.
pub const ERROR_TYPE_TAG: &str = "error.type";
/// Tag key set by [`ScopedSpan::mark_error`] with the failure message.
pub const ERROR_MSG_TAG: &str = "error.msg";

/// Value attached to a span tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Marker for an absent input.
    Null,
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Str(s) => write!(f, "{}", s),
            TagValue::Int(i) => write!(f, "{}", i),
            TagValue::Float(v) => write!(f, "{}", v),
            TagValue::Bool(b) => write!(f, "{}", b),
            TagValue::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Str(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Str(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Int(value)
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::Float(value)
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

impl From<Option<&serde_json::Value>> for TagValue {
    fn from(value: Option<&serde_json::Value>) -> Self {
        use serde_json::Value;

        match value {
            None | Some(Value::Null) => TagValue::Null,
            Some(Value::Bool(b)) => TagValue::Bool(*b),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => TagValue::Int(i),
                None => n.as_f64().map(TagValue::Float).unwrap_or(TagValue::Null),
            },
            Some(Value::String(s)) => TagValue::Str(s.clone()),
            Some(other) => TagValue::Str(other.to_string()),
        }
    }
}

/// Identity of a span, handed to children so they join the same trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanContext {
    pub trace_id: Uuid,
    pub span_id: Uuid,
}

/// A completed (or in-flight) span as delivered to a [`SpanSink`].
#[derive(Debug, Clone, Serialize)]
pub struct SpanRecord {
    pub span_id: Uuid,
    pub trace_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub service: String,
    pub start_unix_nanos: u64,
    /// Zero until the span is closed.
    pub end_unix_nanos: u64,
    pub duration_nanos: u64,
    pub tags: HashMap<String, TagValue>,
    pub metrics: HashMap<String, f64>,
    pub error: bool,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

impl SpanRecord {
    /// Look up a tag by key.
    pub fn tag(&self, key: &str) -> Option<&TagValue> {
        self.tags.get(key)
    }

    /// Look up a metric by key.
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }
}

/// A live span whose release is tied to its scope.
///
/// Dropping the span closes it, so an early return, a `?`, a panic or a
/// cancelled future all still finish the record. Closing twice is a no-op.
pub struct ScopedSpan {
    record: SpanRecord,
    started: Instant,
    sink: Option<Arc<dyn SpanSink>>,
    stats: Arc<TracerStats>,
    closed: bool,
}

impl ScopedSpan {
    pub(crate) fn open(
        name: String,
        service: String,
        parent: Option<&SpanContext>,
        sink: Option<Arc<dyn SpanSink>>,
        stats: Arc<TracerStats>,
    ) -> Self {
        stats.record_open();

        let record = SpanRecord {
            span_id: Uuid::new_v4(),
            trace_id: parent.map(|p| p.trace_id).unwrap_or_else(Uuid::new_v4),
            parent_id: parent.map(|p| p.span_id),
            name,
            service,
            start_unix_nanos: now_nanos(),
            end_unix_nanos: 0,
            duration_nanos: 0,
            tags: HashMap::new(),
            metrics: HashMap::new(),
            error: false,
            error_kind: None,
            error_message: None,
        };

        Self {
            record,
            started: Instant::now(),
            sink,
            stats,
            closed: false,
        }
    }

    /// Identity to pass to child spans.
    pub fn context(&self) -> SpanContext {
        SpanContext {
            trace_id: self.record.trace_id,
            span_id: self.record.span_id,
        }
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Whether this span will be delivered to a sink on close.
    pub fn is_recording(&self) -> bool {
        self.sink.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Set a tag. Last write wins.
    pub fn set_tag(&mut self, key: &str, value: impl Into<TagValue>) {
        if self.closed {
            return;
        }
        self.record.tags.insert(key.to_string(), value.into());
    }

    pub fn set_metric(&mut self, key: &str, value: f64) {
        if self.closed {
            return;
        }
        self.record.metrics.insert(key.to_string(), value);
    }

    /// Flag the span as failed.
    pub fn mark_error(&mut self, kind: &str, message: &str) {
        if self.closed {
            return;
        }
        self.record.error = true;
        self.record.error_kind = Some(kind.to_string());
        self.record.error_message = Some(message.to_string());
        self.set_tag(ERROR_TYPE_TAG, kind);
        self.set_tag(ERROR_MSG_TAG, message);
    }

    /// Finish the span and hand it to the sink. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let elapsed = self.started.elapsed();
        self.record.duration_nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.record.end_unix_nanos = self
            .record
            .start_unix_nanos
            .saturating_add(self.record.duration_nanos);

        self.stats.record_close();

        if let Some(sink) = &self.sink {
            sink.export(self.record.clone());
        }
    }
}

impl Drop for ScopedSpan {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ScopedSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedSpan")
            .field("name", &self.record.name)
            .field("span_id", &self.record.span_id)
            .field("closed", &self.closed)
            .finish()
    }
}

fn now_nanos() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    u64::try_from(nanos).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::sink::MemorySink;
    use crate::observability::tracer::Tracer;

    fn tracer() -> (Tracer, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (Tracer::new("test-service", sink.clone()), sink)
    }

    #[test]
    fn test_double_close_emits_once() {
        let (tracer, sink) = tracer();
        let mut span = tracer.start_span("calculator.add", "test-service");
        span.close();
        span.close();
        drop(span);

        assert_eq!(sink.len(), 1);
        let stats = tracer.stats();
        assert_eq!(stats.opened, 1);
        assert_eq!(stats.closed, 1);
    }

    #[test]
    fn test_drop_closes_span() {
        let (tracer, sink) = tracer();
        {
            let mut span = tracer.start_span("calculator.add", "test-service");
            span.set_tag("operation.type", "add");
        }

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].end_unix_nanos >= records[0].start_unix_nanos);
        assert_eq!(records[0].tag("operation.type"), Some(&TagValue::from("add")));
    }

    #[test]
    fn test_tag_last_write_wins() {
        let (tracer, sink) = tracer();
        let mut span = tracer.start_span("op", "test-service");
        span.set_tag("input.x", 1i64);
        span.set_tag("input.x", 2i64);
        span.close();

        assert_eq!(sink.records()[0].tag("input.x"), Some(&TagValue::Int(2)));
    }

    #[test]
    fn test_mark_error_sets_fields_and_tags() {
        let (tracer, sink) = tracer();
        let mut span = tracer.start_span("op", "test-service");
        span.mark_error("DivisionByZero", "Division by zero!");
        span.close();

        let record = &sink.records()[0];
        assert!(record.error);
        assert_eq!(record.error_kind.as_deref(), Some("DivisionByZero"));
        assert_eq!(record.error_message.as_deref(), Some("Division by zero!"));
        assert_eq!(record.tag(ERROR_TYPE_TAG), Some(&TagValue::from("DivisionByZero")));
    }

    #[test]
    fn test_mutation_after_close_is_ignored() {
        let (tracer, sink) = tracer();
        let mut span = tracer.start_span("op", "test-service");
        span.close();
        span.set_tag("late", true);
        span.set_metric("late", 1.0);

        let record = &sink.records()[0];
        assert!(record.tag("late").is_none());
        assert!(record.metric("late").is_none());
    }

    #[test]
    fn test_tag_value_from_json() {
        let body = serde_json::json!({"x": 3, "y": 2.5, "z": "a", "b": true, "n": null});
        assert_eq!(TagValue::from(body.get("x")), TagValue::Int(3));
        assert_eq!(TagValue::from(body.get("y")), TagValue::Float(2.5));
        assert_eq!(TagValue::from(body.get("z")), TagValue::from("a"));
        assert_eq!(TagValue::from(body.get("b")), TagValue::Bool(true));
        assert_eq!(TagValue::from(body.get("n")), TagValue::Null);
        assert_eq!(TagValue::from(body.get("missing")), TagValue::Null);
    }
}

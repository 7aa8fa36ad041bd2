//! Span creation and scoping.
//!
//! # Design Decisions
//! - Constructed once in `main` and passed to whoever opens spans
//! - Opening a span never fails: without a usable sink the span is a no-op
//! - Cheap to clone (shared sink and counters)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::{SpanExport, TracingConfig};
use crate::observability::sink::{LogSink, SpanSink};
use crate::observability::span::{ScopedSpan, SpanContext};

/// Counters of opened and closed spans.
#[derive(Debug, Default)]
pub struct TracerStats {
    opened: AtomicU64,
    closed: AtomicU64,
}

impl TracerStats {
    pub(crate) fn record_open(&self) {
        self.opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_close(&self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            opened: self.opened.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`TracerStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub opened: u64,
    pub closed: u64,
}

impl StatsSnapshot {
    /// Spans opened but not yet closed.
    pub fn in_flight(&self) -> u64 {
        self.opened.saturating_sub(self.closed)
    }
}

/// Opens scoped spans and routes them to a sink.
#[derive(Clone)]
pub struct Tracer {
    service: Arc<str>,
    sink: Option<Arc<dyn SpanSink>>,
    stats: Arc<TracerStats>,
}

impl Tracer {
    /// Create a tracer that exports to `sink`.
    pub fn new(service: impl Into<String>, sink: Arc<dyn SpanSink>) -> Self {
        Self {
            service: Arc::from(service.into()),
            sink: Some(sink),
            stats: Arc::new(TracerStats::default()),
        }
    }

    /// Create a tracer whose spans record locally but are never exported.
    pub fn noop(service: impl Into<String>) -> Self {
        Self {
            service: Arc::from(service.into()),
            sink: None,
            stats: Arc::new(TracerStats::default()),
        }
    }

    /// Build the tracer described by the configuration.
    pub fn from_config(config: &TracingConfig) -> Self {
        if !config.enabled {
            tracing::info!(service = %config.service, "Span export disabled");
            return Self::noop(config.service.clone());
        }

        match config.export {
            SpanExport::Log => Self::new(config.service.clone(), Arc::new(LogSink)),
            SpanExport::None => Self::noop(config.service.clone()),
        }
    }

    /// Default service label for spans opened by this tracer.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Open a root span. It closes when dropped.
    pub fn start_span(&self, name: impl Into<String>, service: impl Into<String>) -> ScopedSpan {
        ScopedSpan::open(name.into(), service.into(), None, self.usable_sink(), self.stats.clone())
    }

    /// Open a span under `parent`, or a root span when there is none.
    pub fn start_child(&self, name: impl Into<String>, parent: Option<&SpanContext>) -> ScopedSpan {
        ScopedSpan::open(
            name.into(),
            self.service.to_string(),
            parent,
            self.usable_sink(),
            self.stats.clone(),
        )
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn usable_sink(&self) -> Option<Arc<dyn SpanSink>> {
        match &self.sink {
            Some(sink) if sink.is_available() => Some(sink.clone()),
            Some(_) => {
                tracing::debug!("Span sink unavailable, using no-op span");
                None
            }
            None => None,
        }
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("service", &self.service)
            .field("exporting", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::sink::{MemorySink, NoopSink};

    #[test]
    fn test_child_joins_parent_trace() {
        let sink = Arc::new(MemorySink::new());
        let tracer = Tracer::new("calculator-app", sink.clone());

        let parent = tracer.start_span("calculator.complex_calculation", "calculator-app");
        let ctx = parent.context();
        drop(tracer.start_child("calculator.steps", Some(&ctx)));
        drop(parent);

        let child = &sink.named("calculator.steps")[0];
        assert_eq!(child.trace_id, ctx.trace_id);
        assert_eq!(child.parent_id, Some(ctx.span_id));
        assert_eq!(child.service, "calculator-app");
    }

    #[test]
    fn test_unavailable_sink_yields_noop_span() {
        let tracer = Tracer::new("calculator-app", Arc::new(NoopSink));
        let mut span = tracer.start_span("calculator.add", "calculator-app");
        assert!(!span.is_recording());
        span.set_tag("operation.type", "add");
        span.close();

        assert_eq!(tracer.stats(), StatsSnapshot { opened: 1, closed: 1 });
    }

    #[test]
    fn test_from_config_disabled() {
        let config = TracingConfig {
            enabled: false,
            ..TracingConfig::default()
        };
        let tracer = Tracer::from_config(&config);
        assert_eq!(tracer.service(), "calculator-app");
        assert!(!tracer.start_span("op", "calculator-app").is_recording());
    }

    #[test]
    fn test_in_flight_count() {
        let tracer = Tracer::noop("svc");
        let span = tracer.start_span("op", "svc");
        assert_eq!(tracer.stats().in_flight(), 1);
        drop(span);
        assert_eq!(tracer.stats().in_flight(), 0);
    }
}

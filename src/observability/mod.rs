//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handler call
//!     → instrument.rs (wrap: open span, tag inputs, time, mark errors)
//!     → tracer.rs (open scoped span, child spans, open/close counters)
//!     → span.rs (tags, metrics, error state; close exactly once)
//!     → sink.rs (log, memory or no-op backend)
//!
//! Alongside:
//!     → logging.rs (structured log events)
//!     → metrics.rs (Prometheus counters and histograms)
//! ```
//!
//! # Design Decisions
//! - The tracer is injected, never global
//! - Span release is tied to scope so no exit path leaks a span
//! - Metrics are cheap (no-op until a recorder is installed)

pub mod instrument;
pub mod logging;
pub mod metrics;
pub mod sink;
pub mod span;
pub mod tracer;

pub use instrument::{Failure, Handler, Instrumentation, Instrumented, Invocation};
pub use sink::{LogSink, MemorySink, NoopSink, SpanSink};
pub use span::{ScopedSpan, SpanContext, SpanRecord, TagValue};
pub use tracer::{StatsSnapshot, Tracer};

//! Instrumentation wrapper for operation handlers.
//!
//! # Data Flow
//! ```text
//! Invocation
//!     → Instrumented::call
//!         open span "calculator.<operation>"
//!         tag operation.type, input.x, input.y
//!         → inner Handler::call
//!         success: metric operation.duration
//!         failure: mark_error(kind, message)
//!         dropped mid-call: mark_error(Cancelled, ..)
//!         close span
//!     → Result (unchanged)
//! ```
//!
//! # Design Decisions
//! - The wrapper is itself a `Handler`, so wrapping is plain composition
//! - Failures pass through untouched; mapping them to responses is the
//!   HTTP boundary's job
//! - Tagging reads raw JSON and never fails, even for malformed bodies

use std::future::Future;
use std::time::Instant;

use serde_json::Value;
use tracing::Instrument;

use crate::observability::metrics;
use crate::observability::span::{ScopedSpan, SpanContext, TagValue};
use crate::observability::tracer::Tracer;

/// Span name prefix for wrapped operations.
pub const SPAN_PREFIX: &str = "calculator";
/// Metric holding the handler's wall-clock duration in seconds.
pub const DURATION_METRIC: &str = "operation.duration";
/// Error kind recorded when a call is dropped before it settles.
pub const CANCELLED_KIND: &str = "Cancelled";
const CANCELLED_MESSAGE: &str = "operation was cancelled before completing";

/// A failure that can be reported on a span.
pub trait Failure: std::fmt::Display {
    /// Short type name, recorded as the `error.type` tag.
    fn kind(&self) -> &'static str;
}

/// Something that turns an [`Invocation`] into a result.
pub trait Handler: Send + Sync {
    type Output: Send;
    type Error: Failure + Send;

    fn call(
        &self,
        invocation: Invocation,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// Input of one handler call: the request body and its tracing context.
#[derive(Debug, Clone)]
pub struct Invocation {
    body: Result<Value, String>,
    request_id: Option<String>,
    parent: Option<SpanContext>,
}

impl Invocation {
    pub fn new(body: Value) -> Self {
        Self {
            body: Ok(body),
            request_id: None,
            parent: None,
        }
    }

    /// Parse a raw request body. A body that is not JSON is kept as an error
    /// for the handler to report.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let body = if bytes.is_empty() {
            Err("request body is empty".to_string())
        } else {
            serde_json::from_slice(bytes).map_err(|e| format!("request body is not valid JSON: {}", e))
        };

        Self {
            body,
            request_id: None,
            parent: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_parent(mut self, parent: SpanContext) -> Self {
        self.parent = Some(parent);
        self
    }

    /// The parsed body, or the reason it could not be parsed.
    pub fn body(&self) -> Result<&Value, &str> {
        self.body.as_ref().map_err(String::as_str)
    }

    /// A top-level field of the body, if the body is an object holding it.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.body.as_ref().ok().and_then(|body| body.get(key))
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Span of the enclosing instrumented call, if any.
    pub fn parent(&self) -> Option<&SpanContext> {
        self.parent.as_ref()
    }
}

/// Factory for instrumented handlers sharing one tracer.
#[derive(Debug, Clone)]
pub struct Instrumentation {
    tracer: Tracer,
}

impl Instrumentation {
    pub fn new(tracer: Tracer) -> Self {
        Self { tracer }
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Wrap `handler` so every call is traced as `calculator.<operation>`.
    pub fn wrap<H: Handler>(&self, operation: &'static str, handler: H) -> Instrumented<H> {
        Instrumented {
            operation,
            span_name: format!("{}.{}", SPAN_PREFIX, operation),
            tracer: self.tracer.clone(),
            inner: handler,
        }
    }
}

/// A handler decorated with span bookkeeping.
#[derive(Debug, Clone)]
pub struct Instrumented<H> {
    operation: &'static str,
    span_name: String,
    tracer: Tracer,
    inner: H,
}

impl<H> Instrumented<H> {
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn span_name(&self) -> &str {
        &self.span_name
    }
}

/// Span of one in-progress call.
///
/// If the call future is dropped before it settles (request timeout, client
/// gone), the span is closed as a `Cancelled` failure.
struct InFlight {
    operation: &'static str,
    start: Instant,
    span: ScopedSpan,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.span.is_closed() {
            return;
        }
        let elapsed = self.start.elapsed();
        tracing::warn!(
            operation = self.operation,
            elapsed_ms = elapsed.as_millis() as u64,
            "Operation cancelled before completing"
        );
        self.span.mark_error(CANCELLED_KIND, CANCELLED_MESSAGE);
        metrics::record_operation(self.operation, "cancelled", elapsed);
        self.span.close();
    }
}

impl<H: Handler> Handler for Instrumented<H> {
    type Output = H::Output;
    type Error = H::Error;

    async fn call(&self, invocation: Invocation) -> Result<H::Output, H::Error> {
        let operation = self.operation;
        let span = self.tracer.start_span(self.span_name.as_str(), self.tracer.service());
        let log_span = tracing::info_span!("operation", name = operation, span_id = %span.context().span_id);
        let mut call = InFlight {
            operation,
            start: Instant::now(),
            span,
        };

        async move {
            tracing::info!("Processing {} operation", operation);

            let x = TagValue::from(invocation.field("x"));
            let y = TagValue::from(invocation.field("y"));
            tracing::info!(x = %x, y = %y, "Input values");

            let span = &mut call.span;
            span.set_tag("operation.type", operation);
            span.set_tag("input.x", x);
            span.set_tag("input.y", y);
            if let Some(request_id) = invocation.request_id() {
                span.set_tag("request.id", request_id);
            }

            let invocation = invocation.with_parent(span.context());
            let start = Instant::now();
            let outcome = self.inner.call(invocation).await;
            let duration = start.elapsed();

            match &outcome {
                Ok(_) => {
                    span.set_metric(DURATION_METRIC, duration.as_secs_f64());
                    metrics::record_operation(operation, "success", duration);
                    tracing::info!("Operation completed in {:.3} seconds", duration.as_secs_f64());
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::error!(kind = e.kind(), "Error in {}: {}", operation, message);
                    span.mark_error(e.kind(), &message);
                    metrics::record_operation(operation, "error", duration);
                }
            }

            span.close();
            outcome
        }
        .instrument(log_span)
        .await
    }
}

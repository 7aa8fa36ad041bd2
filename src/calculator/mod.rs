//! Calculator operations.
//!
//! # Data Flow
//! ```text
//! Invocation (JSON body)
//!     → operations.rs (extract x, y; apply add/subtract/multiply/divide)
//!     → handlers.rs (Arithmetic, Calculate; simulated latency from latency.rs)
//!     → OperationResult / CalculationReport or CalcError
//! ```
//!
//! [`Endpoints`] holds every handler already wrapped for tracing.

pub mod error;
pub mod handlers;
pub mod latency;
pub mod number;
pub mod operations;

pub use error::{CalcError, CalcResult, DIVISION_BY_ZERO, NOT_FINITE};
pub use handlers::{
    Arithmetic, Calculate, CalculationReport, CalculationSteps, OperationResult,
    CALCULATE_OPERATION, STEPS_SPAN,
};
pub use latency::Latency;
pub use number::Number;
pub use operations::{finite, Operands, Operation};

use crate::observability::{Instrumentation, Instrumented};

/// The instrumented handler behind each endpoint.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub add: Instrumented<Arithmetic>,
    pub subtract: Instrumented<Arithmetic>,
    pub multiply: Instrumented<Arithmetic>,
    pub divide: Instrumented<Arithmetic>,
    pub calculate: Instrumented<Calculate>,
}

impl Endpoints {
    pub fn new(instrumentation: &Instrumentation, latency: Latency) -> Self {
        let arithmetic = |operation: Operation| {
            instrumentation.wrap(operation.name(), Arithmetic::new(operation, latency))
        };

        Self {
            add: arithmetic(Operation::Add),
            subtract: arithmetic(Operation::Subtract),
            multiply: arithmetic(Operation::Multiply),
            divide: arithmetic(Operation::Divide),
            calculate: instrumentation.wrap(
                CALCULATE_OPERATION,
                Calculate::new(instrumentation.tracer().clone(), latency),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{Handler, Invocation, MemorySink, Tracer};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn endpoints(latency: Latency) -> (Endpoints, Tracer, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let tracer = Tracer::new("calculator-app", sink.clone());
        let endpoints = Endpoints::new(&Instrumentation::new(tracer.clone()), latency);
        (endpoints, tracer, sink)
    }

    #[test]
    fn test_endpoint_span_names() {
        let (eps, _, _) = endpoints(Latency::disabled());
        assert_eq!(eps.add.operation(), "add");
        assert_eq!(eps.divide.span_name(), "calculator.divide");
        assert_eq!(eps.calculate.operation(), CALCULATE_OPERATION);
        assert_eq!(eps.calculate.span_name(), "calculator.complex_calculation");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_call_still_closes_span() {
        let slow = Latency::new(Duration::from_secs(5), Duration::from_secs(5));
        let (eps, tracer, sink) = endpoints(slow);

        let call = eps.add.call(Invocation::new(json!({"x": 1, "y": 2})));
        let timed_out = tokio::time::timeout(Duration::from_millis(50), call).await;
        assert!(timed_out.is_err());

        let stats = tracer.stats();
        assert_eq!(stats.opened, 1);
        assert_eq!(stats.closed, 1);

        let span = &sink.named("calculator.add")[0];
        assert!(span.error);
        assert_eq!(span.error_kind.as_deref(), Some("Cancelled"));
    }
}

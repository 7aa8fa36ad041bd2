//! Operation handlers.
//!
//! Each handler is a plain [`Handler`] value; tracing is added from outside by
//! wrapping it with [`Instrumentation::wrap`](crate::observability::Instrumentation::wrap).

use serde::Serialize;

use crate::calculator::error::{CalcError, CalcResult};
use crate::calculator::latency::Latency;
use crate::calculator::number::Number;
use crate::calculator::operations::{divide_or_keep, finite, Operands, Operation};
use crate::observability::{Failure, Handler, Invocation, Tracer};

/// Operation name (and span suffix) of the multi-step calculation.
pub const CALCULATE_OPERATION: &str = "complex_calculation";
/// Span opened by [`Calculate`] around its intermediate steps.
pub const STEPS_SPAN: &str = "calculator.steps";

/// Response body of the single-step endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    pub operation: &'static str,
    pub result: Number,
}

/// Intermediate values of [`Calculate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalculationSteps {
    pub add: Number,
    pub multiply: Number,
    pub subtract: Number,
    #[serde(rename = "final")]
    pub final_result: Number,
}

/// Response body of `/calculate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationReport {
    pub input: Operands,
    pub steps: CalculationSteps,
}

/// add, subtract, multiply or divide.
#[derive(Debug, Clone)]
pub struct Arithmetic {
    operation: Operation,
    latency: Latency,
}

impl Arithmetic {
    pub fn new(operation: Operation, latency: Latency) -> Self {
        Self { operation, latency }
    }
}

impl Handler for Arithmetic {
    type Output = OperationResult;
    type Error = CalcError;

    async fn call(&self, invocation: Invocation) -> CalcResult<OperationResult> {
        self.latency.pause().await;

        let operands = Operands::from_invocation(&invocation)?;
        let result = self.operation.apply(operands)?;

        Ok(OperationResult {
            operation: self.operation.name(),
            result,
        })
    }
}

/// ((x + y) * 2 - y) / y, where the division is skipped when `y` is zero.
///
/// Unlike the divide endpoint this never fails on a zero divisor.
#[derive(Debug, Clone)]
pub struct Calculate {
    tracer: Tracer,
    latency: Latency,
}

impl Calculate {
    pub fn new(tracer: Tracer, latency: Latency) -> Self {
        Self { tracer, latency }
    }
}

impl Handler for Calculate {
    type Output = CalculationReport;
    type Error = CalcError;

    async fn call(&self, invocation: Invocation) -> CalcResult<CalculationReport> {
        let input = Operands::from_invocation(&invocation)?;
        let Operands { x, y } = input;

        let mut span = self.tracer.start_child(STEPS_SPAN, invocation.parent());
        let mut step = |name: &str, value: Number| {
            span.set_tag(name, value);
            finite(value).inspect_err(|e| span.mark_error(e.kind(), &e.to_string()))
        };

        let add = step("step.add", x + y)?;
        self.latency.pause().await;

        let multiply = step("step.multiply", add * Number::Int(2))?;
        self.latency.pause().await;

        let subtract = step("step.subtract", multiply - y)?;
        self.latency.pause().await;

        let final_result = step("step.final", divide_or_keep(subtract, y))?;
        span.close();

        Ok(CalculationReport {
            input,
            steps: CalculationSteps {
                add,
                multiply,
                subtract,
                final_result,
            },
        })
    }
}

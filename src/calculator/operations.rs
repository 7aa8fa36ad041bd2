//! Operand extraction and the primitive operations.

use serde::Serialize;
use serde_json::Value;

use crate::calculator::error::{CalcError, CalcResult, NOT_FINITE};
use crate::calculator::number::Number;
use crate::observability::Invocation;

/// The two inputs of every operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Operands {
    pub x: Number,
    pub y: Number,
}

impl Operands {
    pub fn new(x: impl Into<Number>, y: impl Into<Number>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    /// Pull `x` and `y` out of the request body.
    pub fn from_invocation(invocation: &Invocation) -> CalcResult<Self> {
        let body = invocation
            .body()
            .map_err(|reason| CalcError::InvalidInput(reason.to_string()))?;

        if !body.is_object() {
            return Err(CalcError::InvalidInput(
                "request body must be a JSON object".to_string(),
            ));
        }

        Ok(Self {
            x: operand(body, "x")?,
            y: operand(body, "y")?,
        })
    }
}

fn operand(body: &Value, key: &str) -> CalcResult<Number> {
    let value = body
        .get(key)
        .ok_or_else(|| CalcError::InvalidInput(format!("missing field '{}'", key)))?;

    Number::from_json(value).ok_or_else(|| {
        CalcError::UnexpectedFailure(format!(
            "field '{}' must be a number, got {}",
            key,
            json_type(value)
        ))
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single-step operation exposed on its own endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }

    pub fn apply(self, operands: Operands) -> CalcResult<Number> {
        let Operands { x, y } = operands;
        let result = match self {
            Operation::Add => x + y,
            Operation::Subtract => x - y,
            Operation::Multiply => x * y,
            Operation::Divide => {
                if y.is_zero() {
                    return Err(CalcError::DivisionByZero);
                }
                x / y
            }
        };
        finite(result)
    }
}

/// Reject results that JSON cannot carry.
pub fn finite(value: Number) -> CalcResult<Number> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalcError::UnexpectedFailure(NOT_FINITE.to_string()))
    }
}

/// Final step of `calculate`: divide by `y`, or keep the value when `y` is zero.
pub fn divide_or_keep(value: Number, y: Number) -> Number {
    if y.is_zero() {
        value
    } else {
        value / y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn operands(body: Value) -> CalcResult<Operands> {
        Operands::from_invocation(&Invocation::new(body))
    }

    #[test]
    fn test_apply() {
        let ops = Operands::new(7i64, 2i64);
        assert_eq!(Operation::Add.apply(ops), Ok(Number::Int(9)));
        assert_eq!(Operation::Subtract.apply(ops), Ok(Number::Int(5)));
        assert_eq!(Operation::Multiply.apply(ops), Ok(Number::Int(14)));
        assert_eq!(Operation::Divide.apply(ops), Ok(Number::Float(3.5)));
    }

    #[test]
    fn test_divide_by_zero() {
        assert_eq!(
            Operation::Divide.apply(Operands::new(1i64, 0i64)),
            Err(CalcError::DivisionByZero)
        );
        assert_eq!(
            Operation::Divide.apply(Operands::new(1.0, 0.0)),
            Err(CalcError::DivisionByZero)
        );
    }

    #[test]
    fn test_overflow_to_infinity_fails() {
        let overflow = Err(CalcError::UnexpectedFailure(NOT_FINITE.into()));
        assert_eq!(Operation::Multiply.apply(Operands::new(1e308, 10i64)), overflow);
        assert_eq!(Operation::Add.apply(Operands::new(1.7e308, 1.7e308)), overflow);
        assert_eq!(Operation::Divide.apply(Operands::new(1e308, 1e-10)), overflow);
        assert_eq!(
            Operation::Add.apply(Operands::new(i64::MAX, 1i64)),
            Ok(Number::Float(i64::MAX as f64 + 1.0))
        );
    }

    #[test]
    fn test_divide_or_keep() {
        assert_eq!(divide_or_keep(Number::Int(8), Number::Int(2)), Number::Float(4.0));
        assert_eq!(divide_or_keep(Number::Int(6), Number::Int(0)), Number::Int(6));
    }

    #[test]
    fn test_extract_operands() {
        assert_eq!(operands(json!({"x": 1, "y": 2.5})), Ok(Operands::new(1i64, 2.5)));
    }

    #[test]
    fn test_missing_operand() {
        assert_eq!(
            operands(json!({"x": 1})),
            Err(CalcError::InvalidInput("missing field 'y'".into()))
        );
    }

    #[test]
    fn test_non_object_body() {
        assert!(matches!(operands(json!([1, 2])), Err(CalcError::InvalidInput(_))));
        assert!(matches!(
            Operands::from_invocation(&Invocation::from_slice(b"{oops")),
            Err(CalcError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_numeric_operand() {
        assert_eq!(
            operands(json!({"x": "3", "y": 2})),
            Err(CalcError::UnexpectedFailure(
                "field 'x' must be a number, got string".into()
            ))
        );
    }
}

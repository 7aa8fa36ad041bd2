//! Handler failures.

use thiserror::Error;

use crate::observability::Failure;

/// Message returned for a zero divisor.
pub const DIVISION_BY_ZERO: &str = "Division by zero!";
/// Message returned when a result overflows to infinity or NaN.
pub const NOT_FINITE: &str = "result is not a finite number";

/// Errors an operation handler can return.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    /// Body is not a JSON object, or `x`/`y` is missing.
    #[error("{0}")]
    InvalidInput(String),

    /// `y` is zero on the divide endpoint.
    #[error("Division by zero!")]
    DivisionByZero,

    /// Anything else, e.g. an operand that is not a number.
    #[error("{0}")]
    UnexpectedFailure(String),
}

impl Failure for CalcError {
    fn kind(&self) -> &'static str {
        match self {
            CalcError::InvalidInput(_) => "InvalidInput",
            CalcError::DivisionByZero => "DivisionByZero",
            CalcError::UnexpectedFailure(_) => "UnexpectedFailure",
        }
    }
}

/// Result type for operation handlers.
pub type CalcResult<T> = Result<T, CalcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(CalcError::DivisionByZero.to_string(), DIVISION_BY_ZERO);
        assert_eq!(
            CalcError::InvalidInput("missing field 'y'".into()).to_string(),
            "missing field 'y'"
        );
    }

    #[test]
    fn test_kind() {
        assert_eq!(CalcError::DivisionByZero.kind(), "DivisionByZero");
        assert_eq!(CalcError::InvalidInput(String::new()).kind(), "InvalidInput");
        assert_eq!(CalcError::UnexpectedFailure(String::new()).kind(), "UnexpectedFailure");
    }
}

//! JSON numeric operands.
//!
//! Integers stay integers through add, subtract and multiply, falling back to
//! floating point when i64 would overflow. Division always yields a float.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use crate::observability::TagValue;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Read a JSON value as a number. Booleans and strings are not numbers.
    pub fn from_json(value: &Value) -> Option<Self> {
        let Value::Number(n) = value else {
            return None;
        };
        match n.as_i64() {
            Some(i) => Some(Number::Int(i)),
            None => n.as_f64().map(Number::Float),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// True for integer zero and for both signed float zeros.
    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }

    /// False for a float that overflowed to infinity or became NaN.
    pub fn is_finite(self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(f) => f.is_finite(),
        }
    }

    fn int_op(
        self,
        rhs: Self,
        checked: fn(i64, i64) -> Option<i64>,
        float: fn(f64, f64) -> f64,
    ) -> Self {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => checked(a, b)
                .map(Number::Int)
                .unwrap_or_else(|| Number::Float(float(a as f64, b as f64))),
            (a, b) => Number::Float(float(a.as_f64(), b.as_f64())),
        }
    }
}

impl Add for Number {
    type Output = Number;

    fn add(self, rhs: Self) -> Number {
        self.int_op(rhs, i64::checked_add, |a, b| a + b)
    }
}

impl Sub for Number {
    type Output = Number;

    fn sub(self, rhs: Self) -> Number {
        self.int_op(rhs, i64::checked_sub, |a, b| a - b)
    }
}

impl Mul for Number {
    type Output = Number;

    fn mul(self, rhs: Self) -> Number {
        self.int_op(rhs, i64::checked_mul, |a, b| a * b)
    }
}

/// True division. Callers check for a zero divisor first.
impl Div for Number {
    type Output = Number;

    fn div(self, rhs: Self) -> Number {
        Number::Float(self.as_f64() / rhs.as_f64())
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl From<Number> for TagValue {
    fn from(value: Number) -> Self {
        match value {
            Number::Int(i) => TagValue::Int(i),
            Number::Float(f) => TagValue::Float(f),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(v) => write!(f, "{:?}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_arithmetic_stays_integer() {
        let (x, y) = (Number::Int(3), Number::Int(2));
        assert_eq!(x + y, Number::Int(5));
        assert_eq!(x - y, Number::Int(1));
        assert_eq!(x * y, Number::Int(6));
        assert_eq!(x / y, Number::Float(1.5));
    }

    #[test]
    fn test_float_overflow_is_not_finite() {
        let big = Number::Float(1e308);
        assert!(!(big * Number::Int(10)).is_finite());
        assert!(Number::Int(i64::MAX).is_finite());
        assert!((Number::Int(i64::MAX) + Number::Int(1)).is_finite());
    }

    #[test]
    fn test_mixed_arithmetic_is_float() {
        assert_eq!(Number::Int(1) + Number::Float(0.5), Number::Float(1.5));
        assert_eq!(Number::Float(2.5) * Number::Int(2), Number::Float(5.0));
    }

    #[test]
    fn test_overflow_falls_back_to_float() {
        let sum = Number::Int(i64::MAX) + Number::Int(1);
        assert!(matches!(sum, Number::Float(_)));
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Number::from_json(&json!(7)), Some(Number::Int(7)));
        assert_eq!(Number::from_json(&json!(-1.25)), Some(Number::Float(-1.25)));
        assert_eq!(Number::from_json(&json!("7")), None);
        assert_eq!(Number::from_json(&json!(true)), None);
        assert_eq!(Number::from_json(&json!(null)), None);
    }

    #[test]
    fn test_zero() {
        assert!(Number::Int(0).is_zero());
        assert!(Number::Float(-0.0).is_zero());
        assert!(!Number::Float(1e-300).is_zero());
    }

    #[test]
    fn test_serializes_as_plain_json_number() {
        assert_eq!(serde_json::to_string(&Number::Int(4)).unwrap(), "4");
        assert_eq!(serde_json::to_string(&Number::Float(4.0)).unwrap(), "4.0");
    }
}

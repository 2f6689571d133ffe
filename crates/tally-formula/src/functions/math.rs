//! Math functions and arithmetic operators

use crate::ast::OperatorKind;
use crate::error::{EvalError, EvalResult};
use crate::value::{Number, Value};

/// Coerce an operand to a number or report which operator rejected it
pub(crate) fn number(op: OperatorKind, value: &Value) -> EvalResult<Number> {
    value.as_number().ok_or(EvalError::TypeMismatch {
        op,
        found: value.kind(),
    })
}

/// Wrap a float result, failing on NaN and infinities
pub(crate) fn finite(op: OperatorKind, x: f64) -> EvalResult<Value> {
    if x.is_finite() {
        Ok(Value::Float(x))
    } else {
        Err(EvalError::NotFinite(op))
    }
}

/// PI()
pub fn fn_pi() -> Value {
    Value::Float(std::f64::consts::PI)
}

/// Single-argument float function: ABS, SQRT, COS, ..., LOG
pub fn unary(op: OperatorKind, value: &Value, f: fn(f64) -> f64) -> EvalResult<Value> {
    let x = number(op, value)?.to_f64();
    finite(op, f(x))
}

/// ADD, SUBTRACT, MULTIPLY, DIVIDE and MODULUS; `op` must be one of them
///
/// Two integers stay integers while the result is exact and in range;
/// otherwise the operation is redone in floating point.
pub(crate) fn arithmetic(op: OperatorKind, left: &Value, right: &Value) -> EvalResult<Value> {
    let a = number(op, left)?;
    let b = number(op, right)?;

    if matches!(op, OperatorKind::Divide | OperatorKind::Modulus) && b.to_f64() == 0.0 {
        return Err(EvalError::DivisionByZero);
    }

    if let (Number::Integer(x), Number::Integer(y)) = (a, b) {
        if let Some(result) = integer_op(op, x, y) {
            return Ok(Value::Integer(result));
        }
    }

    let (x, y) = (a.to_f64(), b.to_f64());
    let result = match op {
        OperatorKind::Add => x + y,
        OperatorKind::Subtract => x - y,
        OperatorKind::Multiply => x * y,
        OperatorKind::Divide => x / y,
        OperatorKind::Modulus => x % y,
        _ => unreachable!("{} is not an arithmetic operator", op),
    };
    finite(op, result)
}

/// Exact integer result, or None when floating point must take over
fn integer_op(op: OperatorKind, x: i64, y: i64) -> Option<i64> {
    match op {
        OperatorKind::Add => x.checked_add(y),
        OperatorKind::Subtract => x.checked_sub(y),
        OperatorKind::Multiply => x.checked_mul(y),
        OperatorKind::Divide => match x.checked_rem(y) {
            Some(0) => x.checked_div(y),
            _ => None,
        },
        // i64::MIN % -1 overflows in the instruction but is exactly zero
        OperatorKind::Modulus => Some(x.wrapping_rem(y)),
        _ => None,
    }
}

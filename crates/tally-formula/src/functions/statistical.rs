//! Aggregate functions over a flattened argument list
//!
//! Only Integer and Float members take part in SUM, AVERAGE, MIN and MAX;
//! strings and Empty are skipped without attempting numeric parsing.

use crate::ast::OperatorKind;
use crate::error::{EvalError, EvalResult};
use crate::functions::math::finite;
use crate::value::Value;

fn numbers(values: &[Value]) -> impl Iterator<Item = f64> + '_ {
    values.iter().filter_map(|v| match v {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    })
}

/// SUM(values...)
pub fn fn_sum(values: &[Value]) -> EvalResult<Value> {
    finite(OperatorKind::Sum, numbers(values).sum())
}

/// AVERAGE(values...), divided by the count of numeric members
pub fn fn_average(values: &[Value]) -> EvalResult<Value> {
    let (sum, count) = numbers(values).fold((0.0, 0usize), |(s, c), x| (s + x, c + 1));
    if count == 0 {
        return Err(EvalError::DivisionByZero);
    }
    finite(OperatorKind::Average, sum / count as f64)
}

/// MIN(values...), 0 when nothing is numeric
pub fn fn_min(values: &[Value]) -> Value {
    Value::Float(numbers(values).reduce(f64::min).unwrap_or(0.0))
}

/// MAX(values...), 0 when nothing is numeric
pub fn fn_max(values: &[Value]) -> Value {
    Value::Float(numbers(values).reduce(f64::max).unwrap_or(0.0))
}

/// COUNT(values...): numeric members
pub fn fn_count(values: &[Value]) -> Value {
    Value::Integer(values.iter().filter(|v| v.is_numeric()).count() as i64)
}

/// COUNTA(values...): non-empty members
pub fn fn_counta(values: &[Value]) -> Value {
    Value::Integer(values.iter().filter(|v| !v.is_empty()).count() as i64)
}

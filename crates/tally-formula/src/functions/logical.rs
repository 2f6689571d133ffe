//! Logical functions
//!
//! Results are Integer 1 or 0. IF lives in the evaluator because only the
//! chosen branch is evaluated.

use crate::value::Value;

/// NOT(value)
pub fn fn_not(value: &Value) -> Value {
    Value::from_bool(!value.as_bool())
}

/// AND(values...): false if any value is false
///
/// Every argument has already been evaluated; there is no short-circuit.
pub fn fn_and(values: &[Value]) -> Value {
    Value::from_bool(values.iter().all(Value::as_bool))
}

/// OR(values...): true if any value is true
pub fn fn_or(values: &[Value]) -> Value {
    Value::from_bool(values.iter().any(Value::as_bool))
}

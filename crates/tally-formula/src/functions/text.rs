//! Text functions
//!
//! LEN, LEFT, RIGHT and MID measure in characters, not UTF-8 bytes:
//! `LEN("héllo")` is 5 and `LEFT("héllo",2)` is `"hé"`.

use crate::ast::OperatorKind;
use crate::error::{EvalError, EvalResult};
use crate::value::Value;

fn count(op: OperatorKind, value: &Value) -> EvalResult<i64> {
    value.as_integer().ok_or(EvalError::TypeMismatch {
        op,
        found: value.kind(),
    })
}

/// Clamp a signed count to a usable `usize`
fn clamp(n: i64) -> usize {
    usize::try_from(n.max(0)).unwrap_or(usize::MAX)
}

/// LEN(text)
pub fn fn_len(text: &Value) -> Value {
    Value::Integer(text.as_string().chars().count() as i64)
}

/// LEFT(text, n)
pub fn fn_left(text: &Value, n: &Value) -> EvalResult<Value> {
    let n = clamp(count(OperatorKind::Left, n)?);
    Ok(Value::String(text.as_string().chars().take(n).collect()))
}

/// RIGHT(text, n)
pub fn fn_right(text: &Value, n: &Value) -> EvalResult<Value> {
    let n = clamp(count(OperatorKind::Right, n)?);
    let s = text.as_string();
    let skip = s.chars().count().saturating_sub(n);
    Ok(Value::String(s.chars().skip(skip).collect()))
}

/// MID(text, start, len) with a 1-based start; a start below 1 reads from
/// the first character
pub fn fn_mid(text: &Value, start: &Value, len: &Value) -> EvalResult<Value> {
    let start = count(OperatorKind::Mid, start)?;
    let len = clamp(count(OperatorKind::Mid, len)?);
    let skip = clamp(start.saturating_sub(1));
    Ok(Value::String(
        text.as_string().chars().skip(skip).take(len).collect(),
    ))
}

/// CONCAT(a, b), the `&` operator
pub fn fn_concat(left: &Value, right: &Value) -> Value {
    let mut s = left.as_string();
    s.push_str(&right.as_string());
    Value::String(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    #[test]
    fn test_len() {
        assert_eq!(fn_len(&s("hello")), Value::Integer(5));
        assert_eq!(fn_len(&s("héllo")), Value::Integer(5));
        assert_eq!(fn_len(&Value::Empty), Value::Integer(0));
        assert_eq!(fn_len(&Value::Float(2.5)), Value::Integer(3));
    }

    #[test]
    fn test_left_right() {
        assert_eq!(fn_left(&s("hello"), &Value::Integer(3)), Ok(s("hel")));
        assert_eq!(fn_left(&s("hello"), &Value::Integer(99)), Ok(s("hello")));
        assert_eq!(fn_left(&s("hello"), &Value::Integer(-1)), Ok(s("")));
        assert_eq!(fn_right(&s("hello"), &Value::Integer(3)), Ok(s("llo")));
        assert_eq!(fn_right(&s("héllo"), &Value::Float(4.9)), Ok(s("éllo")));
        assert_eq!(fn_left(&s("héllo"), &Value::Integer(2)), Ok(s("hé")));
        assert_eq!(fn_right(&s("hello"), &Value::Integer(-2)), Ok(s("")));
        assert_eq!(fn_left(&Value::Integer(12345), &Value::Integer(2)), Ok(s("12")));
    }

    #[test]
    fn test_non_numeric_count_fails() {
        assert_eq!(
            fn_left(&s("hello"), &s("two")),
            Err(EvalError::TypeMismatch {
                op: OperatorKind::Left,
                found: crate::value::ValueKind::String,
            })
        );
    }

    #[test]
    fn test_mid() {
        let n = Value::Integer;
        assert_eq!(fn_mid(&s("spreadsheet"), &n(7), &n(5)), Ok(s("sheet")));
        assert_eq!(fn_mid(&s("abc"), &n(0), &n(2)), Ok(s("ab")));
        assert_eq!(fn_mid(&s("abc"), &n(3), &n(10)), Ok(s("c")));
        assert_eq!(fn_mid(&s("abc"), &n(5), &n(1)), Ok(s("")));
        assert_eq!(fn_mid(&s("abc"), &n(1), &n(-1)), Ok(s("")));
    }

    #[test]
    fn test_concat() {
        assert_eq!(fn_concat(&s("a"), &s("b")), s("ab"));
        assert_eq!(fn_concat(&Value::Integer(1), &Value::Float(2.5)), s("12.5"));
        assert_eq!(fn_concat(&Value::Empty, &s("x")), s("x"));
    }
}

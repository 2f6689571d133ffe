//! Typed scalar values and the coercion rules operators rely on

use std::fmt;

/// A scalar produced by a constant or by evaluating a formula
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", content = "value")
)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    #[default]
    Empty,
}

/// The type tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Float,
    String,
    Empty,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Empty => "empty",
        })
    }
}

/// A value after numeric coercion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    /// Widen to a float
    pub fn to_f64(self) -> f64 {
        match self {
            Number::Integer(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Parse text as a number
    ///
    /// Integers that fit in an `i64` stay integers. Anything that only
    /// parses as a float must also be finite and spelled with digits, so
    /// `"inf"` and `"NaN"` are rejected.
    pub fn parse(text: &str) -> Option<Number> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(i) = text.parse::<i64>() {
            return Some(Number::Integer(i));
        }
        if !text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
        {
            return None;
        }
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Number::Float)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Integer(i) => Value::Integer(i),
            Number::Float(f) => Value::Float(f),
        }
    }
}

impl Value {
    /// Boolean results are integers, as in the keyword table (`TRUE` is 1)
    pub fn from_bool(b: bool) -> Self {
        Value::Integer(b as i64)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Empty => ValueKind::Empty,
        }
    }

    /// True for Integer and Float only; no string parsing
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Coerce to a number
    ///
    /// Strings are parsed on demand and Empty counts as integer zero.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Integer(i) => Some(Number::Integer(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            Value::String(s) => Number::parse(s),
            Value::Empty => Some(Number::Integer(0)),
        }
    }

    /// Coerce to a float
    pub fn as_float(&self) -> Option<f64> {
        self.as_number().map(Number::to_f64)
    }

    /// Coerce to an integer, truncating floats toward zero
    pub fn as_integer(&self) -> Option<i64> {
        match self.as_number()? {
            Number::Integer(i) => Some(i),
            Number::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Number::Float(_) => None,
        }
    }

    /// Coerce to a boolean
    ///
    /// Zero, Empty and strings that are not numbers are false. Numeric
    /// strings follow their number; `"TRUE"` is accepted in any case.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => match Number::parse(s) {
                Some(n) => n.to_f64() != 0.0,
                None => s.trim().eq_ignore_ascii_case("TRUE"),
            },
            Value::Empty => false,
        }
    }

    /// Coerce to text; Empty is the empty string
    pub fn as_string(&self) -> String {
        self.to_string()
    }

    /// Convert a string that looks numeric into a number, leaving others as-is
    ///
    /// Resolvers use this to hand out typed cell contents.
    pub fn from_cell_text(text: &str) -> Self {
        match Number::parse(text) {
            Some(n) => n.into(),
            None => Value::String(text.to_string()),
        }
    }

    /// Render as formula source
    ///
    /// Floats always carry a `.` or exponent so re-parsing yields a float
    /// again; strings are quoted with `\"` and `\\` escapes.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format!("{:?}", f),
            Value::String(s) => format!(
                "\"{}\"",
                s.replace('\\', "\\\\").replace('"', "\\\"")
            ),
            Value::Empty => "<empty>".to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            Value::Empty => Ok(()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::from_bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_parse() {
        assert_eq!(Number::parse("42"), Some(Number::Integer(42)));
        assert_eq!(Number::parse(" -7 "), Some(Number::Integer(-7)));
        assert_eq!(Number::parse("2.5"), Some(Number::Float(2.5)));
        assert_eq!(Number::parse("1e3"), Some(Number::Float(1000.0)));
        assert_eq!(Number::parse("abc"), None);
        assert_eq!(Number::parse(""), None);
        assert_eq!(Number::parse("inf"), None);
        assert_eq!(Number::parse("NaN"), None);
        assert_eq!(Number::parse("1e999"), None);
    }

    #[test]
    fn test_empty_is_neutral() {
        assert_eq!(Value::Empty.as_number(), Some(Number::Integer(0)));
        assert_eq!(Value::Empty.as_string(), "");
        assert!(!Value::Empty.as_bool());
    }

    #[test]
    fn test_as_bool() {
        assert!(Value::Integer(3).as_bool());
        assert!(!Value::Integer(0).as_bool());
        assert!(!Value::Float(0.0).as_bool());
        assert!(Value::from("1").as_bool());
        assert!(!Value::from("0").as_bool());
        assert!(!Value::from("").as_bool());
        assert!(!Value::from("abc").as_bool());
        assert!(Value::from("true").as_bool());
    }

    #[test]
    fn test_as_integer_truncates() {
        assert_eq!(Value::Float(2.9).as_integer(), Some(2));
        assert_eq!(Value::Float(-2.9).as_integer(), Some(-2));
        assert_eq!(Value::from("x").as_integer(), None);
    }

    #[test]
    fn test_display_and_literal() {
        assert_eq!(Value::Integer(7).to_string(), "7");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(3.0).to_string(), "3");
        assert_eq!(Value::Float(3.0).to_literal(), "3.0");
        assert_eq!(Value::from("a\"b").to_literal(), "\"a\\\"b\"");
        assert_eq!(Value::from("dir\\").to_literal(), r#""dir\\""#);
    }

    #[test]
    fn test_from_cell_text() {
        assert_eq!(Value::from_cell_text("12"), Value::Integer(12));
        assert_eq!(Value::from_cell_text("0.5"), Value::Float(0.5));
        assert_eq!(Value::from_cell_text("n/a"), Value::from("n/a"));
    }
}

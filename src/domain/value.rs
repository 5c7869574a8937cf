use std::fmt;

use serde::Serialize;

/// A single cell read out of a [`Table`](super::Table).
///
/// Numbers are always finite: anything that would be NaN or infinite is
/// stored as `Null` instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    /// Build a numeric cell, mapping non-finite input to `Null` and `-0.0` to `0.0`.
    pub fn number(n: f64) -> Self {
        if !n.is_finite() {
            Value::Null
        } else if n == 0.0 {
            Value::Number(0.0)
        } else {
            Value::Number(n)
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Cells read from CSV or JSON strings: numeric-looking text becomes a number,
    /// blank and NaN-ish literals become `Null`.
    pub fn parse_field(raw: &str) -> Self {
        let trimmed = raw.trim();
        if is_null_literal(trimmed) {
            return Value::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::number(n),
            _ => Value::Text(raw.to_string()),
        }
    }
}

pub(crate) fn is_null_literal(s: &str) -> bool {
    matches!(s, "" | "NaN" | "nan" | "null" | "NULL" | "None")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_normalizes_special_floats() {
        assert_eq!(Value::number(f64::NAN), Value::Null);
        assert_eq!(Value::number(f64::INFINITY), Value::Null);
        assert_eq!(Value::number(-0.0), Value::Number(0.0));
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(Value::parse_field("10"), Value::Number(10.0));
        assert_eq!(Value::parse_field(" 2.5 "), Value::Number(2.5));
        assert_eq!(Value::parse_field(""), Value::Null);
        assert_eq!(Value::parse_field("NaN"), Value::Null);
        assert_eq!(Value::parse_field("Bogota"), Value::text("Bogota"));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(Some(2.0)), Value::Number(2.0));
        assert_eq!(Value::from(None::<&str>), Value::Null);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(10.0).to_string(), "10");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::text("x").to_string(), "x");
    }
}

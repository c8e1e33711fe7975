//! Driver-neutral cell values

use std::fmt;

use serde_json::Value;

use crate::error::{Result, SqlBackendError};

/// One cell of a result row as decoded from the driver
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Raw textual form; `None` for SQL NULL
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Integral value; floats truncate toward zero
    pub fn to_i64(&self) -> Result<Option<i64>> {
        match self {
            CellValue::Null => Ok(None),
            CellValue::Bool(b) => Ok(Some(i64::from(*b))),
            CellValue::Integer(i) => Ok(Some(*i)),
            CellValue::Float(f) => Ok(Some(f.trunc() as i64)),
            CellValue::Text(s) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    return Ok(Some(i));
                }
                s.parse::<f64>()
                    .map(|f| Some(f.trunc() as i64))
                    .map_err(|_| SqlBackendError::execution(format!("'{}' is not an integer", s)))
            }
        }
    }

    pub fn to_f64(&self) -> Result<Option<f64>> {
        match self {
            CellValue::Null => Ok(None),
            CellValue::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
            CellValue::Integer(i) => Ok(Some(*i as f64)),
            CellValue::Float(f) => Ok(Some(*f)),
            CellValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| SqlBackendError::execution(format!("'{}' is not a number", s))),
        }
    }

    /// Dimension value: a string, or null
    pub fn to_dimension(&self) -> Value {
        match self.as_text() {
            Some(text) => Value::String(text),
            None => Value::Null,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("null"),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// JSON number for a float; non-finite values have no JSON form and become null
pub(crate) fn float_value(f: f64) -> Value {
    serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_coercion() {
        assert_eq!(CellValue::Integer(7).to_i64().unwrap(), Some(7));
        assert_eq!(CellValue::Float(7.9).to_i64().unwrap(), Some(7));
        assert_eq!(CellValue::Text("12".into()).to_i64().unwrap(), Some(12));
        assert_eq!(CellValue::Text("12.0".into()).to_i64().unwrap(), Some(12));
        assert_eq!(CellValue::Null.to_i64().unwrap(), None);
        assert!(CellValue::Text("x".into()).to_i64().is_err());
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(CellValue::Integer(2).to_f64().unwrap(), Some(2.0));
        assert_eq!(CellValue::Text("0.5".into()).to_f64().unwrap(), Some(0.5));
        assert_eq!(CellValue::Null.to_f64().unwrap(), None);
    }

    #[test]
    fn test_dimension_values_are_strings() {
        assert_eq!(CellValue::Integer(42).to_dimension(), Value::String("42".into()));
        assert_eq!(CellValue::Text("US".into()).to_dimension(), Value::String("US".into()));
        assert_eq!(CellValue::Null.to_dimension(), Value::Null);
        assert_eq!(float_value(f64::NAN), Value::Null);
    }
}

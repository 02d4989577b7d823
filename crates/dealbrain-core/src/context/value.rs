//! Dynamic operand values
//!
//! The value type shared by condition operands, formula variables and
//! the context document. It deliberately carries the rule engine's
//! comparison semantics rather than general-purpose ones: numbers
//! coerce across int/float (a rule authored with `16` must match a
//! catalog row holding `16.0`), while every other kind only matches
//! itself. Path traversal over a document lives on
//! [`EvaluationContext`](super::EvaluationContext), not here.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Dynamic value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null; also what missing context fields resolve to
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
}

impl Value {
    /// Create an integer value
    #[inline]
    pub fn int(v: i64) -> Self {
        Self::Int(v)
    }

    /// Create a float value
    #[inline]
    pub fn float(v: f64) -> Self {
        Self::Float(v)
    }

    /// Create a string value
    #[inline]
    pub fn string(v: impl Into<String>) -> Self {
        Self::String(v.into())
    }

    /// Create an array value
    #[inline]
    pub fn array(v: Vec<Value>) -> Self {
        Self::Array(v)
    }

    /// Check if value is null
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Kind name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Numeric view: floats as-is, ints widened, everything else `None`
    ///
    /// This is the coercion every money and metric computation goes
    /// through; catalog feeds store the same quantity as either kind.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// String view
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Array view
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Equality as rule operands see it
    ///
    /// Numbers compare by magnitude regardless of int/float kind; any
    /// other pairing falls back to strict equality.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
            return a == b;
        }
        self == other
    }

    /// Ordering for comparison operators
    ///
    /// Numbers order by magnitude; strings and bools order within their
    /// own kind; anything else is incomparable.
    pub fn ordering(&self, other: &Value) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
            return a.partial_cmp(&b);
        }
        match (self, other) {
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

// Conversions cover what rule authoring needs: numeric literals and
// strings. Anything richer arrives through serde.

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::int(16).as_f64(), Some(16.0));
        assert_eq!(Value::float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::string("16").as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn test_loose_equality_crosses_int_float() {
        assert!(Value::int(16).loosely_equals(&Value::float(16.0)));
        assert!(!Value::int(16).loosely_equals(&Value::float(16.5)));
        assert!(Value::string("used").loosely_equals(&Value::string("used")));
        // No coercion between kinds other than numbers
        assert!(!Value::string("16").loosely_equals(&Value::int(16)));
        assert!(!Value::Null.loosely_equals(&Value::int(0)));
    }

    #[test]
    fn test_ordering() {
        assert_eq!(
            Value::int(1).ordering(&Value::float(1.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::float(2.0).ordering(&Value::int(2)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Value::string("a").ordering(&Value::string("b")),
            Some(Ordering::Less)
        );
        assert_eq!(Value::string("a").ordering(&Value::int(1)), None);
        assert_eq!(Value::Null.ordering(&Value::Null), None);
    }

    #[test]
    fn test_default_is_null() {
        assert!(Value::default().is_null());
    }

    #[test]
    fn test_untagged_serde() {
        let v: Value = serde_json::from_str(r#"[1, 2.5, "x", null, {"a": true}]"#).unwrap();
        let arr = v.as_array().unwrap();
        assert_eq!(arr[0], Value::int(1));
        assert_eq!(arr[1], Value::float(2.5));
        assert_eq!(arr[2], Value::string("x"));
        assert!(arr[3].is_null());
        assert_eq!(arr[4].type_name(), "object");
    }
}

//! Type-erased data point values.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

/// Value produced by a data point source.
///
/// Numeric values are `Decimal` so that price arithmetic is exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Free text (tickers, exchange codes, asset classes)
    Text(String),
    /// Decimal number (prices, margins)
    Number(Decimal),
    /// Whole number (sequence numbers, amounts)
    Integer(i64),
    /// Boolean flag
    Bool(bool),
    /// No value yet
    Empty,
}

impl Value {
    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Number(_) => "number",
            Value::Integer(_) => "integer",
            Value::Bool(_) => "bool",
            Value::Empty => "empty",
        }
    }

    /// Whether this is `Value::Empty`.
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Borrow the text of a `Text` value.
    pub fn as_text(&self) -> EngineResult<&str> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(EngineError::type_mismatch("text", other.type_name())),
        }
    }

    /// Numeric view of the value.
    ///
    /// `Integer` widens to `Decimal`, and `Text` is parsed when it holds a number.
    pub fn as_decimal(&self) -> EngineResult<Decimal> {
        match self {
            Value::Number(d) => Ok(*d),
            Value::Integer(i) => Ok(Decimal::from(*i)),
            Value::Text(s) => Decimal::from_str(s.trim())
                .map_err(|_| EngineError::type_mismatch("number", format!("text '{}'", s))),
            other => Err(EngineError::type_mismatch("number", other.type_name())),
        }
    }

    /// Boolean view of the value.
    pub fn as_bool(&self) -> EngineResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(EngineError::type_mismatch("bool", other.type_name())),
        }
    }

    /// Compare the rendered value against a string.
    pub fn matches_text(&self, expected: &str) -> bool {
        match self {
            Value::Text(s) => s == expected,
            other => other.to_string() == expected,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(d) => write!(f, "{}", d),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Empty => Ok(()),
        }
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

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Number(d)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// =============================================================================
// Tests
// =============================================================================

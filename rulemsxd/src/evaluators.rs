//! Rule evaluators used by the routing rules.

use rulemsx_engine::{DataSet, EngineResult, RuleEvaluator};
use rust_decimal::Decimal;
use std::fmt;

// =============================================================================
// String equality
// =============================================================================

/// Passes when a data point's rendered value equals a fixed string.
#[derive(Debug, Clone)]
pub struct StringEquality {
    data_point: String,
    expected: String,
}

impl StringEquality {
    /// Create an evaluator comparing `data_point` against `expected`.
    pub fn new(data_point: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            data_point: data_point.into(),
            expected: expected.into(),
        }
    }
}

impl RuleEvaluator for StringEquality {
    fn evaluate(&self, data_set: &DataSet) -> EngineResult<bool> {
        Ok(data_set.value_of(&self.data_point)?.matches_text(&self.expected))
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.data_point.clone()]
    }
}

// =============================================================================
// Numeric threshold
// =============================================================================

/// Comparison applied by `NumericThreshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// value > threshold
    GreaterThan,
    /// value >= threshold
    GreaterOrEqual,
    /// value < threshold
    LessThan,
    /// value <= threshold
    LessOrEqual,
    /// value == threshold
    Equal,
}

impl Comparison {
    /// Whether `value <op> threshold` holds.
    pub fn holds(self, value: Decimal, threshold: Decimal) -> bool {
        match self {
            Comparison::GreaterThan => value > threshold,
            Comparison::GreaterOrEqual => value >= threshold,
            Comparison::LessThan => value < threshold,
            Comparison::LessOrEqual => value <= threshold,
            Comparison::Equal => value == threshold,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Comparison::GreaterThan => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessThan => "<",
            Comparison::LessOrEqual => "<=",
            Comparison::Equal => "==",
        };
        write!(f, "{}", op)
    }
}

/// Passes when a numeric data point compares favourably with a threshold.
///
/// Non-numeric values fail the rule with `TypeMismatch`.
#[derive(Debug, Clone)]
pub struct NumericThreshold {
    data_point: String,
    comparison: Comparison,
    threshold: Decimal,
}

impl NumericThreshold {
    /// Create an evaluator for `data_point <comparison> threshold`.
    pub fn new(data_point: impl Into<String>, comparison: Comparison, threshold: Decimal) -> Self {
        Self {
            data_point: data_point.into(),
            comparison,
            threshold,
        }
    }

    /// `data_point > threshold`
    pub fn above(data_point: impl Into<String>, threshold: Decimal) -> Self {
        Self::new(data_point, Comparison::GreaterThan, threshold)
    }

    /// `data_point < threshold`
    pub fn below(data_point: impl Into<String>, threshold: Decimal) -> Self {
        Self::new(data_point, Comparison::LessThan, threshold)
    }
}

impl RuleEvaluator for NumericThreshold {
    fn evaluate(&self, data_set: &DataSet) -> EngineResult<bool> {
        let value = data_set.value_of(&self.data_point)?.as_decimal()?;
        Ok(self.comparison.holds(value, self.threshold))
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.data_point.clone()]
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rulemsx_engine::{ConstantSource, EngineError, Value};
    use rust_decimal_macros::dec;

    fn data_set(points: &[(&str, Value)]) -> DataSet {
        let mut ds = DataSet::new("RMSXTest1001");
        for (name, value) in points {
            let dp = ds.add_data_point(*name).unwrap();
            dp.bind_source(ConstantSource::new(value.clone())).unwrap();
        }
        ds
    }

    #[test]
    fn test_string_equality() {
        let ds = data_set(&[("Exchange", Value::from("US")), ("OrderNo", Value::Integer(1001))]);

        assert!(StringEquality::new("Exchange", "US").evaluate(&ds).unwrap());
        assert!(!StringEquality::new("Exchange", "LN").evaluate(&ds).unwrap());
        assert!(StringEquality::new("OrderNo", "1001").evaluate(&ds).unwrap());
        assert_eq!(StringEquality::new("Exchange", "US").dependencies(), vec!["Exchange"]);
    }

    #[test]
    fn test_string_equality_missing_data_point() {
        let ds = data_set(&[]);

        let err = StringEquality::new("Exchange", "US").evaluate(&ds).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn test_numeric_threshold() {
        let ds = data_set(&[
            ("Amount", Value::Integer(500)),
            ("NewPrice", Value::Number(dec!(102.0))),
        ]);

        assert!(NumericThreshold::above("Amount", dec!(100)).evaluate(&ds).unwrap());
        assert!(!NumericThreshold::below("Amount", dec!(100)).evaluate(&ds).unwrap());
        assert!(NumericThreshold::new("NewPrice", Comparison::Equal, dec!(102))
            .evaluate(&ds)
            .unwrap());
        assert!(NumericThreshold::new("NewPrice", Comparison::LessOrEqual, dec!(102.0))
            .evaluate(&ds)
            .unwrap());
    }

    #[test]
    fn test_numeric_threshold_rejects_text() {
        let ds = data_set(&[("Ticker", Value::from("IBM US Equity"))]);

        let err = NumericThreshold::above("Ticker", dec!(1)).evaluate(&ds).unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch { .. }));
    }

    #[test]
    fn test_comparison_display() {
        assert_eq!(Comparison::GreaterOrEqual.to_string(), ">=");
        assert_eq!(Comparison::Equal.to_string(), "==");
    }
}

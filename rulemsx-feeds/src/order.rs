//! Working orders as sets of live fields.

use indexmap::IndexMap;
use rulemsx_engine::Value;
use std::sync::Arc;

use crate::error::{FeedError, FeedResult};
use crate::field::FieldFeed;

/// Order field names.
pub mod fields {
    /// Order sequence number
    pub const SEQUENCE: &str = "EMSX_SEQUENCE";
    /// Asset class (Equity, Future, ...)
    pub const ASSET_CLASS: &str = "EMSX_ASSET_CLASS";
    /// Order amount
    pub const AMOUNT: &str = "EMSX_AMOUNT";
    /// Exchange code (US, LN, ...)
    pub const EXCHANGE: &str = "EMSX_EXCHANGE";
    /// Security ticker
    pub const TICKER: &str = "EMSX_TICKER";
}

/// A working order: a sequence number and its live fields.
#[derive(Debug)]
pub struct Order {
    sequence: i64,
    fields: IndexMap<String, Arc<FieldFeed>>,
}

impl Order {
    /// Create an order. The sequence field is always present.
    pub fn new<I, K, V>(sequence: i64, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut map = IndexMap::new();
        map.insert(
            fields::SEQUENCE.to_string(),
            Arc::new(FieldFeed::new(fields::SEQUENCE, Value::Integer(sequence))),
        );

        for (name, value) in fields {
            let name = name.into();
            map.insert(name.clone(), Arc::new(FieldFeed::new(name, value)));
        }

        Self {
            sequence,
            fields: map,
        }
    }

    /// Order sequence number.
    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    /// Live field by name.
    pub fn field(&self, name: &str) -> FeedResult<&Arc<FieldFeed>> {
        self.fields
            .get(name)
            .ok_or_else(|| FeedError::unknown_field(format!("order {}", self.sequence), name))
    }

    /// Current ticker of the order.
    pub fn ticker(&self) -> FeedResult<String> {
        Ok(self.field(fields::TICKER)?.value().to_string())
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Subscribed securities and their market data fields.

use indexmap::IndexMap;
use parking_lot::RwLock;
use rulemsx_engine::Value;
use std::sync::Arc;

use crate::error::{FeedError, FeedResult};
use crate::field::FieldFeed;

/// Market data field names.
pub mod fields {
    /// Best bid
    pub const BID: &str = "BID";
    /// Best ask
    pub const ASK: &str = "ASK";
    /// Mid price
    pub const MID: &str = "MID";
    /// Last traded price
    pub const LAST_PRICE: &str = "LAST_PRICE";
}

/// A subscribed security with one live field per subscribed market data field.
#[derive(Debug)]
pub struct Security {
    ticker: String,
    fields: RwLock<IndexMap<String, Arc<FieldFeed>>>,
}

impl Security {
    /// Create a security with empty values for each field.
    pub fn new<S: AsRef<str>>(ticker: &str, field_names: &[S]) -> Self {
        let security = Self {
            ticker: ticker.to_string(),
            fields: RwLock::new(IndexMap::new()),
        };
        for name in field_names {
            security.ensure_field(name.as_ref());
        }
        security
    }

    /// Ticker of the security.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Live field by name.
    pub fn field(&self, name: &str) -> FeedResult<Arc<FieldFeed>> {
        self.fields
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| FeedError::unknown_field(self.ticker.clone(), name))
    }

    /// Subscribed field names.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.read().keys().cloned().collect()
    }

    /// Get or create a field.
    pub(crate) fn ensure_field(&self, name: &str) -> Arc<FieldFeed> {
        self.fields
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(FieldFeed::new(name, Value::Empty)))
            .clone()
    }
}

// =============================================================================
// Tests
// =============================================================================

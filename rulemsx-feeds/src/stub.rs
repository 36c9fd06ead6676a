//! Stub implementations for testing.
//!
//! These implementations simulate the order blotter, market data and
//! reference data services without connecting to anything.

use indexmap::IndexMap;
use parking_lot::RwLock;
use rulemsx_engine::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::{FeedError, FeedResult};
use crate::field::FieldChange;
use crate::market_data::Security;
use crate::order::Order;
use crate::ports::{MarketDataFeed, OrderFeed, RefDataPort};

// =============================================================================
// Stub Order Feed
// =============================================================================

/// Stub order blotter.
///
/// Orders are added explicitly; field updates are applied synchronously and
/// notify handlers on the calling thread.
#[derive(Debug, Default)]
pub struct StubOrderFeed {
    orders: RwLock<IndexMap<i64, Arc<Order>>>,
}

impl StubOrderFeed {
    /// Create an empty order feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an order.
    pub fn add_order(&self, order: Order) -> Arc<Order> {
        let order = Arc::new(order);
        self.orders.write().insert(order.sequence(), order.clone());
        order
    }

    /// Apply a field update to an order.
    pub fn update_field(
        &self,
        sequence: i64,
        field: &str,
        value: impl Into<Value>,
    ) -> FeedResult<FieldChange> {
        let order = self.order(sequence)?;
        let change = order.field(field)?.update(value);
        debug!(sequence, field, value = %change.new_value, "Order field updated");
        Ok(change)
    }
}

impl OrderFeed for StubOrderFeed {
    fn orders(&self) -> Vec<Arc<Order>> {
        self.orders.read().values().cloned().collect()
    }

    fn order(&self, sequence: i64) -> FeedResult<Arc<Order>> {
        self.orders
            .read()
            .get(&sequence)
            .cloned()
            .ok_or(FeedError::UnknownOrder(sequence))
    }
}

// =============================================================================
// Stub Market Data
// =============================================================================

/// Stub market data feed.
///
/// Ticks are delivered by `publish` once the feed has been started.
#[derive(Debug, Default)]
pub struct StubMarketData {
    fields: RwLock<Vec<String>>,
    securities: RwLock<IndexMap<String, Arc<Security>>>,
    started: AtomicBool,
}

impl StubMarketData {
    /// Create a feed with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `start` has been called.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Subscribed tickers, in subscription order.
    pub fn tickers(&self) -> Vec<String> {
        self.securities.read().keys().cloned().collect()
    }

    /// Deliver a tick.
    pub fn publish(
        &self,
        ticker: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> FeedResult<FieldChange> {
        if !self.is_started() {
            return Err(FeedError::NotStarted);
        }

        let security = self
            .security(ticker)
            .ok_or_else(|| FeedError::UnknownSecurity(ticker.to_string()))?;
        let change = security.field(field)?.update(value);
        debug!(ticker, field, value = %change.new_value, "Tick published");
        Ok(change)
    }
}

impl MarketDataFeed for StubMarketData {
    fn add_field(&self, name: &str) {
        {
            let mut fields = self.fields.write();
            if fields.iter().any(|f| f == name) {
                return;
            }
            fields.push(name.to_string());
        }

        for security in self.securities.read().values() {
            security.ensure_field(name);
        }
    }

    fn security(&self, ticker: &str) -> Option<Arc<Security>> {
        self.securities.read().get(ticker).cloned()
    }

    fn add_security(&self, ticker: &str) -> Arc<Security> {
        let fields = self.fields.read().clone();
        self.securities
            .write()
            .entry(ticker.to_string())
            .or_insert_with(|| Arc::new(Security::new(ticker, fields.as_slice())))
            .clone()
    }

    fn start(&self) -> FeedResult<()> {
        self.started.store(true, Ordering::Release);
        debug!(securities = self.securities.read().len(), "Stub market data started");
        Ok(())
    }
}

// =============================================================================
// Stub Reference Data
// =============================================================================

/// Stub reference data service answering from an in-memory table.
#[derive(Debug, Default)]
pub struct StubRefData {
    values: HashMap<(String, String), Value>,
    fetches: AtomicUsize,
}

impl StubRefData {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    pub fn with_value(
        mut self,
        ticker: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.values.insert((ticker.into(), field.into()), value.into());
        self
    }

    /// Number of fetches served (including failed ones).
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl RefDataPort for StubRefData {
    fn fetch(&self, ticker: &str, field: &str) -> FeedResult<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.values
            .get(&(ticker.to_string(), field.to_string()))
            .cloned()
            .ok_or_else(|| FeedError::RefData(format!("no {} for {}", field, ticker)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::fields as md;
    use crate::order::fields;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_feed_update() {
        let feed = StubOrderFeed::new();
        feed.add_order(Order::new(1001, [(fields::AMOUNT, Value::Integer(100))]));

        let change = feed.update_field(1001, fields::AMOUNT, Value::Integer(250)).unwrap();

        assert_eq!(change.old_value, Value::Integer(100));
        assert_eq!(
            feed.order(1001).unwrap().field(fields::AMOUNT).unwrap().value(),
            Value::Integer(250)
        );
    }

    #[test]
    fn test_order_feed_unknown_order_and_field() {
        let feed = StubOrderFeed::new();
        feed.add_order(Order::new(1001, Vec::<(String, Value)>::new()));

        assert!(matches!(
            feed.update_field(9999, fields::AMOUNT, Value::Integer(1)),
            Err(FeedError::UnknownOrder(9999))
        ));
        assert!(matches!(
            feed.update_field(1001, fields::AMOUNT, Value::Integer(1)),
            Err(FeedError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_orders_keep_arrival_order() {
        let feed = StubOrderFeed::new();
        for seq in [1003, 1001, 1002] {
            feed.add_order(Order::new(seq, Vec::<(String, Value)>::new()));
        }

        let seqs: Vec<i64> = feed.orders().iter().map(|o| o.sequence()).collect();
        assert_eq!(seqs, vec![1003, 1001, 1002]);
    }

    #[test]
    fn test_market_data_requires_start() {
        let feed = StubMarketData::new();
        feed.add_field(md::LAST_PRICE);
        feed.add_security("IBM US Equity");

        assert!(matches!(
            feed.publish("IBM US Equity", md::LAST_PRICE, dec!(100)),
            Err(FeedError::NotStarted)
        ));

        feed.start().unwrap();
        feed.publish("IBM US Equity", md::LAST_PRICE, dec!(100)).unwrap();

        let security = feed.security("IBM US Equity").unwrap();
        assert_eq!(
            security.field(md::LAST_PRICE).unwrap().value(),
            Value::Number(dec!(100))
        );
        assert!(matches!(
            feed.publish("MSFT US Equity", md::LAST_PRICE, dec!(1)),
            Err(FeedError::UnknownSecurity(_))
        ));
    }

    #[test]
    fn test_fields_added_later_reach_existing_securities() {
        let feed = StubMarketData::new();
        let security = feed.add_security("VOD LN Equity");
        feed.add_field(md::BID);
        feed.add_field(md::BID);

        assert_eq!(security.field_names(), vec!["BID"]);
        assert!(Arc::ptr_eq(&security, &feed.add_security("VOD LN Equity")));
        assert_eq!(feed.tickers(), vec!["VOD LN Equity"]);
    }

    #[test]
    fn test_ref_data_lookup() {
        let refdata = StubRefData::new().with_value("IBM US Equity", "ID_ISIN", "US4592001014");

        assert_eq!(
            refdata.fetch("IBM US Equity", "ID_ISIN").unwrap(),
            Value::from("US4592001014")
        );
        assert!(matches!(
            refdata.fetch("IBM US Equity", "CNTRY_OF_RISK"),
            Err(FeedError::RefData(_))
        ));
        assert_eq!(refdata.fetch_count(), 2);
    }
}

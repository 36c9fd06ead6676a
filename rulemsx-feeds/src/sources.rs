//! Data point sources backed by feeds.
//!
//! Each source mirrors one feed field. Binding a source also registers a
//! notification handler on the field that marks the data point STALE, so
//! the next evaluation pass sees the new value.
//!
//! Handlers hold only a weak reference to the data point. Once the data set
//! is dropped the handler goes inactive and the field prunes it.

use rulemsx_engine::source::StaleFlag;
use rulemsx_engine::{
    ComputedSource, DataPoint, DataPointSource, DataPointState, EngineError, EngineResult, Value,
};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::field::{FieldChange, FieldFeed, NotificationHandler};
use crate::market_data::Security;
use crate::ports::RefDataPort;

/// Marks a data point STALE on every field change.
struct StaleHandler {
    data_point: Weak<DataPoint>,
}

impl NotificationHandler for StaleHandler {
    fn process_notification(&self, change: &FieldChange) {
        if let Some(dp) = self.data_point.upgrade() {
            debug!(
                data_set = %dp.data_set_name(),
                data_point = %dp.name(),
                field = %change.field,
                "Field changed"
            );
            dp.mark_stale();
        }
    }

    fn is_active(&self) -> bool {
        self.data_point.strong_count() > 0
    }
}

fn attach_stale_handler(data_point: &Arc<DataPoint>, field: &FieldFeed) {
    field.add_notification_handler(Arc::new(StaleHandler {
        data_point: Arc::downgrade(data_point),
    }));
}

// =============================================================================
// Order field
// =============================================================================

/// Mirrors an order field.
pub struct OrderFieldSource {
    field: Arc<FieldFeed>,
    flag: StaleFlag,
}

impl OrderFieldSource {
    /// Create an unbound source over `field`.
    pub fn new(field: Arc<FieldFeed>) -> Self {
        Self {
            field,
            flag: StaleFlag::stale(),
        }
    }

    /// Bind a mirror of `field` to `data_point` and subscribe it to changes.
    pub fn bind(data_point: &Arc<DataPoint>, field: Arc<FieldFeed>) -> EngineResult<()> {
        data_point.bind_source(Self::new(field.clone()))?;
        attach_stale_handler(data_point, &field);
        Ok(())
    }
}

impl DataPointSource for OrderFieldSource {
    fn value(&self) -> EngineResult<Value> {
        self.flag.take_stale();
        Ok(self.field.value())
    }

    fn state(&self) -> DataPointState {
        self.flag.state()
    }

    fn set_state(&self, state: DataPointState) {
        self.flag.set(state);
    }
}

impl fmt::Debug for OrderFieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderFieldSource")
            .field("field", &self.field.name())
            .field("state", &self.flag.state())
            .finish()
    }
}

// =============================================================================
// Market data
// =============================================================================

/// Mirrors a market data field of a subscribed security.
///
/// Unavailable (and STALE) until the first tick arrives.
pub struct MarketDataSource {
    ticker: String,
    field: Arc<FieldFeed>,
    flag: StaleFlag,
}

impl MarketDataSource {
    /// Bind a mirror of `security.field_name` to `data_point`.
    ///
    /// The field is subscribed on the security if it is not already.
    pub fn bind(
        data_point: &Arc<DataPoint>,
        security: &Security,
        field_name: &str,
    ) -> EngineResult<()> {
        let field = security.ensure_field(field_name);
        data_point.bind_source(Self {
            ticker: security.ticker().to_string(),
            field: field.clone(),
            flag: StaleFlag::stale(),
        })?;
        attach_stale_handler(data_point, &field);
        Ok(())
    }
}

impl DataPointSource for MarketDataSource {
    fn value(&self) -> EngineResult<Value> {
        self.flag.take_stale();
        let value = self.field.value();

        if value.is_empty() {
            self.flag.set(DataPointState::Stale);
            return Err(EngineError::SourceUnavailable(format!(
                "no {} tick for {}",
                self.field.name(),
                self.ticker
            )));
        }

        Ok(value)
    }

    fn state(&self) -> DataPointState {
        self.flag.state()
    }

    fn set_state(&self, state: DataPointState) {
        self.flag.set(state);
    }
}

impl fmt::Debug for MarketDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketDataSource")
            .field("ticker", &self.ticker)
            .field("field", &self.field.name())
            .field("state", &self.flag.state())
            .finish()
    }
}

// =============================================================================
// Reference data
// =============================================================================

/// Lazily fetched reference data field.
///
/// Fetches on the first read and again after being marked STALE. Lookup
/// failures surface as `EngineError::SourceUnavailable`.
#[derive(Debug)]
pub struct RefDataSource {
    inner: ComputedSource,
}

impl RefDataSource {
    /// Create a source fetching `field` for `ticker` from `port`.
    pub fn new(
        port: Arc<dyn RefDataPort>,
        ticker: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        let ticker = ticker.into();
        let field = field.into();

        Self {
            inner: ComputedSource::new(move || {
                debug!(ticker = %ticker, field = %field, "Fetching reference data");
                port.fetch(&ticker, &field)
                    .map_err(|e| EngineError::SourceUnavailable(e.to_string()))
            }),
        }
    }
}

impl DataPointSource for RefDataSource {
    fn value(&self) -> EngineResult<Value> {
        self.inner.value()
    }

    fn state(&self) -> DataPointState {
        self.inner.state()
    }

    fn set_state(&self, state: DataPointState) {
        self.inner.set_state(state);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::fields as md;
    use crate::order::{fields, Order};
    use crate::stub::StubRefData;
    use rulemsx_engine::DataSet;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_field_change_marks_data_point_stale() {
        let order = Order::new(1001, [(fields::EXCHANGE, Value::from("US"))]);
        let mut ds = DataSet::new("RMSXTest1001");
        let exchange = ds.add_data_point("Exchange").unwrap();

        OrderFieldSource::bind(&exchange, order.field(fields::EXCHANGE).unwrap().clone())
            .unwrap();

        assert_eq!(exchange.value().unwrap(), Value::from("US"));
        assert_eq!(exchange.state(), DataPointState::Current);

        order.field(fields::EXCHANGE).unwrap().update("LN");

        assert_eq!(exchange.state(), DataPointState::Stale);
        assert_eq!(exchange.value().unwrap(), Value::from("LN"));
        assert_eq!(exchange.state(), DataPointState::Current);
    }

    #[test]
    fn test_dropped_data_point_ignores_updates() {
        let order = Order::new(1001, [(fields::AMOUNT, Value::Integer(100))]);
        let field = order.field(fields::AMOUNT).unwrap().clone();

        {
            let mut ds = DataSet::new("RMSXTest1001");
            let amount = ds.add_data_point("Amount").unwrap();
            OrderFieldSource::bind(&amount, field.clone()).unwrap();
            assert_eq!(field.handler_count(), 1);
        }

        assert_eq!(field.handler_count(), 0);
        field.update(Value::Integer(200));
        assert_eq!(field.value(), Value::Integer(200));
    }

    #[test]
    fn test_market_data_unavailable_until_first_tick() {
        let security = Security::new::<&str>("IBM US Equity", &[]);
        let mut ds = DataSet::new("RMSXTest1001");
        let last_price = ds.add_data_point("LastPrice").unwrap();

        MarketDataSource::bind(&last_price, &security, md::LAST_PRICE).unwrap();

        assert!(matches!(last_price.value(), Err(EngineError::SourceUnavailable(_))));
        assert_eq!(last_price.state(), DataPointState::Stale);

        security.field(md::LAST_PRICE).unwrap().update(dec!(100.25));

        assert_eq!(last_price.value().unwrap(), Value::Number(dec!(100.25)));
        assert_eq!(last_price.state(), DataPointState::Current);
    }

    #[test]
    fn test_ref_data_fetched_once_until_stale() {
        let port = Arc::new(StubRefData::new().with_value(
            "IBM US Equity",
            "ID_ISIN",
            "US4592001014",
        ));
        let source = RefDataSource::new(port.clone(), "IBM US Equity", "ID_ISIN");

        assert_eq!(source.value().unwrap(), Value::from("US4592001014"));
        assert_eq!(source.value().unwrap(), Value::from("US4592001014"));
        assert_eq!(port.fetch_count(), 1);

        source.set_state(DataPointState::Stale);
        source.value().unwrap();
        assert_eq!(port.fetch_count(), 2);
    }

    #[test]
    fn test_ref_data_failure_is_unavailable() {
        let port = Arc::new(StubRefData::new());
        let source = RefDataSource::new(port, "VOD LN Equity", "ID_ISIN");

        assert!(matches!(source.value(), Err(EngineError::SourceUnavailable(_))));
        assert_eq!(source.state(), DataPointState::Stale);
    }
}

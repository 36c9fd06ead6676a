//! Data set and rule set construction.
//!
//! One data set per working order, named `RMSXTest<sequence>`:
//!
//! ```text
//! OrderNo, AssetClass, Amount, Exchange, Ticker   ← order fields
//! ISIN                                            ← reference data (ID_ISIN)
//! LastPrice                                       ← market data (LAST_PRICE)
//! Margin                                          ← constant
//! NewPrice = Margin + LastPrice                   ← compound
//! ```
//!
//! and the `TestRules` rule set:
//!
//! ```text
//! IsLNExchange → route to BB
//! IsUSExchange → route to DMTB
//!   └─ IsIBM   → signal "This is IBM!!"
//! IsLargeOrder → signal "Large order"   (Amount >= threshold)
//! ```

use rulemsx_engine::{CompoundSource, ConstantSource, Rule, RuleEngine};
use rulemsx_feeds::market_data::fields as md;
use rulemsx_feeds::{
    fields, MarketDataFeed, MarketDataSource, Order, OrderFieldSource, RefDataPort, RefDataSource,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

use crate::actions::{RouteToBroker, SendAdditionalSignal, SignalLog};
use crate::error::DaemonResult;
use crate::evaluators::{Comparison, NumericThreshold, StringEquality};
use crate::journal::RouteJournal;
use crate::ports::RoutePort;

/// Name of the routing rule set.
pub const RULE_SET: &str = "TestRules";

/// Signal raised by `IsLargeOrder`.
pub const LARGE_ORDER_SIGNAL: &str = "Large order";

/// Reference data field backing `ISIN`.
pub const ISIN_FIELD: &str = "ID_ISIN";

/// Market data fields subscribed for every security.
pub const MARKET_DATA_FIELDS: [&str; 4] = [md::BID, md::ASK, md::MID, md::LAST_PRICE];

/// Data point names.
pub mod points {
    pub const ORDER_NO: &str = "OrderNo";
    pub const ASSET_CLASS: &str = "AssetClass";
    pub const AMOUNT: &str = "Amount";
    pub const EXCHANGE: &str = "Exchange";
    pub const TICKER: &str = "Ticker";
    pub const ISIN: &str = "ISIN";
    pub const LAST_PRICE: &str = "LastPrice";
    pub const MARGIN: &str = "Margin";
    pub const NEW_PRICE: &str = "NewPrice";
}

const ORDER_FIELD_POINTS: [(&str, &str); 5] = [
    (points::ORDER_NO, fields::SEQUENCE),
    (points::ASSET_CLASS, fields::ASSET_CLASS),
    (points::AMOUNT, fields::AMOUNT),
    (points::EXCHANGE, fields::EXCHANGE),
    (points::TICKER, fields::TICKER),
];

/// Data set name for an order.
pub fn data_set_name(sequence: i64) -> String {
    format!("RMSXTest{}", sequence)
}

// =============================================================================
// Data sets
// =============================================================================

/// Create and bind the data set for `order`. Returns the data set name.
///
/// The order's security is subscribed on `market` if it is not already.
pub fn build_order_data_set(
    engine: &mut RuleEngine,
    order: &Order,
    market: &dyn MarketDataFeed,
    refdata: &Arc<dyn RefDataPort>,
    margin: Decimal,
) -> DaemonResult<String> {
    let name = data_set_name(order.sequence());
    let ticker = order.ticker()?;
    let data_set = engine.create_data_set(name.clone())?;

    for (point, field) in ORDER_FIELD_POINTS {
        let dp = data_set.add_data_point(point)?;
        OrderFieldSource::bind(&dp, order.field(field)?.clone())?;
        debug!(data_set = %name, data_point = point, field, "Bound order field");
    }

    data_set
        .add_data_point(points::ISIN)?
        .bind_source(RefDataSource::new(refdata.clone(), ticker.clone(), ISIN_FIELD))?;

    let security = match market.security(&ticker) {
        Some(security) => security,
        None => market.add_security(&ticker),
    };
    let last_price = data_set.add_data_point(points::LAST_PRICE)?;
    MarketDataSource::bind(&last_price, &security, md::LAST_PRICE)?;

    let margin_dp = data_set.add_data_point(points::MARGIN)?;
    margin_dp.bind_source(ConstantSource::new(margin))?;

    let new_price = data_set.add_data_point(points::NEW_PRICE)?;
    new_price.bind_source(CompoundSource::sum(vec![margin_dp, last_price]))?;

    info!(data_set = %name, ticker = %ticker, points = data_set.len(), "Data set created");
    Ok(name)
}

// =============================================================================
// Rules
// =============================================================================

/// Create the `TestRules` rule set.
///
/// Route actions use `NewPrice` as limit price and, when `journal` is
/// given, skip routes already requested for the same order and broker.
/// Orders of at least `large_order_amount` raise `LARGE_ORDER_SIGNAL`.
pub fn build_test_rules(
    engine: &mut RuleEngine,
    router: Arc<dyn RoutePort>,
    journal: Option<Arc<RouteJournal>>,
    signals: Arc<SignalLog>,
    large_order_amount: Decimal,
) -> DaemonResult<()> {
    let route = |broker: &str| {
        let action = RouteToBroker::new(broker, router.clone()).with_limit_price(points::NEW_PRICE);
        match &journal {
            Some(journal) => action.with_journal(journal.clone()),
            None => action,
        }
    };

    let rule_set = engine.create_rule_set(RULE_SET)?;

    rule_set.add_rule(
        Rule::new("IsLNExchange", StringEquality::new(points::EXCHANGE, "LN"))
            .with_action(route("BB")),
    )?;

    let is_us = rule_set.add_rule(
        Rule::new("IsUSExchange", StringEquality::new(points::EXCHANGE, "US"))
            .with_action(route("DMTB")),
    )?;

    rule_set.add_child_rule(
        is_us,
        Rule::new("IsIBM", StringEquality::new(points::TICKER, "IBM US Equity"))
            .with_action(SendAdditionalSignal::new("This is IBM!!", signals.clone())),
    )?;

    let large = NumericThreshold::new(
        points::AMOUNT,
        Comparison::GreaterOrEqual,
        large_order_amount,
    );
    rule_set.add_rule(
        Rule::new("IsLargeOrder", large)
            .with_action(SendAdditionalSignal::new(LARGE_ORDER_SIGNAL, signals)),
    )?;

    info!(
        rule_set = RULE_SET,
        rules = rule_set.len(),
        reads = ?rule_set.dependencies(),
        "Rule set created"
    );
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

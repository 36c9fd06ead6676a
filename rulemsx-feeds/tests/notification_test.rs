//! Feed notifications flowing into rule evaluation.

use parking_lot::Mutex;
use rulemsx_engine::{
    DataPointState, DataSet, EngineResult, Rule, RuleEngine, RuleEvaluator, Value,
};
use rulemsx_feeds::market_data::fields as md;
use rulemsx_feeds::{
    fields, MarketDataFeed, MarketDataSource, Order, OrderFeed, OrderFieldSource, StubMarketData,
    StubOrderFeed,
};
use rust_decimal_macros::dec;
use std::sync::Arc;

struct ExchangeIs(&'static str);

impl RuleEvaluator for ExchangeIs {
    fn evaluate(&self, data_set: &DataSet) -> EngineResult<bool> {
        Ok(data_set.value_of("Exchange")?.matches_text(self.0))
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["Exchange".to_string()]
    }
}

struct PriceAbove(rust_decimal::Decimal);

impl RuleEvaluator for PriceAbove {
    fn evaluate(&self, data_set: &DataSet) -> EngineResult<bool> {
        Ok(data_set.value_of("LastPrice")?.as_decimal()? > self.0)
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["LastPrice".to_string()]
    }
}

fn recorder(
    log: &Arc<Mutex<Vec<String>>>,
    tag: &'static str,
) -> impl Fn(&DataSet) -> EngineResult<()> + Send + Sync + 'static {
    let log = log.clone();
    move |ds: &DataSet| -> EngineResult<()> {
        log.lock().push(format!("{}:{}", ds.name(), tag));
        Ok(())
    }
}

#[test]
fn test_order_update_changes_next_evaluation() -> anyhow::Result<()> {
    let orders = StubOrderFeed::new();
    orders.add_order(Order::new(
        1001,
        [
            (fields::EXCHANGE, Value::from("US")),
            (fields::TICKER, Value::from("IBM US Equity")),
        ],
    ));

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut engine = RuleEngine::new();

    {
        let rs = engine.create_rule_set("TestRules")?;
        rs.add_rule(Rule::new("IsUS", ExchangeIs("US")).with_action(recorder(&log, "DMTB")))?;
        rs.add_rule(Rule::new("IsLN", ExchangeIs("LN")).with_action(recorder(&log, "BB")))?;
    }

    let order = orders.order(1001)?;
    {
        let ds = engine.create_data_set("RMSXTest1001")?;
        let exchange = ds.add_data_point("Exchange")?;
        OrderFieldSource::bind(&exchange, order.field(fields::EXCHANGE)?.clone())?;
    }

    engine.execute("TestRules", "RMSXTest1001")?;
    assert_eq!(*log.lock(), vec!["RMSXTest1001:DMTB"]);

    orders.update_field(1001, fields::EXCHANGE, "LN")?;
    let exchange = engine.data_set("RMSXTest1001")?.data_point("Exchange")?.clone();
    assert_eq!(exchange.state(), DataPointState::Stale);

    engine.execute("TestRules", "RMSXTest1001")?;
    assert_eq!(*log.lock(), vec!["RMSXTest1001:DMTB", "RMSXTest1001:BB"]);
    Ok(())
}

#[test]
fn test_tick_before_start_is_rejected_and_rule_fails_scoped() -> anyhow::Result<()> {
    let market = StubMarketData::new();
    market.add_field(md::LAST_PRICE);
    let security = market.add_security("IBM US Equity");

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut engine = RuleEngine::new();
    engine.create_rule_set("PriceRules")?.add_rule(
        Rule::new("Above100", PriceAbove(dec!(100))).with_action(recorder(&log, "HIGH")),
    )?;

    {
        let ds = engine.create_data_set("RMSXTest1001")?;
        let last_price = ds.add_data_point("LastPrice")?;
        MarketDataSource::bind(&last_price, &security, md::LAST_PRICE)?;
    }

    // No tick yet: the rule fails, the pass still completes
    let report = engine.execute("PriceRules", "RMSXTest1001")?;
    assert!(report.has_failures());
    assert!(report.fired_rules().is_empty());

    assert!(market.publish("IBM US Equity", md::LAST_PRICE, dec!(101)).is_err());
    market.start()?;
    market.publish("IBM US Equity", md::LAST_PRICE, dec!(101))?;

    let report = engine.execute("PriceRules", "RMSXTest1001")?;
    assert!(!report.has_failures());
    assert_eq!(report.fired_rules(), vec!["Above100"]);
    assert_eq!(*log.lock(), vec!["RMSXTest1001:HIGH"]);
    Ok(())
}

#[test]
fn test_removed_data_sets_release_field_handlers() -> anyhow::Result<()> {
    let orders = StubOrderFeed::new();
    orders.add_order(Order::new(1001, [(fields::EXCHANGE, Value::from("US"))]));
    let order = orders.order(1001)?;
    let exchange = order.field(fields::EXCHANGE)?.clone();

    let mut engine = RuleEngine::new();
    for _ in 0..100 {
        let ds = engine.create_data_set("RMSXTest1001")?;
        let dp = ds.add_data_point("Exchange")?;
        OrderFieldSource::bind(&dp, exchange.clone())?;
        drop(dp);
        engine.remove_data_set("RMSXTest1001")?;
    }

    assert_eq!(engine.data_set_count(), 0);
    assert_eq!(exchange.handler_count(), 0);

    orders.update_field(1001, fields::EXCHANGE, "LN")?;
    assert_eq!(exchange.value(), Value::from("LN"));
    Ok(())
}

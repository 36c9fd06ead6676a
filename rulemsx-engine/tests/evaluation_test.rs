//! Integration test: rule tree evaluation through the registry.
//!
//! Scenario from the routing sample:
//! - IsLNExchange (alpha) → route to BB
//! - IsUSExchange (alpha, no actions) → IsIBM (beta) → signal

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use rulemsx_engine::{
    CompoundSource, ComputedSource, ConstantSource, DataPointState, DataSet, EngineError,
    EngineResult, EntityKind, Rule, RuleAction, RuleEngine, RuleEvaluator, RuleOutcome, Value,
};
use rust_decimal_macros::dec;

// =============================================================================
// Fixtures
// =============================================================================

struct StringEquality {
    data_point: String,
    expected: String,
}

impl StringEquality {
    fn new(data_point: &str, expected: &str) -> Self {
        Self {
            data_point: data_point.to_string(),
            expected: expected.to_string(),
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

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

struct Signal {
    journal: Journal,
    text: &'static str,
}

impl RuleAction for Signal {
    fn execute(&self, data_set: &DataSet) -> EngineResult<()> {
        let order_no = data_set.value_of("OrderNo")?;
        self.journal
            .0
            .lock()
            .push(format!("{}:{}:{}", data_set.name(), order_no, self.text));
        Ok(())
    }
}

fn add_order(engine: &mut RuleEngine, name: &str, order_no: i64, exchange: &str, ticker: &str) {
    let ds = engine.create_data_set(name).unwrap();
    for (dp, value) in [
        ("OrderNo", Value::Integer(order_no)),
        ("Exchange", Value::from(exchange)),
        ("Ticker", Value::from(ticker)),
    ] {
        ds.add_data_point(dp)
            .unwrap()
            .bind_source(ConstantSource::new(value))
            .unwrap();
    }
}

fn build_rules(engine: &mut RuleEngine, journal: &Journal) {
    let rules = engine.create_rule_set("TestRules").unwrap();

    rules
        .add_rule(
            Rule::new("IsLNExchange", StringEquality::new("Exchange", "LN")).with_action(Signal {
                journal: journal.clone(),
                text: "route BB",
            }),
        )
        .unwrap();
    let us = rules
        .add_rule(Rule::new("IsUSExchange", StringEquality::new("Exchange", "US")))
        .unwrap();
    rules
        .add_child_rule(
            us,
            Rule::new("IsIBM", StringEquality::new("Ticker", "IBM US Equity")).with_action(Signal {
                journal: journal.clone(),
                text: "This is IBM!!",
            }),
        )
        .unwrap();
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_us_ibm_fires_only_beta_action() {
    let journal = Journal::default();
    let mut engine = RuleEngine::new();
    add_order(&mut engine, "RMSXTest1001", 1001, "US", "IBM US Equity");
    build_rules(&mut engine, &journal);

    let report = engine.execute("TestRules", "RMSXTest1001").unwrap();

    assert_eq!(journal.entries(), vec!["RMSXTest1001:1001:This is IBM!!"]);
    assert_eq!(report.attempted_rules(), vec!["IsLNExchange", "IsUSExchange", "IsIBM"]);
    assert_eq!(report.fired_rules(), vec!["IsUSExchange", "IsIBM"]);
    assert_eq!(report.outcome_of("IsUSExchange"), Some(&RuleOutcome::Fired { actions: 0 }));
    assert_eq!(report.visits[2].depth, 1);
    assert!(!report.has_failures());
}

#[test]
fn test_execute_all_covers_every_data_set() {
    let journal = Journal::default();
    let mut engine = RuleEngine::new();
    add_order(&mut engine, "RMSXTest1001", 1001, "US", "IBM US Equity");
    add_order(&mut engine, "RMSXTest1002", 1002, "LN", "VOD LN Equity");
    add_order(&mut engine, "RMSXTest1003", 1003, "US", "AAPL US Equity");
    build_rules(&mut engine, &journal);

    let reports = engine.execute_all("TestRules").unwrap();

    assert_eq!(reports.len(), 3);
    assert_eq!(
        journal.entries(),
        vec![
            "RMSXTest1001:1001:This is IBM!!",
            "RMSXTest1002:1002:route BB",
        ]
    );
    assert_eq!(reports[2].fired_rules(), vec!["IsUSExchange"]);
    assert_eq!(reports[2].outcome_of("IsIBM"), Some(&RuleOutcome::NotMatched));
}

#[test]
fn test_missing_data_point_is_scoped_to_rule_and_data_set() {
    let journal = Journal::default();
    let mut engine = RuleEngine::new();

    // No Exchange data point on the first order
    let ds = engine.create_data_set("Broken").unwrap();
    ds.add_data_point("OrderNo")
        .unwrap()
        .bind_source(ConstantSource::new(Value::Integer(1)))
        .unwrap();
    add_order(&mut engine, "RMSXTest1001", 1001, "US", "IBM US Equity");
    build_rules(&mut engine, &journal);

    let broken = engine.data_set("Broken").unwrap();
    assert_eq!(
        broken.data_point("Exchange").unwrap_err(),
        EngineError::not_found(EntityKind::DataPoint, "Exchange")
    );

    let reports = engine.execute_all("TestRules").unwrap();

    // Both alpha rules failed on the broken set, independently
    assert_eq!(reports[0].failures().len(), 2);
    for failure in reports[0].failures() {
        assert!(matches!(
            failure,
            EngineError::EvaluationFailure { data_set, .. } if data_set == "Broken"
        ));
    }

    // The healthy set still ran
    assert!(!reports[1].has_failures());
    assert_eq!(journal.entries(), vec!["RMSXTest1001:1001:This is IBM!!"]);
}

#[test]
fn test_compound_new_price_follows_last_price() {
    let mut engine = RuleEngine::new();
    let ds = engine.create_data_set("RMSXTest1001").unwrap();

    let margin = ds.add_data_point("Margin").unwrap();
    margin.bind_source(ConstantSource::new(dec!(2.0))).unwrap();

    let price_feed = Arc::new(Mutex::new(dec!(100.0)));
    let feed = price_feed.clone();
    let last_price = ds.add_data_point("LastPrice").unwrap();
    last_price
        .bind_source(ComputedSource::new(move || Ok(Value::Number(*feed.lock()))))
        .unwrap();

    let new_price = ds.add_data_point("NewPrice").unwrap();
    new_price
        .bind_source(CompoundSource::sum(vec![margin.clone(), last_price.clone()]))
        .unwrap();

    assert_eq!(ds.value_of("NewPrice").unwrap(), Value::Number(dec!(102.0)));

    // Underlying changes without notification: cached values hold
    *price_feed.lock() = dec!(101.5);
    assert_eq!(ds.value_of("NewPrice").unwrap(), Value::Number(dec!(102.0)));

    // Notification arrives
    last_price.mark_stale();
    assert_eq!(new_price.state(), DataPointState::Stale);
    assert_eq!(ds.value_of("NewPrice").unwrap(), Value::Number(dec!(103.5)));
    assert_eq!(new_price.state(), DataPointState::Current);
}

#[test]
fn test_mark_stale_from_another_thread_during_reads() {
    let mut engine = RuleEngine::new();
    let ds = engine.create_data_set("RMSXTest1001").unwrap();

    let counter = Arc::new(AtomicUsize::new(0));
    let c = counter.clone();
    let dp = ds.add_data_point("LastPrice").unwrap();
    dp.bind_source(ComputedSource::new(move || {
        Ok(Value::Integer(c.fetch_add(1, Ordering::SeqCst) as i64))
    }))
    .unwrap();

    let notifier = {
        let dp = dp.clone();
        thread::spawn(move || {
            for _ in 0..1000 {
                dp.mark_stale();
            }
        })
    };

    for _ in 0..1000 {
        let value = dp.value().unwrap();
        assert!(matches!(value, Value::Integer(n) if n >= 0));
    }
    notifier.join().unwrap();

    // Whatever interleaving happened, one more notification forces a recompute
    dp.mark_stale();
    let before = counter.load(Ordering::SeqCst);
    dp.value().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), before + 1);
}

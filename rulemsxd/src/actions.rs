//! Rule actions used by the routing rules.
//!
//! Actions read only from the data set they are invoked on.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rulemsx_engine::{DataSet, EngineError, EngineResult, RuleAction, Value};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::DaemonError;
use crate::journal::RouteJournal;
use crate::ports::{RoutePort, RouteRequest};
use crate::wiring::points;

// =============================================================================
// Route to broker
// =============================================================================

/// Sends a route instruction for the order to a fixed broker.
pub struct RouteToBroker {
    broker: String,
    router: Arc<dyn RoutePort>,
    journal: Option<Arc<RouteJournal>>,
    limit_price: Option<String>,
}

impl RouteToBroker {
    /// Route to `broker` through `router`. Every firing sends a request.
    pub fn new(broker: impl Into<String>, router: Arc<dyn RoutePort>) -> Self {
        Self {
            broker: broker.into(),
            router,
            journal: None,
            limit_price: None,
        }
    }

    /// Suppress requests already journaled for the same order and broker.
    pub fn with_journal(mut self, journal: Arc<RouteJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Use a data point as limit price. While it is unavailable the route
    /// is sent without a limit.
    pub fn with_limit_price(mut self, data_point: impl Into<String>) -> Self {
        self.limit_price = Some(data_point.into());
        self
    }

    /// Broker code.
    pub fn broker(&self) -> &str {
        &self.broker
    }

    fn build_request(&self, data_set: &DataSet) -> EngineResult<RouteRequest> {
        let order_no = match data_set.value_of(points::ORDER_NO)? {
            Value::Integer(n) => n,
            other => return Err(EngineError::type_mismatch("integer", other.type_name())),
        };

        let limit_price = match &self.limit_price {
            Some(name) => read_price(data_set, name)?,
            None => None,
        };

        Ok(RouteRequest::new(data_set.name(), order_no, &self.broker, limit_price))
    }
}

fn read_price(data_set: &DataSet, name: &str) -> EngineResult<Option<Decimal>> {
    match data_set.value_of(name) {
        Ok(value) => value.as_decimal().map(Some),
        Err(EngineError::SourceUnavailable(reason)) => {
            debug!(data_set = %data_set.name(), data_point = name, %reason, "No limit price yet");
            Ok(None)
        },
        Err(e) => Err(e),
    }
}

impl RuleAction for RouteToBroker {
    fn execute(&self, data_set: &DataSet) -> EngineResult<()> {
        let request = self.build_request(data_set)?;

        if let Some(journal) = &self.journal {
            match journal.record(&request) {
                Ok(()) => {},
                Err(DaemonError::DuplicateRoute { .. }) => {
                    debug!(
                        data_set = %request.data_set,
                        broker = %request.broker,
                        "Duplicate route suppressed"
                    );
                    return Ok(());
                },
                Err(e) => return Err(EngineError::Action(e.to_string())),
            }
        }

        match self.router.route(&request) {
            Ok(ack) => {
                info!(
                    data_set = %request.data_set,
                    order_no = request.order_no,
                    broker = %request.broker,
                    route_id = %ack.route_id,
                    "Created route"
                );
                if let Some(journal) = &self.journal {
                    journal
                        .complete(&ack)
                        .map_err(|e| EngineError::Action(e.to_string()))?;
                }
                Ok(())
            },
            Err(e) => {
                warn!(
                    data_set = %request.data_set,
                    broker = %request.broker,
                    error = %e,
                    "Route failed"
                );
                if let Some(journal) = &self.journal {
                    // Recorded above
                    let _ = journal.fail(request.id, e.to_string());
                }
                Err(EngineError::Action(e.to_string()))
            },
        }
    }
}

// =============================================================================
// Additional signal
// =============================================================================

/// A signal raised for a data set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentSignal {
    /// Data set the signal was raised for
    pub data_set: String,
    /// Signal text
    pub signal: String,
    /// When the signal was raised
    pub sent_at: DateTime<Utc>,
}

/// Record of raised signals.
#[derive(Debug, Default)]
pub struct SignalLog {
    signals: Mutex<Vec<SentSignal>>,
}

impl SignalLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All signals, in the order they were raised.
    pub fn signals(&self) -> Vec<SentSignal> {
        self.signals.lock().clone()
    }

    /// Signal texts raised for a data set.
    pub fn signals_for(&self, data_set: &str) -> Vec<String> {
        self.signals
            .lock()
            .iter()
            .filter(|s| s.data_set == data_set)
            .map(|s| s.signal.clone())
            .collect()
    }

    fn push(&self, signal: SentSignal) {
        self.signals.lock().push(signal);
    }
}

/// Raises a fixed signal for the data set.
#[derive(Debug)]
pub struct SendAdditionalSignal {
    signal: String,
    log: Arc<SignalLog>,
}

impl SendAdditionalSignal {
    /// Raise `signal` into `log` on every firing.
    pub fn new(signal: impl Into<String>, log: Arc<SignalLog>) -> Self {
        Self {
            signal: signal.into(),
            log,
        }
    }
}

impl RuleAction for SendAdditionalSignal {
    fn execute(&self, data_set: &DataSet) -> EngineResult<()> {
        info!(data_set = %data_set.name(), signal = %self.signal, "Sending signal");
        self.log.push(SentSignal {
            data_set: data_set.name().to_string(),
            signal: self.signal.clone(),
            sent_at: Utc::now(),
        });
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::RouteStatus;
    use crate::stub::StubRouter;
    use rulemsx_engine::{ComputedSource, ConstantSource};
    use rust_decimal_macros::dec;

    fn order_data_set(order_no: i64) -> DataSet {
        let mut ds = DataSet::new(format!("RMSXTest{}", order_no));
        ds.add_data_point(points::ORDER_NO)
            .unwrap()
            .bind_source(ConstantSource::new(order_no))
            .unwrap();
        ds
    }

    #[test]
    fn test_route_without_journal_sends_every_time() {
        let router = Arc::new(StubRouter::new());
        let action = RouteToBroker::new("DMTB", router.clone());
        let ds = order_data_set(1001);

        action.execute(&ds).unwrap();
        action.execute(&ds).unwrap();

        assert_eq!(router.brokers_for("RMSXTest1001"), vec!["DMTB", "DMTB"]);
        assert_eq!(router.routes()[0].order_no, 1001);
    }

    #[test]
    fn test_journal_suppresses_duplicate_route() {
        let router = Arc::new(StubRouter::new());
        let journal = Arc::new(RouteJournal::new());
        let action = RouteToBroker::new("DMTB", router.clone()).with_journal(journal.clone());
        let ds = order_data_set(1001);

        action.execute(&ds).unwrap();
        action.execute(&ds).unwrap();

        assert_eq!(router.routes().len(), 1);
        assert!(journal.is_routed("RMSXTest1001", "DMTB"));
    }

    #[test]
    fn test_failed_route_is_retried_next_pass() {
        let router = Arc::new(StubRouter::new());
        let journal = Arc::new(RouteJournal::new());
        let action = RouteToBroker::new("BB", router.clone()).with_journal(journal.clone());
        let ds = order_data_set(1002);

        router.set_fail_next(true);
        assert!(matches!(action.execute(&ds), Err(EngineError::Action(_))));
        assert_eq!(journal.get("RMSXTest1002", "BB").unwrap().status, RouteStatus::Failed);

        action.execute(&ds).unwrap();
        assert!(journal.is_routed("RMSXTest1002", "BB"));
        assert_eq!(router.routes().len(), 1);
    }

    #[test]
    fn test_limit_price_read_when_available() {
        let router = Arc::new(StubRouter::new());
        let action = RouteToBroker::new("DMTB", router.clone()).with_limit_price(points::NEW_PRICE);

        let mut ds = order_data_set(1001);
        ds.add_data_point(points::NEW_PRICE)
            .unwrap()
            .bind_source(ConstantSource::new(dec!(102.0)))
            .unwrap();

        action.execute(&ds).unwrap();
        assert_eq!(router.routes()[0].limit_price, Some(dec!(102.0)));
    }

    #[test]
    fn test_unavailable_limit_price_routes_at_market() {
        let router = Arc::new(StubRouter::new());
        let action = RouteToBroker::new("DMTB", router.clone()).with_limit_price(points::NEW_PRICE);

        let mut ds = order_data_set(1001);
        ds.add_data_point(points::NEW_PRICE)
            .unwrap()
            .bind_source(ComputedSource::new(|| {
                Err(EngineError::SourceUnavailable("no LAST_PRICE tick".to_string()))
            }))
            .unwrap();

        action.execute(&ds).unwrap();
        assert_eq!(router.routes()[0].limit_price, None);
    }

    #[test]
    fn test_missing_order_no_fails_action() {
        let router = Arc::new(StubRouter::new());
        let action = RouteToBroker::new("DMTB", router.clone());
        let ds = DataSet::new("RMSXTest1001");

        assert!(matches!(action.execute(&ds), Err(EngineError::NotFound { .. })));
        assert!(router.routes().is_empty());
    }

    #[test]
    fn test_signal_is_logged() {
        let log = Arc::new(SignalLog::new());
        let action = SendAdditionalSignal::new("This is IBM!!", log.clone());

        action.execute(&order_data_set(1001)).unwrap();

        assert_eq!(log.signals_for("RMSXTest1001"), vec!["This is IBM!!"]);
        assert!(log.signals_for("RMSXTest1002").is_empty());
        assert_eq!(log.signals().len(), 1);
    }
}

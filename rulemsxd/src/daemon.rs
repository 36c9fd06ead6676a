//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together all components:
//! - Rule engine (data sets and the routing rule set)
//! - Feeds (orders, market data, reference data)
//! - Event bus (feed notifications → re-evaluation)
//! - Routing (route port and route journal)
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Build one data set per working order and the routing rule set
//! 3. Start market data
//! 4. Initial evaluation pass of every data set
//! 5. Main event loop (re-evaluate the data sets affected by each event)
//! 6. Graceful shutdown on SIGINT or a `Shutdown` event

use std::collections::HashMap;
use std::sync::Arc;

use rulemsx_engine::{EvaluationReport, RuleEngine, Value};
use rulemsx_feeds::market_data::fields as md;
use rulemsx_feeds::{
    fields, FieldChange, MarketDataFeed, Order, OrderFeed, RefDataPort, StubMarketData,
    StubOrderFeed, StubRefData,
};
use tracing::{debug, error, info, warn};

use crate::actions::SignalLog;
use crate::config::Config;
use crate::error::{DaemonError, DaemonResult};
use crate::event_bus::{EventBus, EventReceiver, FeedEvent};
use crate::journal::RouteJournal;
use crate::ports::RoutePort;
use crate::stub::StubRouter;
use crate::wiring::{self, MARKET_DATA_FIELDS, RULE_SET};

// =============================================================================
// Components
// =============================================================================

/// External services the daemon talks to.
#[derive(Clone)]
pub struct Feeds {
    /// Working orders
    pub orders: Arc<dyn OrderFeed>,
    /// Market data subscriptions
    pub market: Arc<dyn MarketDataFeed>,
    /// Reference data lookups
    pub refdata: Arc<dyn RefDataPort>,
    /// Route instructions
    pub router: Arc<dyn RoutePort>,
}

// =============================================================================
// Daemon
// =============================================================================

/// The main RuleMSX daemon.
pub struct Daemon {
    /// Configuration
    config: Config,
    /// Data sets and rule sets
    engine: RuleEngine,
    /// External services
    feeds: Feeds,
    /// Event bus
    event_bus: Arc<EventBus>,
    /// Receiver subscribed at construction, so no event is missed
    receiver: Option<EventReceiver>,
    /// Route journal
    journal: Arc<RouteJournal>,
    /// Raised signals
    signals: Arc<SignalLog>,
    /// Data sets by security ticker
    by_ticker: HashMap<String, Vec<String>>,
}

impl Daemon {
    /// Create a daemon with stub feeds seeded with sample orders.
    pub fn new_stub(config: Config) -> Self {
        let orders = StubOrderFeed::new();
        orders.add_order(Order::new(
            1001,
            [
                (fields::ASSET_CLASS, Value::from("Equity")),
                (fields::AMOUNT, Value::Integer(100)),
                (fields::EXCHANGE, Value::from("US")),
                (fields::TICKER, Value::from("IBM US Equity")),
            ],
        ));
        orders.add_order(Order::new(
            1002,
            [
                (fields::ASSET_CLASS, Value::from("Equity")),
                (fields::AMOUNT, Value::Integer(2500)),
                (fields::EXCHANGE, Value::from("LN")),
                (fields::TICKER, Value::from("VOD LN Equity")),
            ],
        ));

        let refdata = StubRefData::new()
            .with_value("IBM US Equity", wiring::ISIN_FIELD, "US4592001014")
            .with_value("VOD LN Equity", wiring::ISIN_FIELD, "GB00BH4HKS39");

        let feeds = Feeds {
            orders: Arc::new(orders),
            market: Arc::new(StubMarketData::new()),
            refdata: Arc::new(refdata),
            router: Arc::new(StubRouter::new()),
        };

        Self::new(config, feeds)
    }

    /// Create a daemon over the given feeds.
    pub fn new(config: Config, feeds: Feeds) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_bus.capacity));
        let receiver = Some(event_bus.subscribe());

        Self {
            config,
            engine: RuleEngine::new(),
            feeds,
            event_bus,
            receiver,
            journal: Arc::new(RouteJournal::new()),
            signals: Arc::new(SignalLog::new()),
            by_ticker: HashMap::new(),
        }
    }

    /// Configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Rule engine.
    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// Event bus.
    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    /// Route journal.
    pub fn journal(&self) -> &RouteJournal {
        &self.journal
    }

    /// Raised signals.
    pub fn signals(&self) -> &SignalLog {
        &self.signals
    }

    /// Data sets evaluated when `ticker` ticks.
    pub fn data_sets_for(&self, ticker: &str) -> &[String] {
        self.by_ticker.get(ticker).map(Vec::as_slice).unwrap_or(&[])
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Build data sets and rules, wire notifications to the event bus, and
    /// start market data.
    pub fn setup(&mut self) -> DaemonResult<()> {
        for field in MARKET_DATA_FIELDS {
            self.feeds.market.add_field(field);
        }

        for order in self.feeds.orders.orders() {
            let data_set = wiring::build_order_data_set(
                &mut self.engine,
                &order,
                self.feeds.market.as_ref(),
                &self.feeds.refdata,
                self.config.routing.default_margin,
            )?;
            self.watch_order(&order, &data_set)?;

            self.by_ticker
                .entry(order.ticker()?)
                .or_default()
                .push(data_set);
        }

        // After every data set is bound, so all LastPrice points are stale
        // before the event is posted
        for ticker in self.by_ticker.keys() {
            self.watch_security(ticker)?;
        }

        let journal = self
            .config
            .routing
            .suppress_duplicate_routes
            .then(|| self.journal.clone());
        wiring::build_test_rules(
            &mut self.engine,
            self.feeds.router.clone(),
            journal,
            self.signals.clone(),
            self.config.routing.large_order_amount,
        )?;

        self.feeds.market.start()?;

        info!(
            data_sets = self.engine.data_set_count(),
            securities = self.by_ticker.len(),
            "Setup complete"
        );
        Ok(())
    }

    /// Post an event for every change of the order's fields. Registered
    /// after the data point handlers, so the data points are already stale
    /// when the event is seen.
    fn watch_order(&self, order: &Order, data_set: &str) -> DaemonResult<()> {
        for name in order.field_names() {
            let bus = self.event_bus.clone();
            let data_set = data_set.to_string();
            order
                .field(name)?
                .add_notification_handler(Arc::new(move |change: &FieldChange| {
                    bus.send(FeedEvent::OrderFieldChanged {
                        data_set: data_set.clone(),
                        field: change.field.clone(),
                        timestamp: change.timestamp,
                    });
                }));
        }
        Ok(())
    }

    fn watch_security(&self, ticker: &str) -> DaemonResult<()> {
        let security = self
            .feeds
            .market
            .security(ticker)
            .ok_or_else(|| rulemsx_feeds::FeedError::UnknownSecurity(ticker.to_string()))?;

        let bus = self.event_bus.clone();
        let owner = ticker.to_string();
        security
            .field(md::LAST_PRICE)?
            .add_notification_handler(Arc::new(move |change: &FieldChange| {
                bus.send(FeedEvent::MarketData {
                    ticker: owner.clone(),
                    field: change.field.clone(),
                    timestamp: change.timestamp,
                });
            }));
        Ok(())
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Evaluate every data set against the routing rules.
    pub fn evaluate_all(&self) -> DaemonResult<Vec<EvaluationReport>> {
        let reports = self.engine.execute_all(RULE_SET)?;
        for report in &reports {
            log_report(report);
        }
        Ok(reports)
    }

    /// Evaluate one data set against the routing rules.
    pub fn evaluate(&self, data_set: &str) -> DaemonResult<EvaluationReport> {
        let report = self.engine.execute(RULE_SET, data_set)?;
        log_report(&report);
        Ok(report)
    }

    /// Handle an event from the event bus.
    ///
    /// Returns the reports of the passes it triggered.
    pub fn handle_event(&self, event: FeedEvent) -> DaemonResult<Vec<EvaluationReport>> {
        match event {
            FeedEvent::OrderFieldChanged { data_set, field, .. } => {
                debug!(data_set = %data_set, field = %field, "Order field changed");
                Ok(vec![self.evaluate(&data_set)?])
            },
            FeedEvent::MarketData { ticker, field, .. } => {
                debug!(ticker = %ticker, field = %field, "Market data update");
                self.data_sets_for(&ticker)
                    .iter()
                    .map(|data_set| self.evaluate(data_set))
                    .collect()
            },
            FeedEvent::Shutdown => Err(DaemonError::Shutdown),
        }
    }

    /// Handle every event already queued, without waiting.
    ///
    /// A `Shutdown` event stops draining and is returned as
    /// `DaemonError::Shutdown`.
    pub fn drain_events(&mut self) -> DaemonResult<Vec<EvaluationReport>> {
        let mut reports = Vec::new();

        loop {
            let next = match self.receiver.as_mut() {
                Some(receiver) => receiver.try_recv(),
                None => return Err(DaemonError::EventBus("receiver taken".to_string())),
            };

            match next {
                Some(Ok(event)) => reports.extend(self.handle_event(event)?),
                Some(Err(lag_msg)) => {
                    warn!(%lag_msg, "Event receiver lagged, re-evaluating all data sets");
                    reports.extend(self.evaluate_all()?);
                },
                None => return Ok(reports),
            }
        }
    }

    // =========================================================================
    // Run loop
    // =========================================================================

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT or a
    /// `Shutdown` event).
    pub async fn run(mut self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            "Starting RuleMSX daemon"
        );

        // 1. Data sets, rules, subscriptions
        self.setup()?;

        // 2. Initial pass
        self.evaluate_all()?;

        let mut receiver = self
            .receiver
            .take()
            .ok_or_else(|| DaemonError::EventBus("receiver taken".to_string()))?;

        // 3. Main event loop
        info!("Entering main event loop");
        loop {
            tokio::select! {
                event_result = receiver.recv() => {
                    match event_result {
                        Some(Ok(event)) => match self.handle_event(event) {
                            Ok(_) => {},
                            Err(DaemonError::Shutdown) => {
                                info!("Received shutdown event");
                                break;
                            },
                            Err(e) => error!(error = %e, "Error handling event"),
                        },
                        Some(Err(lag_msg)) => {
                            warn!(%lag_msg, "Event receiver lagged, re-evaluating all data sets");
                            if let Err(e) = self.evaluate_all() {
                                error!(error = %e, "Error re-evaluating after lag");
                            }
                        },
                        None => break,
                    }
                }

                // Handle shutdown signals
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        // 4. Graceful shutdown
        self.shutdown();

        Ok(())
    }

    fn shutdown(&self) {
        info!(
            routes = self.journal.len(),
            signals = self.signals.signals().len(),
            "Shutting down"
        );
    }
}

fn log_report(report: &EvaluationReport) {
    for failure in report.failures() {
        warn!(
            rule_set = %report.rule_set,
            data_set = %report.data_set,
            error = %failure,
            "Rule failed"
        );
    }

    debug!(
        rule_set = %report.rule_set,
        data_set = %report.data_set,
        fired = ?report.fired_rules(),
        actions = report.actions_executed(),
        elapsed_us = report.elapsed.as_micros() as u64,
        "Evaluation pass"
    );
}

// =============================================================================
// Tests
// =============================================================================

//! RuleMSX Daemon Library
//!
//! Runtime orchestrator that evaluates routing rules over working orders.
//!
//! # Architecture
//!
//! ```text
//! Order / Market Data feeds → FieldFeed → DataPoint::mark_stale
//!                                 ↓
//!                            Event Bus (FeedEvent)
//!                                 ↓
//!                  Daemon → RuleEngine::execute(TestRules, RMSXTest<seq>)
//!                                 ↓
//!              RouteToBroker → RouteJournal → RoutePort
//!              SendAdditionalSignal → SignalLog
//! ```
//!
//! # Components
//!
//! - **Daemon**: Main runtime orchestrator
//! - **Wiring**: Per-order data sets and the `TestRules` rule set
//! - **Evaluators / Actions**: Rule building blocks for routing
//! - **Route Journal**: Duplicate-route suppression
//! - **Event Bus**: Feed notifications to the run loop
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use rulemsxd::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let daemon = Daemon::new_stub(config);
//!     daemon.run().await.expect("Daemon error");
//! }
//! ```

#![warn(clippy::all)]

pub mod actions;
pub mod config;
pub mod daemon;
pub mod error;
pub mod evaluators;
pub mod event_bus;
pub mod journal;
pub mod ports;
pub mod stub;
pub mod wiring;

// Re-exports for convenience
pub use actions::{RouteToBroker, SendAdditionalSignal, SentSignal, SignalLog};
pub use config::{Config, Environment, EventBusConfig, RoutingConfig};
pub use daemon::{Daemon, Feeds};
pub use error::{DaemonError, DaemonResult};
pub use evaluators::{Comparison, NumericThreshold, StringEquality};
pub use event_bus::{EventBus, EventReceiver, FeedEvent};
pub use journal::{RouteEntry, RouteJournal, RouteStatus};
pub use ports::{RouteAck, RoutePort, RouteRequest};
pub use stub::StubRouter;

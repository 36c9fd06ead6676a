//! RuleMSX Feeds Layer
//!
//! Notification adapters between live order/market-data feeds and the
//! engine's data point sources.
//!
//! # Architecture
//!
//! ```text
//! Feed update → FieldFeed::update → NotificationHandler → DataPoint::mark_stale
//!                                                  ↓
//!                                   (next evaluation pass reads new value)
//! ```
//!
//! # Components
//!
//! - **Ports**: traits for order feeds, market data feeds and reference data
//! - **FieldFeed**: a live field that notifies registered handlers on change
//! - **Sources**: `DataPointSource` implementations bound to feeds
//! - **Stub**: in-process feed implementations for development and tests

#![warn(clippy::all)]

pub mod error;
pub mod field;
pub mod market_data;
pub mod order;
pub mod ports;
pub mod sources;
pub mod stub;

// Re-exports for convenience
pub use error::{FeedError, FeedResult};
pub use field::{FieldChange, FieldFeed, NotificationHandler};
pub use market_data::Security;
pub use order::{fields, Order};
pub use ports::{MarketDataFeed, OrderFeed, RefDataPort};
pub use sources::{MarketDataSource, OrderFieldSource, RefDataSource};
pub use stub::{StubMarketData, StubOrderFeed, StubRefData};

//! Feed port definitions.
//!
//! Ports define the interfaces to order management, market data and
//! reference data services. Adapters implement them for specific services;
//! `stub` provides in-process implementations.

use rulemsx_engine::Value;
use std::sync::Arc;

use crate::error::FeedResult;
use crate::market_data::Security;
use crate::order::Order;

// =============================================================================
// Order Feed Port
// =============================================================================

/// Port for the working-order blotter.
///
/// Implementations:
/// - `StubOrderFeed` - in-memory orders with manual field updates
pub trait OrderFeed: Send + Sync {
    /// All working orders, in arrival order.
    fn orders(&self) -> Vec<Arc<Order>>;

    /// Order by sequence number.
    fn order(&self, sequence: i64) -> FeedResult<Arc<Order>>;
}

// =============================================================================
// Market Data Port
// =============================================================================

/// Port for streaming market data subscriptions.
///
/// Implementations:
/// - `StubMarketData` - ticks published manually
pub trait MarketDataFeed: Send + Sync {
    /// Subscribe a field for every current and future security.
    fn add_field(&self, name: &str);

    /// Security if already subscribed.
    fn security(&self, ticker: &str) -> Option<Arc<Security>>;

    /// Subscribe a security (returns the existing one if present).
    fn add_security(&self, ticker: &str) -> Arc<Security>;

    /// Begin delivering updates.
    fn start(&self) -> FeedResult<()>;
}

// =============================================================================
// Reference Data Port
// =============================================================================

/// Port for static reference data (ISIN, country of risk, ...).
///
/// Called synchronously from an evaluation pass, on demand.
///
/// Implementations:
/// - `StubRefData` - answers from an in-memory table
pub trait RefDataPort: Send + Sync {
    /// Fetch a field for a security.
    fn fetch(&self, ticker: &str, field: &str) -> FeedResult<Value>;
}

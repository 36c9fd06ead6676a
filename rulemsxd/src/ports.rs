//! Routing port definitions.
//!
//! Route requests leave the daemon through `RoutePort`. Requests are built
//! only from data in the order's data set.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DaemonResult;

// =============================================================================
// Types
// =============================================================================

/// Instruction to route an order to a broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    /// Unique request identifier
    pub id: Uuid,
    /// Data set the request was built from
    pub data_set: String,
    /// Order sequence number
    pub order_no: i64,
    /// Broker code (e.g. `BB`, `DMTB`)
    pub broker: String,
    /// Limit price, or `None` for a market route
    pub limit_price: Option<Decimal>,
    /// When the request was built
    pub requested_at: DateTime<Utc>,
}

impl RouteRequest {
    /// Create a new request with a fresh time-ordered id.
    pub fn new(
        data_set: impl Into<String>,
        order_no: i64,
        broker: impl Into<String>,
        limit_price: Option<Decimal>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            data_set: data_set.into(),
            order_no,
            broker: broker.into(),
            limit_price,
            requested_at: Utc::now(),
        }
    }
}

/// Acknowledgement of an accepted route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAck {
    /// Request this acknowledges
    pub request_id: Uuid,
    /// Route identifier assigned by the routing service
    pub route_id: String,
    /// When the route was accepted
    pub acknowledged_at: DateTime<Utc>,
}

// =============================================================================
// Route Port
// =============================================================================

/// Port for sending route instructions.
///
/// Called synchronously from rule actions, inside an evaluation pass.
///
/// Implementations:
/// - `StubRouter` - accepts every request (or fails on demand)
pub trait RoutePort: Send + Sync {
    /// Send a route request.
    fn route(&self, request: &RouteRequest) -> DaemonResult<RouteAck>;
}

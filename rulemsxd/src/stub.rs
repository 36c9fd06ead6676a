//! Stub routing implementation for testing.
//!
//! Simulates a routing service that accepts every request immediately.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::error::{DaemonError, DaemonResult};
use crate::ports::{RouteAck, RoutePort, RouteRequest};

/// Stub router.
///
/// Records every accepted request and assigns sequential route ids.
#[derive(Debug, Default)]
pub struct StubRouter {
    /// Accepted requests, in order
    routes: Mutex<Vec<RouteRequest>>,
    /// Route counter for generating ids
    route_counter: AtomicU64,
    /// Whether to fail the next request
    fail_next: AtomicBool,
}

impl StubRouter {
    /// Create a new stub router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the next request to fail.
    pub fn set_fail_next(&self, fail: bool) {
        self.fail_next.store(fail, Ordering::SeqCst);
    }

    /// Accepted requests, in order.
    pub fn routes(&self) -> Vec<RouteRequest> {
        self.routes.lock().clone()
    }

    /// Brokers of the accepted requests for a data set, in order.
    pub fn brokers_for(&self, data_set: &str) -> Vec<String> {
        self.routes
            .lock()
            .iter()
            .filter(|r| r.data_set == data_set)
            .map(|r| r.broker.clone())
            .collect()
    }

    fn next_route_id(&self) -> String {
        let n = self.route_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("STUB-ROUTE-{}", n)
    }
}

impl RoutePort for StubRouter {
    fn route(&self, request: &RouteRequest) -> DaemonResult<RouteAck> {
        // Reset after check
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(DaemonError::Routing("Simulated routing failure".to_string()));
        }

        self.routes.lock().push(request.clone());

        Ok(RouteAck {
            request_id: request.id,
            route_id: self.next_route_id(),
            acknowledged_at: Utc::now(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_stub_router_accepts_and_numbers_routes() {
        let router = StubRouter::new();

        let first = RouteRequest::new("RMSXTest1001", 1001, "DMTB", None);
        let second = RouteRequest::new("RMSXTest1002", 1002, "BB", Some(dec!(102.5)));

        assert_eq!(router.route(&first).unwrap().route_id, "STUB-ROUTE-1");
        let ack = router.route(&second).unwrap();

        assert_eq!(ack.route_id, "STUB-ROUTE-2");
        assert_eq!(ack.request_id, second.id);
        assert_eq!(router.brokers_for("RMSXTest1002"), vec!["BB"]);
        assert_eq!(router.routes().len(), 2);
    }

    #[test]
    fn test_stub_router_fail_next() {
        let router = StubRouter::new();
        router.set_fail_next(true);

        let request = RouteRequest::new("RMSXTest1001", 1001, "DMTB", None);
        assert!(matches!(router.route(&request), Err(DaemonError::Routing(_))));

        // Only the next request fails
        assert!(router.route(&request).is_ok());
        assert_eq!(router.routes().len(), 1);
    }
}

//! Route journal for duplicate-route suppression.
//!
//! Every notification triggers a fresh evaluation pass, so a matching
//! routing rule fires again on each pass. The journal records one entry per
//! (data set, broker) and refuses a second live entry for the same pair.
//!
//! # Flow
//!
//! 1. Record the request (before sending)
//! 2. Send the request through the `RoutePort`
//! 3. Complete with the acknowledgement, or fail with the reason
//!
//! Failed entries may be retried: recording over a failed entry replaces it.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DaemonError, DaemonResult};
use crate::ports::{RouteAck, RouteRequest};

// =============================================================================
// Entry Types
// =============================================================================

/// Status of a journaled route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    /// Recorded, not yet acknowledged
    Pending,
    /// Accepted by the routing service
    Routed,
    /// Rejected or failed; may be retried
    Failed,
}

/// A journaled route request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEntry {
    /// The request as sent
    pub request: RouteRequest,
    /// Current status
    pub status: RouteStatus,
    /// Route id assigned on acknowledgement
    pub route_id: Option<String>,
    /// Failure reason
    pub error: Option<String>,
    /// When the entry was completed or failed
    pub completed_at: Option<DateTime<Utc>>,
}

impl RouteEntry {
    fn new(request: RouteRequest) -> Self {
        Self {
            request,
            status: RouteStatus::Pending,
            route_id: None,
            error: None,
            completed_at: None,
        }
    }

    /// Whether this entry blocks another route for the same key.
    pub fn is_live(&self) -> bool {
        !matches!(self.status, RouteStatus::Failed)
    }
}

// =============================================================================
// Route Journal
// =============================================================================

type RouteKey = (String, String);

/// In-memory journal of route requests keyed by (data set, broker).
#[derive(Debug, Default)]
pub struct RouteJournal {
    entries: RwLock<IndexMap<RouteKey, RouteEntry>>,
}

impl RouteJournal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request before sending it.
    ///
    /// Returns `DaemonError::DuplicateRoute` if a pending or routed entry
    /// already exists for the same data set and broker.
    pub fn record(&self, request: &RouteRequest) -> DaemonResult<()> {
        let key = (request.data_set.clone(), request.broker.clone());
        let mut entries = self.entries.write();

        if entries.get(&key).is_some_and(RouteEntry::is_live) {
            return Err(DaemonError::DuplicateRoute {
                data_set: request.data_set.clone(),
                broker: request.broker.clone(),
            });
        }

        entries.insert(key, RouteEntry::new(request.clone()));
        Ok(())
    }

    /// Mark a request as routed.
    pub fn complete(&self, ack: &RouteAck) -> DaemonResult<()> {
        self.update(ack.request_id, |entry| {
            entry.status = RouteStatus::Routed;
            entry.route_id = Some(ack.route_id.clone());
            entry.completed_at = Some(ack.acknowledged_at);
        })
    }

    /// Mark a request as failed.
    pub fn fail(&self, request_id: Uuid, reason: impl Into<String>) -> DaemonResult<()> {
        let reason = reason.into();
        self.update(request_id, |entry| {
            entry.status = RouteStatus::Failed;
            entry.error = Some(reason);
            entry.completed_at = Some(Utc::now());
        })
    }

    /// Entry for a data set and broker.
    pub fn get(&self, data_set: &str, broker: &str) -> Option<RouteEntry> {
        self.entries
            .read()
            .get(&(data_set.to_string(), broker.to_string()))
            .cloned()
    }

    /// Whether a route to `broker` has been acknowledged for `data_set`.
    pub fn is_routed(&self, data_set: &str, broker: &str) -> bool {
        self.get(data_set, broker)
            .map(|e| e.status == RouteStatus::Routed)
            .unwrap_or(false)
    }

    /// All entries, in the order their keys were first recorded.
    pub fn entries(&self) -> Vec<RouteEntry> {
        self.entries.read().values().cloned().collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn update(&self, request_id: Uuid, apply: impl FnOnce(&mut RouteEntry)) -> DaemonResult<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .values_mut()
            .find(|e| e.request.id == request_id)
            .ok_or(DaemonError::RouteNotFound(request_id))?;

        apply(entry);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

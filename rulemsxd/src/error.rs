//! Daemon error types.

use rulemsx_engine::EngineError;
use rulemsx_feeds::FeedError;
use thiserror::Error;
use uuid::Uuid;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Engine error
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Feed error
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// A live route already exists for this data set and broker
    #[error("Route to {broker} already requested for {data_set}")]
    DuplicateRoute { data_set: String, broker: String },

    /// Route request not present in the journal
    #[error("Route request not found: {0}")]
    RouteNotFound(Uuid),

    /// Routing service rejected or failed the request
    #[error("Routing error: {0}")]
    Routing(String),

    /// Event bus error
    #[error("Event bus error: {0}")]
    EventBus(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shutdown requested
    #[error("Shutdown requested")]
    Shutdown,
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;

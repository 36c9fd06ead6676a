//! Feed layer error types.

use rulemsx_engine::EngineError;
use thiserror::Error;

/// Errors raised by feed adapters.
#[derive(Debug, Error)]
pub enum FeedError {
    /// No order with this sequence number
    #[error("Unknown order: {0}")]
    UnknownOrder(i64),

    /// Field not present on an order or security
    #[error("Unknown field '{field}' on {owner}")]
    UnknownField {
        /// Order or security the field was requested from
        owner: String,
        /// Requested field name
        field: String,
    },

    /// Security not subscribed
    #[error("Unknown security: {0}")]
    UnknownSecurity(String),

    /// Market data feed has not been started
    #[error("Market data feed not started")]
    NotStarted,

    /// Reference data lookup failed
    #[error("Reference data error: {0}")]
    RefData(String),

    /// Engine error while binding a source
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

impl FeedError {
    /// Create an unknown field error
    pub fn unknown_field(owner: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            owner: owner.into(),
            field: field.into(),
        }
    }
}

/// Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;

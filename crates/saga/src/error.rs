//! Saga error types.

use messaging::BrokerError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during saga operations.
///
/// Illegal or duplicate triggers are deliberately *not* errors: out-of-order
/// and duplicate delivery is expected, and the lifecycle drops such
/// messages as successful no-ops.
#[derive(Debug, Error)]
pub enum SagaError {
    /// An order must consist of a positive number of pieces.
    #[error("can't order {requested} pieces: the piece count must be positive")]
    InvalidPieceCount { requested: i64 },

    /// Durable store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Broker error.
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

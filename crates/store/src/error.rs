use common::UnknownStatus;
use thiserror::Error;

/// Errors that can occur when interacting with the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored status string did not parse back into the enum.
    #[error("Corrupt record: {0}")]
    CorruptStatus(#[from] UnknownStatus),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

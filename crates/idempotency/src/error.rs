use thiserror::Error;

use crate::record::SagaKey;

/// Errors that can occur when interacting with the idempotency guard.
#[derive(Debug, Error)]
pub enum IdempotencyError {
    /// An attempt is already recorded for this saga key.
    ///
    /// This is the conflict side of the insert-if-absent write: the caller
    /// lost the race (or re-delivered a duplicate) and must not commit its
    /// domain action.
    #[error("Attempt already recorded for saga key {0}")]
    DuplicateAttempt(SagaKey),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl IdempotencyError {
    /// Returns true if this is the duplicate-attempt conflict.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, IdempotencyError::DuplicateAttempt(_))
    }
}

/// Result type for guard operations.
pub type Result<T> = std::result::Result<T, IdempotencyError>;

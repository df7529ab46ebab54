//! Participant error types.

use idempotency::IdempotencyError;
use thiserror::Error;

/// A failure raised while handling one event.
///
/// The two kinds matter to the saga differently: a validation failure is a
/// business precondition the order itself violates, an unexpected failure
/// is an infrastructure problem the transport's redelivery may cure. Both
/// are absorbed at the `process`/`rollback` boundary into a history entry
/// plus re-emission; neither ever propagates past the participant.
#[derive(Debug, Error)]
pub enum ParticipantError {
    /// A business precondition was violated (empty payload, missing
    /// identifiers, duplicate transaction, unknown product code, ...).
    #[error("{message}")]
    Validation { message: String },

    /// Anything else, e.g. a storage failure.
    #[error("{message}")]
    Unexpected { message: String },
}

impl ParticipantError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ParticipantError::Validation {
            message: message.into(),
        }
    }

    /// Creates an unexpected error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        ParticipantError::Unexpected {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, ParticipantError::Validation { .. })
    }
}

impl From<IdempotencyError> for ParticipantError {
    fn from(err: IdempotencyError) -> Self {
        match err {
            IdempotencyError::DuplicateAttempt(_) => {
                ParticipantError::validation("There's another transactionId for this validation.")
            }
            other => ParticipantError::unexpected(other.to_string()),
        }
    }
}

/// Result type for participant domain operations.
pub type Result<T> = std::result::Result<T, ParticipantError>;

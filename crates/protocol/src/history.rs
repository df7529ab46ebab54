//! History ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::SagaStatus;

/// One entry in the event's audit trail.
///
/// Immutable once appended; the ledger never edits or deletes an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    /// Name of the participant that wrote the entry.
    pub source: String,
    pub status: SagaStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl History {
    /// Creates an entry stamped with the current time.
    pub fn new(source: impl Into<String>, status: SagaStatus, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            status,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

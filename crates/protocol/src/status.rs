//! Saga status state machine.

use serde::{Deserialize, Serialize};

/// The status a participant stamps on the event before re-emitting it.
///
/// Transitions, per participant, on one incoming event:
/// ```text
/// Pending ──► Success
///    │
///    └──► RollbackPending ──► Fail
/// ```
/// `Success` lets the orchestrator advance the saga; `RollbackPending`
/// tells it to start unwinding previously succeeded participants; `Fail`
/// means this participant has finished its own compensating rollback.
/// Rollback may be applied from any status, so `Fail` is reachable from
/// all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaStatus {
    /// Initial status, before the first participant writes.
    #[default]
    Pending,

    /// This participant's step completed; the saga may advance.
    Success,

    /// This participant failed and the orchestrator must begin unwinding.
    RollbackPending,

    /// This participant has completed its own compensating rollback.
    Fail,
}

impl SagaStatus {
    /// Returns true if the orchestrator may route the saga forward.
    pub fn allows_advance(&self) -> bool {
        matches!(self, SagaStatus::Pending | SagaStatus::Success)
    }

    /// Returns true if the orchestrator must begin compensation.
    pub fn needs_rollback(&self) -> bool {
        matches!(self, SagaStatus::RollbackPending)
    }

    /// Returns true if this is a terminal status for a participant.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaStatus::Fail)
    }

    /// Returns the status name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStatus::Pending => "PENDING",
            SagaStatus::Success => "SUCCESS",
            SagaStatus::RollbackPending => "ROLLBACK_PENDING",
            SagaStatus::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

use async_trait::async_trait;

use crate::error::Result;
use crate::record::{IdempotencyRecord, SagaKey};

/// Storage port for a participant's idempotency records.
///
/// One guard (one table, one map) exists per participant; records are
/// queried by key equality only, never range-scanned. All implementations
/// must be thread-safe (Send + Sync), and `record_attempt` must be
/// atomically conditional: under concurrent duplicate delivery of the same
/// key, exactly one caller wins the insert and every other caller gets
/// [`IdempotencyError::DuplicateAttempt`](crate::IdempotencyError).
#[async_trait]
pub trait IdempotencyGuard: Send + Sync {
    /// Returns true if this participant has already recorded an attempt
    /// for the saga instance.
    async fn exists(&self, key: &SagaKey) -> Result<bool>;

    /// Retrieves the record for a saga instance, if any.
    async fn find(&self, key: &SagaKey) -> Result<Option<IdempotencyRecord>>;

    /// Inserts a new record if, and only if, none exists for the key.
    ///
    /// Fails with `DuplicateAttempt` when a record is already present.
    /// This insert is the linearization point of the at-most-once
    /// guarantee; callers use [`exists`](Self::exists) as an advisory
    /// pre-check but must not rely on it.
    async fn record_attempt(&self, key: &SagaKey, success: bool) -> Result<IdempotencyRecord>;

    /// Flips the record for a key to `success = false`, creating it when
    /// absent.
    ///
    /// Rollback may legitimately arrive before any forward attempt under
    /// at-least-once delivery, so the missing-record case inserts directly
    /// rather than failing.
    async fn mark_failed(&self, key: &SagaKey) -> Result<IdempotencyRecord>;
}

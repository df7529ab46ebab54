use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{IdempotencyError, Result};
use crate::guard::IdempotencyGuard;
use crate::record::{IdempotencyRecord, SagaKey};

/// In-memory idempotency guard.
///
/// Backs the integration tests and the demo runner, and provides the same
/// interface and atomicity as the PostgreSQL implementation: the
/// insert-if-absent of `record_attempt` happens under a single write lock.
#[derive(Clone, Default)]
pub struct InMemoryIdempotencyGuard {
    records: Arc<RwLock<HashMap<SagaKey, IdempotencyRecord>>>,
}

impl InMemoryIdempotencyGuard {
    /// Creates a new empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of records.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Clears all records.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl IdempotencyGuard for InMemoryIdempotencyGuard {
    async fn exists(&self, key: &SagaKey) -> Result<bool> {
        Ok(self.records.read().await.contains_key(key))
    }

    async fn find(&self, key: &SagaKey) -> Result<Option<IdempotencyRecord>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn record_attempt(&self, key: &SagaKey, success: bool) -> Result<IdempotencyRecord> {
        let mut records = self.records.write().await;

        if records.contains_key(key) {
            return Err(IdempotencyError::DuplicateAttempt(key.clone()));
        }

        let record = IdempotencyRecord::new(key.clone(), success);
        records.insert(key.clone(), record.clone());
        Ok(record)
    }

    async fn mark_failed(&self, key: &SagaKey) -> Result<IdempotencyRecord> {
        let mut records = self.records.write().await;

        let record = records
            .entry(key.clone())
            .and_modify(|record| {
                record.success = false;
                record.updated_at = Utc::now();
            })
            .or_insert_with(|| IdempotencyRecord::new(key.clone(), false));

        Ok(record.clone())
    }
}

use chrono::{DateTime, Utc};
use common::{OrderId, TransactionId};
use serde::{Deserialize, Serialize};

/// The key under which a participant records its attempt for one saga
/// instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SagaKey {
    pub order_id: OrderId,
    pub transaction_id: TransactionId,
}

impl SagaKey {
    /// Creates a saga key.
    pub fn new(order_id: impl Into<OrderId>, transaction_id: impl Into<TransactionId>) -> Self {
        Self {
            order_id: order_id.into(),
            transaction_id: transaction_id.into(),
        }
    }
}

impl std::fmt::Display for SagaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.order_id, self.transaction_id)
    }
}

/// One participant's durable memory of a saga instance.
///
/// Created when the participant first commits its domain action (or
/// directly by rollback when no forward attempt ever committed), and
/// updated, never deleted, from then on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: SagaKey,
    pub success: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// Creates a record stamped with the current time.
    pub fn new(key: SagaKey, success: bool) -> Self {
        let now = Utc::now();
        Self {
            key,
            success,
            created_at: now,
            updated_at: now,
        }
    }
}

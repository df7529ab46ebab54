//! Payment participant.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{OrderId, TransactionId};
use idempotency::SagaKey;
use protocol::Order;
use serde::{Deserialize, Serialize};

use crate::error::{ParticipantError, Result};
use crate::service::DomainAction;

/// Source name this participant stamps on events and history entries.
pub const PAYMENT_SOURCE: &str = "PAYMENT_SERVICE";

/// Lifecycle of a payment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Success,
    Refunded,
}

/// A payment persisted per saga instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub order_id: OrderId,
    pub transaction_id: TransactionId,
    pub total_amount: f64,
    pub total_items: u32,
    pub status: PaymentStatus,
}

/// Storage port for payments.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persists a payment.
    async fn save(&self, payment: Payment) -> Result<()>;

    /// Retrieves the payment for a saga instance, if any.
    async fn find(&self, key: &SagaKey) -> Result<Option<Payment>>;

    /// Marks the payment for a saga instance refunded; no-op when absent.
    async fn mark_refunded(&self, key: &SagaKey) -> Result<()>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    payments: HashMap<SagaKey, Payment>,
    fail_on_save: bool,
}

/// In-memory payment store for testing and the demo runner.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentStore {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail on the next save call.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.state.write().unwrap().fail_on_save = fail;
    }

    /// Returns the number of payments stored.
    pub fn payment_count(&self) -> usize {
        self.state.read().unwrap().payments.len()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn save(&self, payment: Payment) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_save {
            return Err(ParticipantError::unexpected("Payment storage unavailable"));
        }
        let key = SagaKey::new(payment.order_id.clone(), payment.transaction_id.clone());
        state.payments.insert(key, payment);
        Ok(())
    }

    async fn find(&self, key: &SagaKey) -> Result<Option<Payment>> {
        Ok(self.state.read().unwrap().payments.get(key).cloned())
    }

    async fn mark_refunded(&self, key: &SagaKey) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if let Some(payment) = state.payments.get_mut(key) {
            payment.status = PaymentStatus::Refunded;
        }
        Ok(())
    }
}

/// Sums the order's line items into a payment and enriches the payload
/// with the computed totals.
pub struct PaymentAction<S: PaymentStore> {
    store: S,
}

impl<S: PaymentStore> PaymentAction<S> {
    /// Creates the action over a payment store.
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

/// Total amount of an order: Σ quantity × unit value over the line items.
pub fn order_total_amount(payload: &Order) -> f64 {
    payload
        .products
        .iter()
        .map(|item| f64::from(item.quantity) * item.product.unit_val)
        .sum()
}

/// Total item count of an order: Σ quantity over the line items.
pub fn order_total_items(payload: &Order) -> u32 {
    payload.products.iter().map(|item| item.quantity).sum()
}

#[async_trait]
impl<S: PaymentStore> DomainAction for PaymentAction<S> {
    fn source(&self) -> &'static str {
        PAYMENT_SOURCE
    }

    fn failure_label(&self) -> &'static str {
        "realize payment"
    }

    fn rollback_message(&self) -> &'static str {
        "Rollback executed on payment!"
    }

    async fn execute(&self, key: &SagaKey, payload: &mut Order) -> Result<String> {
        let total_amount = order_total_amount(payload);
        let total_items = order_total_items(payload);

        self.store
            .save(Payment {
                order_id: key.order_id.clone(),
                transaction_id: key.transaction_id.clone(),
                total_amount,
                total_items,
                status: PaymentStatus::Success,
            })
            .await?;

        payload.total_amount = total_amount;
        payload.total_items = total_items;

        Ok("Payment realized successfully!".to_string())
    }

    async fn compensate(&self, key: &SagaKey, _payload: &Order) -> Result<()> {
        self.store.mark_refunded(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{OrderItem, Product};

    fn key() -> SagaKey {
        SagaKey::new("ORD-1", "TXN-1")
    }

    fn order(items: Vec<OrderItem>) -> Order {
        Order::new("ORD-1", "TXN-1", items)
    }

    #[test]
    fn test_totals_over_line_items() {
        let payload = order(vec![
            OrderItem::new(Product::new("A", 10.0), 2),
            OrderItem::new(Product::new("B", 5.0), 1),
        ]);

        assert_eq!(order_total_amount(&payload), 25.0);
        assert_eq!(order_total_items(&payload), 3);
    }

    #[test]
    fn test_totals_of_empty_list_are_zero() {
        let payload = order(vec![]);
        assert_eq!(order_total_amount(&payload), 0.0);
        assert_eq!(order_total_items(&payload), 0);
    }

    #[tokio::test]
    async fn test_execute_persists_payment_and_enriches_payload() {
        let store = InMemoryPaymentStore::new();
        let action = PaymentAction::new(store.clone());
        let mut payload = order(vec![
            OrderItem::new(Product::new("A", 10.0), 2),
            OrderItem::new(Product::new("B", 5.0), 1),
        ]);

        let message = action.execute(&key(), &mut payload).await.unwrap();
        assert_eq!(message, "Payment realized successfully!");
        assert_eq!(payload.total_amount, 25.0);
        assert_eq!(payload.total_items, 3);

        let payment = store.find(&key()).await.unwrap().unwrap();
        assert_eq!(payment.total_amount, 25.0);
        assert_eq!(payment.total_items, 3);
        assert_eq!(payment.status, PaymentStatus::Success);
    }

    #[tokio::test]
    async fn test_storage_failure_is_an_unexpected_error() {
        let store = InMemoryPaymentStore::new();
        store.set_fail_on_save(true);
        let action = PaymentAction::new(store.clone());
        let mut payload = order(vec![OrderItem::new(Product::new("A", 10.0), 1)]);

        let err = action.execute(&key(), &mut payload).await.unwrap_err();
        assert!(!err.is_validation());
        assert_eq!(store.payment_count(), 0);
        // The payload is only enriched on commit
        assert_eq!(payload.total_amount, 0.0);
    }

    #[tokio::test]
    async fn test_compensate_marks_refunded() {
        let store = InMemoryPaymentStore::new();
        let action = PaymentAction::new(store.clone());
        let mut payload = order(vec![OrderItem::new(Product::new("A", 10.0), 1)]);
        action.execute(&key(), &mut payload).await.unwrap();

        action.compensate(&key(), &payload).await.unwrap();
        let payment = store.find(&key()).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Refunded);

        // Idempotent, and a no-op for a key that never paid
        action.compensate(&key(), &payload).await.unwrap();
        action
            .compensate(&SagaKey::new("ORD-9", "TXN-9"), &payload)
            .await
            .unwrap();
    }
}

//! The generic saga participant.

use async_trait::async_trait;
use idempotency::{IdempotencyGuard, SagaKey};
use protocol::{Event, Order, SagaStatus};

use crate::error::{ParticipantError, Result};
use crate::transport::{MessageTransport, TransportError};

/// The domain half of a saga participant.
///
/// `execute` runs the forward business action over the payload and may
/// enrich it with side-effect results; `compensate` undoes it. Neither is
/// responsible for idempotency, history or emission: that is the
/// boundary's job.
#[async_trait]
pub trait DomainAction: Send + Sync {
    /// Participant name written into `source` and every history entry.
    fn source(&self) -> &'static str;

    /// Label used in failure history messages, e.g. `"validate products"`
    /// producing `"Fail to validate products: <cause>"`.
    fn failure_label(&self) -> &'static str;

    /// Message for the rollback history entry.
    fn rollback_message(&self) -> &'static str;

    /// Runs the forward domain action. Returns the success history message.
    async fn execute(&self, key: &SagaKey, payload: &mut Order) -> Result<String>;

    /// Undoes the forward action. Must be idempotent and safe to invoke
    /// when `execute` never ran for this key. Defaults to a no-op.
    async fn compensate(&self, _key: &SagaKey, _payload: &Order) -> Result<()> {
        Ok(())
    }
}

/// One saga participant: a domain action behind the idempotency guard,
/// wired to the transport it re-emits events on.
///
/// Composed explicitly at process startup; holds no per-saga state of its
/// own, so invocations for different saga keys run fully in parallel.
pub struct ParticipantService<A, G, T>
where
    A: DomainAction,
    G: IdempotencyGuard,
    T: MessageTransport,
{
    action: A,
    guard: G,
    transport: T,
    output_channel: String,
}

impl<A, G, T> ParticipantService<A, G, T>
where
    A: DomainAction,
    G: IdempotencyGuard,
    T: MessageTransport,
{
    /// Creates a participant emitting to the given channel.
    pub fn new(action: A, guard: G, transport: T, output_channel: impl Into<String>) -> Self {
        Self {
            action,
            guard,
            transport,
            output_channel: output_channel.into(),
        }
    }

    /// Returns this participant's source name.
    pub fn source(&self) -> &'static str {
        self.action.source()
    }

    /// Handles one forward event.
    ///
    /// On success the event is stamped `SUCCESS`; on any failure it is
    /// stamped `ROLLBACK_PENDING` with the failure's message. Either way
    /// the event is re-emitted: the orchestrator depends on that emission
    /// to keep the saga live, so a failure is never swallowed. Only a
    /// transport publish failure is returned, for the delivery loop to
    /// retry.
    #[tracing::instrument(
        skip(self, event),
        fields(
            source = self.action.source(),
            order_id = %event.order_id,
            transaction_id = %event.transaction_id,
        )
    )]
    pub async fn process(&self, mut event: Event) -> std::result::Result<Event, TransportError> {
        match self.try_process(&mut event).await {
            Ok(message) => {
                metrics::counter!("participant_process_success").increment(1);
                event.transition(self.action.source(), SagaStatus::Success, message);
            }
            Err(e) => {
                metrics::counter!("participant_process_failed").increment(1);
                tracing::error!(error = %e, "domain action failed");
                event.transition(
                    self.action.source(),
                    SagaStatus::RollbackPending,
                    format!("Fail to {}: {}", self.action.failure_label(), e),
                );
            }
        }

        self.transport.publish(&self.output_channel, &event).await?;
        Ok(event)
    }

    async fn try_process(&self, event: &mut Event) -> Result<String> {
        validate_structure(event)?;

        let key = saga_key(event);
        if self.guard.exists(&key).await? {
            return Err(ParticipantError::validation(
                "There's another transactionId for this validation.",
            ));
        }

        let message = self.action.execute(&key, &mut event.payload).await?;

        // The insert is the commit gate: a concurrent duplicate that slipped
        // past the exists() pre-check loses here and reports failure.
        self.guard.record_attempt(&key, true).await?;

        Ok(message)
    }

    /// Applies the compensating rollback for this participant.
    ///
    /// Safe before, after, or without a completed `process` for the same
    /// key: the domain compensation is idempotent and the guard record is
    /// flipped to `success = false`, created directly when rollback raced
    /// ahead of any forward attempt. The event always goes out stamped
    /// `FAIL`.
    #[tracing::instrument(
        skip(self, event),
        fields(
            source = self.action.source(),
            order_id = %event.order_id,
            transaction_id = %event.transaction_id,
        )
    )]
    pub async fn rollback(&self, mut event: Event) -> std::result::Result<Event, TransportError> {
        let key = saga_key(&event);

        if let Err(e) = self.try_rollback(&key, &event).await {
            // Locally unrecoverable; the transport's redelivery will retry.
            tracing::error!(error = %e, "rollback bookkeeping failed");
        }

        metrics::counter!("participant_rollbacks").increment(1);
        event.transition(
            self.action.source(),
            SagaStatus::Fail,
            self.action.rollback_message(),
        );

        self.transport.publish(&self.output_channel, &event).await?;
        Ok(event)
    }

    async fn try_rollback(&self, key: &SagaKey, event: &Event) -> Result<()> {
        self.action.compensate(key, &event.payload).await?;
        self.guard.mark_failed(key).await?;
        Ok(())
    }
}

fn saga_key(event: &Event) -> SagaKey {
    SagaKey::new(event.order_id.clone(), event.transaction_id.clone())
}

fn validate_structure(event: &Event) -> Result<()> {
    if event.payload.products.is_empty() {
        return Err(ParticipantError::validation("Product list is empty!"));
    }

    if event.order_id.is_empty() || event.transaction_id.is_empty() {
        return Err(ParticipantError::validation(
            "OrderID and TransactionID must be informed!",
        ));
    }

    for item in &event.payload.products {
        if item.product.code.is_empty() {
            return Err(ParticipantError::validation("Product must be informed!"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTransport;
    use idempotency::InMemoryIdempotencyGuard;
    use protocol::{OrderItem, Product};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const CHANNEL: &str = "orchestrator";

    /// Action stub counting executions, with a switchable failure.
    #[derive(Default)]
    struct StubAction {
        executions: AtomicUsize,
        compensations: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl DomainAction for StubAction {
        fn source(&self) -> &'static str {
            "STUB_SERVICE"
        }

        fn failure_label(&self) -> &'static str {
            "run stub"
        }

        fn rollback_message(&self) -> &'static str {
            "Rollback executed on stub!"
        }

        async fn execute(&self, _key: &SagaKey, payload: &mut Order) -> Result<String> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ParticipantError::unexpected("stub storage down"));
            }
            self.executions.fetch_add(1, Ordering::SeqCst);
            payload.total_items = 99;
            Ok("Stub executed successfully!".to_string())
        }

        async fn compensate(&self, _key: &SagaKey, _payload: &Order) -> Result<()> {
            self.compensations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    type StubParticipant =
        ParticipantService<StubAction, InMemoryIdempotencyGuard, InMemoryTransport>;

    fn participant() -> (StubParticipant, InMemoryIdempotencyGuard, InMemoryTransport) {
        let guard = InMemoryIdempotencyGuard::new();
        let transport = InMemoryTransport::new();
        let service = ParticipantService::new(
            StubAction::default(),
            guard.clone(),
            transport.clone(),
            CHANNEL,
        );
        (service, guard, transport)
    }

    fn sample_event() -> Event {
        Event::for_order(Order::new(
            "ORD-1",
            "TXN-1",
            vec![OrderItem::new(Product::new("BOOK", 25.0), 2)],
        ))
    }

    #[tokio::test]
    async fn test_process_success_records_and_emits() {
        let (service, guard, transport) = participant();

        let emitted = service.process(sample_event()).await.unwrap();

        assert_eq!(emitted.status, SagaStatus::Success);
        assert_eq!(emitted.source, "STUB_SERVICE");
        assert_eq!(emitted.payload.total_items, 99);
        assert_eq!(emitted.event_history.len(), 1);
        assert_eq!(
            emitted.event_history[0].message,
            "Stub executed successfully!"
        );

        let key = SagaKey::new("ORD-1", "TXN-1");
        assert!(guard.find(&key).await.unwrap().unwrap().success);
        assert_eq!(transport.published_count(CHANNEL).await, 1);
    }

    #[tokio::test]
    async fn test_process_failure_still_emits() {
        let (service, guard, transport) = participant();
        service.action.fail.store(true, Ordering::SeqCst);

        let emitted = service.process(sample_event()).await.unwrap();

        assert_eq!(emitted.status, SagaStatus::RollbackPending);
        assert_eq!(
            emitted.event_history[0].message,
            "Fail to run stub: stub storage down"
        );
        // No record for an attempt that never committed
        assert!(!guard.exists(&SagaKey::new("ORD-1", "TXN-1")).await.unwrap());
        assert_eq!(transport.published_count(CHANNEL).await, 1);
    }

    #[tokio::test]
    async fn test_empty_product_list_is_rejected_before_the_action() {
        let (service, _, transport) = participant();
        let event = Event::for_order(Order::new("ORD-1", "TXN-1", vec![]));

        let emitted = service.process(event).await.unwrap();

        assert_eq!(emitted.status, SagaStatus::RollbackPending);
        assert_eq!(
            emitted.event_history[0].message,
            "Fail to run stub: Product list is empty!"
        );
        assert_eq!(service.action.executions.load(Ordering::SeqCst), 0);
        assert_eq!(transport.published_count(CHANNEL).await, 1);
    }

    #[tokio::test]
    async fn test_missing_identifiers_are_rejected() {
        let (service, _, _) = participant();
        let event = Event::for_order(Order::new(
            "",
            "",
            vec![OrderItem::new(Product::new("BOOK", 25.0), 2)],
        ));

        let emitted = service.process(event).await.unwrap();

        assert_eq!(emitted.status, SagaStatus::RollbackPending);
        assert_eq!(
            emitted.event_history[0].message,
            "Fail to run stub: OrderID and TransactionID must be informed!"
        );
    }

    #[tokio::test]
    async fn test_blank_product_code_is_rejected() {
        let (service, _, _) = participant();
        let event = Event::for_order(Order::new(
            "ORD-1",
            "TXN-1",
            vec![OrderItem::new(Product::new("", 25.0), 2)],
        ));

        let emitted = service.process(event).await.unwrap();

        assert_eq!(emitted.status, SagaStatus::RollbackPending);
        assert_eq!(
            emitted.event_history[0].message,
            "Fail to run stub: Product must be informed!"
        );
    }

    #[tokio::test]
    async fn test_duplicate_process_runs_the_action_at_most_once() {
        let (service, _, transport) = participant();

        let first = service.process(sample_event()).await.unwrap();
        assert_eq!(first.status, SagaStatus::Success);

        let second = service.process(sample_event()).await.unwrap();
        assert_eq!(second.status, SagaStatus::RollbackPending);
        assert_eq!(
            second.event_history[0].message,
            "Fail to run stub: There's another transactionId for this validation."
        );

        assert_eq!(service.action.executions.load(Ordering::SeqCst), 1);
        // Both deliveries were answered
        assert_eq!(transport.published_count(CHANNEL).await, 2);
    }

    #[tokio::test]
    async fn test_rollback_flips_record_and_emits_fail() {
        let (service, guard, transport) = participant();
        service.process(sample_event()).await.unwrap();

        let emitted = service.rollback(sample_event()).await.unwrap();

        assert_eq!(emitted.status, SagaStatus::Fail);
        assert_eq!(emitted.event_history[0].message, "Rollback executed on stub!");
        assert_eq!(service.action.compensations.load(Ordering::SeqCst), 1);

        let record = guard
            .find(&SagaKey::new("ORD-1", "TXN-1"))
            .await
            .unwrap()
            .unwrap();
        assert!(!record.success);
        assert_eq!(transport.published_count(CHANNEL).await, 2);
    }

    #[tokio::test]
    async fn test_rollback_without_prior_process_creates_failed_record() {
        let (service, guard, _) = participant();

        let emitted = service.rollback(sample_event()).await.unwrap();

        assert_eq!(emitted.status, SagaStatus::Fail);
        let record = guard
            .find(&SagaKey::new("ORD-1", "TXN-1"))
            .await
            .unwrap()
            .unwrap();
        assert!(!record.success);
    }

    #[tokio::test]
    async fn test_process_after_rollback_is_rejected_as_duplicate() {
        let (service, _, _) = participant();
        service.rollback(sample_event()).await.unwrap();

        let emitted = service.process(sample_event()).await.unwrap();

        assert_eq!(emitted.status, SagaStatus::RollbackPending);
        assert_eq!(service.action.executions.load(Ordering::SeqCst), 0);
    }
}

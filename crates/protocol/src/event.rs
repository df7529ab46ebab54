//! The event envelope exchanged between all saga services.

use chrono::{DateTime, Utc};
use common::{EventId, OrderId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::history::History;
use crate::order::Order;
use crate::status::SagaStatus;

/// The versioned message that travels hop-to-hop through the saga.
///
/// One envelope exists per saga attempt, identified by `transaction_id`.
/// It travels by value: each hop's mutation is carried forward inside the
/// re-emitted event, never merged from multiple copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Opaque identifier, assigned once at construction.
    pub id: EventId,

    /// Unique per saga instance, stable across every hop.
    pub transaction_id: TransactionId,

    /// The business order being processed, stable across every hop.
    pub order_id: OrderId,

    /// The order snapshot; participants enrich it but never remove lines.
    pub payload: Order,

    /// Name of the participant that last wrote the event.
    #[serde(default)]
    pub source: String,

    pub status: SagaStatus,

    /// Append-only audit trail, insertion order significant.
    #[serde(default)]
    pub event_history: Vec<History>,

    /// Saga-instance creation timestamp, set once.
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Creates a new event envelope builder.
    pub fn builder() -> EventBuilder {
        EventBuilder::default()
    }

    /// Creates a fresh envelope around an order snapshot, taking the order
    /// and transaction identifiers from the payload.
    pub fn for_order(payload: Order) -> Self {
        Event {
            id: EventId::new(),
            transaction_id: payload.transaction_id.clone(),
            order_id: payload.id.clone(),
            payload,
            source: String::new(),
            status: SagaStatus::Pending,
            event_history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Appends an entry to the history ledger.
    ///
    /// This is the only mutator of `event_history`; entries are pushed to
    /// the end and never reordered or removed.
    pub fn append_history(&mut self, entry: History) {
        self.event_history.push(entry);
    }

    /// Records a state transition: sets the owning source and the new
    /// status, and appends a matching history entry stamped now.
    pub fn transition(
        &mut self,
        source: impl Into<String>,
        status: SagaStatus,
        message: impl Into<String>,
    ) {
        let source = source.into();
        self.status = status;
        self.source = source.clone();
        self.append_history(History::new(source, status, message));
    }

    /// Encodes the event to its JSON wire form.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes an event from its JSON wire form.
    pub fn from_wire(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Builder for constructing event envelopes.
#[derive(Debug, Default)]
pub struct EventBuilder {
    id: Option<EventId>,
    transaction_id: Option<TransactionId>,
    order_id: Option<OrderId>,
    payload: Option<Order>,
    source: Option<String>,
    status: Option<SagaStatus>,
    created_at: Option<DateTime<Utc>>,
}

impl EventBuilder {
    /// Sets the event ID. If not set, a new ID will be generated.
    pub fn id(mut self, id: EventId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the transaction ID.
    pub fn transaction_id(mut self, id: impl Into<TransactionId>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    /// Sets the order ID.
    pub fn order_id(mut self, id: impl Into<OrderId>) -> Self {
        self.order_id = Some(id.into());
        self
    }

    /// Sets the order payload.
    pub fn payload(mut self, payload: Order) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the originating source. Defaults to the empty string.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the initial status. Defaults to `Pending`.
    pub fn status(mut self, status: SagaStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the creation timestamp. If not set, the current time is used.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Builds the event envelope.
    ///
    /// # Panics
    ///
    /// Panics if required fields (transaction_id, order_id, payload) are
    /// not set.
    pub fn build(self) -> Event {
        Event {
            id: self.id.unwrap_or_default(),
            transaction_id: self.transaction_id.expect("transaction_id is required"),
            order_id: self.order_id.expect("order_id is required"),
            payload: self.payload.expect("payload is required"),
            source: self.source.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            event_history: Vec::new(),
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }

    /// Tries to build the envelope, returning None if required fields are
    /// missing.
    pub fn try_build(self) -> Option<Event> {
        Some(Event {
            id: self.id.unwrap_or_default(),
            transaction_id: self.transaction_id?,
            order_id: self.order_id?,
            payload: self.payload?,
            source: self.source.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            event_history: Vec::new(),
            created_at: self.created_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderItem, Product};

    fn sample_order() -> Order {
        Order::new(
            "ORD-1",
            "TXN-1",
            vec![
                OrderItem::new(Product::new("SMARTPHONE", 1500.0), 1),
                OrderItem::new(Product::new("BOOK", 25.0), 2),
            ],
        )
    }

    #[test]
    fn test_builder() {
        let event = Event::builder()
            .transaction_id("TXN-1")
            .order_id("ORD-1")
            .payload(sample_order())
            .source("ORDER_SERVICE")
            .build();

        assert_eq!(event.transaction_id.as_str(), "TXN-1");
        assert_eq!(event.order_id.as_str(), "ORD-1");
        assert_eq!(event.source, "ORDER_SERVICE");
        assert_eq!(event.status, SagaStatus::Pending);
        assert!(event.event_history.is_empty());
    }

    #[test]
    fn test_try_build_returns_none_on_missing_fields() {
        assert!(Event::builder().try_build().is_none());
        assert!(
            Event::builder()
                .transaction_id("TXN-1")
                .order_id("ORD-1")
                .try_build()
                .is_none()
        );
    }

    #[test]
    fn test_for_order_takes_ids_from_payload() {
        let event = Event::for_order(sample_order());
        assert_eq!(event.order_id, event.payload.id);
        assert_eq!(event.transaction_id, event.payload.transaction_id);
        assert_eq!(event.status, SagaStatus::Pending);
    }

    #[test]
    fn test_transition_sets_owner_and_appends_history() {
        let mut event = Event::for_order(sample_order());

        event.transition(
            "PAYMENT_SERVICE",
            SagaStatus::Success,
            "Payment realized successfully!",
        );

        assert_eq!(event.source, "PAYMENT_SERVICE");
        assert_eq!(event.status, SagaStatus::Success);
        assert_eq!(event.event_history.len(), 1);
        let entry = &event.event_history[0];
        assert_eq!(entry.source, "PAYMENT_SERVICE");
        assert_eq!(entry.status, SagaStatus::Success);
        assert_eq!(entry.message, "Payment realized successfully!");
    }

    #[test]
    fn test_history_is_append_only() {
        let mut event = Event::for_order(sample_order());
        event.transition("A", SagaStatus::Success, "first");
        let prefix = event.event_history.clone();

        event.transition("B", SagaStatus::RollbackPending, "second");
        event.transition("A", SagaStatus::Fail, "third");

        assert_eq!(event.event_history.len(), 3);
        assert_eq!(&event.event_history[..1], &prefix[..]);
    }

    #[test]
    fn test_wire_roundtrip_preserves_everything() {
        let mut event = Event::for_order(sample_order());
        event.transition("PRODUCT_VALIDATION_SERVICE", SagaStatus::Success, "ok");
        event.transition("PAYMENT_SERVICE", SagaStatus::RollbackPending, "declined");

        let wire = event.to_wire().unwrap();
        let decoded = Event::from_wire(&wire).unwrap();

        assert_eq!(decoded, event);
        // Re-encoding the decoded event must reproduce the exact document.
        assert_eq!(decoded.to_wire().unwrap(), wire);
    }

    #[test]
    fn test_wire_field_names() {
        let event = Event::for_order(sample_order());
        let value = serde_json::to_value(&event).unwrap();
        for field in [
            "id",
            "transactionId",
            "orderId",
            "payload",
            "source",
            "status",
            "eventHistory",
            "createdAt",
        ] {
            assert!(value.get(field).is_some(), "missing wire field {field}");
        }
    }

    #[test]
    fn test_wire_accepts_missing_history() {
        let event = Event::for_order(sample_order());
        let mut value = serde_json::to_value(&event).unwrap();
        value.as_object_mut().unwrap().remove("eventHistory");
        value.as_object_mut().unwrap().remove("source");

        let decoded: Event = serde_json::from_value(value).unwrap();
        assert!(decoded.event_history.is_empty());
        assert!(decoded.source.is_empty());
    }
}

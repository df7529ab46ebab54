//! Demo runner entry point.
//!
//! Assembles the three saga participants over the in-memory transport and
//! plays the external orchestrator for two sagas: one that completes and
//! one that fails at the inventory step and is compensated in reverse
//! order.

mod config;

use config::Config;
use idempotency::InMemoryIdempotencyGuard;
use participant::{
    InMemoryInventoryStore, InMemoryPaymentStore, InMemoryProductCatalog, InMemoryTransport,
    InventoryAction, ParticipantService, PaymentAction, ProductValidationAction,
};
use protocol::{Event, Order, OrderItem, Product, TransactionId};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn log_ledger(event: &Event) {
    for entry in &event.event_history {
        tracing::info!(
            source = %entry.source,
            status = %entry.status,
            message = %entry.message,
            "ledger entry"
        );
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Wire the participants once at startup: each one gets its domain
    // action, its own idempotency guard and the shared transport.
    let transport = InMemoryTransport::new();
    let catalog = InMemoryProductCatalog::with_products(["SMARTPHONE", "NOTEBOOK", "BOOK"]);
    let payment_store = InMemoryPaymentStore::new();
    let inventory_store =
        InMemoryInventoryStore::with_stock([("SMARTPHONE", 5), ("NOTEBOOK", 3), ("BOOK", 10)]);

    let validation = ParticipantService::new(
        ProductValidationAction::new(catalog),
        InMemoryIdempotencyGuard::new(),
        transport.clone(),
        config.orchestrator_channel.clone(),
    );
    let payment = ParticipantService::new(
        PaymentAction::new(payment_store),
        InMemoryIdempotencyGuard::new(),
        transport.clone(),
        config.orchestrator_channel.clone(),
    );
    let inventory = ParticipantService::new(
        InventoryAction::new(inventory_store),
        InMemoryIdempotencyGuard::new(),
        transport.clone(),
        config.orchestrator_channel.clone(),
    );

    // Saga 1: completes at every step
    let event = Event::for_order(Order::new(
        "ORD-0001",
        TransactionId::generate(),
        vec![
            OrderItem::new(Product::new("SMARTPHONE", 1500.0), 1),
            OrderItem::new(Product::new("BOOK", 25.0), 2),
        ],
    ));
    tracing::info!(order_id = %event.order_id, "starting saga");

    let event = validation.process(event).await.expect("publish failed");
    let event = payment.process(event).await.expect("publish failed");
    let event = inventory.process(event).await.expect("publish failed");

    tracing::info!(
        order_id = %event.order_id,
        status = %event.status,
        total_amount = event.payload.total_amount,
        total_items = event.payload.total_items,
        "saga finished"
    );
    log_ledger(&event);

    // Saga 2: more notebooks than the stock holds; inventory refuses and
    // the orchestrator unwinds the earlier participants in reverse order
    let event = Event::for_order(Order::new(
        "ORD-0002",
        TransactionId::generate(),
        vec![OrderItem::new(Product::new("NOTEBOOK", 2000.0), 7)],
    ));
    tracing::info!(order_id = %event.order_id, "starting saga");

    let event = validation.process(event).await.expect("publish failed");
    let event = payment.process(event).await.expect("publish failed");
    let mut event = inventory.process(event).await.expect("publish failed");

    if event.status.needs_rollback() {
        tracing::warn!(order_id = %event.order_id, "saga failed, compensating");
        event = payment.rollback(event).await.expect("publish failed");
        event = validation.rollback(event).await.expect("publish failed");
    }

    tracing::info!(order_id = %event.order_id, status = %event.status, "saga finished");
    log_ledger(&event);

    let published = transport.published_count(&config.orchestrator_channel).await;
    tracing::info!(published, "events emitted to the orchestrator");
}

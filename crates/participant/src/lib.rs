//! Saga participant pattern for the order services.
//!
//! Every business service in the saga repeats the same shape: check the
//! idempotency guard, run the domain action, append to the event's history
//! ledger, re-emit the event. This crate implements that shape once as
//! [`ParticipantService`] and instantiates it for the three services
//! observed in the system:
//!
//! 1. Product validation: every line item's code must exist in the catalog
//! 2. Payment: totals computed over the line items and persisted
//! 3. Inventory: stock debited per line item, restored on rollback
//!
//! The orchestrator that routes events between participants and decides
//! when to compensate is external; its contract is the pair of operations
//! [`ParticipantService::process`] and [`ParticipantService::rollback`]
//! plus the guarantee that a failure is always re-emitted, never swallowed.

pub mod error;
pub mod memory;
pub mod service;
pub mod services;
pub mod transport;

pub use error::{ParticipantError, Result};
pub use memory::InMemoryTransport;
pub use service::{DomainAction, ParticipantService};
pub use services::{
    INVENTORY_SOURCE, InMemoryInventoryStore, InMemoryPaymentStore, InMemoryProductCatalog,
    InventoryAction, InventoryMovement, InventoryStore, PAYMENT_SOURCE, PRODUCT_VALIDATION_SOURCE,
    Payment, PaymentAction, PaymentStatus, PaymentStore, ProductCatalog, ProductValidationAction,
};
pub use transport::{MessageTransport, TransportError};

//! Shared identifier types used by every saga service.

mod types;

pub use types::{EventId, OrderId, TransactionId};

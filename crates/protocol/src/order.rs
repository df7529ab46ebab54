//! The order snapshot carried as the event payload.

use chrono::{DateTime, Utc};
use common::{OrderId, TransactionId};
use serde::{Deserialize, Serialize};

/// A product in the reference catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Catalog code, e.g. `"SMARTPHONE"`.
    pub code: String,
    /// Unit value in currency units.
    pub unit_val: f64,
}

impl Product {
    /// Creates a product from a code and unit value.
    pub fn new(code: impl Into<String>, unit_val: f64) -> Self {
        Self {
            code: code.into(),
            unit_val,
        }
    }
}

/// One order line: a product and the quantity ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: Product,
    pub quantity: u32,
}

impl OrderItem {
    /// Creates an order line.
    pub fn new(product: Product, quantity: u32) -> Self {
        Self { product, quantity }
    }
}

/// The order snapshot travelling inside the event envelope.
///
/// Participants may enrich the running totals but must never remove line
/// items; the line items are the record the downstream participants and
/// the rollback path work from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Same value as the envelope's `orderId`.
    pub id: OrderId,
    pub products: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    /// Same value as the envelope's `transactionId`.
    pub transaction_id: TransactionId,
    /// Filled in by the payment participant.
    #[serde(default)]
    pub total_amount: f64,
    /// Filled in by the payment participant.
    #[serde(default)]
    pub total_items: u32,
}

impl Order {
    /// Creates a new order snapshot with zeroed totals.
    pub fn new(
        id: impl Into<OrderId>,
        transaction_id: impl Into<TransactionId>,
        products: Vec<OrderItem>,
    ) -> Self {
        Self {
            id: id.into(),
            products,
            created_at: Utc::now(),
            transaction_id: transaction_id.into(),
            total_amount: 0.0,
            total_items: 0,
        }
    }
}

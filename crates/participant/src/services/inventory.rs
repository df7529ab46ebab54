//! Inventory participant.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use idempotency::SagaKey;
use protocol::{Order, OrderItem};
use serde::{Deserialize, Serialize};

use crate::error::{ParticipantError, Result};
use crate::service::DomainAction;

/// Source name this participant stamps on events and history entries.
pub const INVENTORY_SOURCE: &str = "INVENTORY_SERVICE";

/// One stock movement remembered per saga instance so rollback can put
/// the exact quantities back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub product_code: String,
    pub order_quantity: u32,
    pub old_quantity: u32,
    pub new_quantity: u32,
}

/// Storage port for product stock and the per-saga movements against it.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Returns the available quantity for a product code, if stocked.
    async fn available(&self, code: &str) -> Result<Option<u32>>;

    /// Debits stock for every line item and remembers the movements under
    /// the saga key, all-or-nothing.
    ///
    /// The debit is keyed: a second call for the same key fails without
    /// touching stock, so a racing duplicate delivery cannot double-debit.
    async fn debit(&self, key: &SagaKey, items: &[OrderItem]) -> Result<Vec<InventoryMovement>>;

    /// Restores the movements remembered for the key. Idempotent; a no-op
    /// when the key has no movements or they were already restored.
    async fn restore(&self, key: &SagaKey) -> Result<()>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    stock: HashMap<String, u32>,
    /// Movements per saga key, with a flag marking them restored.
    movements: HashMap<SagaKey, (Vec<InventoryMovement>, bool)>,
    fail_on_debit: bool,
}

/// In-memory inventory store for testing and the demo runner.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryStore {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with the given stock levels.
    pub fn with_stock<I, S>(stock: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut state = store.state.write().unwrap();
            state
                .stock
                .extend(stock.into_iter().map(|(code, qty)| (code.into(), qty)));
        }
        store
    }

    /// Configures the store to fail on the next debit call.
    pub fn set_fail_on_debit(&self, fail: bool) {
        self.state.write().unwrap().fail_on_debit = fail;
    }

    /// Returns the stock currently available for a code.
    pub fn stock_of(&self, code: &str) -> Option<u32> {
        self.state.read().unwrap().stock.get(code).copied()
    }

    /// Returns the number of saga keys with remembered movements.
    pub fn movement_count(&self) -> usize {
        self.state.read().unwrap().movements.len()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn available(&self, code: &str) -> Result<Option<u32>> {
        Ok(self.state.read().unwrap().stock.get(code).copied())
    }

    async fn debit(&self, key: &SagaKey, items: &[OrderItem]) -> Result<Vec<InventoryMovement>> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_debit {
            return Err(ParticipantError::unexpected("Inventory storage unavailable"));
        }

        if state.movements.contains_key(key) {
            return Err(ParticipantError::validation(
                "Inventory already updated for this transactionId.",
            ));
        }

        // Validate every line before touching stock
        let mut movements = Vec::with_capacity(items.len());
        let mut working: HashMap<&str, u32> = HashMap::new();
        for item in items {
            let code = item.product.code.as_str();
            let available = match working.get(code) {
                Some(qty) => *qty,
                None => *state.stock.get(code).ok_or_else(|| {
                    ParticipantError::validation(format!("Product '{code}' is not stocked"))
                })?,
            };

            let new_quantity = available.checked_sub(item.quantity).ok_or_else(|| {
                ParticipantError::validation(format!("Product '{code}' is out of stock!"))
            })?;

            movements.push(InventoryMovement {
                product_code: code.to_string(),
                order_quantity: item.quantity,
                old_quantity: available,
                new_quantity,
            });
            working.insert(code, new_quantity);
        }

        for (code, qty) in working {
            state.stock.insert(code.to_string(), qty);
        }
        state.movements.insert(key.clone(), (movements.clone(), false));

        Ok(movements)
    }

    async fn restore(&self, key: &SagaKey) -> Result<()> {
        let mut state = self.state.write().unwrap();

        let Some((movements, restored)) = state.movements.get(key).cloned() else {
            return Ok(());
        };
        if restored {
            return Ok(());
        }

        for movement in &movements {
            if let Some(qty) = state.stock.get_mut(&movement.product_code) {
                *qty += movement.order_quantity;
            }
        }
        state.movements.insert(key.clone(), (movements, true));

        Ok(())
    }
}

/// Debits stock for the order's line items; rollback restores it.
pub struct InventoryAction<S: InventoryStore> {
    store: S,
}

impl<S: InventoryStore> InventoryAction<S> {
    /// Creates the action over an inventory store.
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: InventoryStore> DomainAction for InventoryAction<S> {
    fn source(&self) -> &'static str {
        INVENTORY_SOURCE
    }

    fn failure_label(&self) -> &'static str {
        "update inventory"
    }

    fn rollback_message(&self) -> &'static str {
        "Rollback executed on inventory!"
    }

    async fn execute(&self, key: &SagaKey, payload: &mut Order) -> Result<String> {
        self.store.debit(key, &payload.products).await?;
        Ok("Inventory updated successfully!".to_string())
    }

    async fn compensate(&self, key: &SagaKey, _payload: &Order) -> Result<()> {
        self.store.restore(key).await
    }
}

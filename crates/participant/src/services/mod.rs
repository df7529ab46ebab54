//! The three business participants of the order saga.

pub mod inventory;
pub mod payment;
pub mod product_validation;

pub use inventory::{
    INVENTORY_SOURCE, InMemoryInventoryStore, InventoryAction, InventoryMovement, InventoryStore,
};
pub use payment::{
    InMemoryPaymentStore, PAYMENT_SOURCE, Payment, PaymentAction, PaymentStatus, PaymentStore,
};
pub use product_validation::{
    InMemoryProductCatalog, PRODUCT_VALIDATION_SOURCE, ProductCatalog, ProductValidationAction,
};

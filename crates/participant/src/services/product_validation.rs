//! Product validation participant.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use idempotency::SagaKey;
use protocol::Order;

use crate::error::{ParticipantError, Result};
use crate::service::DomainAction;

/// Source name this participant stamps on events and history entries.
pub const PRODUCT_VALIDATION_SOURCE: &str = "PRODUCT_VALIDATION_SERVICE";

/// Read port over the reference product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns true if a product with this code exists.
    async fn exists_by_code(&self, code: &str) -> Result<bool>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    codes: HashSet<String>,
    fail_on_lookup: bool,
}

/// In-memory product catalog for testing and the demo runner.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryProductCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog pre-loaded with the given product codes.
    pub fn with_products<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let catalog = Self::new();
        {
            let mut state = catalog.state.write().unwrap();
            state.codes.extend(codes.into_iter().map(Into::into));
        }
        catalog
    }

    /// Adds a product code to the catalog.
    pub fn add(&self, code: impl Into<String>) {
        self.state.write().unwrap().codes.insert(code.into());
    }

    /// Configures the catalog to fail lookups, simulating storage loss.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().unwrap().fail_on_lookup = fail;
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn exists_by_code(&self, code: &str) -> Result<bool> {
        let state = self.state.read().unwrap();
        if state.fail_on_lookup {
            return Err(ParticipantError::unexpected("Product catalog unavailable"));
        }
        Ok(state.codes.contains(code))
    }
}

/// Validates that every line item's product exists in the catalog.
pub struct ProductValidationAction<C: ProductCatalog> {
    catalog: C,
}

impl<C: ProductCatalog> ProductValidationAction<C> {
    /// Creates the action over a catalog.
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl<C: ProductCatalog> DomainAction for ProductValidationAction<C> {
    fn source(&self) -> &'static str {
        PRODUCT_VALIDATION_SOURCE
    }

    fn failure_label(&self) -> &'static str {
        "validate products"
    }

    fn rollback_message(&self) -> &'static str {
        "Rollback executed on product validation!"
    }

    async fn execute(&self, _key: &SagaKey, payload: &mut Order) -> Result<String> {
        for item in &payload.products {
            let code = &item.product.code;
            if !self.catalog.exists_by_code(code).await? {
                return Err(ParticipantError::validation(format!(
                    "Product '{code}' does not exist in the catalog"
                )));
            }
        }

        Ok("Products are validated successfully!".to_string())
    }
}

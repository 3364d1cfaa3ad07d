//! Catalog price oracle trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Money, ProductId};

use crate::error::ServiceError;

/// Authoritative product data fetched from the external catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub thumbnail: String,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub available: bool,
}

impl CatalogProduct {
    /// Returns the discount price if present, otherwise the list price.
    pub fn effective_price(&self) -> Money {
        self.discount_price.unwrap_or(self.price)
    }
}

/// Client for the external product catalog.
#[async_trait]
pub trait CatalogOracle: Send + Sync {
    /// Fetches authoritative price/availability for a set of products.
    ///
    /// Products unknown to the catalog are simply absent from the result;
    /// the caller decides whether that is an error.
    async fn get_products(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<CatalogProduct>, ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, CatalogProduct>,
    fail_on_fetch: bool,
}

/// In-memory catalog for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalog {
    /// Creates a new empty in-memory catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product.
    pub fn put(&self, product: CatalogProduct) {
        self.state
            .write()
            .unwrap()
            .products
            .insert(product.id, product);
    }

    /// Inserts a plain available product with a list price.
    pub fn put_simple(&self, id: ProductId, name: &str, price: Money) {
        self.put(CatalogProduct {
            id,
            name: name.to_string(),
            description: String::new(),
            thumbnail: String::new(),
            price,
            discount_price: None,
            available: true,
        });
    }

    /// Updates the list price of an existing product.
    pub fn set_price(&self, id: ProductId, price: Money) {
        if let Some(p) = self.state.write().unwrap().products.get_mut(&id) {
            p.price = price;
        }
    }

    /// Flips a product's availability.
    pub fn set_available(&self, id: ProductId, available: bool) {
        if let Some(p) = self.state.write().unwrap().products.get_mut(&id) {
            p.available = available;
        }
    }

    /// Configures the catalog to fail fetches.
    pub fn set_fail_on_fetch(&self, fail: bool) {
        self.state.write().unwrap().fail_on_fetch = fail;
    }
}

#[async_trait]
impl CatalogOracle for InMemoryCatalog {
    async fn get_products(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<CatalogProduct>, ServiceError> {
        let state = self.state.read().unwrap();
        if state.fail_on_fetch {
            return Err(ServiceError::Catalog("catalog service unavailable".to_string()));
        }

        Ok(product_ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }
}

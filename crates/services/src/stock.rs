//! Stock ledger client trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::ProductId;

use crate::error::ServiceError;

/// A single product's stock movement in a batch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDelta {
    /// The product whose stock moves.
    pub product_id: ProductId,
    /// Quantity to reduce or restore.
    pub quantity: u32,
}

/// Client for the external inventory service.
///
/// Stock quantities are owned by the remote ledger and are never
/// read-modify-written by value from this core. Batch operations apply each
/// product's delta atomically and independently; no cross-product atomicity
/// is assumed.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Fetches current quantities for a set of products.
    async fn get_quantities(
        &self,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, u32>, ServiceError>;

    /// Reduces stock for every delta in the batch.
    async fn reduce_batch(&self, deltas: &[StockDelta]) -> Result<(), ServiceError>;

    /// Restores stock for every delta in the batch (compensation).
    async fn restore_batch(&self, deltas: &[StockDelta]) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryStockState {
    quantities: HashMap<ProductId, u32>,
    reduce_calls: u32,
    restore_calls: u32,
    fail_on_reduce: bool,
    fail_on_restore: bool,
}

/// In-memory stock ledger for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockLedger {
    state: Arc<RwLock<InMemoryStockState>>,
}

impl InMemoryStockLedger {
    /// Creates a new empty in-memory stock ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stock level for a product.
    pub fn set_quantity(&self, product_id: ProductId, quantity: u32) {
        self.state
            .write()
            .unwrap()
            .quantities
            .insert(product_id, quantity);
    }

    /// Returns the current stock level for a product.
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.state
            .read()
            .unwrap()
            .quantities
            .get(&product_id)
            .copied()
            .unwrap_or(0)
    }

    /// Configures the ledger to fail reduce calls.
    pub fn set_fail_on_reduce(&self, fail: bool) {
        self.state.write().unwrap().fail_on_reduce = fail;
    }

    /// Configures the ledger to fail restore calls.
    pub fn set_fail_on_restore(&self, fail: bool) {
        self.state.write().unwrap().fail_on_restore = fail;
    }

    /// Returns the number of reduce batches received.
    pub fn reduce_calls(&self) -> u32 {
        self.state.read().unwrap().reduce_calls
    }

    /// Returns the number of restore batches received.
    pub fn restore_calls(&self) -> u32 {
        self.state.read().unwrap().restore_calls
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn get_quantities(
        &self,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, u32>, ServiceError> {
        let state = self.state.read().unwrap();
        Ok(product_ids
            .iter()
            .map(|id| (*id, state.quantities.get(id).copied().unwrap_or(0)))
            .collect())
    }

    async fn reduce_batch(&self, deltas: &[StockDelta]) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        state.reduce_calls += 1;

        if state.fail_on_reduce {
            return Err(ServiceError::Stock("inventory service unavailable".to_string()));
        }

        // Conditional decrement per product, as the real ledger does.
        for delta in deltas {
            let available = state.quantities.get(&delta.product_id).copied().unwrap_or(0);
            if available < delta.quantity {
                return Err(ServiceError::Stock(format!(
                    "insufficient stock for product {}",
                    delta.product_id
                )));
            }
            state
                .quantities
                .insert(delta.product_id, available - delta.quantity);
        }
        Ok(())
    }

    async fn restore_batch(&self, deltas: &[StockDelta]) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        state.restore_calls += 1;

        if state.fail_on_restore {
            return Err(ServiceError::Stock("inventory service unavailable".to_string()));
        }

        for delta in deltas {
            let current = state.quantities.get(&delta.product_id).copied().unwrap_or(0);
            state
                .quantities
                .insert(delta.product_id, current + delta.quantity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_quantities_defaults_to_zero() {
        let ledger = InMemoryStockLedger::new();
        ledger.set_quantity(ProductId::new(10), 5);

        let quantities = ledger
            .get_quantities(&[ProductId::new(10), ProductId::new(11)])
            .await
            .unwrap();
        assert_eq!(quantities[&ProductId::new(10)], 5);
        assert_eq!(quantities[&ProductId::new(11)], 0);
    }

    #[tokio::test]
    async fn test_reduce_and_restore() {
        let ledger = InMemoryStockLedger::new();
        ledger.set_quantity(ProductId::new(10), 5);

        ledger
            .reduce_batch(&[StockDelta {
                product_id: ProductId::new(10),
                quantity: 2,
            }])
            .await
            .unwrap();
        assert_eq!(ledger.quantity_of(ProductId::new(10)), 3);

        ledger
            .restore_batch(&[StockDelta {
                product_id: ProductId::new(10),
                quantity: 2,
            }])
            .await
            .unwrap();
        assert_eq!(ledger.quantity_of(ProductId::new(10)), 5);
        assert_eq!(ledger.reduce_calls(), 1);
        assert_eq!(ledger.restore_calls(), 1);
    }

    #[tokio::test]
    async fn test_reduce_below_zero_rejected() {
        let ledger = InMemoryStockLedger::new();
        ledger.set_quantity(ProductId::new(10), 1);

        let result = ledger
            .reduce_batch(&[StockDelta {
                product_id: ProductId::new(10),
                quantity: 2,
            }])
            .await;
        assert!(result.is_err());
        assert_eq!(ledger.quantity_of(ProductId::new(10)), 1);
    }

    #[tokio::test]
    async fn test_fail_on_reduce() {
        let ledger = InMemoryStockLedger::new();
        ledger.set_quantity(ProductId::new(10), 5);
        ledger.set_fail_on_reduce(true);

        let result = ledger
            .reduce_batch(&[StockDelta {
                product_id: ProductId::new(10),
                quantity: 1,
            }])
            .await;
        assert!(result.is_err());
        assert_eq!(ledger.quantity_of(ProductId::new(10)), 5);
    }
}

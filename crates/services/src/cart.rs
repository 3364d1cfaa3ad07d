//! Cart gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::UserId;
use domain::{Money, ProductId};

use crate::error::ServiceError;

/// One line in a user's cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// The price the user saw when the item was added. Checkout verifies
    /// this still matches the catalog before committing.
    pub effective_price: Money,
}

/// A user's cart as reported by the external cart service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Returns true if the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Client for the external cart service.
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Fetches the user's cart contents.
    async fn get_cart(&self, user_id: UserId) -> Result<Cart, ServiceError>;

    /// Empties the user's cart.
    async fn clear(&self, user_id: UserId) -> Result<(), ServiceError>;

    /// Removes only the given products from the user's cart.
    async fn remove_items(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<UserId, Vec<CartItem>>,
    clear_calls: u32,
    fail_on_clear: bool,
}

/// In-memory cart gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartGateway {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartGateway {
    /// Creates a new empty in-memory cart gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item to a user's cart.
    pub fn add_item(&self, user_id: UserId, item: CartItem) {
        self.state
            .write()
            .unwrap()
            .carts
            .entry(user_id)
            .or_default()
            .push(item);
    }

    /// Returns the number of items left in a user's cart.
    pub fn item_count(&self, user_id: UserId) -> usize {
        self.state
            .read()
            .unwrap()
            .carts
            .get(&user_id)
            .map(|items| items.len())
            .unwrap_or(0)
    }

    /// Configures the gateway to fail clear/remove calls.
    pub fn set_fail_on_clear(&self, fail: bool) {
        self.state.write().unwrap().fail_on_clear = fail;
    }

    /// Returns the number of clear calls received.
    pub fn clear_calls(&self) -> u32 {
        self.state.read().unwrap().clear_calls
    }
}

#[async_trait]
impl CartGateway for InMemoryCartGateway {
    async fn get_cart(&self, user_id: UserId) -> Result<Cart, ServiceError> {
        let state = self.state.read().unwrap();
        Ok(Cart {
            items: state.carts.get(&user_id).cloned().unwrap_or_default(),
        })
    }

    async fn clear(&self, user_id: UserId) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        state.clear_calls += 1;
        if state.fail_on_clear {
            return Err(ServiceError::Cart("cart service unavailable".to_string()));
        }
        state.carts.remove(&user_id);
        Ok(())
    }

    async fn remove_items(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        state.clear_calls += 1;
        if state.fail_on_clear {
            return Err(ServiceError::Cart("cart service unavailable".to_string()));
        }
        if let Some(items) = state.carts.get_mut(&user_id) {
            items.retain(|item| !product_ids.contains(&item.product_id));
        }
        Ok(())
    }
}

//! Fulfillment error types.

use common::{OrderId, UserId};
use domain::{OrderError, OrderStatus, PaymentError, ProductId};
use services::ServiceError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during checkout, payment, or lifecycle operations.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The cart (or the selected subset of it) is empty.
    #[error("Cart is empty")]
    EmptyCart,

    /// A product is missing from the catalog or flagged unavailable.
    #[error("Product {product_id} is unavailable")]
    ProductUnavailable { product_id: ProductId },

    /// The catalog price no longer matches the price captured in the cart.
    #[error("Price of product {product_id} has changed; refresh the cart")]
    PriceChanged { product_id: ProductId },

    /// Requested quantity exceeds available stock.
    #[error(
        "Insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: u32,
        requested: u32,
    },

    /// The order is not in the status the operation requires.
    #[error("Order {order_id} is {actual}, expected {expected}")]
    InvalidOrderStatus {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// No payment exists for the order.
    #[error("Payment not found for order: {0}")]
    PaymentNotFound(OrderId),

    /// The acting user does not own the order.
    #[error("User {user_id} does not own order {order_id}")]
    NotOwner { user_id: UserId, order_id: OrderId },

    /// The callback signature did not verify. Never retried.
    #[error("Invalid callback signature")]
    InvalidSignature,

    /// A required callback parameter is missing.
    #[error("Missing callback parameter: {0}")]
    MissingParameter(&'static str),

    /// The transaction reference could not be parsed back to an order.
    #[error("Malformed transaction reference: {0}")]
    MalformedTransactionRef(String),

    /// A downstream call failed; the request may be retried.
    #[error("Downstream service failure: {0}")]
    Communication(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Domain rule violation on the order aggregate.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Domain rule violation on the payment aggregate.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),
}

impl From<ServiceError> for FulfillmentError {
    fn from(e: ServiceError) -> Self {
        FulfillmentError::Communication(e.to_string())
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;

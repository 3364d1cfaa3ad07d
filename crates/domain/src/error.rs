//! Domain error types.

use thiserror::Error;

use crate::status::OrderStatus;

/// Errors raised by the order aggregate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// The requested status transition is not allowed.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// The order cannot be cancelled in its current status.
    #[error("Order cannot be cancelled in status {status}")]
    NotCancellable { status: OrderStatus },

    /// An order must contain at least one item.
    #[error("Order must contain at least one item")]
    NoItems,

    /// An item quantity must be positive.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: i64, quantity: u32 },
}

/// Errors raised by the payment aggregate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentError {
    /// A completed payment cannot be reset for another attempt.
    #[error("Payment for order {order_id} is already completed")]
    AlreadyCompleted { order_id: String },
}

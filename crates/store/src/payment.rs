//! Payment store trait.

use async_trait::async_trait;
use common::OrderId;
use domain::{Payment, PaymentStatus};

use crate::error::Result;

/// Persistence for Payment records, keyed by order ID.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Loads the payment for an order, if any.
    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>>;

    /// Inserts a new payment row.
    async fn insert(&self, payment: &Payment) -> Result<()>;

    /// Persists the current state of an existing payment.
    ///
    /// Fails with `PaymentNotFound` if no row exists for the order.
    async fn update(&self, payment: &Payment) -> Result<()>;

    /// Atomically moves the payment for `order_id` from `from` to `to`.
    ///
    /// Returns `true` only if the row existed and was in `from`; a `false`
    /// return means some other delivery of the same callback won the race.
    /// Compensation is keyed to this compare-and-set so duplicate failure
    /// callbacks restore stock exactly once.
    async fn transition_status(
        &self,
        order_id: OrderId,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool>;
}

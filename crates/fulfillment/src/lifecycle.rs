//! Order lifecycle operations: cancellation, expiry, status updates.

use chrono::Utc;
use common::{OrderId, UserId};
use domain::{DomainEvent, Order, OrderError, OrderStatus};
use services::{EventPublisher, StockDelta, StockLedger};
use store::OrderStore;

use crate::error::{FulfillmentError, Result};
use crate::publish_best_effort;

/// Owns the order status surface after checkout: user cancellation,
/// system expiry, and the generic status updates downstream services
/// (shipping, delivery confirmation) drive.
pub struct OrderLifecycle<O, S, E>
where
    O: OrderStore,
    S: StockLedger,
    E: EventPublisher,
{
    orders: O,
    stock: S,
    publisher: E,
}

impl<O, S, E> OrderLifecycle<O, S, E>
where
    O: OrderStore,
    S: StockLedger,
    E: EventPublisher,
{
    /// Creates a new lifecycle service.
    pub fn new(orders: O, stock: S, publisher: E) -> Self {
        Self {
            orders,
            stock,
            publisher,
        }
    }

    /// Returns an order, enforcing ownership.
    pub async fn get_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;
        if !order.is_owned_by(user_id) {
            return Err(FulfillmentError::NotOwner { user_id, order_id });
        }
        Ok(order)
    }

    /// Cancels an order on behalf of its owner.
    ///
    /// Only the owner may cancel, and only while the order is still
    /// awaiting payment. Stock is restored before the order mutates: if
    /// restoration fails the order stays cancellable and the whole call
    /// can be retried.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let mut order = self.get_order(user_id, order_id).await?;
        if !order.can_be_cancelled() {
            return Err(OrderError::NotCancellable {
                status: order.status(),
            }
            .into());
        }

        self.restore_order_stock(&order).await?;

        order.cancel()?;
        self.orders.update(&order).await?;

        publish_best_effort(
            &self.publisher,
            DomainEvent::OrderCancelled {
                order_id,
                user_id,
                amount: order.total_amount(),
                timestamp: Utc::now(),
            },
        )
        .await;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order_id, "order cancelled");
        Ok(order)
    }

    /// Expires an unpaid order.
    ///
    /// Called by the scheduler for orders whose payment window elapsed.
    /// Follows the same restore-then-mutate path as cancellation but is
    /// system-initiated, so there is no ownership check and a distinct
    /// event is published.
    #[tracing::instrument(skip(self))]
    pub async fn expire(&self, order_id: OrderId) -> Result<Order> {
        let mut order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;
        if !order.can_be_cancelled() {
            return Err(OrderError::NotCancellable {
                status: order.status(),
            }
            .into());
        }

        self.restore_order_stock(&order).await?;

        order.cancel()?;
        self.orders.update(&order).await?;

        publish_best_effort(
            &self.publisher,
            DomainEvent::OrderExpired {
                order_id,
                user_id: order.user_id(),
                amount: order.total_amount(),
                timestamp: Utc::now(),
            },
        )
        .await;

        metrics::counter!("orders_expired_total").increment(1);
        tracing::info!(%order_id, "order expired");
        Ok(order)
    }

    /// Moves an order to `status`, rejecting illegal transitions.
    ///
    /// The surface shipping and delivery integrations call; payment
    /// settlement uses its own path.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;

        order.transition_to(status)?;
        self.orders.update(&order).await?;

        publish_best_effort(
            &self.publisher,
            DomainEvent::OrderStatusUpdated {
                order_id,
                user_id: order.user_id(),
                amount: order.total_amount(),
                status,
                timestamp: Utc::now(),
            },
        )
        .await;

        tracing::info!(%order_id, status = %status, "order status updated");
        Ok(order)
    }

    async fn restore_order_stock(&self, order: &Order) -> Result<()> {
        let deltas: Vec<StockDelta> = order
            .items()
            .iter()
            .map(|item| StockDelta {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect();
        self.stock.restore_batch(&deltas).await?;
        Ok(())
    }
}

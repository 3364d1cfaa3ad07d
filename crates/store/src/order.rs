//! Order store trait.

use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{Order, OrderItem};

use crate::error::Result;
use crate::reservation::{ReservationId, ReservationLine, StockReservation};

/// Persistence for the Order aggregate.
///
/// The store assigns the surrogate ID and the human-readable order code at
/// insert time. Code sequencing is a dedicated per-day atomic counter, not
/// a count of same-day rows, so concurrent checkouts cannot mint duplicate
/// codes.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order for `user_id`, assigning its ID and code.
    ///
    /// The item list must satisfy the order invariants (non-empty, positive
    /// quantities); the total is computed by the aggregate constructor.
    async fn insert(&self, user_id: UserId, items: Vec<OrderItem>) -> Result<Order>;

    /// Loads an order by ID.
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Persists the current state of an existing order.
    ///
    /// Fails with `OrderNotFound` if the order was never inserted.
    async fn update(&self, order: &Order) -> Result<()>;

    /// Writes a pending stock reservation intent before the ledger reduce.
    async fn begin_reservation(&self, lines: Vec<ReservationLine>) -> Result<ReservationId>;

    /// Marks a reservation consumed by a persisted order.
    async fn commit_reservation(&self, reservation_id: ReservationId) -> Result<()>;

    /// Marks a reservation abandoned after a failed checkout.
    async fn abort_reservation(&self, reservation_id: ReservationId) -> Result<()>;

    /// Returns reservations still pending, oldest first.
    ///
    /// Consumed by the reconciliation job that cleans up checkouts that
    /// crashed between the ledger reduce and the order insert.
    async fn pending_reservations(&self) -> Result<Vec<StockReservation>>;
}

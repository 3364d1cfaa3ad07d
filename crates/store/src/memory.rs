//! In-memory store implementations for testing and local development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use common::{OrderId, UserId};
use domain::{Order, OrderCode, OrderItem, Payment, PaymentStatus};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::order::OrderStore;
use crate::payment::PaymentStore;
use crate::reservation::{
    ReservationId, ReservationLine, ReservationStatus, StockReservation,
};

#[derive(Default)]
struct OrderState {
    orders: HashMap<OrderId, Order>,
    // Per-day order code counter; mirrors the Postgres sequence table.
    sequences: HashMap<NaiveDate, u32>,
    reservations: HashMap<ReservationId, StockReservation>,
}

/// In-memory order store.
///
/// Provides the same interface as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<OrderState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the reservation with the given ID, if it exists.
    pub async fn reservation(&self, id: ReservationId) -> Option<StockReservation> {
        self.state.read().await.reservations.get(&id).cloned()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, user_id: UserId, items: Vec<OrderItem>) -> Result<Order> {
        let mut state = self.state.write().await;

        let today = Utc::now().date_naive();
        let seq = state.sequences.entry(today).or_insert(0);
        *seq += 1;
        let code = OrderCode::format(today, *seq);

        let order = Order::new(OrderId::new(), code, user_id, items)?;
        state.orders.insert(order.id(), order.clone());
        Ok(order)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn update(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        match state.orders.get_mut(&order.id()) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(StoreError::OrderNotFound(order.id())),
        }
    }

    async fn begin_reservation(&self, lines: Vec<ReservationLine>) -> Result<ReservationId> {
        let reservation = StockReservation::pending(lines);
        let id = reservation.id;
        self.state
            .write()
            .await
            .reservations
            .insert(id, reservation);
        Ok(id)
    }

    async fn commit_reservation(&self, reservation_id: ReservationId) -> Result<()> {
        if let Some(r) = self
            .state
            .write()
            .await
            .reservations
            .get_mut(&reservation_id)
        {
            r.status = ReservationStatus::Committed;
        }
        Ok(())
    }

    async fn abort_reservation(&self, reservation_id: ReservationId) -> Result<()> {
        if let Some(r) = self
            .state
            .write()
            .await
            .reservations
            .get_mut(&reservation_id)
        {
            r.status = ReservationStatus::Aborted;
        }
        Ok(())
    }

    async fn pending_reservations(&self) -> Result<Vec<StockReservation>> {
        let state = self.state.read().await;
        let mut pending: Vec<_> = state
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }
}

/// In-memory payment store.
#[derive(Clone, Default)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<OrderId, Payment>>>,
}

impl InMemoryPaymentStore {
    /// Creates a new empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of payment rows.
    pub async fn payment_count(&self) -> usize {
        self.payments.read().await.len()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>> {
        Ok(self.payments.read().await.get(&order_id).cloned())
    }

    async fn insert(&self, payment: &Payment) -> Result<()> {
        self.payments
            .write()
            .await
            .insert(payment.order_id, payment.clone());
        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<()> {
        let mut payments = self.payments.write().await;
        match payments.get_mut(&payment.order_id) {
            Some(existing) => {
                *existing = payment.clone();
                Ok(())
            }
            None => Err(StoreError::PaymentNotFound(payment.order_id)),
        }
    }

    async fn transition_status(
        &self,
        order_id: OrderId,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool> {
        let mut payments = self.payments.write().await;
        match payments.get_mut(&order_id) {
            Some(p) if p.status == from => {
                p.status = to;
                p.updated_at = Utc::now();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::PaymentNotFound(order_id)),
        }
    }
}

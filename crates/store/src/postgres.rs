//! PostgreSQL-backed store implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, PaymentId, UserId};
use domain::{Money, Order, OrderCode, OrderItem, OrderStatus, Payment, PaymentStatus};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::order::OrderStore;
use crate::payment::PaymentStore;
use crate::reservation::{
    ReservationId, ReservationLine, ReservationStatus, StockReservation,
};

fn parse_order_status(s: &str) -> Result<OrderStatus> {
    match s {
        "PendingPayment" => Ok(OrderStatus::PendingPayment),
        "Paid" => Ok(OrderStatus::Paid),
        "Shipping" => Ok(OrderStatus::Shipping),
        "Delivered" => Ok(OrderStatus::Delivered),
        "Completed" => Ok(OrderStatus::Completed),
        "Cancelled" => Ok(OrderStatus::Cancelled),
        other => Err(StoreError::CorruptRow(format!(
            "unknown order status '{other}'"
        ))),
    }
}

fn parse_payment_status(s: &str) -> Result<PaymentStatus> {
    match s {
        "Pending" => Ok(PaymentStatus::Pending),
        "Completed" => Ok(PaymentStatus::Completed),
        "Failed" => Ok(PaymentStatus::Failed),
        other => Err(StoreError::CorruptRow(format!(
            "unknown payment status '{other}'"
        ))),
    }
}

fn parse_reservation_status(s: &str) -> Result<ReservationStatus> {
    match s {
        "Pending" => Ok(ReservationStatus::Pending),
        "Committed" => Ok(ReservationStatus::Committed),
        "Aborted" => Ok(ReservationStatus::Aborted),
        other => Err(StoreError::CorruptRow(format!(
            "unknown reservation status '{other}'"
        ))),
    }
}

/// PostgreSQL order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let items_json: serde_json::Value = row.try_get("items")?;
        let items: Vec<OrderItem> = serde_json::from_value(items_json)?;
        let status = parse_order_status(&row.try_get::<String, _>("status")?)?;

        Ok(Order::from_parts(
            OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            OrderCode::from_string(row.try_get("code")?),
            UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            status,
            items,
            Money::from_cents(row.try_get("total_cents")?),
            row.try_get::<DateTime<Utc>, _>("created_at")?,
            row.try_get::<DateTime<Utc>, _>("updated_at")?,
        ))
    }

    fn row_to_reservation(row: PgRow) -> Result<StockReservation> {
        let lines_json: serde_json::Value = row.try_get("lines")?;
        let lines: Vec<ReservationLine> = serde_json::from_value(lines_json)?;
        let status = parse_reservation_status(&row.try_get::<String, _>("status")?)?;

        Ok(StockReservation {
            id: ReservationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            lines,
            status,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert(&self, user_id: UserId, items: Vec<OrderItem>) -> Result<Order> {
        // The sequence bump and the order insert share one transaction so
        // a failed insert does not burn a code.
        let mut tx = self.pool.begin().await?;

        let today = Utc::now().date_naive();
        let seq: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO order_code_sequences (day, seq) VALUES ($1, 1)
            ON CONFLICT (day) DO UPDATE SET seq = order_code_sequences.seq + 1
            RETURNING seq
            "#,
        )
        .bind(today)
        .fetch_one(&mut *tx)
        .await?;

        let code = OrderCode::format(today, seq as u32);
        let order = Order::new(OrderId::new(), code, user_id, items)?;
        let items_json = serde_json::to_value(order.items())?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, code, user_id, status, items, total_cents, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.code().as_str())
        .bind(order.user_id().as_uuid())
        .bind(order.status().as_str())
        .bind(&items_json)
        .bind(order.total_amount().cents())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn update(&self, order: &Order) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(order.id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.updated_at())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(order.id()));
        }
        Ok(())
    }

    async fn begin_reservation(&self, lines: Vec<ReservationLine>) -> Result<ReservationId> {
        let reservation = StockReservation::pending(lines);
        let lines_json = serde_json::to_value(&reservation.lines)?;

        sqlx::query(
            "INSERT INTO stock_reservations (id, lines, status, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(reservation.id.as_uuid())
        .bind(&lines_json)
        .bind(reservation.status.as_str())
        .bind(reservation.created_at)
        .execute(&self.pool)
        .await?;

        Ok(reservation.id)
    }

    async fn commit_reservation(&self, reservation_id: ReservationId) -> Result<()> {
        sqlx::query("UPDATE stock_reservations SET status = 'Committed' WHERE id = $1")
            .bind(reservation_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn abort_reservation(&self, reservation_id: ReservationId) -> Result<()> {
        sqlx::query("UPDATE stock_reservations SET status = 'Aborted' WHERE id = $1")
            .bind(reservation_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn pending_reservations(&self) -> Result<Vec<StockReservation>> {
        let rows = sqlx::query(
            "SELECT * FROM stock_reservations WHERE status = 'Pending' ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }
}

/// PostgreSQL payment store.
#[derive(Clone)]
pub struct PostgresPaymentStore {
    pool: PgPool,
}

impl PostgresPaymentStore {
    /// Creates a new PostgreSQL payment store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: PgRow) -> Result<Payment> {
        let status = parse_payment_status(&row.try_get::<String, _>("status")?)?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            amount: Money::from_cents(row.try_get("amount_cents")?),
            payment_method: row.try_get("payment_method")?,
            status,
            transaction_id: row.try_get("transaction_id")?,
            bank_code: row.try_get("bank_code")?,
            card_type: row.try_get("card_type")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

#[async_trait]
impl PaymentStore for PostgresPaymentStore {
    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>> {
        let row = sqlx::query("SELECT * FROM payments WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn insert(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, user_id, amount_cents, payment_method, status,
                                  transaction_id, bank_code, card_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.order_id.as_uuid())
        .bind(payment.user_id.as_uuid())
        .bind(payment.amount.cents())
        .bind(&payment.payment_method)
        .bind(payment.status.as_str())
        .bind(&payment.transaction_id)
        .bind(&payment.bank_code)
        .bind(&payment.card_type)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET amount_cents = $2, payment_method = $3, status = $4,
                transaction_id = $5, bank_code = $6, card_type = $7, updated_at = $8
            WHERE order_id = $1
            "#,
        )
        .bind(payment.order_id.as_uuid())
        .bind(payment.amount.cents())
        .bind(&payment.payment_method)
        .bind(payment.status.as_str())
        .bind(&payment.transaction_id)
        .bind(&payment.bank_code)
        .bind(&payment.card_type)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::PaymentNotFound(payment.order_id));
        }
        Ok(())
    }

    async fn transition_status(
        &self,
        order_id: OrderId,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool> {
        // Single-statement compare-and-set; duplicate callbacks race here
        // and only one of them sees rows_affected == 1.
        let result = sqlx::query(
            "UPDATE payments SET status = $3, updated_at = $4 WHERE order_id = $1 AND status = $2",
        )
        .bind(order_id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Distinguish "lost the race" from "row missing"
        let exists: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM payments WHERE order_id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match exists {
            Some(_) => Ok(false),
            None => Err(StoreError::PaymentNotFound(order_id)),
        }
    }
}

//! Stock reservation intent records.
//!
//! A reservation row is written before the inventory ledger is asked to
//! reduce stock and resolved once the order commits (or the checkout
//! aborts). A reservation left `Pending` marks a checkout that died between
//! the ledger call and the order insert; a reconciliation job can pick
//! those up and restore the stock.

use chrono::{DateTime, Utc};
use domain::{Money, ProductId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a stock reservation intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(Uuid);

impl ReservationId {
    /// Creates a new random reservation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a reservation ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a reservation intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Written before the ledger reduce; stock may or may not be held.
    Pending,
    /// The order that consumed this reservation was persisted.
    Committed,
    /// The checkout aborted; stock was not reduced (or was restored).
    Aborted,
}

impl ReservationStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "Pending",
            ReservationStatus::Committed => "Committed",
            ReservationStatus::Aborted => "Aborted",
        }
    }
}

/// One product line held by a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Effective price at reservation time; kept for reconciliation reports.
    pub effective_price: Money,
}

/// A stock reservation intent record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReservation {
    pub id: ReservationId,
    pub lines: Vec<ReservationLine>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl StockReservation {
    /// Creates a new pending reservation for the given lines.
    pub fn pending(lines: Vec<ReservationLine>) -> Self {
        Self {
            id: ReservationId::new(),
            lines,
            status: ReservationStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

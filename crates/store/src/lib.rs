//! Persistence layer for the fulfillment system.
//!
//! Provides the [`OrderStore`] and [`PaymentStore`] traits together with
//! in-memory implementations (used in tests and local development) and
//! PostgreSQL implementations backed by `sqlx`.
//!
//! The order store also owns two concerns that exist purely to keep the
//! checkout saga honest:
//! - per-day atomic sequencing of human-readable order codes, and
//! - stock reservation intent records written before the inventory ledger
//!   is mutated, so a crash between the ledger call and the order commit
//!   leaves a detectable trail for reconciliation.

pub mod error;
pub mod memory;
pub mod order;
pub mod payment;
pub mod postgres;
pub mod reservation;

pub use error::{Result, StoreError};
pub use memory::{InMemoryOrderStore, InMemoryPaymentStore};
pub use order::OrderStore;
pub use payment::PaymentStore;
pub use postgres::{PostgresOrderStore, PostgresPaymentStore};
pub use reservation::{ReservationId, ReservationLine, ReservationStatus, StockReservation};

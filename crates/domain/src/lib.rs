//! Domain model for the order fulfillment system.
//!
//! This crate provides the core aggregates and value objects:
//! - Order aggregate with its status state machine
//! - OrderItem value objects (immutable price snapshots)
//! - Payment aggregate with idempotent settlement rules
//! - Domain events published to the message bus

pub mod error;
pub mod events;
pub mod order;
pub mod payment;
pub mod status;
pub mod value_objects;

pub use error::{OrderError, PaymentError};
pub use events::{DomainEvent, Topic};
pub use order::{Order, OrderCode, OrderItem};
pub use payment::{Payment, PaymentStatus};
pub use status::OrderStatus;
pub use value_objects::{Money, ProductId};

//! Shared identifier types used across the fulfillment system.

pub mod types;

pub use types::{OrderId, PaymentId, UserId};

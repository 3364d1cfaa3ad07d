//! Service error types.

use thiserror::Error;

/// Errors returned by external collaborators.
///
/// All variants are communication-shaped: the remote call failed or the
/// remote side refused the operation. Validation of the caller's own input
/// happens before these services are touched.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The stock ledger rejected or failed an operation.
    #[error("Stock ledger error: {0}")]
    Stock(String),

    /// The product catalog rejected or failed an operation.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// The cart service rejected or failed an operation.
    #[error("Cart error: {0}")]
    Cart(String),

    /// The message bus refused the event.
    #[error("Event bus error: {0}")]
    Bus(String),
}

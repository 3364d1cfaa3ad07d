//! Orchestration of the order–payment–inventory saga.
//!
//! The checkout orchestrator turns a cart into an order, committing stock
//! provisionally; the payment orchestrator settles the order against an
//! external gateway and compensates (restores stock) when settlement
//! fails; the lifecycle service owns cancellation, expiry, and the status
//! update surface other services consume.
//!
//! There is no shared transaction across the inventory ledger, the order
//! store, and the gateway. The model is at-least-once with compensation:
//! every check runs before any mutation, stock reductions are preceded by
//! a persisted reservation intent, and compensation is keyed to the first
//! terminal transition of the payment row so duplicate callbacks restore
//! stock exactly once.

pub mod checkout;
pub mod error;
pub mod lifecycle;
pub mod payment;
pub mod signature;

pub use checkout::CheckoutOrchestrator;
pub use error::FulfillmentError;
pub use lifecycle::OrderLifecycle;
pub use payment::{CallbackOutcome, GatewayConfig, PaymentOrchestrator, PaymentRequest};

use domain::DomainEvent;
use services::EventPublisher;

/// Publishes an event, logging failures instead of propagating them.
///
/// Events are a best-effort side channel; a bus outage must never roll
/// back the operation that produced the event.
pub(crate) async fn publish_best_effort<P: EventPublisher>(publisher: &P, event: DomainEvent) {
    let event_type = event.event_type();
    let order_id = event.order_id();
    if let Err(e) = publisher.publish(event).await {
        tracing::warn!(%order_id, event_type, error = %e, "event publish failed");
    }
}

//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// PendingPayment ──► Paid ──► Shipping ──► Delivered ──► Completed
///        │
///        └──► Cancelled
/// ```
///
/// `Completed` and `Cancelled` are terminal. Every transition is validated
/// by [`OrderStatus::can_transition_to`], so the guarantee holds regardless
/// of which caller mutates the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order created, awaiting payment.
    #[default]
    PendingPayment,

    /// Payment confirmed.
    Paid,

    /// Order handed to the carrier.
    Shipping,

    /// Order delivered to the customer.
    Delivered,

    /// Order finished (terminal state).
    Completed,

    /// Order cancelled or expired before payment (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the order may move from this status to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::PendingPayment, OrderStatus::Paid)
                | (OrderStatus::PendingPayment, OrderStatus::Cancelled)
                | (OrderStatus::Paid, OrderStatus::Shipping)
                | (OrderStatus::Shipping, OrderStatus::Delivered)
                | (OrderStatus::Delivered, OrderStatus::Completed)
        )
    }

    /// Returns true if the order can still be cancelled.
    ///
    /// Only orders that have not been paid yet can be cancelled; everything
    /// after payment goes through the return/refund flow, which is out of
    /// this subsystem's hands.
    pub fn can_be_cancelled(&self) -> bool {
        matches!(self, OrderStatus::PendingPayment)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "PendingPayment",
            OrderStatus::Paid => "Paid",
            OrderStatus::Shipping => "Shipping",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending_payment() {
        assert_eq!(OrderStatus::default(), OrderStatus::PendingPayment);
    }

    #[test]
    fn test_happy_path_transitions() {
        assert!(OrderStatus::PendingPayment.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Shipping));
        assert!(OrderStatus::Shipping.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::Completed));
    }

    #[test]
    fn test_cancel_transition_only_from_pending_payment() {
        assert!(OrderStatus::PendingPayment.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipping.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_no_skipping_states() {
        assert!(!OrderStatus::PendingPayment.can_transition_to(OrderStatus::Shipping));
        assert!(!OrderStatus::PendingPayment.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Completed));
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::PendingPayment));
        assert!(!OrderStatus::Shipping.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::PendingPayment));
    }

    #[test]
    fn test_can_be_cancelled() {
        assert!(OrderStatus::PendingPayment.can_be_cancelled());
        assert!(!OrderStatus::Paid.can_be_cancelled());
        assert!(!OrderStatus::Shipping.can_be_cancelled());
        assert!(!OrderStatus::Delivered.can_be_cancelled());
        assert!(!OrderStatus::Completed.can_be_cancelled());
        assert!(!OrderStatus::Cancelled.can_be_cancelled());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderStatus::PendingPayment.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
        assert!(!OrderStatus::Shipping.is_terminal());
        assert!(!OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(OrderStatus::PendingPayment.to_string(), "PendingPayment");
        assert_eq!(OrderStatus::Paid.to_string(), "Paid");
        assert_eq!(OrderStatus::Cancelled.to_string(), "Cancelled");
    }

    #[test]
    fn test_serialization() {
        let status = OrderStatus::Shipping;
        let json = serde_json::to_string(&status).unwrap();
        let deserialized: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, deserialized);
    }
}

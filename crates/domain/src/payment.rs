//! Payment aggregate.

use chrono::{DateTime, Utc};
use common::{OrderId, PaymentId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::PaymentError;
use crate::value_objects::Money;

/// The status of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    /// Payment request issued, awaiting the gateway callback.
    #[default]
    Pending,

    /// Gateway confirmed the charge (terminal for the business fields).
    Completed,

    /// Gateway rejected the charge.
    Failed,
}

impl PaymentStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment record, keyed 1:1 with an order.
///
/// At most one payment row exists per order: a retry resets and reuses the
/// existing row rather than inserting a duplicate. Once completed, the
/// business fields are immutable; a repeated success callback is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub user_id: UserId,
    /// Copied from the order total when the payment is created.
    pub amount: Money,
    pub payment_method: String,
    pub status: PaymentStatus,
    /// Transaction ID reported by the gateway on completion.
    pub transaction_id: Option<String>,
    pub bank_code: Option<String>,
    pub card_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new pending payment for an order.
    pub fn new(order_id: OrderId, user_id: UserId, amount: Money, method: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::new(),
            order_id,
            user_id,
            amount,
            payment_method: method.into(),
            status: PaymentStatus::Pending,
            transaction_id: None,
            bank_code: None,
            card_type: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Resets the record back to `Pending` for a fresh attempt.
    ///
    /// Fails if the payment already completed: a settled payment is never
    /// reopened.
    pub fn reset_for_retry(&mut self, amount: Money, method: impl Into<String>) -> Result<(), PaymentError> {
        if self.status == PaymentStatus::Completed {
            return Err(PaymentError::AlreadyCompleted {
                order_id: self.order_id.to_string(),
            });
        }
        self.status = PaymentStatus::Pending;
        self.amount = amount;
        self.payment_method = method.into();
        self.transaction_id = None;
        self.bank_code = None;
        self.card_type = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Marks the payment completed with the gateway metadata.
    ///
    /// Idempotent: a payment that is already completed keeps its original
    /// transaction metadata and only the audit timestamp moves.
    pub fn mark_completed(
        &mut self,
        transaction_id: Option<String>,
        bank_code: Option<String>,
        card_type: Option<String>,
    ) {
        if self.status != PaymentStatus::Completed {
            self.status = PaymentStatus::Completed;
            self.transaction_id = transaction_id;
            self.bank_code = bank_code;
            self.card_type = card_type;
        }
        self.updated_at = Utc::now();
    }

    /// Marks the payment failed.
    pub fn mark_failed(&mut self) {
        self.status = PaymentStatus::Failed;
        self.updated_at = Utc::now();
    }

    /// Returns true if the payment has completed.
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment() -> Payment {
        Payment::new(OrderId::new(), UserId::new(), Money::from_cents(10000), "CARD")
    }

    #[test]
    fn test_new_payment_is_pending() {
        let p = payment();
        assert_eq!(p.status, PaymentStatus::Pending);
        assert!(p.transaction_id.is_none());
    }

    #[test]
    fn test_mark_completed_is_idempotent() {
        let mut p = payment();
        p.mark_completed(Some("TXN-1".to_string()), Some("NCB".to_string()), None);
        assert!(p.is_completed());
        assert_eq!(p.transaction_id.as_deref(), Some("TXN-1"));

        // Second settlement keeps the first transaction's metadata
        p.mark_completed(Some("TXN-2".to_string()), None, None);
        assert_eq!(p.transaction_id.as_deref(), Some("TXN-1"));
        assert_eq!(p.bank_code.as_deref(), Some("NCB"));
    }

    #[test]
    fn test_reset_for_retry() {
        let mut p = payment();
        p.mark_failed();
        p.reset_for_retry(Money::from_cents(12000), "WALLET").unwrap();
        assert_eq!(p.status, PaymentStatus::Pending);
        assert_eq!(p.amount.cents(), 12000);
        assert_eq!(p.payment_method, "WALLET");
        assert!(p.transaction_id.is_none());
    }

    #[test]
    fn test_completed_payment_cannot_be_reset() {
        let mut p = payment();
        p.mark_completed(Some("TXN-1".to_string()), None, None);
        let err = p
            .reset_for_retry(Money::from_cents(10000), "CARD")
            .unwrap_err();
        assert!(matches!(err, PaymentError::AlreadyCompleted { .. }));
        assert!(p.is_completed());
    }
}

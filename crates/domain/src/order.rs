//! Order aggregate and order item value objects.

use chrono::{DateTime, NaiveDate, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::status::OrderStatus;
use crate::value_objects::{Money, ProductId};

/// Human-readable order code in the form `ORD-YYYYMMDD-NNNN`.
///
/// Codes are unique and the sequence suffix increases monotonically within
/// a calendar day. The sequence itself is owned by the order store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderCode(String);

impl OrderCode {
    /// Formats an order code for the given day and sequence number.
    pub fn format(date: NaiveDate, sequence: u32) -> Self {
        Self(format!("ORD-{}-{:04}", date.format("%Y%m%d"), sequence))
    }

    /// Wraps an already-formatted code (e.g. read back from the database).
    pub fn from_string(code: String) -> Self {
        Self(code)
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An item in an order.
///
/// An immutable snapshot of the product as it was sold: the catalog may
/// change names and prices later, but the order remains the system of
/// record for what was charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The product identifier in the external catalog.
    pub product_id: ProductId,

    /// Product name at the time of purchase.
    pub product_name: String,

    /// Product description at the time of purchase.
    pub description: String,

    /// Product thumbnail URL at the time of purchase.
    pub thumbnail: String,

    /// List price per unit.
    pub unit_price: Money,

    /// Discounted price per unit, if a discount applied.
    pub discount_price: Option<Money>,

    /// Quantity ordered.
    pub quantity: u32,

    /// `effective_price * quantity`, fixed at creation.
    pub subtotal: Money,
}

impl OrderItem {
    /// Creates a new order item, capturing the effective price snapshot.
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        description: impl Into<String>,
        thumbnail: impl Into<String>,
        unit_price: Money,
        discount_price: Option<Money>,
        quantity: u32,
    ) -> Self {
        let effective = discount_price.unwrap_or(unit_price);
        Self {
            product_id,
            product_name: product_name.into(),
            description: description.into(),
            thumbnail: thumbnail.into(),
            unit_price,
            discount_price,
            quantity,
            subtotal: effective.multiply(quantity),
        }
    }

    /// Returns the price actually charged per unit: the discount price if
    /// present, otherwise the list price.
    pub fn effective_price(&self) -> Money {
        self.discount_price.unwrap_or(self.unit_price)
    }
}

/// Order aggregate root.
///
/// Orders are created with status [`OrderStatus::PendingPayment`] and are
/// never deleted; cancellation and expiry are terminal statuses, not
/// removal. All status changes go through [`Order::transition_to`] (or the
/// named shortcuts), which consult the state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    code: OrderCode,
    user_id: UserId,
    status: OrderStatus,
    items: Vec<OrderItem>,
    total_amount: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order in `PendingPayment` status.
    ///
    /// The item list must be non-empty and every quantity positive. The
    /// total is computed here once; nothing else in the system recomputes
    /// it.
    pub fn new(
        id: OrderId,
        code: OrderCode,
        user_id: UserId,
        items: Vec<OrderItem>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        for item in &items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id.as_i64(),
                    quantity: item.quantity,
                });
            }
        }

        let total_amount = items.iter().map(|i| i.subtotal).sum();
        let now = Utc::now();
        Ok(Self {
            id,
            code,
            user_id,
            status: OrderStatus::PendingPayment,
            items,
            total_amount,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitutes an order from persisted state without re-validating.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: OrderId,
        code: OrderCode,
        user_id: UserId,
        status: OrderStatus,
        items: Vec<OrderItem>,
        total_amount: Money,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            code,
            user_id,
            status,
            items,
            total_amount,
            created_at,
            updated_at,
        }
    }

    /// Returns the order ID.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the human-readable order code.
    pub fn code(&self) -> &OrderCode {
        &self.code
    }

    /// Returns the owning user.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the items in the order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns the order total.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last-update timestamp.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if `user_id` owns this order.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Returns true if the order can still be cancelled.
    pub fn can_be_cancelled(&self) -> bool {
        self.status.can_be_cancelled()
    }

    /// Moves the order to `next`, rejecting illegal transitions.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Marks the order as paid.
    pub fn mark_as_paid(&mut self) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Paid)
    }

    /// Cancels the order.
    ///
    /// Fails unless the order is still awaiting payment.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.can_be_cancelled() {
            return Err(OrderError::NotCancellable {
                status: self.status,
            });
        }
        self.transition_to(OrderStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: i64, quantity: u32, price_cents: i64) -> OrderItem {
        OrderItem::new(
            ProductId::new(product_id),
            format!("Product {product_id}"),
            "A product",
            "https://img.example/p.png",
            Money::from_cents(price_cents),
            None,
            quantity,
        )
    }

    fn order_with(items: Vec<OrderItem>) -> Order {
        Order::new(
            OrderId::new(),
            OrderCode::format(NaiveDate::from_ymd_opt(2026, 8, 30).unwrap(), 1),
            UserId::new(),
            items,
        )
        .unwrap()
    }

    #[test]
    fn test_order_code_format() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert_eq!(OrderCode::format(date, 7).as_str(), "ORD-20260830-0007");
        assert_eq!(OrderCode::format(date, 1234).as_str(), "ORD-20260830-1234");
    }

    #[test]
    fn test_item_subtotal_uses_effective_price() {
        let plain = item(10, 2, 5000);
        assert_eq!(plain.effective_price().cents(), 5000);
        assert_eq!(plain.subtotal.cents(), 10000);

        let discounted = OrderItem::new(
            ProductId::new(11),
            "Product 11",
            "",
            "",
            Money::from_cents(5000),
            Some(Money::from_cents(4000)),
            3,
        );
        assert_eq!(discounted.effective_price().cents(), 4000);
        assert_eq!(discounted.subtotal.cents(), 12000);
    }

    #[test]
    fn test_total_is_sum_of_subtotals() {
        let order = order_with(vec![item(10, 2, 5000), item(11, 1, 2500)]);
        assert_eq!(order.total_amount().cents(), 12500);
        let sum: Money = order.items().iter().map(|i| i.subtotal).sum();
        assert_eq!(order.total_amount(), sum);
    }

    #[test]
    fn test_empty_order_rejected() {
        let result = Order::new(
            OrderId::new(),
            OrderCode::from_string("ORD-20260830-0001".to_string()),
            UserId::new(),
            vec![],
        );
        assert_eq!(result.unwrap_err(), OrderError::NoItems);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let result = Order::new(
            OrderId::new(),
            OrderCode::from_string("ORD-20260830-0001".to_string()),
            UserId::new(),
            vec![item(10, 0, 5000)],
        );
        assert!(matches!(
            result.unwrap_err(),
            OrderError::InvalidQuantity { product_id: 10, .. }
        ));
    }

    #[test]
    fn test_new_order_is_pending_payment() {
        let order = order_with(vec![item(10, 1, 100)]);
        assert_eq!(order.status(), OrderStatus::PendingPayment);
        assert!(order.can_be_cancelled());
    }

    #[test]
    fn test_mark_as_paid() {
        let mut order = order_with(vec![item(10, 1, 100)]);
        order.mark_as_paid().unwrap();
        assert_eq!(order.status(), OrderStatus::Paid);

        // Paying twice is an illegal transition
        assert!(matches!(
            order.mark_as_paid(),
            Err(OrderError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_cancel_only_while_pending() {
        let mut order = order_with(vec![item(10, 1, 100)]);
        order.cancel().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);

        let mut paid = order_with(vec![item(10, 1, 100)]);
        paid.mark_as_paid().unwrap();
        assert_eq!(
            paid.cancel(),
            Err(OrderError::NotCancellable {
                status: OrderStatus::Paid
            })
        );
        assert_eq!(paid.status(), OrderStatus::Paid);
    }

    #[test]
    fn test_full_lifecycle() {
        let mut order = order_with(vec![item(10, 1, 100)]);
        order.transition_to(OrderStatus::Paid).unwrap();
        order.transition_to(OrderStatus::Shipping).unwrap();
        order.transition_to(OrderStatus::Delivered).unwrap();
        order.transition_to(OrderStatus::Completed).unwrap();
        assert!(order.status().is_terminal());

        assert!(order.transition_to(OrderStatus::Shipping).is_err());
    }

    #[test]
    fn test_ownership() {
        let user = UserId::new();
        let order = Order::new(
            OrderId::new(),
            OrderCode::from_string("ORD-20260830-0001".to_string()),
            user,
            vec![item(10, 1, 100)],
        )
        .unwrap();
        assert!(order.is_owned_by(user));
        assert!(!order.is_owned_by(UserId::new()));
    }
}

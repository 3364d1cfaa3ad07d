//! Domain events published to the message bus.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::status::OrderStatus;
use crate::value_objects::Money;

/// Topic a domain event is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// Order lifecycle events.
    Orders,
    /// Payment settlement events.
    Payments,
}

impl Topic {
    /// Returns the topic name on the bus.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Orders => "order-events",
            Topic::Payments => "payment-events",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events emitted by the fulfillment core.
///
/// Every event carries the order id, the owning user, the order amount,
/// and the time it happened. Delivery is fire-and-forget; consumers
/// (notification, analytics) must tolerate at-least-once delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    OrderCreated {
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    /// Order cancelled by its owner; notifies both the user and admins.
    OrderCancelled {
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    /// Order expired without payment; notifies the user only.
    OrderExpired {
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    OrderStatusUpdated {
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        status: OrderStatus,
        timestamp: DateTime<Utc>,
    },
    PaymentCompleted {
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentFailed {
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Returns the event type tag as published on the bus.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::OrderCreated { .. } => "ORDER_CREATED",
            DomainEvent::OrderCancelled { .. } => "ORDER_CANCELLED",
            DomainEvent::OrderExpired { .. } => "ORDER_EXPIRED",
            DomainEvent::OrderStatusUpdated { .. } => "ORDER_STATUS_UPDATED",
            DomainEvent::PaymentCompleted { .. } => "PAYMENT_COMPLETED",
            DomainEvent::PaymentFailed { .. } => "PAYMENT_FAILED",
        }
    }

    /// Returns the topic this event is routed to.
    pub fn topic(&self) -> Topic {
        match self {
            DomainEvent::OrderCreated { .. }
            | DomainEvent::OrderCancelled { .. }
            | DomainEvent::OrderExpired { .. }
            | DomainEvent::OrderStatusUpdated { .. } => Topic::Orders,
            DomainEvent::PaymentCompleted { .. } | DomainEvent::PaymentFailed { .. } => {
                Topic::Payments
            }
        }
    }

    /// Returns the order the event refers to.
    pub fn order_id(&self) -> OrderId {
        match self {
            DomainEvent::OrderCreated { order_id, .. }
            | DomainEvent::OrderCancelled { order_id, .. }
            | DomainEvent::OrderExpired { order_id, .. }
            | DomainEvent::OrderStatusUpdated { order_id, .. }
            | DomainEvent::PaymentCompleted { order_id, .. }
            | DomainEvent::PaymentFailed { order_id, .. } => *order_id,
        }
    }
}

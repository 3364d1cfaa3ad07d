//! Event publisher trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::DomainEvent;

use crate::error::ServiceError;

/// Client for the message bus carrying domain events.
///
/// Publication is a best-effort notification side channel, not part of the
/// consistency boundary: callers log a failed publish and move on, never
/// rolling back the local transaction that produced the event.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes an event to its topic.
    async fn publish(&self, event: DomainEvent) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryPublisherState {
    published: Vec<DomainEvent>,
    fail_on_publish: bool,
}

/// In-memory event publisher that records everything it is handed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    state: Arc<RwLock<InMemoryPublisherState>>,
}

impl InMemoryEventPublisher {
    /// Creates a new in-memory publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every event published so far, in order.
    pub fn published(&self) -> Vec<DomainEvent> {
        self.state.read().unwrap().published.clone()
    }

    /// Returns how many events of the given type were published.
    pub fn count_of(&self, event_type: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .published
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    /// Configures the publisher to fail.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().unwrap().fail_on_publish = fail;
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: DomainEvent) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_publish {
            return Err(ServiceError::Bus("message bus unavailable".to_string()));
        }
        state.published.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{OrderId, UserId};
    use domain::Money;

    fn event() -> DomainEvent {
        DomainEvent::OrderCreated {
            order_id: OrderId::new(),
            user_id: UserId::new(),
            amount: Money::from_cents(100),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_records_events() {
        let publisher = InMemoryEventPublisher::new();
        publisher.publish(event()).await.unwrap();
        publisher.publish(event()).await.unwrap();

        assert_eq!(publisher.published().len(), 2);
        assert_eq!(publisher.count_of("ORDER_CREATED"), 2);
        assert_eq!(publisher.count_of("PAYMENT_FAILED"), 0);
    }

    #[tokio::test]
    async fn test_fail_on_publish() {
        let publisher = InMemoryEventPublisher::new();
        publisher.set_fail_on_publish(true);
        assert!(publisher.publish(event()).await.is_err());
        assert!(publisher.published().is_empty());
    }
}

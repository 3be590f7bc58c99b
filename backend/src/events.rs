//! Process-wide domain event broadcasting
//!
//! The broadcaster is an explicit dependency injected through `AppState`
//! rather than a module-level global, so services can be tested with their
//! own instance and multiple server instances do not share channels.
//! Delivery is at-least-once to currently connected subscribers; nothing is
//! persisted or replayed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use shared::models::{AlertType, ProductCategory, StockStatus};

/// Read-only product projection attached to alert events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductProjection {
    pub id: Uuid,
    pub name: String,
    pub category: ProductCategory,
    pub stock: i32,
    pub min_stock: i32,
    pub expiry_date: DateTime<Utc>,
}

/// Events published by the core services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum DomainEvent {
    #[serde(rename = "product:created")]
    ProductCreated { product_id: Uuid },

    #[serde(rename = "product:updated")]
    ProductUpdated { product_id: Uuid, status: StockStatus },

    #[serde(rename = "product:deleted")]
    ProductDeleted { product_id: Uuid },

    #[serde(rename = "alert:new")]
    AlertNew {
        alert_id: Uuid,
        alert_type: AlertType,
        message: String,
        product: ProductProjection,
    },

    #[serde(rename = "transaction:created")]
    TransactionCreated {
        transaction_id: String,
        product_id: Uuid,
        new_stock: i32,
    },

    #[serde(rename = "collection:new")]
    CollectionNew {
        transaction_id: String,
        supplier_id: Uuid,
        total: Decimal,
    },

    #[serde(rename = "qr:generated")]
    QrGenerated {
        transaction_id: String,
        expires_at: DateTime<Utc>,
    },

    #[serde(rename = "payment:completed")]
    PaymentCompleted {
        transaction_id: String,
        amount: Decimal,
    },
}

impl DomainEvent {
    /// Event name as exposed on the SSE stream
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::ProductCreated { .. } => "product:created",
            DomainEvent::ProductUpdated { .. } => "product:updated",
            DomainEvent::ProductDeleted { .. } => "product:deleted",
            DomainEvent::AlertNew { .. } => "alert:new",
            DomainEvent::TransactionCreated { .. } => "transaction:created",
            DomainEvent::CollectionNew { .. } => "collection:new",
            DomainEvent::QrGenerated { .. } => "qr:generated",
            DomainEvent::PaymentCompleted { .. } => "payment:completed",
        }
    }
}

/// Fan-out broadcaster over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Publishing never fails the caller; with no subscribers connected the
    /// event is simply dropped.
    pub fn publish(&self, event: DomainEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!("Published {} to {} subscriber(s)", name, receivers);
            }
            Err(_) => {
                tracing::debug!("Published {} with no subscribers", name);
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn published_events_reach_subscribers() {
        let broadcaster = EventBroadcaster::new(16);
        let mut rx = broadcaster.subscribe();

        let product_id = Uuid::new_v4();
        broadcaster.publish(DomainEvent::ProductCreated { product_id });

        match rx.recv().await.unwrap() {
            DomainEvent::ProductCreated { product_id: got } => assert_eq!(got, product_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let broadcaster = EventBroadcaster::new(16);
        broadcaster.publish(DomainEvent::ProductDeleted {
            product_id: Uuid::new_v4(),
        });
    }

    #[test]
    fn event_names_match_wire_format() {
        let event = DomainEvent::PaymentCompleted {
            transaction_id: "PAY-1".to_string(),
            amount: Decimal::ZERO,
        };
        assert_eq!(event.name(), "payment:completed");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "payment:completed");
    }
}

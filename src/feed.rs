//! Public event feed
//!
//! Push-based subscription channel for auction state changes. Every
//! committed price change, deadline extension, and terminal transition
//! is published here so clients never need to poll on a tight loop.
//! Lagging receivers drop oldest events rather than blocking the engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Public transaction-log events visible to all clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuctionEvent {
    ItemQueued {
        item_id: Uuid,
        asset_name: String,
        starting_price: Decimal,
    },
    ItemActivated {
        item_id: Uuid,
        deadline: DateTime<Utc>,
    },
    BidAccepted {
        item_id: Uuid,
        bidder_id: Uuid,
        /// Bidder displaced from the lead, for outbid notification
        outbid: Option<Uuid>,
        amount: Decimal,
        sequence: u64,
    },
    DeadlineExtended {
        item_id: Uuid,
        deadline: DateTime<Utc>,
    },
    ItemSettled {
        item_id: Uuid,
        winner: Uuid,
        price: Decimal,
        salary: Decimal,
    },
    ItemCancelled {
        item_id: Uuid,
    },
    ItemFailed {
        item_id: Uuid,
        winner: Uuid,
        price: Decimal,
        reason: String,
    },
}

impl AuctionEvent {
    pub fn item_id(&self) -> Uuid {
        match self {
            AuctionEvent::ItemQueued { item_id, .. }
            | AuctionEvent::ItemActivated { item_id, .. }
            | AuctionEvent::BidAccepted { item_id, .. }
            | AuctionEvent::DeadlineExtended { item_id, .. }
            | AuctionEvent::ItemSettled { item_id, .. }
            | AuctionEvent::ItemCancelled { item_id }
            | AuctionEvent::ItemFailed { item_id, .. } => *item_id,
        }
    }
}

/// Broadcast fan-out of auction events
#[derive(Debug, Clone)]
pub struct EventFeed {
    sender: broadcast::Sender<AuctionEvent>,
}

impl EventFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to the live event stream
    pub fn subscribe(&self) -> broadcast::Receiver<AuctionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; a send with no subscribers is not an error
    pub fn publish(&self, event: AuctionEvent) {
        debug!(item_id = %event.item_id(), "publishing {:?}", event);
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let feed = EventFeed::new(8);
        let mut rx = feed.subscribe();

        let item_id = Uuid::new_v4();
        feed.publish(AuctionEvent::ItemCancelled { item_id });

        let event = rx.recv().await.unwrap();
        assert_eq!(event, AuctionEvent::ItemCancelled { item_id });
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let feed = EventFeed::new(8);
        feed.publish(AuctionEvent::ItemQueued {
            item_id: Uuid::new_v4(),
            asset_name: "Player".to_string(),
            starting_price: dec!(1_000_000),
        });
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = AuctionEvent::DeadlineExtended {
            item_id: Uuid::new_v4(),
            deadline: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "deadline_extended");
    }
}

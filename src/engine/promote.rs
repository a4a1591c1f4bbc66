//! Slot promotion: moving queued items into the bounded active set

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::AuctionState;
use crate::engine::board::AuctionBoard;
use crate::engine::queue::AuctionQueue;
use crate::error::Result;
use crate::feed::{AuctionEvent, EventFeed};

pub struct SlotPromoter {
    board: Arc<AuctionBoard>,
    queue: Arc<AuctionQueue>,
    feed: EventFeed,
    active_slots: usize,
    duration: chrono::Duration,
    /// Serializes fill runs; the capacity check and the activations it
    /// admits must be one critical section or two concurrent callers
    /// can both see a free slot and overfill the cap
    gate: Mutex<()>,
}

impl SlotPromoter {
    pub fn new(
        board: Arc<AuctionBoard>,
        queue: Arc<AuctionQueue>,
        feed: EventFeed,
        active_slots: usize,
        duration_secs: u64,
    ) -> Self {
        Self {
            board,
            queue,
            feed,
            active_slots,
            duration: chrono::Duration::seconds(duration_secs as i64),
            gate: Mutex::new(()),
        }
    }

    /// Fill free active slots from the head of the backlog, FIFO.
    /// Idempotent: the Queued -> Active state guard means an item can
    /// only ever be promoted once, and the gate bounds the total so
    /// concurrent callers never exceed the slot cap.
    pub async fn promote_if_capacity(&self) -> Result<Vec<Uuid>> {
        let _gate = self.gate.lock().await;

        // Counted once under the gate; everything activated below is
        // tracked in `promoted`, so a re-count would double-count
        let active = self.board.count_in_state(AuctionState::Active).await;
        let mut promoted = Vec::new();

        while active + promoted.len() < self.active_slots {
            let Some(item_id) = self.queue.pop_next().await else {
                break;
            };

            match self.activate(item_id).await {
                Ok(deadline) => {
                    info!(%item_id, %deadline, "promoted into active slot");
                    self.feed
                        .publish(AuctionEvent::ItemActivated { item_id, deadline });
                    promoted.push(item_id);
                }
                Err(e) => {
                    // Queue can momentarily hold an id whose item was
                    // cancelled; skip it and keep filling
                    warn!(%item_id, "skipping promotion: {e}");
                }
            }
        }

        Ok(promoted)
    }

    async fn activate(&self, item_id: Uuid) -> Result<chrono::DateTime<Utc>> {
        let item = self.board.get(item_id)?;
        let mut guard = item.write().await;
        let now = Utc::now();
        guard.activate(now, self.duration)?;
        Ok(now + self.duration)
    }
}

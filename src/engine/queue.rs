//! Pending backlog of auction items awaiting an active slot

use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{GavelError, Result};

#[derive(Debug, Default)]
struct QueueInner {
    backlog: VecDeque<Uuid>,
    enqueued_count: u64,
    promoted_count: u64,
    removed_count: u64,
}

/// FIFO backlog; order only changes through explicit admin reprioritization
#[derive(Debug, Default)]
pub struct AuctionQueue {
    inner: Mutex<QueueInner>,
}

impl AuctionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item id to the tail of the backlog
    pub async fn enqueue(&self, item_id: Uuid) {
        let mut inner = self.inner.lock().await;
        debug!(%item_id, position = inner.backlog.len(), "enqueued");
        inner.backlog.push_back(item_id);
        inner.enqueued_count += 1;
    }

    /// Pop the head item for promotion
    pub async fn pop_next(&self) -> Option<Uuid> {
        let mut inner = self.inner.lock().await;
        let next = inner.backlog.pop_front();
        if next.is_some() {
            inner.promoted_count += 1;
        }
        next
    }

    /// Remove an item from the backlog (admin cancel before promotion)
    pub async fn remove(&self, item_id: Uuid) -> bool {
        let mut inner = self.inner.lock().await;
        let before = inner.backlog.len();
        inner.backlog.retain(|id| *id != item_id);
        let removed = inner.backlog.len() < before;
        if removed {
            inner.removed_count += 1;
        }
        removed
    }

    /// Move an item to `position` in the backlog (admin-only)
    pub async fn reprioritize(&self, item_id: Uuid, position: usize) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let current = inner
            .backlog
            .iter()
            .position(|id| *id == item_id)
            .ok_or_else(|| GavelError::Queue(format!("item {item_id} is not queued")))?;

        inner.backlog.remove(current);
        let target = position.min(inner.backlog.len());
        inner.backlog.insert(target, item_id);
        debug!(%item_id, from = current, to = target, "reprioritized");
        Ok(())
    }

    pub async fn contains(&self, item_id: Uuid) -> bool {
        self.inner.lock().await.backlog.contains(&item_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.backlog.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.backlog.is_empty()
    }

    /// Backlog ids in promotion order
    pub async fn pending(&self) -> Vec<Uuid> {
        self.inner.lock().await.backlog.iter().copied().collect()
    }

    pub async fn stats(&self) -> QueueStats {
        let inner = self.inner.lock().await;
        QueueStats {
            current_size: inner.backlog.len(),
            enqueued_total: inner.enqueued_count,
            promoted_total: inner.promoted_count,
            removed_total: inner.removed_count,
        }
    }
}

/// Queue statistics
#[derive(Debug, Clone)]
pub struct QueueStats {
    pub current_size: usize,
    pub enqueued_total: u64,
    pub promoted_total: u64,
    pub removed_total: u64,
}

impl std::fmt::Display for QueueStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Queue[{}, enq={}, prom={}, rem={}]",
            self.current_size, self.enqueued_total, self.promoted_total, self.removed_total
        )
    }
}

//! Auction board: the shared store of live auction items
//!
//! Each item sits behind its own `RwLock`, so the mutable per-item
//! triple (price, leader, deadline) has exactly one writer at a time
//! while snapshots stay cheap for readers.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{AuctionItem, AuctionState, ItemSnapshot};
use crate::error::{GavelError, Result};

#[derive(Debug, Default)]
pub struct AuctionBoard {
    items: DashMap<Uuid, Arc<RwLock<AuctionItem>>>,
}

impl AuctionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new item; returns its id
    pub fn insert(&self, item: AuctionItem) -> Uuid {
        let id = item.id;
        self.items.insert(id, Arc::new(RwLock::new(item)));
        id
    }

    /// Handle to an item's lock, for callers that need to mutate
    pub fn get(&self, id: Uuid) -> Result<Arc<RwLock<AuctionItem>>> {
        self.items
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(GavelError::ItemNotFound(id))
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<ItemSnapshot> {
        let item = self.get(id)?;
        let guard = item.read().await;
        Ok(guard.snapshot())
    }

    /// Snapshots of all Active items, in creation order, at most `limit`
    pub async fn active_snapshots(&self, limit: usize) -> Vec<ItemSnapshot> {
        let handles: Vec<_> = self.items.iter().map(|e| e.value().clone()).collect();

        let mut snapshots = Vec::new();
        for handle in handles {
            let guard = handle.read().await;
            if guard.state == AuctionState::Active {
                snapshots.push(guard.snapshot());
            }
        }
        snapshots.sort_by_key(|s| s.created_at);
        snapshots.truncate(limit);
        snapshots
    }

    pub async fn count_in_state(&self, state: AuctionState) -> usize {
        let handles: Vec<_> = self.items.iter().map(|e| e.value().clone()).collect();

        let mut count = 0;
        for handle in handles {
            if handle.read().await.state == state {
                count += 1;
            }
        }
        count
    }

    /// Ids of Active items whose deadline has elapsed
    pub async fn expired_active(&self, now: DateTime<Utc>, limit: usize) -> Vec<Uuid> {
        let handles: Vec<_> = self.items.iter().map(|e| e.value().clone()).collect();

        let mut expired = Vec::new();
        for handle in handles {
            let guard = handle.read().await;
            if guard.state == AuctionState::Active && guard.is_expired(now) {
                expired.push(guard.id);
                if expired.len() >= limit {
                    break;
                }
            }
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetDescriptor, ItemSeed};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn seeded_item(name: &str) -> AuctionItem {
        AuctionItem::new(ItemSeed {
            asset: AssetDescriptor {
                name: name.to_string(),
                category: "MF".to_string(),
                quality: 75,
                nationality: "ES".to_string(),
                media_ref: None,
            },
            starting_price: dec!(1_000_000),
        })
    }

    #[tokio::test]
    async fn test_insert_and_snapshot() {
        let board = AuctionBoard::new();
        let id = board.insert(seeded_item("A"));

        let snapshot = board.snapshot(id).await.unwrap();
        assert_eq!(snapshot.id, id);
        assert_eq!(snapshot.state, AuctionState::Queued);
    }

    #[tokio::test]
    async fn test_get_unknown_item() {
        let board = AuctionBoard::new();
        assert!(matches!(
            board.get(Uuid::new_v4()),
            Err(GavelError::ItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_active_snapshots_ordered_and_bounded() {
        let board = AuctionBoard::new();
        let now = Utc::now();

        let mut ids = Vec::new();
        for (i, name) in ["A", "B", "C", "D"].iter().enumerate() {
            let mut item = seeded_item(name);
            // Explicit creation order so the sort is deterministic
            item.created_at = now + Duration::milliseconds(i as i64);
            item.activate(now, Duration::seconds(60)).unwrap();
            ids.push(board.insert(item));
        }

        let active = board.active_snapshots(3).await;
        assert_eq!(active.len(), 3);
        assert_eq!(active[0].id, ids[0]);
        assert_eq!(active[2].id, ids[2]);
    }

    #[tokio::test]
    async fn test_expired_active_only_returns_elapsed() {
        let board = AuctionBoard::new();
        let now = Utc::now();

        let mut fresh = seeded_item("fresh");
        fresh.activate(now, Duration::seconds(60)).unwrap();
        board.insert(fresh);

        let mut stale = seeded_item("stale");
        stale.activate(now - Duration::seconds(120), Duration::seconds(60)).unwrap();
        let stale_id = board.insert(stale);

        let expired = board.expired_active(now, 10).await;
        assert_eq!(expired, vec![stale_id]);
    }
}

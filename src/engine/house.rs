//! Auction house facade
//!
//! Owns the board, queue, bid engine, settlement engine, and sweeper,
//! and exposes the admin and client surfaces. All engine calls take
//! explicit caller identity; there is no ambient session state.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::{AuctionItem, AuctionState, BidReceipt, ItemSeed, ItemSnapshot, SettlementOutcome};
use crate::engine::bids::BidEngine;
use crate::engine::board::AuctionBoard;
use crate::engine::promote::SlotPromoter;
use crate::engine::queue::{AuctionQueue, QueueStats};
use crate::engine::settlement::SettlementEngine;
use crate::engine::sweeper::{ExpirySweeper, SweeperStats};
use crate::error::{BidError, GavelError, Result};
use crate::feed::{AuctionEvent, EventFeed};
use crate::ports::{AuditLog, BalanceLedger, RosterService};

pub struct AuctionHouse {
    config: AppConfig,
    board: Arc<AuctionBoard>,
    queue: Arc<AuctionQueue>,
    feed: EventFeed,
    bids: BidEngine,
    settlement: Arc<SettlementEngine>,
    promoter: Arc<SlotPromoter>,
    sweeper: Arc<ExpirySweeper>,
}

impl AuctionHouse {
    pub fn new(
        config: AppConfig,
        ledger: Arc<dyn BalanceLedger>,
        roster: Arc<dyn RosterService>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        let board = Arc::new(AuctionBoard::new());
        let queue = Arc::new(AuctionQueue::new());
        let feed = EventFeed::default();

        let bids = BidEngine::new(
            &config,
            board.clone(),
            ledger.clone(),
            audit.clone(),
            feed.clone(),
        );
        let settlement = Arc::new(SettlementEngine::new(
            board.clone(),
            ledger,
            roster,
            audit,
            feed.clone(),
        ));
        let promoter = Arc::new(SlotPromoter::new(
            board.clone(),
            queue.clone(),
            feed.clone(),
            config.auction.active_slots,
            config.auction.duration_secs,
        ));
        let sweeper = Arc::new(ExpirySweeper::new(
            board.clone(),
            settlement.clone(),
            promoter.clone(),
            config.sweeper.clone(),
        ));

        Self {
            config,
            board,
            queue,
            feed,
            bids,
            settlement,
            promoter,
            sweeper,
        }
    }

    // === Admin surface ===

    /// Seed a new item into the pending backlog and fill any free slot
    pub async fn seed(&self, seed: ItemSeed) -> Result<Uuid> {
        if seed.asset.name.trim().is_empty() {
            return Err(GavelError::Validation("asset name is empty".to_string()));
        }
        if seed.starting_price <= Decimal::ZERO {
            return Err(GavelError::Validation(
                "starting price must be positive".to_string(),
            ));
        }

        let asset_name = seed.asset.name.clone();
        let starting_price = seed.starting_price;
        let item = AuctionItem::new(seed);
        let item_id = self.board.insert(item);
        self.queue.enqueue(item_id).await;

        info!(%item_id, asset = %asset_name, %starting_price, "item seeded");
        self.feed.publish(AuctionEvent::ItemQueued {
            item_id,
            asset_name,
            starting_price,
        });

        self.promoter.promote_if_capacity().await?;
        Ok(item_id)
    }

    /// Force an Active item to end now and settle it
    pub async fn manual_close(&self, item_id: Uuid) -> Result<SettlementOutcome> {
        {
            let item = self.board.get(item_id)?;
            let mut guard = item.write().await;
            if guard.state != AuctionState::Active {
                return Err(GavelError::UnexpectedState(format!(
                    "manual close requires an active item, found {}",
                    guard.state
                )));
            }
            guard.deadline = Some(Utc::now());
            guard.transition_to(AuctionState::Ended)?;
            info!(%item_id, "manually closed");
        }

        let outcome = self.settlement.settle(item_id).await?;
        self.promoter.promote_if_capacity().await?;
        Ok(outcome)
    }

    /// Cancel an item that has attracted no commitment yet: a Queued
    /// item is removed from the backlog; an Active item without bids is
    /// closed to Cancelled. An Active item with a leader is refused —
    /// the accepted bid is a commitment; use `manual_close` instead.
    pub async fn cancel(&self, item_id: Uuid) -> Result<()> {
        let item = self.board.get(item_id)?;

        {
            let mut guard = item.write().await;
            match guard.state {
                AuctionState::Queued => {
                    guard.transition_to(AuctionState::Cancelled)?;
                    guard.outcome = Some(SettlementOutcome::NoBids);
                }
                AuctionState::Active if guard.leader.is_none() => {
                    guard.transition_to(AuctionState::Ended)?;
                }
                ref state => {
                    return Err(GavelError::UnexpectedState(format!(
                        "cannot cancel item in state {state}{}",
                        if guard.leader.is_some() {
                            " with an accepted bid"
                        } else {
                            ""
                        }
                    )));
                }
            }
        }

        self.queue.remove(item_id).await;

        // An ex-Active item goes through settlement, which lands it in
        // Cancelled (it has no bids) and publishes the event
        let snapshot = self.board.snapshot(item_id).await?;
        if snapshot.state == AuctionState::Ended {
            self.settlement.settle(item_id).await?;
            self.promoter.promote_if_capacity().await?;
        } else {
            self.feed.publish(AuctionEvent::ItemCancelled { item_id });
        }

        info!(%item_id, "cancelled");
        Ok(())
    }

    /// Reorder the pending backlog (admin-only)
    pub async fn reprioritize_queue(&self, item_id: Uuid, position: usize) -> Result<()> {
        self.queue.reprioritize(item_id, position).await
    }

    // === Bidding surface ===

    pub async fn place_bid(
        &self,
        bidder_id: Uuid,
        item_id: Uuid,
        amount: Decimal,
    ) -> std::result::Result<BidReceipt, BidError> {
        self.bids.place_bid(bidder_id, item_id, amount).await
    }

    // === Client query surface ===

    /// Currently biddable items, creation order, bounded by the slot cap
    pub async fn active_items(&self) -> Vec<ItemSnapshot> {
        self.board
            .active_snapshots(self.config.auction.active_slots)
            .await
    }

    pub async fn item(&self, item_id: Uuid) -> Result<ItemSnapshot> {
        self.board.snapshot(item_id).await
    }

    /// Push-based subscription to every auction event
    pub fn subscribe(&self) -> broadcast::Receiver<AuctionEvent> {
        self.feed.subscribe()
    }

    // === Operations ===

    pub fn start_sweeper(&self) {
        self.sweeper.start();
    }

    pub fn stop_sweeper(&self) {
        self.sweeper.stop();
    }

    /// Drive one sweep cycle synchronously (operator tooling and tests)
    pub async fn sweep_now(&self) -> Result<()> {
        self.sweeper.sweep_cycle().await
    }

    pub async fn queue_stats(&self) -> QueueStats {
        self.queue.stats().await
    }

    pub async fn sweeper_stats(&self) -> SweeperStats {
        self.sweeper.get_stats().await
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryAuditLog, InMemoryLedger, InMemoryRoster};
    use crate::domain::AssetDescriptor;
    use rust_decimal_macros::dec;

    fn seed(name: &str, price: Decimal) -> ItemSeed {
        ItemSeed {
            asset: AssetDescriptor {
                name: name.to_string(),
                category: "MF".to_string(),
                quality: 77,
                nationality: "UY".to_string(),
                media_ref: None,
            },
            starting_price: price,
        }
    }

    fn house() -> (AuctionHouse, Arc<InMemoryLedger>) {
        let mut config = AppConfig::default_config();
        config.auction.bid_cooldown_ms = 0;
        let ledger = Arc::new(InMemoryLedger::new());
        let house = AuctionHouse::new(
            config,
            ledger.clone(),
            Arc::new(InMemoryRoster::new()),
            Arc::new(InMemoryAuditLog::new()),
        );
        (house, ledger)
    }

    #[tokio::test]
    async fn test_seed_promotes_into_free_slots() {
        let (house, _) = house();

        for i in 0..5 {
            house
                .seed(seed(&format!("P{i}"), dec!(1_000_000)))
                .await
                .unwrap();
        }

        // Three slots active, two still queued
        assert_eq!(house.active_items().await.len(), 3);
        assert_eq!(house.queue_stats().await.current_size, 2);
    }

    #[tokio::test]
    async fn test_seed_rejects_invalid_items() {
        let (house, _) = house();

        assert!(house.seed(seed("", dec!(1_000_000))).await.is_err());
        assert!(house.seed(seed("P", dec!(0))).await.is_err());
    }

    #[tokio::test]
    async fn test_manual_close_settles_and_refills() {
        let (house, ledger) = house();
        let bidder = Uuid::new_v4();
        ledger.set_balance(bidder, dec!(10_000_000));

        let mut ids = Vec::new();
        for i in 0..4 {
            ids.push(house.seed(seed(&format!("P{i}"), dec!(1_000_000))).await.unwrap());
        }

        house
            .place_bid(bidder, ids[0], dec!(2_000_000))
            .await
            .unwrap();
        let outcome = house.manual_close(ids[0]).await.unwrap();
        assert!(matches!(outcome, SettlementOutcome::Sold { .. }));

        // The queued fourth item took the freed slot
        let active = house.active_items().await;
        assert_eq!(active.len(), 3);
        assert!(active.iter().any(|s| s.id == ids[3]));
    }

    #[tokio::test]
    async fn test_manual_close_requires_active() {
        let (house, _) = house();
        let mut ids = Vec::new();
        for i in 0..4 {
            ids.push(house.seed(seed(&format!("P{i}"), dec!(1_000_000))).await.unwrap());
        }

        // ids[3] is still queued
        assert!(house.manual_close(ids[3]).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_queued_item() {
        let (house, _) = house();
        let mut ids = Vec::new();
        for i in 0..4 {
            ids.push(house.seed(seed(&format!("P{i}"), dec!(1_000_000))).await.unwrap());
        }

        house.cancel(ids[3]).await.unwrap();

        let snapshot = house.item(ids[3]).await.unwrap();
        assert_eq!(snapshot.state, AuctionState::Cancelled);
        assert_eq!(house.queue_stats().await.current_size, 0);
    }

    #[tokio::test]
    async fn test_cancel_active_item_without_bids() {
        let (house, _) = house();
        let id = house.seed(seed("P", dec!(1_000_000))).await.unwrap();

        house.cancel(id).await.unwrap();

        let snapshot = house.item(id).await.unwrap();
        assert_eq!(snapshot.state, AuctionState::Cancelled);
        assert!(house.active_items().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_refused_once_a_bid_exists() {
        let (house, ledger) = house();
        let bidder = Uuid::new_v4();
        ledger.set_balance(bidder, dec!(10_000_000));

        let id = house.seed(seed("P", dec!(1_000_000))).await.unwrap();
        house.place_bid(bidder, id, dec!(2_000_000)).await.unwrap();

        let err = house.cancel(id).await.unwrap_err();
        assert!(matches!(err, GavelError::UnexpectedState(_)));
        assert_eq!(
            house.item(id).await.unwrap().state,
            AuctionState::Active
        );
    }

    #[tokio::test]
    async fn test_reprioritize_changes_promotion_order() {
        let (house, _) = house();
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(house.seed(seed(&format!("P{i}"), dec!(1_000_000))).await.unwrap());
        }

        // Backlog holds ids[3], ids[4]; move ids[4] to the front, then
        // free a slot
        house.reprioritize_queue(ids[4], 0).await.unwrap();
        house.manual_close(ids[0]).await.unwrap();

        let active = house.active_items().await;
        assert!(active.iter().any(|s| s.id == ids[4]));
        assert!(!active.iter().any(|s| s.id == ids[3]));
    }

    #[tokio::test]
    async fn test_feed_reports_lifecycle() {
        let (house, _) = house();
        let mut rx = house.subscribe();

        let id = house.seed(seed("P", dec!(1_000_000))).await.unwrap();

        let queued = rx.recv().await.unwrap();
        assert!(matches!(queued, AuctionEvent::ItemQueued { item_id, .. } if item_id == id));
        let activated = rx.recv().await.unwrap();
        assert!(matches!(activated, AuctionEvent::ItemActivated { item_id, .. } if item_id == id));
    }
}

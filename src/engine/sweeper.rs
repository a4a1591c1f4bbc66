//! Expiry sweeper background service
//!
//! Periodically finds Active items whose deadline has elapsed, drives
//! them to Ended, invokes settlement, and refills freed slots from the
//! queue. Safe to run from multiple concurrent workers: the transition
//! into Ended goes through the same state-guarded write as bidding, so
//! at most one worker proceeds to settlement per item.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SweeperConfig;
use crate::domain::{AuctionState, SettlementOutcome};
use crate::engine::board::AuctionBoard;
use crate::engine::promote::SlotPromoter;
use crate::engine::settlement::SettlementEngine;
use crate::error::Result;

/// Sweeper statistics
#[derive(Debug, Clone, Default)]
pub struct SweeperStats {
    pub cycles: u64,
    pub items_ended: u64,
    pub items_settled: u64,
    pub items_cancelled: u64,
    pub items_failed: u64,
    pub settlement_errors: u64,
    pub last_cycle: Option<DateTime<Utc>>,
}

pub struct ExpirySweeper {
    board: Arc<AuctionBoard>,
    settlement: Arc<SettlementEngine>,
    promoter: Arc<SlotPromoter>,
    config: SweeperConfig,
    running: Arc<AtomicBool>,
    stats: Arc<RwLock<SweeperStats>>,
}

impl ExpirySweeper {
    pub fn new(
        board: Arc<AuctionBoard>,
        settlement: Arc<SettlementEngine>,
        promoter: Arc<SlotPromoter>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            board,
            settlement,
            promoter,
            config,
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(RwLock::new(SweeperStats::default())),
        }
    }

    pub async fn get_stats(&self) -> SweeperStats {
        self.stats.read().await.clone()
    }

    /// Start the sweep loop
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("expiry sweeper already running");
            return;
        }

        info!(
            interval_secs = self.config.interval_secs,
            "starting expiry sweeper"
        );

        let sweeper = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(
                sweeper.config.interval_secs,
            ));

            while sweeper.running.load(Ordering::SeqCst) {
                interval.tick().await;

                if let Err(e) = sweeper.sweep_cycle().await {
                    error!("sweep cycle failed: {e}");
                }
            }

            info!("expiry sweeper stopped");
        });
    }

    /// Stop the sweep loop
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("expiry sweeper stop requested");
    }

    /// Run a single sweep cycle. Public so tests and operators can
    /// drive expiry deterministically.
    pub async fn sweep_cycle(&self) -> Result<()> {
        let now = Utc::now();
        let expired = self
            .board
            .expired_active(now, self.config.max_items_per_cycle)
            .await;

        let mut ended = 0u64;
        let mut settled = 0u64;
        let mut cancelled = 0u64;
        let mut failed = 0u64;
        let mut errors = 0u64;

        for item_id in expired {
            if !self.end_item(item_id).await {
                // Another worker won the transition; it owns settlement
                continue;
            }
            ended += 1;

            match self.settlement.settle(item_id).await {
                Ok(SettlementOutcome::Sold { .. }) => settled += 1,
                Ok(SettlementOutcome::NoBids) => cancelled += 1,
                Ok(SettlementOutcome::DebitFailed { .. }) => failed += 1,
                Err(e) => {
                    errors += 1;
                    error!(%item_id, "settlement error: {e}");
                }
            }
        }

        // Refill freed slots
        if ended > 0 {
            self.promoter.promote_if_capacity().await?;
        }

        {
            let mut s = self.stats.write().await;
            s.cycles += 1;
            s.items_ended += ended;
            s.items_settled += settled;
            s.items_cancelled += cancelled;
            s.items_failed += failed;
            s.settlement_errors += errors;
            s.last_cycle = Some(now);
        }

        if ended > 0 {
            debug!(
                "sweep cycle: ended={ended}, settled={settled}, cancelled={cancelled}, failed={failed}, errors={errors}"
            );
        }

        Ok(())
    }

    /// Drive one item Active -> Ended. Returns false if the item was
    /// no longer Active or no longer expired (a late extension or a
    /// concurrent worker got there first).
    async fn end_item(&self, item_id: Uuid) -> bool {
        let Ok(item) = self.board.get(item_id) else {
            return false;
        };
        let mut guard = item.write().await;

        if guard.state != AuctionState::Active || !guard.is_expired(Utc::now()) {
            return false;
        }

        match guard.transition_to(AuctionState::Ended) {
            Ok(()) => {
                debug!(%item_id, "deadline elapsed, ended");
                true
            }
            Err(e) => {
                warn!(%item_id, "could not end item: {e}");
                false
            }
        }
    }
}

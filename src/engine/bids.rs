//! Bid acceptance engine
//!
//! Validates and atomically commits bid submissions. Concurrent bids on
//! one item are linearized by a versioned commit under the item's write
//! lock: a commit whose snapshot version went stale re-validates against
//! the fresh state and retries a bounded number of times before
//! surfacing `Outbid` with the authoritative price. No bid is silently
//! dropped.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::{Bid, BidReceipt};
use crate::engine::board::AuctionBoard;
use crate::engine::snipe::SnipePolicy;
use crate::engine::throttle::BidThrottle;
use crate::error::BidError;
use crate::feed::{AuctionEvent, EventFeed};
use crate::ports::{AuditLog, BalanceLedger};

pub struct BidEngine {
    board: Arc<AuctionBoard>,
    ledger: Arc<dyn BalanceLedger>,
    audit: Arc<dyn AuditLog>,
    feed: EventFeed,
    throttle: BidThrottle,
    snipe: SnipePolicy,
    min_increment: Decimal,
    max_commit_attempts: u32,
    duration: chrono::Duration,
}

impl BidEngine {
    pub fn new(
        config: &AppConfig,
        board: Arc<AuctionBoard>,
        ledger: Arc<dyn BalanceLedger>,
        audit: Arc<dyn AuditLog>,
        feed: EventFeed,
    ) -> Self {
        Self {
            board,
            ledger,
            audit,
            feed,
            throttle: BidThrottle::new(config.auction.bid_cooldown_ms),
            snipe: SnipePolicy::new(&config.snipe),
            min_increment: config.auction.min_increment,
            max_commit_attempts: config.auction.max_commit_attempts,
            duration: chrono::Duration::seconds(config.auction.duration_secs as i64),
        }
    }

    /// Submit a bid. Returns a receipt when the bid commits, or a
    /// definitive rejection carrying the context needed to retry.
    pub async fn place_bid(
        &self,
        bidder_id: Uuid,
        item_id: Uuid,
        amount: Decimal,
    ) -> Result<BidReceipt, BidError> {
        if amount <= Decimal::ZERO {
            return Err(BidError::Validation(
                "bid amount must be positive".to_string(),
            ));
        }
        if amount.scale() > 2 {
            return Err(BidError::Validation(
                "bid amount has sub-cent precision".to_string(),
            ));
        }

        self.throttle.check(bidder_id, Utc::now())?;

        let item = self
            .board
            .get(item_id)
            .map_err(|_| BidError::ItemNotFound)?;

        let mut last_seen_price = Decimal::ZERO;

        for attempt in 0..self.max_commit_attempts {
            let snapshot = item.read().await.snapshot();
            last_seen_price = snapshot.current_price;

            let now = Utc::now();
            let deadline = match snapshot.deadline {
                Some(d) if snapshot.state.is_biddable() && now < d => d,
                _ => return Err(BidError::AuctionClosed),
            };

            let minimum = snapshot.current_price + self.min_increment;
            if amount < minimum {
                // A proposal at or under an accepted bid was raced away
                // and is retryable as Outbid; one that merely undercuts
                // the increment is a plain BidTooLow.
                return Err(if snapshot.leader.is_some() && amount <= snapshot.current_price {
                    BidError::Outbid {
                        current_price: snapshot.current_price,
                    }
                } else {
                    BidError::BidTooLow { minimum }
                });
            }

            if snapshot.leader == Some(bidder_id) {
                return Err(BidError::AlreadyLeader);
            }

            // Point-in-time affordability gate; authoritative check is
            // repeated at settlement
            let available = self
                .ledger
                .balance(bidder_id)
                .await
                .map_err(|e| BidError::LedgerUnavailable(e.to_string()))?;
            if available < amount {
                return Err(BidError::InsufficientFunds {
                    required: amount,
                    available,
                });
            }

            match self
                .try_commit(&item, snapshot.version, bidder_id, amount, deadline)
                .await
            {
                CommitResult::Committed {
                    bid,
                    receipt,
                    outbid,
                } => {
                    if let Err(e) = self.audit.append_bid(&bid).await {
                        // The commit stands; price moves are never rolled
                        // back. Surface the append failure for operator
                        // attention.
                        error!(%item_id, sequence = bid.sequence, "bid log append failed: {e}");
                        return Err(BidError::LedgerUnavailable(format!(
                            "bid log append failed: {e}"
                        )));
                    }

                    info!(
                        %item_id, %bidder_id, %amount,
                        sequence = receipt.sequence,
                        extended = receipt.extended,
                        "bid accepted"
                    );

                    self.feed.publish(AuctionEvent::BidAccepted {
                        item_id,
                        bidder_id,
                        outbid,
                        amount,
                        sequence: receipt.sequence,
                    });
                    if receipt.extended {
                        self.feed.publish(AuctionEvent::DeadlineExtended {
                            item_id,
                            deadline: receipt.deadline,
                        });
                    }

                    return Ok(receipt);
                }
                CommitResult::Conflict { current_price } => {
                    debug!(
                        %item_id, %bidder_id, attempt,
                        "commit conflict, re-validating against price {current_price}"
                    );
                    last_seen_price = current_price;
                }
                CommitResult::Closed => return Err(BidError::AuctionClosed),
            }
        }

        Err(BidError::Outbid {
            current_price: last_seen_price,
        })
    }

    /// Compare-and-set commit on (price, leader, version). The anti-snipe
    /// policy is consulted inside the same critical section, so a
    /// qualifying bid and its extension are one atomic change.
    async fn try_commit(
        &self,
        item: &Arc<tokio::sync::RwLock<crate::domain::AuctionItem>>,
        expected_version: u64,
        bidder_id: Uuid,
        amount: Decimal,
        expected_deadline: chrono::DateTime<Utc>,
    ) -> CommitResult {
        let mut guard = item.write().await;

        if guard.version != expected_version {
            return CommitResult::Conflict {
                current_price: guard.current_price,
            };
        }

        let now = Utc::now();
        // The deadline can lapse between snapshot and commit even with
        // an unchanged version; never accept past it.
        if guard.is_expired(now) {
            return CommitResult::Closed;
        }

        let outbid = guard.leader;

        guard.prior_leader = outbid;
        guard.leader = Some(bidder_id);
        guard.current_price = amount;
        guard.bid_count += 1;
        guard.version += 1;

        let natural_end = guard
            .natural_end(self.duration)
            .unwrap_or(expected_deadline);
        let mut deadline = expected_deadline;
        let mut extended = false;
        if let Some(new_deadline) = self.snipe.extend(now, expected_deadline, natural_end) {
            guard.deadline = Some(new_deadline);
            deadline = new_deadline;
            extended = true;
        }

        let sequence = guard.bid_count;
        let bid = Bid {
            item_id: guard.id,
            bidder_id,
            amount,
            sequence,
            placed_at: now,
        };
        let receipt = BidReceipt {
            item_id: guard.id,
            bidder_id,
            amount,
            sequence,
            deadline,
            extended,
        };

        CommitResult::Committed {
            bid,
            receipt,
            outbid,
        }
    }
}

enum CommitResult {
    Committed {
        bid: Bid,
        receipt: BidReceipt,
        outbid: Option<Uuid>,
    },
    Conflict {
        current_price: Decimal,
    },
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryAuditLog, InMemoryLedger};
    use crate::domain::{AssetDescriptor, AuctionItem, ItemSeed};
    use rust_decimal_macros::dec;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default_config();
        config.auction.min_increment = dec!(100_000);
        // Cooldown off so unit tests can bid back-to-back
        config.auction.bid_cooldown_ms = 0;
        config
    }

    struct Fixture {
        engine: BidEngine,
        board: Arc<AuctionBoard>,
        ledger: Arc<InMemoryLedger>,
        audit: Arc<InMemoryAuditLog>,
    }

    fn fixture() -> Fixture {
        fixture_with_config(test_config())
    }

    fn fixture_with_config(config: AppConfig) -> Fixture {
        let board = Arc::new(AuctionBoard::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let engine = BidEngine::new(
            &config,
            board.clone(),
            ledger.clone(),
            audit.clone(),
            EventFeed::new(64),
        );
        Fixture {
            engine,
            board,
            ledger,
            audit,
        }
    }

    fn active_item(board: &AuctionBoard, price: Decimal, secs_left: i64) -> Uuid {
        let mut item = AuctionItem::new(ItemSeed {
            asset: AssetDescriptor {
                name: "Player".to_string(),
                category: "FW".to_string(),
                quality: 80,
                nationality: "FR".to_string(),
                media_ref: None,
            },
            starting_price: price,
        });
        item.activate(
            Utc::now() - chrono::Duration::seconds(300 - secs_left),
            chrono::Duration::seconds(300),
        )
        .unwrap();
        board.insert(item)
    }

    fn funded_bidder(ledger: &InMemoryLedger, balance: Decimal) -> Uuid {
        let bidder = Uuid::new_v4();
        ledger.set_balance(bidder, balance);
        bidder
    }

    #[tokio::test]
    async fn test_successful_bid_updates_price_and_leader() {
        let f = fixture();
        let item_id = active_item(&f.board, dec!(2_000_000), 120);
        let bidder = funded_bidder(&f.ledger, dec!(10_000_000));

        let receipt = f
            .engine
            .place_bid(bidder, item_id, dec!(2_500_000))
            .await
            .unwrap();
        assert_eq!(receipt.amount, dec!(2_500_000));
        assert_eq!(receipt.sequence, 1);
        assert!(!receipt.extended);

        let snapshot = f.board.snapshot(item_id).await.unwrap();
        assert_eq!(snapshot.current_price, dec!(2_500_000));
        assert_eq!(snapshot.leader, Some(bidder));

        let bids = f.audit.bids_for_item(item_id).await.unwrap();
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].amount, dec!(2_500_000));
    }

    #[tokio::test]
    async fn test_bid_below_increment_rejected() {
        let f = fixture();
        let item_id = active_item(&f.board, dec!(2_000_000), 120);
        let bidder = funded_bidder(&f.ledger, dec!(10_000_000));

        let err = f
            .engine
            .place_bid(bidder, item_id, dec!(2_050_000))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BidError::BidTooLow {
                minimum: dec!(2_100_000)
            }
        );

        // Nothing mutated
        let snapshot = f.board.snapshot(item_id).await.unwrap();
        assert_eq!(snapshot.current_price, dec!(2_000_000));
        assert!(snapshot.leader.is_none());
    }

    #[tokio::test]
    async fn test_leader_cannot_raise_own_bid() {
        let f = fixture();
        let item_id = active_item(&f.board, dec!(2_000_000), 120);
        let bidder = funded_bidder(&f.ledger, dec!(10_000_000));

        f.engine
            .place_bid(bidder, item_id, dec!(2_500_000))
            .await
            .unwrap();
        let err = f
            .engine
            .place_bid(bidder, item_id, dec!(3_000_000))
            .await
            .unwrap_err();
        assert_eq!(err, BidError::AlreadyLeader);

        let snapshot = f.board.snapshot(item_id).await.unwrap();
        assert_eq!(snapshot.current_price, dec!(2_500_000));
        assert_eq!(snapshot.leader, Some(bidder));
    }

    #[tokio::test]
    async fn test_insufficient_funds_rejected_without_mutation() {
        let f = fixture();
        let item_id = active_item(&f.board, dec!(2_000_000), 120);
        let bidder = funded_bidder(&f.ledger, dec!(1_000_000));

        let err = f
            .engine
            .place_bid(bidder, item_id, dec!(3_000_000))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BidError::InsufficientFunds {
                required: dec!(3_000_000),
                available: dec!(1_000_000)
            }
        );

        let snapshot = f.board.snapshot(item_id).await.unwrap();
        assert_eq!(snapshot.current_price, dec!(2_000_000));
        assert_eq!(snapshot.version, 1); // only the activation transition
    }

    #[tokio::test]
    async fn test_bid_on_expired_item_rejected() {
        let f = fixture();
        let item_id = active_item(&f.board, dec!(2_000_000), -5);
        let bidder = funded_bidder(&f.ledger, dec!(10_000_000));

        let err = f
            .engine
            .place_bid(bidder, item_id, dec!(2_500_000))
            .await
            .unwrap_err();
        assert_eq!(err, BidError::AuctionClosed);
    }

    #[tokio::test]
    async fn test_bid_on_unknown_item_rejected() {
        let f = fixture();
        let bidder = funded_bidder(&f.ledger, dec!(10_000_000));

        let err = f
            .engine
            .place_bid(bidder, Uuid::new_v4(), dec!(2_500_000))
            .await
            .unwrap_err();
        assert_eq!(err, BidError::ItemNotFound);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let f = fixture();
        let item_id = active_item(&f.board, dec!(2_000_000), 120);
        let bidder = funded_bidder(&f.ledger, dec!(10_000_000));

        let err = f
            .engine
            .place_bid(bidder, item_id, dec!(0))
            .await
            .unwrap_err();
        assert!(matches!(err, BidError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cooldown_rejects_rapid_resubmission() {
        let mut config = test_config();
        config.auction.bid_cooldown_ms = 1000;
        let f = fixture_with_config(config);
        let item_id = active_item(&f.board, dec!(2_000_000), 120);
        let bidder = funded_bidder(&f.ledger, dec!(10_000_000));

        f.engine
            .place_bid(bidder, item_id, dec!(2_500_000))
            .await
            .unwrap();
        let err = f
            .engine
            .place_bid(bidder, item_id, dec!(3_000_000))
            .await
            .unwrap_err();
        assert!(matches!(err, BidError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_bid_inside_snipe_window_extends_deadline() {
        let f = fixture();
        // 10s left, inside the 15s window
        let item_id = active_item(&f.board, dec!(2_000_000), 10);
        let bidder = funded_bidder(&f.ledger, dec!(10_000_000));

        let before = f.board.snapshot(item_id).await.unwrap().deadline.unwrap();
        let receipt = f
            .engine
            .place_bid(bidder, item_id, dec!(2_500_000))
            .await
            .unwrap();
        assert!(receipt.extended);
        assert!(receipt.deadline > before);

        let snapshot = f.board.snapshot(item_id).await.unwrap();
        assert_eq!(snapshot.deadline, Some(receipt.deadline));
    }

    #[tokio::test]
    async fn test_bid_outside_snipe_window_leaves_deadline() {
        let f = fixture();
        let item_id = active_item(&f.board, dec!(2_000_000), 120);
        let bidder = funded_bidder(&f.ledger, dec!(10_000_000));

        let before = f.board.snapshot(item_id).await.unwrap().deadline.unwrap();
        let receipt = f
            .engine
            .place_bid(bidder, item_id, dec!(2_500_000))
            .await
            .unwrap();
        assert!(!receipt.extended);
        assert_eq!(receipt.deadline, before);
    }

    #[tokio::test]
    async fn test_alternating_bidders_price_is_monotone() {
        let f = fixture();
        let item_id = active_item(&f.board, dec!(2_000_000), 120);
        let a = funded_bidder(&f.ledger, dec!(10_000_000));
        let b = funded_bidder(&f.ledger, dec!(8_000_000));

        let mut price = dec!(2_000_000);
        let mut last = price;
        for (i, bidder) in [a, b, a, b].iter().enumerate() {
            price += dec!(1_000_000);
            let receipt = f.engine.place_bid(*bidder, item_id, price).await.unwrap();
            assert_eq!(receipt.sequence, (i + 1) as u64);
            assert!(receipt.amount > last);
            last = receipt.amount;
        }

        let snapshot = f.board.snapshot(item_id).await.unwrap();
        assert_eq!(snapshot.current_price, dec!(6_000_000));
        assert_eq!(snapshot.leader, Some(b));
        assert_eq!(snapshot.bid_count, 4);
    }
}

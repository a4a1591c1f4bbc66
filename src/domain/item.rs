use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GavelError, Result};

use super::AuctionState;

/// Descriptor of the asset being sold (a player, in league terms)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub name: String,
    /// Position/category label (e.g. "GK", "DF", "MF", "FW")
    pub category: String,
    /// Quality rating on the league scale
    pub quality: u8,
    pub nationality: String,
    /// Reference to the asset's media (portrait) in external storage
    pub media_ref: Option<String>,
}

/// Terminal outcome recorded by the settlement engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// Winner debited, asset transferred to their roster
    Sold {
        winner: Uuid,
        price: Decimal,
        salary: Decimal,
    },
    /// No bid was ever placed
    NoBids,
    /// Winner existed but the debit or transfer could not complete
    DebitFailed {
        winner: Uuid,
        price: Decimal,
        reason: String,
    },
}

/// Request to seed a new item into the pending backlog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSeed {
    pub asset: AssetDescriptor,
    pub starting_price: Decimal,
}

/// One auction item and its mutable live state
///
/// The mutable triple (price, leader, deadline) is only ever changed
/// under the item's write lock, and `version` is bumped on every
/// mutation so a commit can detect that it raced with another writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionItem {
    pub id: Uuid,
    pub asset: AssetDescriptor,
    pub starting_price: Decimal,
    pub state: AuctionState,
    pub current_price: Decimal,
    /// Current leading bidder, if any bid has been accepted
    pub leader: Option<Uuid>,
    /// Previous leading bidder, kept for outbid notification
    pub prior_leader: Option<Uuid>,
    /// Live bidding deadline; set on promotion, only ever moves forward
    pub deadline: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Number of accepted bids; doubles as the per-item bid sequence
    pub bid_count: u64,
    /// Bumped on every mutation; commit-time compare detects races
    pub version: u64,
    pub outcome: Option<SettlementOutcome>,
}

impl AuctionItem {
    pub fn new(seed: ItemSeed) -> Self {
        Self {
            id: Uuid::new_v4(),
            current_price: seed.starting_price,
            starting_price: seed.starting_price,
            asset: seed.asset,
            state: AuctionState::Queued,
            leader: None,
            prior_leader: None,
            deadline: None,
            activated_at: None,
            created_at: Utc::now(),
            bid_count: 0,
            version: 0,
            outcome: None,
        }
    }

    /// Guarded state transition; bumps the version on success
    pub fn transition_to(&mut self, target: AuctionState) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(GavelError::InvalidStateTransition {
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }
        self.state = target;
        self.version += 1;
        Ok(())
    }

    /// Promote into an active slot and arm the deadline
    pub fn activate(&mut self, now: DateTime<Utc>, duration: chrono::Duration) -> Result<()> {
        self.transition_to(AuctionState::Active)?;
        self.activated_at = Some(now);
        self.deadline = Some(now + duration);
        Ok(())
    }

    /// Is the deadline in the past?
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    /// Minimum acceptable next bid
    pub fn minimum_bid(&self, min_increment: Decimal) -> Decimal {
        self.current_price + min_increment
    }

    /// The natural end the item would have had with no extensions
    pub fn natural_end(&self, duration: chrono::Duration) -> Option<DateTime<Utc>> {
        self.activated_at.map(|at| at + duration)
    }

    /// Point-in-time copy of the fields a bidder or client needs
    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            id: self.id,
            asset: self.asset.clone(),
            state: self.state,
            current_price: self.current_price,
            leader: self.leader,
            deadline: self.deadline,
            created_at: self.created_at,
            bid_count: self.bid_count,
            version: self.version,
            outcome: self.outcome.clone(),
        }
    }
}

/// Immutable point-in-time view of an item, safe to hand to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: Uuid,
    pub asset: AssetDescriptor,
    pub state: AuctionState,
    pub current_price: Decimal,
    pub leader: Option<Uuid>,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub bid_count: u64,
    pub version: u64,
    pub outcome: Option<SettlementOutcome>,
}

impl ItemSnapshot {
    /// Seconds remaining until the deadline (zero if elapsed or unarmed)
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        match self.deadline {
            Some(deadline) => (deadline - now).num_seconds().max(0),
            None => 0,
        }
    }
}

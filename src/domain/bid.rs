use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An accepted bid, as appended to the audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub item_id: Uuid,
    pub bidder_id: Uuid,
    pub amount: Decimal,
    /// Monotonically increasing, scoped to the item
    pub sequence: u64,
    pub placed_at: DateTime<Utc>,
}

/// What a bidder gets back when their bid commits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidReceipt {
    pub item_id: Uuid,
    pub bidder_id: Uuid,
    pub amount: Decimal,
    pub sequence: u64,
    /// Deadline after any anti-snipe extension this bid triggered
    pub deadline: DateTime<Utc>,
    pub extended: bool,
}

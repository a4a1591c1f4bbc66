//! Seams to external collaborators
//!
//! The engine never owns team balances or rosters; it talks to them
//! through these traits, injected as `Arc<dyn …>` so every call carries
//! explicit caller identity instead of ambient session state.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{AssetDescriptor, Bid, LedgerEntry};
use crate::error::Result;

/// Outcome of an atomic debit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// Funds removed
    Applied,
    /// Balance below the requested amount; nothing changed
    InsufficientFunds,
    /// The idempotency key was already applied; nothing changed
    AlreadyApplied,
}

/// Authoritative owner of per-team balances
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    /// Current balance; a point-in-time read, not a reservation
    async fn balance(&self, team_id: Uuid) -> Result<Decimal>;

    /// Atomic debit keyed for idempotence; must never partially apply
    async fn debit(
        &self,
        team_id: Uuid,
        amount: Decimal,
        idempotency_key: &str,
    ) -> Result<DebitOutcome>;

    async fn credit(&self, team_id: Uuid, amount: Decimal, idempotency_key: &str) -> Result<()>;
}

/// Team roster storage; receives the won asset at settlement
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RosterService: Send + Sync {
    async fn add_asset(
        &self,
        team_id: Uuid,
        asset: &AssetDescriptor,
        acquired_price: Decimal,
        salary: Decimal,
    ) -> Result<()>;
}

/// Append-only audit log for bids and ledger entries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append_bid(&self, bid: &Bid) -> Result<()>;

    async fn append_ledger_entry(&self, entry: &LedgerEntry) -> Result<()>;

    async fn bids_for_item(&self, item_id: Uuid) -> Result<Vec<Bid>>;
}

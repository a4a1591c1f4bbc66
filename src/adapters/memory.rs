//! In-memory adapters for tests and dry runs
//!
//! The ledger honors the same idempotency contract a production wallet
//! service would: a repeated debit with the same key is a no-op.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{AssetDescriptor, Bid, LedgerEntry};
use crate::error::{GavelError, Result};
use crate::ports::{AuditLog, BalanceLedger, DebitOutcome, RosterService};

/// In-memory balance ledger
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: DashMap<Uuid, Decimal>,
    applied_keys: DashSet<String>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, team_id: Uuid, balance: Decimal) {
        self.balances.insert(team_id, balance);
    }
}

#[async_trait]
impl BalanceLedger for InMemoryLedger {
    async fn balance(&self, team_id: Uuid) -> Result<Decimal> {
        self.balances
            .get(&team_id)
            .map(|b| *b)
            .ok_or_else(|| GavelError::LedgerUnavailable(format!("unknown team {team_id}")))
    }

    async fn debit(
        &self,
        team_id: Uuid,
        amount: Decimal,
        idempotency_key: &str,
    ) -> Result<DebitOutcome> {
        if !self.applied_keys.insert(idempotency_key.to_string()) {
            debug!(%team_id, idempotency_key, "debit already applied");
            return Ok(DebitOutcome::AlreadyApplied);
        }

        // get_mut holds the shard lock, making check-and-subtract atomic
        let Some(mut balance) = self.balances.get_mut(&team_id) else {
            self.applied_keys.remove(idempotency_key);
            return Err(GavelError::LedgerUnavailable(format!(
                "unknown team {team_id}"
            )));
        };

        if *balance < amount {
            drop(balance);
            self.applied_keys.remove(idempotency_key);
            return Ok(DebitOutcome::InsufficientFunds);
        }

        *balance -= amount;
        debug!(%team_id, %amount, idempotency_key, "debit applied");
        Ok(DebitOutcome::Applied)
    }

    async fn credit(&self, team_id: Uuid, amount: Decimal, idempotency_key: &str) -> Result<()> {
        if !self.applied_keys.insert(idempotency_key.to_string()) {
            return Ok(());
        }
        *self.balances.entry(team_id).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }
}

/// An asset held on a team roster after settlement
#[derive(Debug, Clone)]
pub struct RosterAsset {
    pub asset: AssetDescriptor,
    pub acquired_price: Decimal,
    pub salary: Decimal,
    pub acquired_at: DateTime<Utc>,
}

/// In-memory roster store
#[derive(Debug, Default)]
pub struct InMemoryRoster {
    rosters: DashMap<Uuid, Vec<RosterAsset>>,
}

impl InMemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assets_of(&self, team_id: Uuid) -> Vec<RosterAsset> {
        self.rosters
            .get(&team_id)
            .map(|assets| assets.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RosterService for InMemoryRoster {
    async fn add_asset(
        &self,
        team_id: Uuid,
        asset: &AssetDescriptor,
        acquired_price: Decimal,
        salary: Decimal,
    ) -> Result<()> {
        self.rosters.entry(team_id).or_default().push(RosterAsset {
            asset: asset.clone(),
            acquired_price,
            salary,
            acquired_at: Utc::now(),
        });
        Ok(())
    }
}

/// In-memory append-only audit log
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    bids: Mutex<Vec<Bid>>,
    ledger_entries: Mutex<Vec<LedgerEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.ledger_entries.lock().await.clone()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append_bid(&self, bid: &Bid) -> Result<()> {
        self.bids.lock().await.push(bid.clone());
        Ok(())
    }

    async fn append_ledger_entry(&self, entry: &LedgerEntry) -> Result<()> {
        self.ledger_entries.lock().await.push(entry.clone());
        Ok(())
    }

    async fn bids_for_item(&self, item_id: Uuid) -> Result<Vec<Bid>> {
        Ok(self
            .bids
            .lock()
            .await
            .iter()
            .filter(|b| b.item_id == item_id)
            .cloned()
            .collect())
    }
}

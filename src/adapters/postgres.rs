//! Postgres-backed audit log
//!
//! Append-only storage for the bid log and ledger-entry log. Rows are
//! never updated or deleted; the tables are the durable audit contract.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Bid, LedgerDirection, LedgerEntry};
use crate::error::{GavelError, Result};
use crate::ports::AuditLog;

/// Audit log persisted in PostgreSQL
pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the audit tables exist
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        let log = Self::new(pool);
        log.ensure_schema().await?;
        Ok(log)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS auction_bids (
                id BIGSERIAL PRIMARY KEY,
                item_id UUID NOT NULL,
                bidder_id UUID NOT NULL,
                amount NUMERIC NOT NULL,
                sequence BIGINT NOT NULL,
                placed_at TIMESTAMPTZ NOT NULL,
                UNIQUE (item_id, sequence)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_entries (
                id BIGSERIAL PRIMARY KEY,
                team_id UUID NOT NULL,
                direction TEXT NOT NULL,
                amount NUMERIC NOT NULL,
                reason TEXT NOT NULL,
                recorded_at TIMESTAMPTZ NOT NULL,
                idempotency_key TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    async fn append_bid(&self, bid: &Bid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO auction_bids (item_id, bidder_id, amount, sequence, placed_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(bid.item_id)
        .bind(bid.bidder_id)
        .bind(bid.amount)
        .bind(bid.sequence as i64)
        .bind(bid.placed_at)
        .execute(&self.pool)
        .await?;

        debug!(item_id = %bid.item_id, sequence = bid.sequence, "bid appended to audit log");
        Ok(())
    }

    async fn append_ledger_entry(&self, entry: &LedgerEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (team_id, direction, amount, reason, recorded_at, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(entry.team_id)
        .bind(entry.direction.to_string())
        .bind(entry.amount)
        .bind(&entry.reason)
        .bind(entry.recorded_at)
        .bind(&entry.idempotency_key)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn bids_for_item(&self, item_id: Uuid) -> Result<Vec<Bid>> {
        let rows = sqlx::query(
            r#"
            SELECT item_id, bidder_id, amount, sequence, placed_at
            FROM auction_bids
            WHERE item_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let sequence: i64 = row.get("sequence");
                Ok(Bid {
                    item_id: row.get("item_id"),
                    bidder_id: row.get("bidder_id"),
                    amount: row.get("amount"),
                    sequence: sequence as u64,
                    placed_at: row.get("placed_at"),
                })
            })
            .collect::<Result<Vec<_>>>()
    }
}

impl PostgresAuditLog {
    /// Ledger entries for a team, oldest first. Operator tooling for
    /// remediating items stuck in Failed.
    pub async fn ledger_entries_for_team(&self, team_id: Uuid) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT team_id, direction, amount, reason, recorded_at, idempotency_key
            FROM ledger_entries
            WHERE team_id = $1
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let direction: String = row.get("direction");
                Ok(LedgerEntry {
                    team_id: row.get("team_id"),
                    direction: parse_direction(&direction)?,
                    amount: row.get("amount"),
                    reason: row.get("reason"),
                    recorded_at: row.get("recorded_at"),
                    idempotency_key: row.get("idempotency_key"),
                })
            })
            .collect::<Result<Vec<_>>>()
    }
}

impl std::fmt::Debug for PostgresAuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAuditLog").finish_non_exhaustive()
    }
}

fn parse_direction(s: &str) -> Result<LedgerDirection> {
    match s {
        "DEBIT" => Ok(LedgerDirection::Debit),
        "CREDIT" => Ok(LedgerDirection::Credit),
        other => Err(GavelError::Internal(format!(
            "unknown ledger direction: {other}"
        ))),
    }
}

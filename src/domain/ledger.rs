use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Direction of a balance-affecting entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerDirection {
    Debit,
    Credit,
}

impl fmt::Display for LedgerDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerDirection::Debit => write!(f, "DEBIT"),
            LedgerDirection::Credit => write!(f, "CREDIT"),
        }
    }
}

/// Append-only record of a balance-affecting event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub team_id: Uuid,
    pub direction: LedgerDirection,
    pub amount: Decimal,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
    /// Token making a repeated apply a no-op; auction debits use the item id
    pub idempotency_key: String,
}

impl LedgerEntry {
    pub fn debit(team_id: Uuid, amount: Decimal, reason: &str, idempotency_key: &str) -> Self {
        Self {
            team_id,
            direction: LedgerDirection::Debit,
            amount,
            reason: reason.to_string(),
            recorded_at: Utc::now(),
            idempotency_key: idempotency_key.to_string(),
        }
    }

    pub fn credit(team_id: Uuid, amount: Decimal, reason: &str, idempotency_key: &str) -> Self {
        Self {
            team_id,
            direction: LedgerDirection::Credit,
            amount,
            reason: reason.to_string(),
            recorded_at: Utc::now(),
            idempotency_key: idempotency_key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_debit_entry() {
        let team = Uuid::new_v4();
        let entry = LedgerEntry::debit(team, dec!(6_000_000), "auction settlement", "item-1");
        assert_eq!(entry.direction, LedgerDirection::Debit);
        assert_eq!(entry.amount, dec!(6_000_000));
        assert_eq!(entry.idempotency_key, "item-1");
    }
}

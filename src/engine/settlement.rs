//! Settlement engine
//!
//! Terminal finalization of an ended auction: determine the outcome,
//! debit the winner exactly once, transfer the asset, append the ledger
//! record, publish the public feed entry. Settlement is idempotent by
//! state guard: it only acts on `Ended` items, and re-invocation on a
//! terminal item returns the recorded outcome unchanged.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{AuctionState, LedgerEntry, SettlementOutcome};
use crate::engine::board::AuctionBoard;
use crate::error::SettlementError;
use crate::feed::{AuctionEvent, EventFeed};
use crate::ports::{AuditLog, BalanceLedger, DebitOutcome, RosterService};

/// Derived contract attribute for a won asset
const SALARY_RATE: Decimal = dec!(0.007);

pub fn derived_salary(price: Decimal) -> Decimal {
    (price * SALARY_RATE).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

pub struct SettlementEngine {
    board: Arc<AuctionBoard>,
    ledger: Arc<dyn BalanceLedger>,
    roster: Arc<dyn RosterService>,
    audit: Arc<dyn AuditLog>,
    feed: EventFeed,
}

impl SettlementEngine {
    pub fn new(
        board: Arc<AuctionBoard>,
        ledger: Arc<dyn BalanceLedger>,
        roster: Arc<dyn RosterService>,
        audit: Arc<dyn AuditLog>,
        feed: EventFeed,
    ) -> Self {
        Self {
            board,
            ledger,
            roster,
            audit,
            feed,
        }
    }

    /// Finalize an ended item. At most one caller ever transitions the
    /// item away from `Ended`; the write lock is held across the debit
    /// so a concurrent settle blocks and then observes the terminal
    /// state instead of racing the ledger.
    pub async fn settle(&self, item_id: Uuid) -> Result<SettlementOutcome, SettlementError> {
        let item = self
            .board
            .get(item_id)
            .map_err(|_| SettlementError::ItemNotFound)?;

        let mut guard = item.write().await;

        if guard.state.is_terminal() {
            return guard
                .outcome
                .clone()
                .ok_or(SettlementError::Conflict {
                    state: guard.state.to_string(),
                });
        }
        if guard.state != AuctionState::Ended {
            return Err(SettlementError::Conflict {
                state: guard.state.to_string(),
            });
        }

        let Some(winner) = guard.leader else {
            // No bid was ever placed: no ledger or roster effects
            guard
                .transition_to(AuctionState::Cancelled)
                .map_err(|e| SettlementError::Conflict {
                    state: e.to_string(),
                })?;
            guard.outcome = Some(SettlementOutcome::NoBids);
            info!(%item_id, "settled with no bids, cancelled");
            self.feed.publish(AuctionEvent::ItemCancelled { item_id });
            return Ok(SettlementOutcome::NoBids);
        };

        let price = guard.current_price;
        let idempotency_key = item_id.to_string();

        // Affordability can have changed since the winning bid; the
        // ledger is only authoritative here
        let debit_result = match self.ledger.balance(winner).await {
            Ok(balance) if balance < price => Ok(DebitOutcome::InsufficientFunds),
            Ok(_) => self.ledger.debit(winner, price, &idempotency_key).await,
            Err(e) => Err(e),
        };

        let failure_reason = match debit_result {
            Ok(DebitOutcome::Applied) | Ok(DebitOutcome::AlreadyApplied) => {
                let salary = derived_salary(price);
                match self
                    .roster
                    .add_asset(winner, &guard.asset, price, salary)
                    .await
                {
                    Ok(()) => {
                        let entry = LedgerEntry::debit(
                            winner,
                            price,
                            &format!("auction settlement: {}", guard.asset.name),
                            &idempotency_key,
                        );
                        if let Err(e) = self.audit.append_ledger_entry(&entry).await {
                            // Funds moved and the asset transferred; the
                            // external ledger holds the authoritative
                            // record, so the settlement stands.
                            error!(%item_id, "ledger entry append failed: {e}");
                        }

                        guard
                            .transition_to(AuctionState::Settled)
                            .map_err(|e| SettlementError::Conflict {
                                state: e.to_string(),
                            })?;
                        let outcome = SettlementOutcome::Sold {
                            winner,
                            price,
                            salary,
                        };
                        guard.outcome = Some(outcome.clone());

                        info!(%item_id, %winner, %price, %salary, "settled");
                        self.feed.publish(AuctionEvent::ItemSettled {
                            item_id,
                            winner,
                            price,
                            salary,
                        });
                        return Ok(outcome);
                    }
                    Err(e) => format!("roster transfer failed: {e}"),
                }
            }
            Ok(DebitOutcome::InsufficientFunds) => {
                format!("winner balance below final price {price}")
            }
            Err(e) => format!("ledger debit failed: {e}"),
        };

        // Not auto-retried: a blind retry risks a duplicate debit.
        // Operator remediation required.
        guard
            .transition_to(AuctionState::Failed)
            .map_err(|e| SettlementError::Conflict {
                state: e.to_string(),
            })?;
        let outcome = SettlementOutcome::DebitFailed {
            winner,
            price,
            reason: failure_reason.clone(),
        };
        guard.outcome = Some(outcome.clone());

        warn!(%item_id, %winner, %price, "settlement failed: {failure_reason}");
        self.feed.publish(AuctionEvent::ItemFailed {
            item_id,
            winner,
            price,
            reason: failure_reason,
        });
        Ok(outcome)
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Auction item lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuctionState {
    /// In the pending backlog, waiting for an active slot
    Queued,
    /// Live and accepting bids until the deadline
    Active,
    /// Deadline elapsed, awaiting settlement
    Ended,
    /// Winner debited and asset transferred
    Settled,
    /// Closed with no bids, no ledger or roster effects
    Cancelled,
    /// Winner existed but debit/transfer failed; operator remediation required
    Failed,
}

impl AuctionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionState::Queued => "QUEUED",
            AuctionState::Active => "ACTIVE",
            AuctionState::Ended => "ENDED",
            AuctionState::Settled => "SETTLED",
            AuctionState::Cancelled => "CANCELLED",
            AuctionState::Failed => "FAILED",
        }
    }

    /// Check if this state can transition to another state
    pub fn can_transition_to(&self, target: AuctionState) -> bool {
        use AuctionState::*;

        match (self, target) {
            // From Queued
            (Queued, Active) => true,    // Promoted into a free slot
            (Queued, Cancelled) => true, // Admin removal before promotion

            // From Active
            (Active, Ended) => true, // Deadline elapsed or manual close

            // From Ended
            (Ended, Settled) => true,   // Winner debited, asset transferred
            (Ended, Cancelled) => true, // No bids were ever placed
            (Ended, Failed) => true,    // Debit or transfer failed

            // Settled / Cancelled / Failed are terminal
            _ => false,
        }
    }

    /// Get valid next states from current state
    pub fn valid_transitions(&self) -> Vec<AuctionState> {
        use AuctionState::*;

        match self {
            Queued => vec![Active, Cancelled],
            Active => vec![Ended],
            Ended => vec![Settled, Cancelled, Failed],
            Settled | Cancelled | Failed => vec![],
        }
    }

    /// Can bids be accepted in this state?
    pub fn is_biddable(&self) -> bool {
        matches!(self, AuctionState::Active)
    }

    /// Is this a terminal state?
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuctionState::Settled | AuctionState::Cancelled | AuctionState::Failed
        )
    }

    /// Does this state occupy one of the bounded active slots?
    pub fn occupies_slot(&self) -> bool {
        matches!(self, AuctionState::Active)
    }
}

impl fmt::Display for AuctionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for AuctionState {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "QUEUED" => Ok(AuctionState::Queued),
            "ACTIVE" => Ok(AuctionState::Active),
            "ENDED" => Ok(AuctionState::Ended),
            "SETTLED" => Ok(AuctionState::Settled),
            "CANCELLED" => Ok(AuctionState::Cancelled),
            "FAILED" => Ok(AuctionState::Failed),
            _ => Err(format!("Unknown state: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        use AuctionState::*;

        // Valid transitions
        assert!(Queued.can_transition_to(Active));
        assert!(Queued.can_transition_to(Cancelled));
        assert!(Active.can_transition_to(Ended));
        assert!(Ended.can_transition_to(Settled));
        assert!(Ended.can_transition_to(Cancelled));
        assert!(Ended.can_transition_to(Failed));

        // Invalid transitions
        assert!(!Queued.can_transition_to(Ended));
        assert!(!Active.can_transition_to(Settled));
        assert!(!Active.can_transition_to(Queued));
        assert!(!Ended.can_transition_to(Active));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        use AuctionState::*;

        for terminal in [Settled, Cancelled, Failed] {
            assert!(terminal.is_terminal());
            assert!(terminal.valid_transitions().is_empty());
            for target in [Queued, Active, Ended, Settled, Cancelled, Failed] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn test_state_from_str() {
        assert_eq!(
            AuctionState::try_from("QUEUED").unwrap(),
            AuctionState::Queued
        );
        assert_eq!(
            AuctionState::try_from("settled").unwrap(),
            AuctionState::Settled
        );
        assert!(AuctionState::try_from("INVALID").is_err());
    }

    #[test]
    fn test_is_biddable() {
        assert!(!AuctionState::Queued.is_biddable());
        assert!(AuctionState::Active.is_biddable());
        assert!(!AuctionState::Ended.is_biddable());
        assert!(!AuctionState::Settled.is_biddable());
    }
}

//! Per-bidder submission cooldown
//!
//! The cooldown is an engine rule, not a UI affordance, so the bound on
//! resubmission load holds for any client.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::BidError;

#[derive(Debug)]
pub struct BidThrottle {
    last_attempt: DashMap<Uuid, DateTime<Utc>>,
    min_interval: Duration,
}

impl BidThrottle {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            last_attempt: DashMap::new(),
            min_interval: Duration::milliseconds(cooldown_ms as i64),
        }
    }

    /// Admit or reject a submission at `now`, stamping on admission.
    /// The stamp is taken whether or not the bid later commits, so a
    /// stream of rejected bids is throttled just the same.
    pub fn check(&self, bidder_id: Uuid, now: DateTime<Utc>) -> Result<(), BidError> {
        let mut entry = self.last_attempt.entry(bidder_id).or_insert(
            // First submission from this bidder always passes
            now - self.min_interval,
        );

        let elapsed = now - *entry;
        if elapsed < self.min_interval {
            let retry_after = self.min_interval - elapsed;
            return Err(BidError::RateLimited {
                retry_after_ms: retry_after.num_milliseconds().max(0) as u64,
            });
        }

        *entry = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_passes() {
        let throttle = BidThrottle::new(1000);
        assert!(throttle.check(Uuid::new_v4(), Utc::now()).is_ok());
    }

    #[test]
    fn test_rapid_resubmission_rejected() {
        let throttle = BidThrottle::new(1000);
        let bidder = Uuid::new_v4();
        let now = Utc::now();

        assert!(throttle.check(bidder, now).is_ok());
        let err = throttle
            .check(bidder, now + Duration::milliseconds(200))
            .unwrap_err();
        match err {
            BidError::RateLimited { retry_after_ms } => {
                assert!(retry_after_ms > 0 && retry_after_ms <= 800);
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn test_attempt_after_cooldown_passes() {
        let throttle = BidThrottle::new(1000);
        let bidder = Uuid::new_v4();
        let now = Utc::now();

        assert!(throttle.check(bidder, now).is_ok());
        assert!(throttle
            .check(bidder, now + Duration::milliseconds(1000))
            .is_ok());
    }

    #[test]
    fn test_bidders_are_independent() {
        let throttle = BidThrottle::new(1000);
        let now = Utc::now();

        assert!(throttle.check(Uuid::new_v4(), now).is_ok());
        assert!(throttle.check(Uuid::new_v4(), now).is_ok());
    }
}

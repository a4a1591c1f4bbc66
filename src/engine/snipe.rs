//! Anti-snipe deadline extension policy
//!
//! A bid landing inside the trailing window pushes the deadline to
//! `now + extension`. The deadline never moves backward, and the total
//! extension past the item's natural end is optionally capped.

use chrono::{DateTime, Duration, Utc};

use crate::config::SnipeConfig;

#[derive(Debug, Clone)]
pub struct SnipePolicy {
    window: Duration,
    extension: Duration,
    max_total_extension: Option<Duration>,
}

impl SnipePolicy {
    pub fn new(config: &SnipeConfig) -> Self {
        Self {
            window: Duration::seconds(config.window_secs as i64),
            extension: Duration::seconds(config.extension_secs as i64),
            max_total_extension: config
                .max_total_extension_secs
                .map(|secs| Duration::seconds(secs as i64)),
        }
    }

    /// New deadline for a bid committing at `now`, or None if this bid
    /// does not qualify for an extension.
    ///
    /// `natural_end` is the deadline the item would have had with no
    /// extensions; the cap is measured from there.
    pub fn extend(
        &self,
        now: DateTime<Utc>,
        deadline: DateTime<Utc>,
        natural_end: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if deadline - now > self.window {
            return None;
        }

        let mut extended = now + self.extension;
        if let Some(cap) = self.max_total_extension {
            extended = extended.min(natural_end + cap);
        }

        // Forward-only: an extension that would not gain time is no extension
        (extended > deadline).then_some(extended)
    }
}

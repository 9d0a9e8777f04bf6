//! Staleness predicate shared by query-time filtering and eviction.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::entity::Price;

/// Default maximum age of a cached price (30 days).
pub const DEFAULT_EVICTION_THRESHOLD: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Decides whether a price has aged out of the cache.
///
/// A price is stale when `now - timestamp > threshold`. A price exactly at the
/// threshold is still served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    threshold: TimeDelta,
}

impl EvictionPolicy {
    /// Create a policy with the given maximum age.
    ///
    /// Thresholds beyond what `TimeDelta` can represent saturate, which
    /// effectively disables eviction.
    #[must_use]
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold: TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Configured maximum age.
    #[must_use]
    pub const fn threshold(&self) -> TimeDelta {
        self.threshold
    }

    /// Whether `price` is stale at `now`.
    #[must_use]
    pub fn is_stale(&self, price: &Price, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(price.timestamp()) > self.threshold
    }
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EVICTION_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn price_at(timestamp: DateTime<Utc>) -> Price {
        Price::new("Bloomberg", "AAPL", 1.0, 1.0, timestamp)
    }

    #[test]
    fn default_threshold_is_thirty_days() {
        assert_eq!(EvictionPolicy::default().threshold(), TimeDelta::days(30));
    }

    #[test]
    fn boundary_is_not_stale() {
        let policy = EvictionPolicy::new(Duration::from_secs(60));
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        assert!(!policy.is_stale(&price_at(now - TimeDelta::seconds(60)), now));
        assert!(policy.is_stale(&price_at(now - TimeDelta::seconds(61)), now));
    }

    #[test]
    fn future_prices_are_fresh() {
        let policy = EvictionPolicy::new(Duration::from_secs(1));
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        assert!(!policy.is_stale(&price_at(now + TimeDelta::days(1)), now));
    }

    #[test]
    fn huge_threshold_saturates() {
        let policy = EvictionPolicy::new(Duration::MAX);
        let now = Utc::now();

        assert_eq!(policy.threshold(), TimeDelta::MAX);
        assert!(!policy.is_stale(&price_at(DateTime::<Utc>::MIN_UTC), now));
    }
}

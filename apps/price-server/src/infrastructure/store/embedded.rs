//! Embedded Price Store
//!
//! In-memory, append-only price cache. Entries are bucketed by the
//! case-folded vendor id inside a sharded `DashMap`, so appends for different
//! vendors rarely contend and no operation takes a global lock.
//!
//! Readers see a weakly consistent view: a query may or may not observe an
//! append or eviction that runs concurrently with it, but it never observes a
//! partially applied one. Instrument queries scan every bucket; vendor queries
//! touch a single bucket. Sorting happens after all shard locks are released.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::price::{
    EvictionPolicy, Price, PriceStore, StoreError, fold_case, matches_key, query_key,
    sort_most_recent_first,
};

/// Concurrent in-memory `PriceStore`.
#[derive(Debug)]
pub struct EmbeddedPriceStore {
    buckets: DashMap<String, Vec<Price>>,
    policy: EvictionPolicy,
}

impl EmbeddedPriceStore {
    /// Create a store that treats prices older than `eviction_threshold` as
    /// stale.
    #[must_use]
    pub fn new(eviction_threshold: Duration) -> Self {
        Self::with_policy(EvictionPolicy::new(eviction_threshold))
    }

    /// Create a store with an explicit eviction policy.
    #[must_use]
    pub fn with_policy(policy: EvictionPolicy) -> Self {
        tracing::debug!(
            threshold_secs = policy.threshold().num_seconds(),
            "Embedded price store created"
        );
        Self {
            buckets: DashMap::new(),
            policy,
        }
    }

    /// The staleness policy used by queries and eviction.
    #[must_use]
    pub const fn policy(&self) -> &EvictionPolicy {
        &self.policy
    }

    /// Number of distinct vendors currently retained.
    #[must_use]
    pub fn vendor_count(&self) -> usize {
        self.buckets.len()
    }

    /// Drop every retained price.
    pub fn clear(&self) {
        self.buckets.clear();
    }

    fn vendor_prices_at(&self, key: &str, now: DateTime<Utc>) -> Vec<Price> {
        let mut prices: Vec<Price> = self
            .buckets
            .get(key)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|price| !self.policy.is_stale(price, now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        sort_most_recent_first(&mut prices);
        prices
    }

    fn instrument_prices_at(&self, key: &str, now: DateTime<Utc>) -> Vec<Price> {
        let mut prices = Vec::new();
        for bucket in &self.buckets {
            prices.extend(
                bucket
                    .iter()
                    .filter(|price| {
                        matches_key(price.instrument_id(), key)
                            && !self.policy.is_stale(price, now)
                    })
                    .cloned(),
            );
        }

        sort_most_recent_first(&mut prices);
        prices
    }

    fn evict_at(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.buckets.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|price| !self.policy.is_stale(price, now));
            removed += before - bucket.len();
            !bucket.is_empty()
        });
        removed
    }
}

impl Default for EmbeddedPriceStore {
    fn default() -> Self {
        Self::with_policy(EvictionPolicy::default())
    }
}

impl PriceStore for EmbeddedPriceStore {
    fn append(&self, price: Price) -> Result<(), StoreError> {
        tracing::debug!(price = %price, "Appending price");
        self.buckets
            .entry(fold_case(price.vendor_id()))
            .or_default()
            .push(price);
        Ok(())
    }

    fn get_by_vendor(&self, vendor_id: &str) -> Result<Vec<Price>, StoreError> {
        Ok(self.vendor_prices_at(&query_key(vendor_id), Utc::now()))
    }

    fn get_by_instrument(&self, instrument_id: &str) -> Result<Vec<Price>, StoreError> {
        Ok(self.instrument_prices_at(&query_key(instrument_id), Utc::now()))
    }

    fn evict(&self) -> usize {
        tracing::info!("Evicting entries from cache");
        let removed = self.evict_at(Utc::now());
        tracing::info!(removed, remaining = self.len(), "Eviction completed");
        removed
    }

    fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.len()).sum()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::TimeDelta;

    use super::*;

    const THRESHOLD: Duration = Duration::from_secs(24 * 60 * 60);

    fn price(vendor: &str, instrument: &str, timestamp: DateTime<Utc>) -> Price {
        Price::new(vendor, instrument, 1.0, 1.0, timestamp)
    }

    fn stale_timestamp() -> DateTime<Utc> {
        Utc::now() - TimeDelta::from_std(THRESHOLD).unwrap() - TimeDelta::seconds(1)
    }

    #[test]
    fn eviction_removes_only_stale_entries() {
        let store = EmbeddedPriceStore::new(THRESHOLD);
        let young = price("Bloomberg", "AAPL", Utc::now());
        let old = price("Bloomberg", "AAPL", stale_timestamp());
        store.append(young.clone()).unwrap();
        store.append(old).unwrap();
        assert_eq!(store.len(), 2);

        let removed = store.evict();

        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_by_vendor("Bloomberg").unwrap(), vec![young]);
    }

    #[test]
    fn eviction_drops_empty_vendor_buckets() {
        let store = EmbeddedPriceStore::new(THRESHOLD);
        store
            .append(price("Reuters", "AAPL", stale_timestamp()))
            .unwrap();
        store.append(price("Bloomberg", "AAPL", Utc::now())).unwrap();
        assert_eq!(store.vendor_count(), 2);

        store.evict();

        assert_eq!(store.vendor_count(), 1);
    }

    #[test]
    fn stale_entries_hidden_before_eviction() {
        let store = EmbeddedPriceStore::new(THRESHOLD);
        store
            .append(price("Bloomberg", "AAPL", stale_timestamp()))
            .unwrap();

        assert!(store.get_by_vendor("Bloomberg").unwrap().is_empty());
        assert!(store.get_by_instrument("AAPL").unwrap().is_empty());
        // Still physically present until evict runs.
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn queries_at_later_instant_apply_staleness() {
        let store = EmbeddedPriceStore::new(Duration::from_secs(60));
        let now = Utc::now();
        store.append(price("Bloomberg", "AAPL", now)).unwrap();

        let later = now + TimeDelta::seconds(61);

        assert_eq!(store.vendor_prices_at("bloomberg", now).len(), 1);
        assert!(store.vendor_prices_at("bloomberg", later).is_empty());
        assert!(store.instrument_prices_at("aapl", later).is_empty());
        assert_eq!(store.evict_at(later), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn repeated_eviction_is_a_no_op() {
        let store = EmbeddedPriceStore::new(THRESHOLD);
        store.append(price("Bloomberg", "AAPL", Utc::now())).unwrap();
        store
            .append(price("Bloomberg", "MSFT", stale_timestamp()))
            .unwrap();

        assert_eq!(store.evict(), 1);
        let after_first = store.get_by_vendor("bloomberg").unwrap();

        assert_eq!(store.evict(), 0);
        assert_eq!(store.get_by_vendor("bloomberg").unwrap(), after_first);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_ids_are_stored_under_their_own_key() {
        let store = EmbeddedPriceStore::default();
        store.append(price("Bloomberg", "AAPL", Utc::now())).unwrap();
        store.append(price("", "AAPL", Utc::now())).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.vendor_count(), 2);
        assert_eq!(store.vendor_prices_at("", Utc::now()).len(), 1);
        assert_eq!(store.instrument_prices_at("aapl", Utc::now()).len(), 2);
    }

    #[test]
    fn equal_identity_prices_are_both_retained() {
        let store = EmbeddedPriceStore::default();
        let timestamp = Utc::now();
        store
            .append(Price::new("Bloomberg", "AAPL", 1.0, 2.0, timestamp))
            .unwrap();
        store
            .append(Price::new("Bloomberg", "AAPL", 3.0, 4.0, timestamp))
            .unwrap();

        let prices = store.get_by_instrument("AAPL").unwrap();

        assert_eq!(prices.len(), 2);
        let mut bids: Vec<f64> = prices.iter().map(Price::bid).collect();
        bids.sort_by(f64::total_cmp);
        assert_eq!(bids, vec![1.0, 3.0]);
    }

    #[test]
    fn clear_empties_store() {
        let store = EmbeddedPriceStore::default();
        store.append(price("Bloomberg", "AAPL", Utc::now())).unwrap();

        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.vendor_count(), 0);
    }

    #[test]
    fn concurrent_append_evict_and_query() {
        let store = Arc::new(EmbeddedPriceStore::new(THRESHOLD));
        let vendors = ["Bloomberg", "Reuters", "ICE", "Refinitiv"];

        let writers: Vec<_> = vendors
            .iter()
            .map(|vendor| {
                let store = Arc::clone(&store);
                let vendor = (*vendor).to_string();
                thread::spawn(move || {
                    for i in 0..500 {
                        let timestamp = if i % 5 == 0 {
                            stale_timestamp()
                        } else {
                            Utc::now()
                        };
                        store.append(price(&vendor, "AAPL", timestamp)).unwrap();
                    }
                })
            })
            .collect();

        let evictor = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..50 {
                    store.evict();
                }
            })
        };

        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..200 {
                    let prices = store.get_by_instrument("aapl").unwrap();
                    assert!(
                        prices
                            .windows(2)
                            .all(|w| w[0].timestamp() >= w[1].timestamp())
                    );
                }
            })
        };

        for handle in writers {
            handle.join().unwrap();
        }
        evictor.join().unwrap();
        reader.join().unwrap();

        store.evict();
        assert_eq!(store.len(), vendors.len() * 400);
        assert_eq!(store.get_by_instrument("AAPL").unwrap().len(), 1600);
    }
}

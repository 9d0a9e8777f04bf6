//! Price Store Trait
//!
//! Storage contract for the price cache. Implemented by adapters in the
//! infrastructure layer.

use std::sync::Arc;

use super::entity::Price;
use super::errors::StoreError;

/// Repository trait for cached prices.
///
/// Implementations must tolerate concurrent calls from ingestion workers,
/// the eviction ticker and query handlers without global locking.
#[cfg_attr(test, mockall::automock)]
pub trait PriceStore: Send + Sync {
    /// Append a price to the cache.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidArgument` if the adapter refuses the
    /// price. The store is left unchanged. Blank ids are ordinary values.
    fn append(&self, price: Price) -> Result<(), StoreError>;

    /// All non-stale prices for a vendor, most recent first.
    ///
    /// Matching trims the argument and ignores case. A key nothing was stored
    /// under yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidArgument` if the adapter refuses the key.
    fn get_by_vendor(&self, vendor_id: &str) -> Result<Vec<Price>, StoreError>;

    /// All non-stale prices for an instrument across vendors, most recent
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidArgument` if the adapter refuses the key.
    fn get_by_instrument(&self, instrument_id: &str) -> Result<Vec<Price>, StoreError>;

    /// Physically remove stale entries. Returns how many were removed.
    fn evict(&self) -> usize;

    /// Number of retained entries, stale ones included until evicted.
    fn len(&self) -> usize;

    /// Whether the store retains nothing.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: PriceStore + ?Sized> PriceStore for Arc<S> {
    fn append(&self, price: Price) -> Result<(), StoreError> {
        (**self).append(price)
    }

    fn get_by_vendor(&self, vendor_id: &str) -> Result<Vec<Price>, StoreError> {
        (**self).get_by_vendor(vendor_id)
    }

    fn get_by_instrument(&self, instrument_id: &str) -> Result<Vec<Price>, StoreError> {
        (**self).get_by_instrument(instrument_id)
    }

    fn evict(&self) -> usize {
        (**self).evict()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Fold one char: uppercase, then lowercase, keeping a single char.
///
/// Chars whose uppercase form expands (`ß` to `SS`) are kept as is, so
/// folding never changes a key's length in chars. Going through uppercase
/// makes variants like final sigma `ς` and `σ` compare equal.
fn fold_char(c: char) -> char {
    let mut upper = c.to_uppercase();
    let (Some(u), None) = (upper.next(), upper.next()) else {
        return c;
    };
    u.to_lowercase().next().unwrap_or(u)
}

/// Case-fold `value` one char at a time, without trimming.
///
/// Used for both stored ids and query keys so the two always fold the same
/// way.
#[must_use]
pub fn fold_case(value: &str) -> String {
    value.chars().map(fold_char).collect()
}

/// Normalize a query argument: trim, then fold case.
#[must_use]
pub fn query_key(value: &str) -> String {
    fold_case(value.trim())
}

/// Case-insensitive comparison of a stored id against a key produced by
/// `query_key`.
#[must_use]
pub fn matches_key(stored: &str, normalized_query: &str) -> bool {
    stored.chars().map(fold_char).eq(normalized_query.chars())
}

/// Order prices by timestamp, most recent first. Ties keep no particular order.
pub fn sort_most_recent_first(prices: &mut [Price]) {
    prices.sort_unstable_by_key(|price| std::cmp::Reverse(price.timestamp()));
}

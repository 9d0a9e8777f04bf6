//! Price query use case.

use std::sync::Arc;

use crate::domain::price::{Price, PriceStore, StoreError};

/// Read-side service over a `PriceStore`.
pub struct PriceQueryService<S: PriceStore> {
    store: Arc<S>,
}

impl<S: PriceStore> PriceQueryService<S> {
    /// Create a query service over a shared store.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Prices published by `vendor_id`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidArgument` if the store refuses the key.
    #[tracing::instrument(skip(self))]
    pub fn by_vendor(&self, vendor_id: &str) -> Result<Vec<Price>, StoreError> {
        tracing::info!("Requesting prices for vendor");
        let prices = self.store.get_by_vendor(vendor_id)?;
        crate::infrastructure::metrics::record_query("vendor", prices.len());
        Ok(prices)
    }

    /// Prices for `instrument_id` across vendors, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidArgument` if the store refuses the key.
    #[tracing::instrument(skip(self))]
    pub fn by_instrument(&self, instrument_id: &str) -> Result<Vec<Price>, StoreError> {
        tracing::info!("Requesting prices for instrument");
        let prices = self.store.get_by_instrument(instrument_id)?;
        crate::infrastructure::metrics::record_query("instrument", prices.len());
        Ok(prices)
    }
}

impl<S: PriceStore> Clone for PriceQueryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

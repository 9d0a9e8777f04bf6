//! Price Entity
//!
//! The unit retained by the cache and returned from queries.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::PriceEvent;

/// A price received from a vendor for an instrument.
///
/// Identity is `(vendor_id, instrument_id, timestamp)`: two prices that only
/// differ in bid or ask compare equal and hash identically.
///
/// Prices are modeled with `f64` and a single implicit currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    vendor_id: String,
    instrument_id: String,
    bid: f64,
    ask: f64,
    timestamp: DateTime<Utc>,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub fn new(
        vendor_id: impl Into<String>,
        instrument_id: impl Into<String>,
        bid: f64,
        ask: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            vendor_id: vendor_id.into(),
            instrument_id: instrument_id.into(),
            bid,
            ask,
            timestamp,
        }
    }

    /// Convert an inbound event into a price.
    #[must_use]
    pub fn from_event(event: PriceEvent) -> Self {
        Self {
            vendor_id: event.vendor_id,
            instrument_id: event.instrument_id,
            bid: event.bid,
            ask: event.ask,
            timestamp: event.timestamp,
        }
    }

    /// Vendor identifier, as received.
    #[must_use]
    pub fn vendor_id(&self) -> &str {
        &self.vendor_id
    }

    /// Instrument identifier, as received.
    #[must_use]
    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    /// Bid price.
    #[must_use]
    pub const fn bid(&self) -> f64 {
        self.bid
    }

    /// Ask price.
    #[must_use]
    pub const fn ask(&self) -> f64 {
        self.ask
    }

    /// Vendor timestamp; the ordering and eviction key.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl From<PriceEvent> for Price {
    fn from(event: PriceEvent) -> Self {
        Self::from_event(event)
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.vendor_id == other.vendor_id
            && self.instrument_id == other.instrument_id
            && self.timestamp == other.timestamp
    }
}

impl Eq for Price {}

impl Hash for Price {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.vendor_id.hash(state);
        self.instrument_id.hash(state);
        self.timestamp.hash(state);
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Price{{vendorId={}, instrumentId={}, bid={}, ask={}, timestamp={}}}",
            self.vendor_id,
            self.instrument_id,
            self.bid,
            self.ask,
            self.timestamp.to_rfc3339()
        )
    }
}

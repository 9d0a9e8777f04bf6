//! Price Event
//!
//! Wire representation of a price update as it arrives on the mailbox.
//! Kept separate from `Price` so transport metadata can grow here without
//! touching the stored entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inbound price update.
///
/// ```json
/// {"vendorId":"Bloomberg","instrumentId":"AAPL","bid":1.0,"ask":1.1,"timestamp":"2024-01-02T10:00:00Z"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEvent {
    /// Vendor that published the price.
    pub vendor_id: String,
    /// Instrument the price refers to.
    pub instrument_id: String,
    /// Bid price.
    pub bid: f64,
    /// Ask price.
    pub ask: f64,
    /// Instant the vendor stamped the price with.
    pub timestamp: DateTime<Utc>,
}

impl PriceEvent {
    /// Create a new price event.
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

    /// Decode an event from a raw mailbox body.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the body is not a JSON object with
    /// every wire field present and correctly typed.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

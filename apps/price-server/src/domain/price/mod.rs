//! Price Domain
//!
//! Types and rules for the vendor price cache.
//!
//! # Design
//!
//! - `PriceEvent` is the inbound wire form, decoded from mailbox messages.
//! - `Price` is the stored unit, derived one-to-one from a `PriceEvent`.
//! - `PriceStore` is the storage contract; adapters live in infrastructure.
//! - `EvictionPolicy` is the single staleness predicate shared by query-time
//!   filtering and physical eviction.

mod entity;
mod errors;
mod event;
mod eviction;
mod store;

pub use entity::Price;
pub use errors::StoreError;
pub use event::PriceEvent;
pub use eviction::{DEFAULT_EVICTION_THRESHOLD, EvictionPolicy};
pub use store::{PriceStore, fold_case, matches_key, query_key, sort_most_recent_first};

#[cfg(test)]
pub use store::MockPriceStore;

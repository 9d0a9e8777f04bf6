//! Domain Layer - Price cache types and business rules.
//!
//! This layer contains the price entity, its wire-level event form, the
//! staleness rules and the store contract. No I/O lives here.

/// Price entity, wire event, store contract and eviction policy.
pub mod price;

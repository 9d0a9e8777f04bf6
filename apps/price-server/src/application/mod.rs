//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the ingestion and query services and the port
//! interfaces they use to reach the mailbox and the dead-letter channel.

/// Port interfaces for external systems (mailbox, dead letters).
pub mod ports;

/// Application services for ingestion and querying.
pub mod services;

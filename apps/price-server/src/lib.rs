#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Price Server - Vendor Price Cache
//!
//! Consumes price updates published by market-data vendors, keeps them in a
//! concurrent in-memory cache and answers "latest prices by vendor" and
//! "latest prices by instrument" queries. Messages that cannot be decoded or
//! stored are diverted to a dead-letter channel; prices older than the
//! eviction threshold are hidden from queries and periodically dropped.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Price model and store contract
//!   - `price`: `PriceEvent`, `Price`, `PriceStore`, eviction policy
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Mailbox and dead-letter interfaces
//!   - `services`: Ingestion pipeline, price queries
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `store`: Sharded in-memory `PriceStore`
//!   - `mailbox`: Bounded in-memory mailbox and TCP line listener
//!   - `dead_letter`: Bounded dead-letter retention with live fan-out
//!   - `eviction`: Periodic eviction ticker
//!   - `http`: Query, health and metrics endpoints
//!   - `config`: Environment configuration
//!
//! # Data Flow
//!
//! ```text
//! TCP lines ──┐                                 ┌──► Price Store ◄── Eviction ticker
//!             ├──► Mailbox ──► Ingestion ───────┤          ▲
//! senders ────┘              pipeline           └──► Dead letters
//!                                                          │
//!                                       HTTP queries ──────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Price model and store contract.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::price::{EvictionPolicy, Price, PriceEvent, PriceStore, StoreError};

// Application
pub use application::ports::{
    DeadLetter, DeadLetterError, DeadLetterPort, DeadLetterReason, DeliveryTag, InboundMessage,
    MailboxError, MailboxPort,
};
pub use application::services::{
    Disposition, IngestionError, IngestionPipeline, IngestionStats, IngestionStatsHandle,
    PriceQueryService,
};

// Infrastructure adapters
pub use infrastructure::config::{
    ConfigError, EvictionSettings, IngestionSettings, ServerConfig, ServerSettings,
};
pub use infrastructure::dead_letter::InMemoryDeadLetters;
pub use infrastructure::eviction::EvictionTicker;
pub use infrastructure::http::{HttpServer, HttpServerError, HttpState, create_router};
pub use infrastructure::mailbox::{
    InMemoryMailbox, MailboxListener, MailboxListenerError, MailboxSender,
};
pub use infrastructure::store::EmbeddedPriceStore;

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};

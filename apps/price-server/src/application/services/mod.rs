//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `IngestionPipeline`: Mailbox → price store, with dead-letter routing
//! - `PriceQueryService`: Read side used by the HTTP layer

mod ingestion;
mod query;

pub use ingestion::{
    Disposition, IngestionError, IngestionPipeline, IngestionStats, IngestionStatsHandle,
};
pub use query::PriceQueryService;

pub(crate) use ingestion::panic_message;

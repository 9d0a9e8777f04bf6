//! Configuration Module
//!
//! Configuration loading for the price server.

mod settings;

pub use settings::{ConfigError, EvictionSettings, IngestionSettings, ServerConfig, ServerSettings};

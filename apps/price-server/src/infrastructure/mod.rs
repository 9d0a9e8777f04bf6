//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Configuration loading.
pub mod config;

/// In-memory dead-letter channel.
pub mod dead_letter;

/// Periodic eviction of stale prices.
pub mod eviction;

/// HTTP query, health and metrics endpoint.
pub mod http;

/// Mailbox adapters (in-memory channel, TCP listener).
pub mod mailbox;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Concurrent in-memory price store.
pub mod store;

/// Structured logging and OpenTelemetry tracing.
pub mod telemetry;

//! HTTP Query, Health and Metrics Endpoint
//!
//! # Endpoints
//!
//! - `GET /prices/vendors/{vendor_id}` - Prices from one vendor, newest first
//! - `GET /prices/instruments/{instrument_id}` - Prices for one instrument, newest first
//! - `GET /deadletters` - Retained dead letters, oldest first
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (checks ingestion workers)
//! - `GET /metrics` - Prometheus metrics in text format

mod handlers;
mod health;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use handlers::ApiError;
pub use health::{HealthResponse, HealthStatus};

use crate::application::services::{IngestionStatsHandle, PriceQueryService};
use crate::domain::price::PriceStore;
use crate::infrastructure::dead_letter::InMemoryDeadLetters;

// =============================================================================
// Server State
// =============================================================================

/// Shared state for HTTP handlers.
pub struct HttpState<S: PriceStore> {
    queries: PriceQueryService<S>,
    store: Arc<S>,
    dead_letters: Arc<InMemoryDeadLetters>,
    ingestion: IngestionStatsHandle,
    version: String,
    started_at: Instant,
}

impl<S: PriceStore> HttpState<S> {
    /// Create handler state over the shared store and dead-letter channel.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        dead_letters: Arc<InMemoryDeadLetters>,
        ingestion: IngestionStatsHandle,
        version: impl Into<String>,
    ) -> Self {
        Self {
            queries: PriceQueryService::new(Arc::clone(&store)),
            store,
            dead_letters,
            ingestion,
            version: version.into(),
            started_at: Instant::now(),
        }
    }
}

impl<S: PriceStore> Clone for HttpState<S> {
    fn clone(&self) -> Self {
        Self {
            queries: self.queries.clone(),
            store: Arc::clone(&self.store),
            dead_letters: Arc::clone(&self.dead_letters),
            ingestion: self.ingestion.clone(),
            version: self.version.clone(),
            started_at: self.started_at,
        }
    }
}

/// Build the router for all endpoints.
pub fn create_router<S: PriceStore + 'static>(state: HttpState<S>) -> Router {
    Router::new()
        .route("/prices/vendors/{vendor_id}", get(handlers::vendor_prices::<S>))
        .route(
            "/prices/instruments/{instrument_id}",
            get(handlers::instrument_prices::<S>),
        )
        .route("/deadletters", get(handlers::dead_letters::<S>))
        .route("/health", get(health::health_handler::<S>))
        .route("/healthz", get(health::liveness_handler))
        .route("/readyz", get(health::readiness_handler::<S>))
        .route("/metrics", get(health::metrics_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Server
// =============================================================================

/// Query and health HTTP server.
pub struct HttpServer<S: PriceStore + 'static> {
    port: u16,
    state: HttpState<S>,
    cancel: CancellationToken,
}

impl<S: PriceStore + 'static> HttpServer<S> {
    /// Create a new HTTP server.
    #[must_use]
    pub const fn new(port: u16, state: HttpState<S>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HttpServerError> {
        let app = create_router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HttpServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

//! Health, readiness and metrics handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::HttpState;
use crate::application::services::IngestionStats;
use crate::domain::price::PriceStore;
use crate::infrastructure::metrics::get_metrics_handle;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Server version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Prices currently retained, stale ones included until evicted.
    pub cached_prices: usize,
    /// Ingestion counters.
    pub ingestion: IngestionStats,
    /// Dead letters currently retained.
    pub dead_letters: usize,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Ingesting normally.
    Healthy,
    /// Ingesting, but dead letters are being lost.
    Degraded,
    /// No ingestion worker running.
    Unhealthy,
}

pub(super) async fn health_handler<S: PriceStore + 'static>(
    State(state): State<HttpState<S>>,
) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

pub(super) async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub(super) async fn readiness_handler<S: PriceStore + 'static>(
    State(state): State<HttpState<S>>,
) -> impl IntoResponse {
    if state.ingestion.snapshot().active_workers > 0 {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

pub(super) async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response<S: PriceStore>(state: &HttpState<S>) -> HealthResponse {
    let ingestion = state.ingestion.snapshot();

    HealthResponse {
        status: determine_health_status(&ingestion),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        cached_prices: state.store.len(),
        ingestion,
        dead_letters: state.dead_letters.len(),
    }
}

const fn determine_health_status(ingestion: &IngestionStats) -> HealthStatus {
    if ingestion.active_workers == 0 {
        HealthStatus::Unhealthy
    } else if ingestion.dead_letter_failures > 0 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

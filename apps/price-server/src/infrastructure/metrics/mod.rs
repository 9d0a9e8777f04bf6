//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Ingestion**: Messages received, prices stored, dead letters
//! - **Cache**: Retained price count, eviction runs and removals
//! - **Queries**: Query counts and result sizes by key type
//! - **Latency**: Per-message processing time
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the HTTP server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::application::ports::DeadLetterReason;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if another global recorder was already installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "price_server_messages_received_total",
        "Total messages taken from the mailbox"
    );
    describe_counter!(
        "price_server_prices_stored_total",
        "Total prices appended to the cache"
    );
    describe_counter!(
        "price_server_dead_letters_total",
        "Total messages routed to dead letters by reason"
    );
    describe_counter!(
        "price_server_dead_letter_failures_total",
        "Total dead letters that could not be published"
    );

    describe_counter!(
        "price_server_evictions_total",
        "Total eviction runs by outcome"
    );
    describe_counter!(
        "price_server_evicted_prices_total",
        "Total prices physically removed by eviction"
    );
    describe_gauge!(
        "price_server_cached_prices",
        "Prices currently retained, stale ones included until evicted"
    );

    describe_counter!(
        "price_server_queries_total",
        "Total price queries by key type"
    );
    describe_histogram!(
        "price_server_query_results",
        "Number of prices returned per query"
    );

    describe_histogram!(
        "price_server_message_processing_seconds",
        "Time to decode, store or dead-letter one message"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a message taken from the mailbox.
pub fn record_message_received() {
    counter!("price_server_messages_received_total").increment(1);
}

/// Record a price appended to the cache.
pub fn record_price_stored() {
    counter!("price_server_prices_stored_total").increment(1);
}

/// Record a dead-lettered message.
pub fn record_dead_letter(reason: DeadLetterReason) {
    counter!(
        "price_server_dead_letters_total",
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Record a dead letter that could not be published.
pub fn record_dead_letter_failure() {
    counter!("price_server_dead_letter_failures_total").increment(1);
}

/// Record a completed eviction run.
pub fn record_eviction(removed: usize, remaining: usize) {
    counter!("price_server_evictions_total", "outcome" => "ok").increment(1);
    counter!("price_server_evicted_prices_total").increment(removed as u64);
    set_cached_prices(remaining);
}

/// Record an eviction run that failed.
pub fn record_eviction_failure() {
    counter!("price_server_evictions_total", "outcome" => "failed").increment(1);
}

/// Update the retained price gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_cached_prices(count: usize) {
    gauge!("price_server_cached_prices").set(count as f64);
}

/// Record a query and the number of prices it returned.
#[allow(clippy::cast_precision_loss)]
pub fn record_query(key_type: &'static str, results: usize) {
    counter!("price_server_queries_total", "key" => key_type).increment(1);
    histogram!("price_server_query_results", "key" => key_type).record(results as f64);
}

/// Record message processing duration.
pub fn record_processing_duration(duration: Duration) {
    histogram!("price_server_message_processing_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================

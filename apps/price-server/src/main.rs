//! Price Server Binary
//!
//! Starts the vendor price cache.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin price-server
//! ```
//!
//! # Environment Variables
//!
//! - `PRICE_SERVER_HTTP_PORT`: Query/health/metrics HTTP port (default: 8080)
//! - `PRICE_SERVER_MAILBOX_PORT`: TCP mailbox port, 0 disables (default: 61616)
//! - `PRICE_SERVER_MAILBOX_CAPACITY`: Bounded mailbox size (default: 1024)
//! - `PRICE_SERVER_INGEST_WORKERS`: Ingestion workers (default: 1)
//! - `PRICE_SERVER_DEAD_LETTER_RETENTION`: Retained dead letters (default: 10000)
//! - `PRICE_SERVER_EVICTION_THRESHOLD_SECS`: Staleness threshold (default: 2592000)
//! - `PRICE_SERVER_EVICTION_PERIOD_SECS`: Eviction interval (default: 60)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: price-server)
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use price_server::infrastructure::telemetry;
use price_server::{
    EmbeddedPriceStore, EvictionTicker, HttpServer, HttpState, InMemoryDeadLetters,
    InMemoryMailbox, IngestionPipeline, MailboxListener, PriceStore, ServerConfig, init_metrics,
};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    // Initialize telemetry (tracing + optional OpenTelemetry)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting price server");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = ServerConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // One store shared by ingestion, queries, eviction and health
    let store = Arc::new(EmbeddedPriceStore::new(config.eviction.threshold));
    let dead_letters = Arc::new(InMemoryDeadLetters::new(
        config.ingestion.dead_letter_retention,
    ));
    let (mailbox_sender, mailbox) = InMemoryMailbox::channel(config.ingestion.mailbox_capacity);
    let mailbox = Arc::new(mailbox);

    let pipeline = IngestionPipeline::new(Arc::clone(&store), Arc::clone(&dead_letters));
    let ingestion_stats = pipeline.stats();

    let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(config.ingestion.workers);
    for worker in 0..config.ingestion.workers {
        let pipeline = pipeline.clone();
        let mailbox = Arc::clone(&mailbox);
        let cancel = shutdown_token.clone();
        workers.push(tokio::spawn(async move {
            tracing::debug!(worker, "Spawning ingestion worker");
            pipeline.run(mailbox, cancel).await;
        }));
    }

    // Spawn eviction ticker
    let ticker = EvictionTicker::new(
        Arc::clone(&store),
        config.eviction.period,
        shutdown_token.clone(),
    );
    workers.push(tokio::spawn(ticker.run()));

    // Spawn TCP mailbox listener
    if config.server.mailbox_listener_enabled() {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.mailbox_port));
        let listener = MailboxListener::bind(addr, mailbox_sender).await?;
        let cancel = shutdown_token.clone();
        tokio::spawn(async move {
            if let Err(e) = listener.run(cancel).await {
                tracing::error!(error = %e, "Mailbox listener error");
            }
        });
    } else {
        tracing::info!("Mailbox listener disabled");
        drop(mailbox_sender);
    }

    // Spawn HTTP server
    let http_state = HttpState::new(
        Arc::clone(&store),
        Arc::clone(&dead_letters),
        ingestion_stats,
        env!("CARGO_PKG_VERSION"),
    );
    let http_server = HttpServer::new(
        config.server.http_port,
        http_state,
        shutdown_token.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = http_server.run().await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    tracing::info!("Price server ready");

    await_shutdown(shutdown_token).await;

    let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Background task failed");
            }
        }
    })
    .await;

    if drained.is_err() {
        tracing::warn!("Shutdown timeout elapsed before all tasks stopped");
    }

    tracing::info!(
        cached_prices = store.len(),
        dead_letters = dead_letters.len(),
        "Price server stopped"
    );
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &ServerConfig) {
    tracing::info!(
        http_port = config.server.http_port,
        mailbox_port = config.server.mailbox_port,
        workers = config.ingestion.workers,
        mailbox_capacity = config.ingestion.mailbox_capacity,
        dead_letter_retention = config.ingestion.dead_letter_retention,
        "Configuration loaded"
    );
    tracing::debug!(
        threshold_secs = config.eviction.threshold.as_secs(),
        period_secs = config.eviction.period.as_secs(),
        "Eviction schedule"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}

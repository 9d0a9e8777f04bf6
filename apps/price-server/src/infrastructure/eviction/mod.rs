//! Eviction Ticker
//!
//! Periodically asks the price store to physically drop stale prices.
//! Queries already hide stale prices, so the ticker only bounds memory.
//! A failing run is logged and the next tick runs as scheduled.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::application::services::panic_message;
use crate::domain::price::PriceStore;
use crate::infrastructure::metrics;

/// Runs `PriceStore::evict` on a fixed period until cancelled.
pub struct EvictionTicker<S: PriceStore> {
    store: Arc<S>,
    period: Duration,
    cancel: CancellationToken,
}

impl<S: PriceStore> EvictionTicker<S> {
    /// Create a ticker. The first run happens one `period` after `run` starts.
    #[must_use]
    pub const fn new(store: Arc<S>, period: Duration, cancel: CancellationToken) -> Self {
        Self {
            store,
            period,
            cancel,
        }
    }

    /// Run until cancelled.
    pub async fn run(self) {
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(period_secs = self.period.as_secs_f64(), "Eviction ticker started");

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    tracing::info!("Eviction ticker stopped");
                    break;
                }

                _ = interval.tick() => {
                    self.tick();
                }
            }
        }
    }

    /// Run one eviction. Returns the number of prices removed, or `None` if
    /// the run failed.
    pub fn tick(&self) -> Option<usize> {
        match catch_unwind(AssertUnwindSafe(|| self.store.evict())) {
            Ok(removed) => {
                let remaining = self.store.len();
                metrics::record_eviction(removed, remaining);
                if removed > 0 {
                    tracing::debug!(removed, remaining, "Eviction tick completed");
                }
                Some(removed)
            }
            Err(payload) => {
                metrics::record_eviction_failure();
                tracing::error!(
                    error = panic_message(payload.as_ref()),
                    "Eviction tick failed"
                );
                None
            }
        }
    }
}

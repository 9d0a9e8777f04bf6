//! Ingestion Pipeline
//!
//! Bridges the mailbox to the price store. Each message is handled in
//! isolation:
//!
//! ```text
//! receive ─► decode PriceEvent ─► Price::from_event ─► store.append ─► ack
//!                 │                                        │
//!                 └──────────── dead letter ◄──────────────┘ ─► ack
//! ```
//!
//! A message is acknowledged only after it was stored or dead-lettered, so a
//! crash mid-way leaves it to the transport's redelivery, and a failing
//! message is diverted once instead of looping.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    DeadLetter, DeadLetterPort, DeadLetterReason, InboundMessage, MailboxPort,
};
use crate::domain::price::{Price, PriceEvent, PriceStore};
use crate::infrastructure::metrics;

// =============================================================================
// Outcomes
// =============================================================================

/// Final state of a single inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// The price was appended to the store.
    Stored(Price),
    /// The message was diverted to the dead-letter channel.
    DeadLettered(DeadLetter),
}

impl Disposition {
    /// Whether the message ended up in the store.
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        matches!(self, Self::Stored(_))
    }
}

/// Failure while handling a message.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    /// Body is not a valid price event.
    #[error("failed to deserialize price event: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// Event decoded but conversion or append failed.
    #[error("failed to process price event: {0}")]
    Processing(String),
}

impl IngestionError {
    /// Dead-letter category for this failure.
    #[must_use]
    pub const fn reason(&self) -> DeadLetterReason {
        match self {
            Self::Deserialization(_) => DeadLetterReason::Deserialization,
            Self::Processing(_) => DeadLetterReason::Processing,
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

#[derive(Debug, Default)]
struct IngestionCounters {
    received: AtomicU64,
    stored: AtomicU64,
    dead_lettered: AtomicU64,
    dead_letter_failures: AtomicU64,
    active_workers: AtomicUsize,
}

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestionStats {
    /// Messages taken from the mailbox.
    pub received: u64,
    /// Prices appended to the store.
    pub stored: u64,
    /// Messages diverted to dead letters.
    pub dead_lettered: u64,
    /// Dead letters that could not be published.
    pub dead_letter_failures: u64,
    /// Consume loops currently running.
    pub active_workers: usize,
}

/// Read-only handle on the pipeline counters, for health reporting.
#[derive(Debug, Clone)]
pub struct IngestionStatsHandle(Arc<IngestionCounters>);

impl IngestionStatsHandle {
    /// Snapshot the counters.
    #[must_use]
    pub fn snapshot(&self) -> IngestionStats {
        let counters = &self.0;
        IngestionStats {
            received: counters.received.load(Ordering::Relaxed),
            stored: counters.stored.load(Ordering::Relaxed),
            dead_lettered: counters.dead_lettered.load(Ordering::Relaxed),
            dead_letter_failures: counters.dead_letter_failures.load(Ordering::Relaxed),
            active_workers: counters.active_workers.load(Ordering::Relaxed),
        }
    }
}

struct WorkerGuard(Arc<IngestionCounters>);

impl WorkerGuard {
    fn enter(counters: &Arc<IngestionCounters>) -> Self {
        counters.active_workers.fetch_add(1, Ordering::Relaxed);
        Self(Arc::clone(counters))
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.0.active_workers.fetch_sub(1, Ordering::Relaxed);
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Consumes mailbox messages into a `PriceStore`.
///
/// Cloning is cheap; clones share the store, the dead-letter sink and the
/// counters, so one clone per worker can run `run` concurrently.
pub struct IngestionPipeline<S, D>
where
    S: PriceStore + 'static,
    D: DeadLetterPort + 'static,
{
    store: Arc<S>,
    dead_letters: Arc<D>,
    counters: Arc<IngestionCounters>,
}

impl<S, D> Clone for IngestionPipeline<S, D>
where
    S: PriceStore + 'static,
    D: DeadLetterPort + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            dead_letters: Arc::clone(&self.dead_letters),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<S, D> IngestionPipeline<S, D>
where
    S: PriceStore + 'static,
    D: DeadLetterPort + 'static,
{
    /// Create a pipeline writing to `store` and diverting failures to
    /// `dead_letters`.
    #[must_use]
    pub fn new(store: Arc<S>, dead_letters: Arc<D>) -> Self {
        Self {
            store,
            dead_letters,
            counters: Arc::new(IngestionCounters::default()),
        }
    }

    /// Handle on the shared counters.
    #[must_use]
    pub fn stats(&self) -> IngestionStatsHandle {
        IngestionStatsHandle(Arc::clone(&self.counters))
    }

    /// Consume `mailbox` until it closes or `cancel` fires.
    ///
    /// A message already taken from the mailbox is always processed and
    /// acknowledged before cancellation is honored.
    pub async fn run<M>(self, mailbox: Arc<M>, cancel: CancellationToken)
    where
        M: MailboxPort + ?Sized,
    {
        let _guard = WorkerGuard::enter(&self.counters);
        tracing::info!("Ingestion worker started");

        loop {
            let message = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!("Ingestion worker cancelled");
                    break;
                }
                message = mailbox.receive() => match message {
                    Some(message) => message,
                    None => {
                        tracing::info!("Mailbox closed");
                        break;
                    }
                },
            };

            let tag = message.tag;
            self.process(&message).await;

            if let Err(e) = mailbox.acknowledge(tag).await {
                tracing::error!(tag, error = %e, "Failed to acknowledge message");
            }
        }

        tracing::info!("Ingestion worker stopped");
    }

    /// Store one message, or dead-letter it.
    ///
    /// Never fails: every outcome is reported through the returned
    /// `Disposition`.
    pub async fn process(&self, message: &InboundMessage) -> Disposition {
        let started = Instant::now();
        self.counters.received.fetch_add(1, Ordering::Relaxed);
        metrics::record_message_received();

        let disposition = match self.store_message(&message.body) {
            Ok(price) => {
                self.counters.stored.fetch_add(1, Ordering::Relaxed);
                metrics::record_price_stored();
                tracing::debug!(tag = message.tag, price = %price, "Price stored");
                Disposition::Stored(price)
            }
            Err(e) => {
                let letter = DeadLetter::new(e.reason(), e.to_string(), message);
                tracing::warn!(
                    tag = message.tag,
                    reason = letter.reason.as_str(),
                    error = %e,
                    "Routing message to dead letters"
                );
                self.dead_letter(letter.clone()).await;
                Disposition::DeadLettered(letter)
            }
        };

        metrics::record_processing_duration(started.elapsed());
        disposition
    }

    fn store_message(&self, body: &str) -> Result<Price, IngestionError> {
        let event = PriceEvent::from_json(body)?;
        tracing::info!(
            vendor_id = %event.vendor_id,
            instrument_id = %event.instrument_id,
            "Received price event"
        );

        let price = Price::from_event(event);
        let stored = price.clone();
        let store = &self.store;

        match catch_unwind(AssertUnwindSafe(|| store.append(price))) {
            Ok(Ok(())) => Ok(stored),
            Ok(Err(e)) => Err(IngestionError::Processing(e.to_string())),
            Err(payload) => Err(IngestionError::Processing(format!(
                "store panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }

    async fn dead_letter(&self, letter: DeadLetter) {
        let reason = letter.reason;
        match self.dead_letters.publish(letter).await {
            Ok(()) => {
                self.counters.dead_lettered.fetch_add(1, Ordering::Relaxed);
                metrics::record_dead_letter(reason);
            }
            Err(e) => {
                self.counters
                    .dead_letter_failures
                    .fetch_add(1, Ordering::Relaxed);
                metrics::record_dead_letter_failure();
                tracing::error!(error = %e, "Failed to publish dead letter; message dropped");
            }
        }
    }
}

/// Best-effort description of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mockall::predicate::always;

    use super::*;
    use crate::application::ports::{DeadLetterError, MockDeadLetterPort};
    use crate::domain::price::{MockPriceStore, StoreError};

    const VALID: &str = r#"{"vendorId":"test","instrumentId":"test","bid":0.0,"ask":0.0,"timestamp":"2024-03-01T09:30:00Z"}"#;

    fn expected_price() -> Price {
        Price::new(
            "test",
            "test",
            0.0,
            0.0,
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        )
    }

    fn accepting_dead_letters() -> MockDeadLetterPort {
        let mut dead_letters = MockDeadLetterPort::new();
        dead_letters.expect_publish().never();
        dead_letters
    }

    #[tokio::test]
    async fn valid_event_is_appended_once() {
        let mut store = MockPriceStore::new();
        store
            .expect_append()
            .withf(|price| *price == expected_price())
            .times(1)
            .returning(|_| Ok(()));

        let pipeline = IngestionPipeline::new(Arc::new(store), Arc::new(accepting_dead_letters()));

        let disposition = pipeline.process(&InboundMessage::new(1, VALID)).await;

        assert_eq!(disposition, Disposition::Stored(expected_price()));
        let stats = pipeline.stats().snapshot();
        assert_eq!(stats.received, 1);
        assert_eq!(stats.stored, 1);
        assert_eq!(stats.dead_lettered, 0);
    }

    #[tokio::test]
    async fn malformed_body_is_dead_lettered_verbatim() {
        let mut store = MockPriceStore::new();
        store.expect_append().never();

        let mut dead_letters = MockDeadLetterPort::new();
        dead_letters
            .expect_publish()
            .withf(|letter| {
                letter.body == "Not an Event"
                    && letter.reason == DeadLetterReason::Deserialization
            })
            .times(1)
            .returning(|_| Ok(()));

        let pipeline = IngestionPipeline::new(Arc::new(store), Arc::new(dead_letters));

        let disposition = pipeline
            .process(&InboundMessage::new(7, "Not an Event"))
            .await;

        assert!(!disposition.is_stored());
        assert_eq!(pipeline.stats().snapshot().dead_lettered, 1);
    }

    #[tokio::test]
    async fn store_rejection_is_dead_lettered_as_processing_failure() {
        let mut store = MockPriceStore::new();
        store
            .expect_append()
            .times(1)
            .returning(|_| Err(StoreError::invalid_argument("vendorId", "unknown vendor")));

        let mut dead_letters = MockDeadLetterPort::new();
        dead_letters
            .expect_publish()
            .withf(|letter| letter.reason == DeadLetterReason::Processing && letter.body == VALID)
            .times(1)
            .returning(|_| Ok(()));

        let pipeline = IngestionPipeline::new(Arc::new(store), Arc::new(dead_letters));

        let disposition = pipeline.process(&InboundMessage::new(1, VALID)).await;

        match disposition {
            Disposition::DeadLettered(letter) => {
                assert!(letter.error.contains("unknown vendor"));
            }
            Disposition::Stored(_) => panic!("expected dead letter"),
        }
    }

    struct PanickingStore;

    impl PriceStore for PanickingStore {
        fn append(&self, _price: Price) -> Result<(), StoreError> {
            panic!("store exploded");
        }

        fn get_by_vendor(&self, _vendor_id: &str) -> Result<Vec<Price>, StoreError> {
            Ok(vec![])
        }

        fn get_by_instrument(&self, _instrument_id: &str) -> Result<Vec<Price>, StoreError> {
            Ok(vec![])
        }

        fn evict(&self) -> usize {
            0
        }

        fn len(&self) -> usize {
            0
        }
    }

    #[tokio::test]
    async fn store_panic_is_contained() {
        let mut dead_letters = MockDeadLetterPort::new();
        dead_letters
            .expect_publish()
            .withf(|letter| letter.error.contains("store exploded"))
            .times(1)
            .returning(|_| Ok(()));

        let pipeline = IngestionPipeline::new(Arc::new(PanickingStore), Arc::new(dead_letters));

        let disposition = pipeline.process(&InboundMessage::new(1, VALID)).await;

        assert!(!disposition.is_stored());
        assert_eq!(pipeline.stats().snapshot().dead_lettered, 1);
    }

    #[tokio::test]
    async fn dead_letter_failure_is_counted_not_propagated() {
        let store = MockPriceStore::new();

        let mut dead_letters = MockDeadLetterPort::new();
        dead_letters
            .expect_publish()
            .with(always())
            .times(1)
            .returning(|_| Err(DeadLetterError::Unavailable("closed".to_string())));

        let pipeline = IngestionPipeline::new(Arc::new(store), Arc::new(dead_letters));

        pipeline.process(&InboundMessage::new(1, "{}")).await;

        let stats = pipeline.stats().snapshot();
        assert_eq!(stats.dead_lettered, 0);
        assert_eq!(stats.dead_letter_failures, 1);
    }

    #[test]
    fn error_reasons() {
        let decode = PriceEvent::from_json("nope").unwrap_err();
        assert_eq!(
            IngestionError::from(decode).reason(),
            DeadLetterReason::Deserialization
        );
        assert_eq!(
            IngestionError::Processing("x".to_string()).reason(),
            DeadLetterReason::Processing
        );
    }

    #[test]
    fn panic_payloads_are_described() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(42_u8);

        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}

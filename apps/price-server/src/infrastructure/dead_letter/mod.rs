//! In-Memory Dead Letter Channel
//!
//! Retains failed messages for inspection and fans them out to live
//! subscribers over a tokio broadcast channel.
//!
//! Retention is bounded: once `retention` letters are held, the oldest is
//! dropped for each new one. Broadcast subscribers that fall behind see
//! `RecvError::Lagged` rather than blocking publishers.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::application::ports::{DeadLetter, DeadLetterError, DeadLetterPort};

/// Default number of retained dead letters.
pub const DEFAULT_RETENTION: usize = 10_000;

/// Capacity of the live subscriber channel.
const SUBSCRIBER_CAPACITY: usize = 1_024;

/// Bounded in-memory dead-letter channel.
#[derive(Debug)]
pub struct InMemoryDeadLetters {
    retained: Mutex<VecDeque<DeadLetter>>,
    retention: usize,
    live_tx: broadcast::Sender<DeadLetter>,
    published: AtomicU64,
}

impl InMemoryDeadLetters {
    /// Create a channel retaining at most `retention` letters.
    ///
    /// A retention of zero keeps nothing; letters still reach subscribers.
    #[must_use]
    pub fn new(retention: usize) -> Self {
        Self {
            retained: Mutex::new(VecDeque::with_capacity(retention.min(DEFAULT_RETENTION))),
            retention,
            live_tx: broadcast::channel(SUBSCRIBER_CAPACITY).0,
            published: AtomicU64::new(0),
        }
    }

    /// Retained letters, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DeadLetter> {
        self.retained.lock().iter().cloned().collect()
    }

    /// Number of retained letters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.retained.lock().len()
    }

    /// Whether no letters are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.retained.lock().is_empty()
    }

    /// Letters published since start, including dropped ones.
    #[must_use]
    pub fn total_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Subscribe to letters published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeadLetter> {
        self.live_tx.subscribe()
    }

    fn retain(&self, letter: DeadLetter) {
        if self.retention == 0 {
            return;
        }

        let mut retained = self.retained.lock();
        while retained.len() >= self.retention {
            retained.pop_front();
        }
        retained.push_back(letter);
    }
}

impl Default for InMemoryDeadLetters {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

#[async_trait]
impl DeadLetterPort for InMemoryDeadLetters {
    async fn publish(&self, letter: DeadLetter) -> Result<(), DeadLetterError> {
        tracing::warn!(
            id = %letter.id,
            reason = letter.reason.as_str(),
            error = %letter.error,
            body = %letter.body,
            "Message dead-lettered"
        );

        // No subscribers is not a failure.
        let _ = self.live_tx.send(letter.clone());
        self.retain(letter);
        self.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Shared dead-letter channel reference.
pub type SharedDeadLetters = Arc<InMemoryDeadLetters>;

// =============================================================================
// Tests
// =============================================================================

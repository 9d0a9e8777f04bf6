//! Bounded in-memory mailbox.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::application::ports::{DeliveryTag, InboundMessage, MailboxError, MailboxPort};

/// Producer half of an [`InMemoryMailbox`].
///
/// Cheap to clone; the mailbox closes once every sender is dropped.
#[derive(Debug, Clone)]
pub struct MailboxSender {
    tx: mpsc::Sender<InboundMessage>,
    next_tag: Arc<AtomicU64>,
}

impl MailboxSender {
    /// Post a message body, waiting for capacity if the mailbox is full.
    ///
    /// # Errors
    ///
    /// Returns `MailboxError::Closed` if the mailbox was dropped or closed.
    pub async fn send(&self, body: impl Into<String>) -> Result<DeliveryTag, MailboxError> {
        let tag = self.next_tag.fetch_add(1, Ordering::Relaxed);
        self.tx
            .send(InboundMessage::new(tag, body))
            .await
            .map_err(|_| MailboxError::Closed)?;
        Ok(tag)
    }

    /// Whether the mailbox stopped accepting messages.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half: a bounded mailbox shared by any number of workers.
#[derive(Debug)]
pub struct InMemoryMailbox {
    rx: Mutex<mpsc::Receiver<InboundMessage>>,
    in_flight: parking_lot::Mutex<HashSet<DeliveryTag>>,
    acknowledged: AtomicU64,
}

impl InMemoryMailbox {
    /// Create a mailbox holding at most `capacity` unreceived messages.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn channel(capacity: usize) -> (MailboxSender, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        let sender = MailboxSender {
            tx,
            next_tag: Arc::new(AtomicU64::new(1)),
        };
        let mailbox = Self {
            rx: Mutex::new(rx),
            in_flight: parking_lot::Mutex::new(HashSet::new()),
            acknowledged: AtomicU64::new(0),
        };
        (sender, mailbox)
    }

    /// Stop accepting messages. Already queued messages can still be received.
    pub async fn close(&self) {
        self.rx.lock().await.close();
    }

    /// Messages received but not yet acknowledged.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Messages acknowledged since start.
    #[must_use]
    pub fn acknowledged(&self) -> u64 {
        self.acknowledged.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MailboxPort for InMemoryMailbox {
    async fn receive(&self) -> Option<InboundMessage> {
        let message = self.rx.lock().await.recv().await?;
        self.in_flight.lock().insert(message.tag);
        Some(message)
    }

    async fn acknowledge(&self, tag: DeliveryTag) -> Result<(), MailboxError> {
        if !self.in_flight.lock().remove(&tag) {
            return Err(MailboxError::UnknownDeliveryTag(tag));
        }
        self.acknowledged.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

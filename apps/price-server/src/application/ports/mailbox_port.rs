//! Mailbox Port (Driven Port)
//!
//! Interface for consuming inbound price messages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Identifier of a single delivery, used to acknowledge it.
pub type DeliveryTag = u64;

/// A raw message taken from the mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Delivery tag to acknowledge once processing completed.
    pub tag: DeliveryTag,
    /// Unmodified message body.
    pub body: String,
    /// When the transport handed the message over.
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a message received now.
    #[must_use]
    pub fn new(tag: DeliveryTag, body: impl Into<String>) -> Self {
        Self {
            tag,
            body: body.into(),
            received_at: Utc::now(),
        }
    }
}

/// Mailbox error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailboxError {
    /// The tag was never delivered or was already acknowledged.
    #[error("unknown delivery tag: {0}")]
    UnknownDeliveryTag(DeliveryTag),

    /// The mailbox no longer accepts messages.
    #[error("mailbox closed")]
    Closed,
}

/// Inbound message source.
///
/// Every message returned by `receive` must be passed to `acknowledge`
/// exactly once, after it was stored or dead-lettered.
#[async_trait]
pub trait MailboxPort: Send + Sync {
    /// Wait for the next message. Returns `None` once the mailbox is closed
    /// and drained.
    async fn receive(&self) -> Option<InboundMessage>;

    /// Acknowledge a delivered message.
    ///
    /// # Errors
    ///
    /// Returns `MailboxError::UnknownDeliveryTag` if the tag is not in flight.
    async fn acknowledge(&self, tag: DeliveryTag) -> Result<(), MailboxError>;
}

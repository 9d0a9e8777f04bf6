//! Dead Letter Port (Driven Port)
//!
//! Interface for diverting messages that failed ingestion.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::mailbox_port::InboundMessage;

/// Why a message was dead-lettered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterReason {
    /// Body is not a valid price event.
    Deserialization,
    /// Event decoded but could not be stored.
    Processing,
}

impl DeadLetterReason {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deserialization => "deserialization",
            Self::Processing => "processing",
        }
    }
}

/// A failed message together with the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    /// Record id.
    pub id: Uuid,
    /// Failure category.
    pub reason: DeadLetterReason,
    /// Failure description.
    pub error: String,
    /// Original message body, unmodified.
    pub body: String,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
    /// When the message was diverted.
    pub dead_lettered_at: DateTime<Utc>,
}

impl DeadLetter {
    /// Build a dead letter for `message`.
    #[must_use]
    pub fn new(reason: DeadLetterReason, error: impl Into<String>, message: &InboundMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            reason,
            error: error.into(),
            body: message.body.clone(),
            received_at: message.received_at,
            dead_lettered_at: Utc::now(),
        }
    }
}

/// Dead letter publish error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeadLetterError {
    /// The dead-letter channel is unavailable.
    #[error("dead-letter channel unavailable: {0}")]
    Unavailable(String),
}

/// Dead-letter sink.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeadLetterPort: Send + Sync {
    /// Publish a dead letter.
    ///
    /// # Errors
    ///
    /// Returns `DeadLetterError` if the channel cannot take the letter.
    async fn publish(&self, letter: DeadLetter) -> Result<(), DeadLetterError>;
}

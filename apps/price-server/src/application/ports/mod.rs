//! Port Interfaces
//!
//! Defines the interfaces (ports) the application needs from the transport,
//! following the Hexagonal Architecture pattern.
//!
//! ## Driven Ports (Outbound)
//!
//! - `MailboxPort`: Source of inbound price messages with explicit acknowledgment
//! - `DeadLetterPort`: Sink for messages that could not be stored

mod dead_letter_port;
mod mailbox_port;

pub use dead_letter_port::{DeadLetter, DeadLetterError, DeadLetterPort, DeadLetterReason};
pub use mailbox_port::{DeliveryTag, InboundMessage, MailboxError, MailboxPort};

#[cfg(test)]
pub use dead_letter_port::MockDeadLetterPort;

//! Mailbox Adapters
//!
//! - [`InMemoryMailbox`]: bounded tokio channel implementing `MailboxPort`
//! - [`MailboxListener`]: TCP listener posting newline-delimited messages
//!   into the in-memory mailbox

mod memory;
mod tcp;

pub use memory::{InMemoryMailbox, MailboxSender};
pub use tcp::{MailboxListener, MailboxListenerError};

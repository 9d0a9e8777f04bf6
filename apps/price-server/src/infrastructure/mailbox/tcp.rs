//! TCP mailbox transport.
//!
//! Accepts connections and posts every line as one message body. Line
//! terminators (`\n` or `\r\n`) are stripped and empty lines are treated as
//! keep-alives. Everything else is posted, whitespace-only lines included, so
//! malformed input reaches the dead-letter channel. Bytes that are not valid
//! UTF-8 are replaced with U+FFFD rather than dropping the connection.

use std::borrow::Cow;
use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use super::memory::MailboxSender;

/// Mailbox listener error.
#[derive(Debug, thiserror::Error)]
pub enum MailboxListenerError {
    /// Failed to bind the listening socket.
    #[error("failed to bind mailbox listener on {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying error.
        source: io::Error,
    },

    /// Failed to accept a connection.
    #[error("failed to accept mailbox connection: {0}")]
    Accept(#[source] io::Error),
}

/// TCP listener feeding the in-memory mailbox.
#[derive(Debug)]
pub struct MailboxListener {
    listener: TcpListener,
    sender: MailboxSender,
}

impl MailboxListener {
    /// Bind to `addr`.
    ///
    /// # Errors
    ///
    /// Returns `MailboxListenerError::Bind` if the socket cannot be bound.
    pub async fn bind(addr: SocketAddr, sender: MailboxSender) -> Result<Self, MailboxListenerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| MailboxListenerError::Bind { addr, source })?;
        Ok(Self { listener, sender })
    }

    /// Address actually bound, useful when binding port 0.
    ///
    /// # Errors
    ///
    /// Returns the socket error if the address cannot be read.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `MailboxListenerError::Accept` if accepting fails.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), MailboxListenerError> {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "Mailbox listener started");
        }

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::info!("Mailbox listener shutting down");
                    return Ok(());
                }

                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted.map_err(MailboxListenerError::Accept)?;
                    tracing::debug!(%peer, "Mailbox connection accepted");
                    tokio::spawn(handle_connection(
                        stream,
                        peer,
                        self.sender.clone(),
                        cancel.child_token(),
                    ));
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    sender: MailboxSender,
    cancel: CancellationToken,
) {
    let mut reader = BufReader::new(stream);
    let mut frame = Vec::new();
    let mut posted: u64 = 0;

    loop {
        frame.clear();
        let read = tokio::select! {
            biased;

            () = cancel.cancelled() => break,
            read = reader.read_until(b'\n', &mut frame) => read,
        };

        match read {
            Ok(0) => break,
            Ok(_) => {
                let Some(body) = frame_body(&frame) else {
                    continue;
                };
                if matches!(body, Cow::Owned(_)) {
                    tracing::debug!(%peer, "Mailbox line is not valid UTF-8");
                }
                if sender.send(body.into_owned()).await.is_err() {
                    tracing::warn!(%peer, "Mailbox closed, dropping connection");
                    break;
                }
                posted += 1;
            }
            Err(e) => {
                tracing::warn!(%peer, error = %e, "Mailbox connection read failed");
                break;
            }
        }
    }

    tracing::debug!(%peer, posted, "Mailbox connection closed");
}

/// Strip the line terminator and decode. `None` for an empty line.
fn frame_body(frame: &[u8]) -> Option<Cow<'_, str>> {
    let line = frame.strip_suffix(b"\n").unwrap_or(frame);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(line))
}

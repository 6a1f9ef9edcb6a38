//! Transport contract between the connection manager and a socket.
//!
//! A [`Transport`] opens links. A link is a pair of channels: the manager
//! writes [`OutboundMessage`]s through a [`TransportSender`] and reads
//! [`TransportEvent`]s from the link's event stream. The socket side of the
//! same pair is a [`TransportPeer`], which lets any socket implementation
//! (or a test) plug in without the manager knowing about it.

mod memory;
mod ws;

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::TransportError;

pub use memory::{MemoryListener, MemoryTransport};
pub use ws::WsTransport;

/// Opens links to a gateway.
pub trait Transport: Send + Sync + 'static {
    /// Open a link to `url`. Resolves once the socket is ready for text.
    fn open(&self, url: &str) -> impl Future<Output = Result<TransportLink, TransportError>> + Send;
}

/// Something that happened on an open link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text message arrived.
    Message(String),
    /// The link closed. No further events follow.
    Closed {
        /// Why it closed.
        reason: String,
    },
}

/// A message for the socket to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Send a text message.
    Text(String),
    /// Close the socket.
    Close,
}

/// Write half of a link, held by the manager.
#[derive(Debug, Clone)]
pub struct TransportSender {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl TransportSender {
    /// Queue a text message.
    pub fn send(&self, text: String) -> Result<(), TransportError> {
        self.tx
            .send(OutboundMessage::Text(text))
            .map_err(|_| TransportError::Closed)
    }

    /// Ask the socket to close. Closing an already closed link is a no-op.
    pub fn close(&self) {
        let _ = self.tx.send(OutboundMessage::Close);
    }

    /// Whether the socket side has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// An open link, as handed to the manager.
#[derive(Debug)]
pub struct TransportLink {
    /// Write half.
    pub sender: TransportSender,
    /// Inbound events.
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl TransportLink {
    /// Create a connected link and its socket-side peer.
    #[must_use]
    pub fn pair() -> (Self, TransportPeer) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let link = Self {
            sender: TransportSender { tx: out_tx },
            events: event_rx,
        };
        let peer = TransportPeer {
            outgoing: out_rx,
            incoming: event_tx,
        };
        (link, peer)
    }
}

/// Socket side of a link.
#[derive(Debug)]
pub struct TransportPeer {
    /// Messages the manager wants written.
    pub outgoing: mpsc::UnboundedReceiver<OutboundMessage>,
    /// Events to deliver to the manager.
    pub incoming: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportPeer {
    /// Next text message written by the manager, or `None` once it closes the link.
    pub async fn recv_text(&mut self) -> Option<String> {
        match self.outgoing.recv().await? {
            OutboundMessage::Text(text) => Some(text),
            OutboundMessage::Close => None,
        }
    }

    /// Deliver a text message to the manager.
    pub fn push(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.incoming
            .send(TransportEvent::Message(text.into()))
            .map_err(|_| TransportError::Closed)
    }

    /// Report the link as closed.
    pub fn close(&self, reason: impl Into<String>) {
        let _ = self.incoming.send(TransportEvent::Closed {
            reason: reason.into(),
        });
    }
}

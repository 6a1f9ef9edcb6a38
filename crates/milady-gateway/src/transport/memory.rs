//! In-process transport.
//!
//! Every `open` hands the socket side of a fresh link to a
//! [`MemoryListener`], which plays the gateway.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use super::{Transport, TransportLink, TransportPeer};
use crate::error::TransportError;

/// Transport whose links terminate in the same process.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    accepted: mpsc::UnboundedSender<(String, TransportPeer)>,
    refusing: Arc<AtomicBool>,
}

/// Receives the gateway side of each link opened on a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryListener {
    accepted: mpsc::UnboundedReceiver<(String, TransportPeer)>,
}

impl MemoryTransport {
    /// Create a transport and the listener that receives its links.
    #[must_use]
    pub fn new() -> (Self, MemoryListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            accepted: tx,
            refusing: Arc::new(AtomicBool::new(false)),
        };
        (transport, MemoryListener { accepted: rx })
    }

    /// Make subsequent opens fail, as if nothing were listening.
    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }
}

impl Transport for MemoryTransport {
    fn open(&self, url: &str) -> impl Future<Output = Result<TransportLink, TransportError>> + Send {
        let result = if self.refusing.load(Ordering::SeqCst) {
            Err(TransportError::Connect(format!("connection refused: {url}")))
        } else {
            let (link, peer) = TransportLink::pair();
            self.accepted
                .send((url.to_string(), peer))
                .map(|()| link)
                .map_err(|_| TransportError::Connect(format!("no listener for {url}")))
        };
        std::future::ready(result)
    }
}

impl MemoryListener {
    /// Wait for the next link, returning the URL it was opened with.
    pub async fn accept(&mut self) -> Option<(String, TransportPeer)> {
        self.accepted.recv().await
    }

    /// Take a link that has already been opened, without waiting.
    pub fn try_accept(&mut self) -> Option<(String, TransportPeer)> {
        self.accepted.try_recv().ok()
    }
}

//! WebSocket transport.

use std::future::Future;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use super::{OutboundMessage, Transport, TransportEvent, TransportLink, TransportPeer};
use crate::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default time allowed for the TCP and WebSocket upgrade.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport over `ws://` and `wss://` sockets.
#[derive(Debug, Clone)]
pub struct WsTransport {
    connect_timeout: Duration,
}

impl WsTransport {
    /// Create a transport with the default connect timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WsTransport {
    fn open(&self, url: &str) -> impl Future<Output = Result<TransportLink, TransportError>> + Send {
        let url = url.to_string();
        let connect_timeout = self.connect_timeout;
        async move {
            let (stream, _) = timeout(connect_timeout, connect_async(url.as_str()))
                .await
                .map_err(|_| TransportError::Timeout)?
                .map_err(|e| TransportError::Connect(e.to_string()))?;

            let (write, read) = stream.split();
            let (link, TransportPeer { outgoing, incoming }) = TransportLink::pair();
            tokio::spawn(writer_task(write, outgoing));
            tokio::spawn(reader_task(read, incoming));

            debug!(url = %url, "websocket open");
            Ok(link)
        }
    }
}

async fn writer_task(
    mut write: SplitSink<WsStream, Message>,
    mut outgoing: mpsc::UnboundedReceiver<OutboundMessage>,
) {
    while let Some(message) = outgoing.recv().await {
        match message {
            OutboundMessage::Text(text) => {
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    debug!(error = %e, "websocket write failed");
                    break;
                }
            }
            OutboundMessage::Close => break,
        }
    }
    let _ = write.close().await;
}

async fn reader_task(
    mut read: SplitStream<WsStream>,
    incoming: mpsc::UnboundedSender<TransportEvent>,
) {
    let reason = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => {
                if incoming
                    .send(TransportEvent::Message(text.to_string()))
                    .is_err()
                {
                    return;
                }
            }
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => {
                    if incoming.send(TransportEvent::Message(text)).is_err() {
                        return;
                    }
                }
                Err(_) => debug!(len = bytes.len(), "dropping non-utf8 binary message"),
            },
            Some(Ok(Message::Close(frame))) => break close_reason(frame.as_ref()),
            Some(Ok(_)) => {}
            Some(Err(e)) => break e.to_string(),
            None => break "connection closed".to_string(),
        }
    };
    let _ = incoming.send(TransportEvent::Closed { reason });
}

fn close_reason(frame: Option<&CloseFrame>) -> String {
    match frame {
        Some(frame) if !frame.reason.as_str().is_empty() => {
            format!("closed by gateway: {}", frame.reason.as_str())
        }
        Some(frame) => format!("closed by gateway (code {})", u16::from(frame.code)),
        None => "closed by gateway".to_string(),
    }
}

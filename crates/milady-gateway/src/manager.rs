//! Gateway connection manager.
//!
//! [`GatewayConnection`] owns at most one transport link. It performs the
//! `connect` handshake, correlates requests with responses, forwards pushed
//! events to the bus and, after an unexpected close, reconnects with
//! exponential backoff until [`GatewayConnection::disconnect`] is called.
//!
//! All mutable state sits behind one mutex that is never held across an
//! `.await`. Callbacks finish their mutation under the lock and publish
//! notifications after releasing it. Background tasks (link reader, timers,
//! reconnect) only hold a [`Weak`] reference to the connection.

use std::sync::{Arc, Weak};
use std::time::Duration;

use milady_proto::{
    CONNECT_METHOD, ErrorShape, EventFrame, Frame, HelloOk, RequestFrame, ResponseFrame, codes,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::config::{ConnectOptions, ConnectionConfig};
use crate::error::GatewayError;
use crate::events::Notification;
use crate::pending::{PendingRequest, PendingTable};
use crate::reconnect::Backoff;
use crate::rpc::RpcResult;
use crate::session::{ConnectResult, SessionInfo};
use crate::state::ConnectionState;
use crate::transport::{Transport, TransportEvent, TransportSender, WsTransport};

/// Reason attached to the state change emitted by [`GatewayConnection::disconnect`].
pub const CLIENT_DISCONNECT: &str = "Client disconnect";

/// Client side of a gateway session.
pub struct GatewayConnection<T: Transport = WsTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for GatewayConnection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T> {
    transport: T,
    bus: EventBus,
    config: ConnectionConfig,
    core: Mutex<Core>,
}

struct Core {
    state: ConnectionState,
    options: Option<ConnectOptions>,
    link: Option<ActiveLink>,
    links_opened: u64,
    /// Bumped by every `connect()`, `disconnect()` and reconnect attempt.
    attempt: u64,
    hello: Option<HelloSlot>,
    pending: PendingTable,
    session: Option<SessionInfo>,
    last_seq: Option<u64>,
    backoff: Backoff,
    explicit_close: bool,
    reconnect: Option<AbortHandle>,
}

struct ActiveLink {
    id: u64,
    sender: TransportSender,
    reader: AbortHandle,
}

impl ActiveLink {
    fn shut(self) {
        self.reader.abort();
        self.sender.close();
    }
}

struct HelloSlot {
    request_id: String,
    link_id: u64,
    role: String,
    settle: oneshot::Sender<Result<ConnectResult, GatewayError>>,
    timer: AbortHandle,
}

impl HelloSlot {
    fn finish(self, outcome: Result<ConnectResult, GatewayError>) {
        self.timer.abort();
        let _ = self.settle.send(outcome);
    }
}

fn connection_closed() -> RpcResult {
    RpcResult::failure(codes::CONNECTION_CLOSED, "connection closed")
}

impl Core {
    fn new(backoff: Backoff) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            options: None,
            link: None,
            links_opened: 0,
            attempt: 0,
            hello: None,
            pending: PendingTable::new(),
            session: None,
            last_seq: None,
            backoff,
            explicit_close: false,
            reconnect: None,
        }
    }

    fn is_current(&self, link_id: u64) -> bool {
        self.link.as_ref().is_some_and(|link| link.id == link_id)
    }

    /// Drop the link and everything tied to it, settling whatever was waiting.
    fn teardown(&mut self, hello_error: GatewayError) {
        if let Some(reconnect) = self.reconnect.take() {
            reconnect.abort();
        }
        if let Some(link) = self.link.take() {
            link.shut();
        }
        if let Some(slot) = self.hello.take() {
            slot.finish(Err(hello_error));
        }
        for request in self.pending.drain() {
            request.settle(connection_closed());
        }
        self.session = None;
        self.last_seq = None;
    }

    fn accept_hello(
        &mut self,
        response: ResponseFrame,
        role: &str,
        notices: &mut Vec<Notification>,
    ) -> Result<ConnectResult, GatewayError> {
        if !response.ok {
            let error = response
                .error
                .filter(|error| !error.code.is_empty())
                .unwrap_or_else(|| ErrorShape::new(codes::HANDSHAKE_REJECTED, "handshake rejected"));
            return Err(GatewayError::HandshakeRejected {
                code: error.code,
                message: error.message,
            });
        }

        let hello = HelloOk::from_payload(response.payload.as_ref()).map_err(|e| {
            GatewayError::HandshakeRejected {
                code: codes::INVALID_HELLO.to_string(),
                message: e.to_string(),
            }
        })?;

        let session = SessionInfo::from_hello(&hello, role);
        let result = ConnectResult::from(&session);
        info!(
            session_id = %session.session_id,
            protocol = session.protocol_version,
            role = %session.role,
            "gateway handshake complete"
        );

        self.session = Some(session);
        self.state = ConnectionState::Connected;
        self.backoff.reset();
        // A reconnect attempt that got this far no longer guards scheduling.
        self.reconnect = None;
        notices.push(Notification::state(ConnectionState::Connected, None));
        Ok(result)
    }
}

impl GatewayConnection<WsTransport> {
    /// A connection over WebSockets with default timing.
    #[must_use]
    pub fn websocket(bus: EventBus) -> Self {
        Self::new(WsTransport::new(), bus)
    }
}

impl<T: Transport> GatewayConnection<T> {
    /// Create a connection with default timing.
    #[must_use]
    pub fn new(transport: T, bus: EventBus) -> Self {
        Self::with_config(transport, bus, ConnectionConfig::default())
    }

    /// Create a connection with explicit timing.
    #[must_use]
    pub fn with_config(transport: T, bus: EventBus, config: ConnectionConfig) -> Self {
        let backoff = Backoff::new(config.reconnect.clone());
        Self {
            inner: Arc::new(Inner {
                transport,
                bus,
                config,
                core: Mutex::new(Core::new(backoff)),
            }),
        }
    }

    /// The bus notifications are published on.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.core.lock().state
    }

    /// Whether the handshake has completed on the current link.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// The current session, if connected.
    #[must_use]
    pub fn session(&self) -> Option<SessionInfo> {
        self.inner.core.lock().session.clone()
    }

    /// Highest event sequence number seen on the current link.
    #[must_use]
    pub fn last_seq(&self) -> Option<u64> {
        self.inner.core.lock().last_seq
    }

    /// Number of requests awaiting a response.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.inner.core.lock().pending.len()
    }

    /// Delay that the next reconnect attempt will wait.
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        self.inner.core.lock().backoff.current()
    }

    /// Options of the most recent `connect()`.
    #[must_use]
    pub fn options(&self) -> Option<ConnectOptions> {
        self.inner.core.lock().options.clone()
    }

    /// Connect and perform the handshake.
    ///
    /// Any existing link is closed first without triggering a reconnect.
    /// A failed first connect is not retried.
    pub async fn connect(&self, options: ConnectOptions) -> Result<ConnectResult, GatewayError> {
        options.validate()?;

        let attempt = {
            let mut core = self.inner.core.lock();
            core.teardown(GatewayError::Aborted);
            core.explicit_close = false;
            core.attempt += 1;
            core.options = Some(options.clone());
            core.backoff.reset();
            core.state = ConnectionState::Connecting;
            core.attempt
        };
        info!(url = %options.url, "connecting to gateway");
        self.inner.emit_for_attempt(
            attempt,
            &Notification::state(ConnectionState::Connecting, None),
        );

        let result = self.inner.establish(&options, attempt).await;
        if let Err(err) = &result {
            let abandoned = {
                let mut core = self.inner.core.lock();
                if core.attempt == attempt {
                    core.teardown(GatewayError::Aborted);
                    core.state = ConnectionState::Disconnected;
                    true
                } else {
                    false
                }
            };
            warn!(url = %options.url, error = %err, "gateway connect failed");
            if abandoned {
                self.inner.bus.emit(&Notification::state(
                    ConnectionState::Disconnected,
                    Some(err.to_string()),
                ));
            }
        }
        result
    }

    /// Send a request and wait for its response.
    ///
    /// Never fails at the type level: being disconnected, timing out and
    /// losing the link are all reported inside the [`RpcResult`].
    pub async fn send(&self, method: &str, params: Value) -> RpcResult {
        self.send_with_timeout(method, params, self.inner.config.request_timeout)
            .await
    }

    /// [`send`](Self::send) with a per-call timeout.
    pub async fn send_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> RpcResult {
        let request = RequestFrame::new(method, params);
        let id = request.id.clone();
        let text = match Frame::Request(request).to_json() {
            Ok(text) => text,
            Err(e) => return RpcResult::failure(codes::INVALID_REQUEST, e.to_string()),
        };

        let settled = {
            let mut core = self.inner.core.lock();
            let sender = match &core.link {
                Some(link) if core.state == ConnectionState::Connected => link.sender.clone(),
                _ => return RpcResult::from_error(&GatewayError::NotConnected),
            };
            let (tx, rx) = oneshot::channel();
            let timer = self.inner.spawn_request_timer(id.clone(), timeout);
            core.pending.insert(id.clone(), PendingRequest::new(tx, timer));
            if sender.send(text).is_err() {
                if let Some(request) = core.pending.take(&id) {
                    request.settle(connection_closed());
                }
            }
            rx
        };
        debug!(method, id = %id, "gateway request sent");

        settled.await.unwrap_or_else(|_| connection_closed())
    }

    /// Typed wrapper over [`send`](Self::send).
    ///
    /// A missing payload decodes as JSON `null`.
    pub async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, ErrorShape>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params)
            .map_err(|e| ErrorShape::new(codes::INVALID_REQUEST, e.to_string()))?;
        let result = self.send(method, params).await;
        if !result.ok {
            return Err(result
                .error
                .unwrap_or_else(|| ErrorShape::new(codes::UNKNOWN, "request failed")));
        }
        serde_json::from_value(result.payload.unwrap_or(Value::Null))
            .map_err(|e| ErrorShape::new(codes::INVALID_RESPONSE, e.to_string()))
    }

    /// Close the connection and stop reconnecting.
    ///
    /// Every outstanding request settles with `CONNECTION_CLOSED` before this
    /// returns.
    pub fn disconnect(&self) {
        {
            let mut core = self.inner.core.lock();
            core.explicit_close = true;
            core.attempt += 1;
            core.teardown(GatewayError::Aborted);
            core.state = ConnectionState::Disconnected;
        }
        info!("disconnected from gateway");
        self.inner.bus.emit(&Notification::state(
            ConnectionState::Disconnected,
            Some(CLIENT_DISCONNECT.to_string()),
        ));
    }
}

impl<T: Transport> Inner<T> {
    /// Publish `notice` unless `attempt` was superseded after the lock was
    /// released. Returns whether it was published.
    fn emit_for_attempt(&self, attempt: u64, notice: &Notification) -> bool {
        if self.core.lock().attempt != attempt {
            debug!(kind = notice.kind(), "dropping notification for superseded attempt");
            return false;
        }
        self.bus.emit(notice);
        true
    }

    /// Open a link and run the handshake on it.
    async fn establish(
        self: &Arc<Self>,
        options: &ConnectOptions,
        attempt: u64,
    ) -> Result<ConnectResult, GatewayError> {
        let request = RequestFrame::new(CONNECT_METHOD, options.connect_params().to_value()?);
        let request_id = request.id.clone();
        let text = Frame::Request(request).to_json()?;

        let link = self
            .transport
            .open(&options.url)
            .await
            .map_err(|e| GatewayError::ConnectFailed(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        {
            let mut core = self.core.lock();
            if core.attempt != attempt {
                link.sender.close();
                return Err(GatewayError::Aborted);
            }

            core.links_opened += 1;
            let link_id = core.links_opened;
            core.last_seq = None;

            let reader = self.spawn_reader(link_id, link.events);
            let timer = self.spawn_hello_timer(link_id);
            if let Err(e) = link.sender.send(text) {
                reader.abort();
                timer.abort();
                return Err(GatewayError::ConnectFailed(e.to_string()));
            }
            core.hello = Some(HelloSlot {
                request_id,
                link_id,
                role: options.role.clone(),
                settle: tx,
                timer,
            });
            core.link = Some(ActiveLink {
                id: link_id,
                sender: link.sender,
                reader,
            });
        }
        debug!(url = %options.url, "handshake sent");

        rx.await.unwrap_or(Err(GatewayError::Aborted))
    }

    fn spawn_reader(
        self: &Arc<Self>,
        link_id: u64,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> AbortHandle {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let event = events.recv().await.unwrap_or_else(|| TransportEvent::Closed {
                    reason: "transport dropped".to_string(),
                });
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                match event {
                    TransportEvent::Message(text) => inner.handle_frame(link_id, &text),
                    TransportEvent::Closed { reason } => {
                        inner.handle_close(link_id, reason);
                        break;
                    }
                }
            }
        })
        .abort_handle()
    }

    fn spawn_hello_timer(self: &Arc<Self>, link_id: u64) -> AbortHandle {
        let weak = Arc::downgrade(self);
        let timeout = self.config.hello_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let expired = {
                let mut core = inner.core.lock();
                match &core.hello {
                    Some(slot) if slot.link_id == link_id => core.hello.take(),
                    _ => None,
                }
            };
            if let Some(slot) = expired {
                warn!(timeout_ms = timeout.as_millis() as u64, "gateway handshake timed out");
                slot.finish(Err(GatewayError::HandshakeTimeout));
            }
        })
        .abort_handle()
    }

    fn spawn_request_timer(self: &Arc<Self>, id: String, timeout: Duration) -> AbortHandle {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let expired = inner.core.lock().pending.take(&id);
            if let Some(request) = expired {
                debug!(id = %id, "gateway request timed out");
                request.settle(RpcResult::from_error(&GatewayError::RequestTimeout));
            }
        })
        .abort_handle()
    }

    fn handle_frame(self: &Arc<Self>, link_id: u64, text: &str) {
        let frame = match Frame::from_json(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "dropping malformed frame");
                return;
            }
        };
        match frame {
            Frame::Response(response) => self.handle_response(link_id, response),
            Frame::Event(event) => self.handle_event(link_id, event),
            Frame::Request(request) => {
                debug!(method = %request.method, "ignoring gateway-initiated request");
            }
        }
    }

    fn handle_response(&self, link_id: u64, response: ResponseFrame) {
        let mut notices = Vec::new();
        let hello = {
            let mut core = self.core.lock();
            if !core.is_current(link_id) {
                return;
            }
            let answers_hello = core
                .hello
                .as_ref()
                .is_some_and(|slot| slot.request_id == response.id);
            if answers_hello {
                core.hello.take().map(|slot| {
                    let outcome = core.accept_hello(response, &slot.role, &mut notices);
                    (slot, outcome)
                })
            } else {
                match core.pending.take(&response.id) {
                    Some(request) => request.settle(RpcResult::from(response)),
                    None => debug!(id = %response.id, "dropping response for unknown request"),
                }
                None
            }
        };
        self.bus.emit_all(notices);
        if let Some((slot, outcome)) = hello {
            slot.finish(outcome);
        }
    }

    fn handle_event(&self, link_id: u64, event: EventFrame) {
        {
            let mut core = self.core.lock();
            if !core.is_current(link_id) {
                return;
            }
            if let Some(seq) = event.seq {
                match core.last_seq {
                    Some(last) if seq > last.saturating_add(1) => warn!(
                        expected = last.saturating_add(1),
                        received = seq,
                        event = %event.event,
                        "gateway event sequence gap"
                    ),
                    Some(last) if seq <= last => {
                        debug!(last, received = seq, "gateway event out of order");
                    }
                    _ => {}
                }
                if core.last_seq.is_none_or(|last| seq > last) {
                    core.last_seq = Some(seq);
                }
            }
        }
        self.bus.emit(&Notification::GatewayEvent {
            event: event.event,
            payload: event.payload,
            seq: event.seq,
        });
    }

    fn handle_close(self: &Arc<Self>, link_id: u64, reason: String) {
        let mut notices = Vec::new();
        {
            let mut core = self.core.lock();
            if !core.is_current(link_id) {
                return;
            }
            if let Some(link) = core.link.take() {
                link.sender.close();
            }
            core.session = None;
            core.last_seq = None;
            for request in core.pending.drain() {
                request.settle(connection_closed());
            }
            // Mid-handshake: whoever is running the handshake decides what happens next.
            if let Some(slot) = core.hello.take() {
                slot.finish(Err(GatewayError::TransportClosed(reason)));
                return;
            }
            // The hello already failed or timed out and its owner is tearing down.
            if core.state != ConnectionState::Connected {
                debug!(reason = %reason, state = %core.state, "link closed before session");
                return;
            }

            warn!(reason = %reason, "gateway connection lost");
            core.state = ConnectionState::Reconnecting;
            notices.push(Notification::state(
                ConnectionState::Reconnecting,
                Some(reason.clone()),
            ));
            notices.push(Notification::Error {
                message: reason,
                will_retry: true,
            });
            self.schedule_reconnect(&mut core);
        }
        self.bus.emit_all(notices);
    }

    /// Arm the reconnect timer unless one is already pending.
    fn schedule_reconnect(self: &Arc<Self>, core: &mut Core) {
        if core.explicit_close || core.reconnect.is_some() {
            return;
        }
        let delay = core.backoff.current();
        info!(
            attempt = core.backoff.attempt(),
            delay_ms = delay.as_millis() as u64,
            "scheduling gateway reconnect"
        );
        let weak = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.reconnect().await;
            }
        });
        core.reconnect = Some(task.abort_handle());
    }

    async fn reconnect(self: &Arc<Self>) {
        let (options, attempt) = {
            let mut core = self.core.lock();
            let options = match core.options.clone() {
                Some(options) if !core.explicit_close => options,
                _ => {
                    core.reconnect = None;
                    return;
                }
            };
            core.attempt += 1;
            core.state = ConnectionState::Connecting;
            (options, core.attempt)
        };
        info!(url = %options.url, "reconnecting to gateway");
        self.emit_for_attempt(
            attempt,
            &Notification::state(ConnectionState::Connecting, None),
        );

        let Err(err) = self.establish(&options, attempt).await else {
            return;
        };

        let mut notices = Vec::new();
        {
            let mut core = self.core.lock();
            if core.attempt != attempt {
                return;
            }
            // Release our own handle before teardown so it is not aborted.
            core.reconnect = None;
            core.teardown(GatewayError::Aborted);
            let next = core.backoff.fail();
            core.state = ConnectionState::Reconnecting;
            warn!(
                error = %err,
                next_delay_ms = next.as_millis() as u64,
                "gateway reconnect failed"
            );
            notices.push(Notification::state(
                ConnectionState::Reconnecting,
                Some(err.to_string()),
            ));
            notices.push(Notification::Error {
                message: err.to_string(),
                will_retry: true,
            });
            self.schedule_reconnect(&mut core);
        }
        self.bus.emit_all(notices);
    }
}

impl<T: Transport> std::fmt::Debug for GatewayConnection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("GatewayConnection")
            .field("state", &core.state)
            .field("pending", &core.pending.len())
            .field("last_seq", &core.last_seq)
            .finish_non_exhaustive()
    }
}

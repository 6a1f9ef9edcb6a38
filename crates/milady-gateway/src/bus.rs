//! In-process fan-out of notifications.
//!
//! Listeners are either callbacks registered with [`EventBus::on`] or
//! channel subscribers created with [`EventBus::subscribe`]. Emission never
//! holds the bus lock while a callback runs, so callbacks may register or
//! remove listeners and call back into the connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use crate::events::Notification;

type Callback = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Handle identifying a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Listeners {
    callbacks: Vec<(ListenerId, Callback)>,
    channels: Vec<mpsc::UnboundedSender<Notification>>,
}

/// Shared notification bus. Cloning yields another handle to the same bus.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<Listeners>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked for every notification.
    pub fn on<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().callbacks.push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns whether it was registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.callbacks.len();
        listeners.callbacks.retain(|(existing, _)| *existing != id);
        listeners.callbacks.len() != before
    }

    /// Subscribe with a channel. The subscription ends when the receiver is dropped.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Notification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().channels.push(tx);
        rx
    }

    /// Number of live callbacks and subscriptions.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        let listeners = self.listeners.lock();
        listeners.callbacks.len() + listeners.channels.iter().filter(|tx| !tx.is_closed()).count()
    }

    /// Deliver a notification to every listener, in registration order.
    pub fn emit(&self, notification: &Notification) {
        let callbacks: Vec<Callback> = {
            let mut listeners = self.listeners.lock();
            listeners
                .channels
                .retain(|tx| tx.send(notification.clone()).is_ok());
            listeners
                .callbacks
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect()
        };
        trace!(kind = notification.kind(), listeners = callbacks.len(), "emitting notification");
        for callback in callbacks {
            callback(notification);
        }
    }

    pub(crate) fn emit_all(&self, notifications: Vec<Notification>) {
        for notification in &notifications {
            self.emit(notification);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

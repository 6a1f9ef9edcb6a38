//! Platform browse contract.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::advert::Advertisement;
use crate::error::{DiscoveryError, Result};

/// What a browser reports while browsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseEvent {
    /// A service instance was resolved or re-resolved.
    Resolved(Advertisement),
    /// A service instance went away.
    Removed {
        /// Instance label, possibly escaped.
        instance: String,
        /// Service type.
        service_type: String,
        /// Browse domain.
        domain: String,
    },
    /// The platform ended the browse.
    Stopped,
}

/// A platform DNS-SD browser.
pub trait ServiceBrowser: Send + Sync + 'static {
    /// Start browsing `service_type` in `domain`.
    fn browse(&self, service_type: &str, domain: &str) -> Result<mpsc::UnboundedReceiver<BrowseEvent>>;

    /// Stop browsing and release platform listeners. Safe when idle.
    fn stop(&self);
}

#[derive(Debug, Default)]
struct ManualState {
    sink: Option<mpsc::UnboundedSender<BrowseEvent>>,
    fail_next: Option<String>,
    browses: usize,
}

/// Browser fed by hand, for hosts that learn about gateways some other way.
#[derive(Debug, Clone, Default)]
pub struct ManualBrowser {
    state: Arc<Mutex<ManualState>>,
}

impl ManualBrowser {
    /// Create an idle browser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `browse` fail with `reason`.
    pub fn fail_next_browse(&self, reason: impl Into<String>) {
        self.state.lock().fail_next = Some(reason.into());
    }

    /// Report a resolved advertisement. Returns whether a browse received it.
    pub fn announce(&self, advert: Advertisement) -> bool {
        self.deliver(BrowseEvent::Resolved(advert))
    }

    /// Report that an advertisement went away.
    pub fn withdraw(&self, instance: &str, service_type: &str, domain: &str) -> bool {
        self.deliver(BrowseEvent::Removed {
            instance: instance.to_string(),
            service_type: service_type.to_string(),
            domain: domain.to_string(),
        })
    }

    /// Whether a browse is active.
    #[must_use]
    pub fn is_browsing(&self) -> bool {
        self.state.lock().sink.is_some()
    }

    /// Number of successful `browse` calls so far.
    #[must_use]
    pub fn browse_count(&self) -> usize {
        self.state.lock().browses
    }

    fn deliver(&self, event: BrowseEvent) -> bool {
        self.state
            .lock()
            .sink
            .as_ref()
            .is_some_and(|sink| sink.send(event).is_ok())
    }
}

impl ServiceBrowser for ManualBrowser {
    fn browse(&self, _service_type: &str, _domain: &str) -> Result<mpsc::UnboundedReceiver<BrowseEvent>> {
        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next.take() {
            return Err(DiscoveryError::StartFailed(reason));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.sink = Some(tx);
        state.browses += 1;
        Ok(rx)
    }

    fn stop(&self) {
        self.state.lock().sink = None;
    }
}

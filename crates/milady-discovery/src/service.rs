//! Discovery service: browse, deduplicate by stable id, publish changes.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use milady_gateway::{EventBus, Notification};
use milady_proto::{
    DEFAULT_DOMAIN, DiscoveredGateway, DiscoveryEvent, DiscoveryEventKind, SERVICE_TYPE,
};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::advert::Advertisement;
use crate::browser::{BrowseEvent, ServiceBrowser};
use crate::error::Result;
use crate::names::{decode_service_name, stable_id};

/// Status reported while a browse is active.
pub const STATUS_DISCOVERING: &str = "Discovering...";

/// Status reported while idle.
pub const STATUS_STOPPED: &str = "Discovery stopped";

/// What to browse for and how long `start_discovery` waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Service type to browse.
    pub service_type: String,
    /// Browse domain.
    pub domain: String,
    /// How long `start_discovery` waits before returning its snapshot.
    pub settle: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_type: SERVICE_TYPE.to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
            settle: Duration::from_secs(1),
        }
    }
}

/// Snapshot of discovered gateways.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryResult {
    /// Gateways sorted by display name, ignoring case.
    pub gateways: Vec<DiscoveredGateway>,
    /// `Discovering...` or `Discovery stopped`.
    pub status: String,
}

#[derive(Default)]
struct Registry {
    discovering: bool,
    browse: u64,
    gateways: HashMap<String, DiscoveredGateway>,
    pump: Option<AbortHandle>,
}

impl Registry {
    fn snapshot(&self) -> DiscoveryResult {
        let mut gateways: Vec<_> = self.gateways.values().cloned().collect();
        gateways.sort_by_cached_key(|gateway| gateway.name.to_lowercase());
        DiscoveryResult {
            gateways,
            status: if self.discovering {
                STATUS_DISCOVERING
            } else {
                STATUS_STOPPED
            }
            .to_string(),
        }
    }

    fn is_current(&self, browse: u64) -> bool {
        self.discovering && self.browse == browse
    }
}

struct Inner<B> {
    browser: B,
    bus: EventBus,
    config: DiscoveryConfig,
    registry: Mutex<Registry>,
}

/// Finds gateways advertised on the local network.
pub struct DiscoveryService<B: ServiceBrowser> {
    inner: Arc<Inner<B>>,
}

impl<B: ServiceBrowser> Clone for DiscoveryService<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(feature = "mdns")]
impl DiscoveryService<crate::mdns::MdnsBrowser> {
    /// Discovery over mDNS with default settings.
    #[must_use]
    pub fn mdns(bus: EventBus) -> Self {
        Self::new(crate::mdns::MdnsBrowser::new(), bus)
    }
}

impl<B: ServiceBrowser> DiscoveryService<B> {
    /// Create a service with default settings.
    #[must_use]
    pub fn new(browser: B, bus: EventBus) -> Self {
        Self::with_config(browser, bus, DiscoveryConfig::default())
    }

    /// Create a service with explicit settings.
    #[must_use]
    pub fn with_config(browser: B, bus: EventBus, config: DiscoveryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                browser,
                bus,
                config,
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    /// Whether a browse is active.
    #[must_use]
    pub fn is_discovering(&self) -> bool {
        self.inner.registry.lock().discovering
    }

    /// Start browsing and return what was found during the settle window.
    ///
    /// Returns the current snapshot at once when already discovering. Later
    /// changes arrive as discovery notifications on the bus.
    pub async fn start_discovery(&self) -> Result<DiscoveryResult> {
        {
            let mut registry = self.inner.registry.lock();
            if registry.discovering {
                return Ok(registry.snapshot());
            }

            let config = &self.inner.config;
            let events = match self.inner.browser.browse(&config.service_type, &config.domain) {
                Ok(events) => events,
                Err(e) => {
                    warn!(service_type = %config.service_type, error = %e, "discovery failed to start");
                    return Err(e);
                }
            };
            registry.discovering = true;
            registry.browse += 1;
            registry.gateways.clear();
            registry.pump = Some(self.inner.spawn_pump(registry.browse, events));
        }
        info!(
            service_type = %self.inner.config.service_type,
            domain = %self.inner.config.domain,
            "discovery started"
        );

        tokio::time::sleep(self.inner.config.settle).await;
        Ok(self.get_discovered_gateways())
    }

    /// Stop browsing and forget every gateway. Safe when idle.
    pub fn stop_discovery(&self) {
        {
            let mut registry = self.inner.registry.lock();
            if !registry.discovering {
                return;
            }
            registry.discovering = false;
            registry.gateways.clear();
            if let Some(pump) = registry.pump.take() {
                pump.abort();
            }
        }
        self.inner.browser.stop();
        info!("discovery stopped");
    }

    /// Current snapshot.
    #[must_use]
    pub fn get_discovered_gateways(&self) -> DiscoveryResult {
        self.inner.registry.lock().snapshot()
    }
}

impl<B: ServiceBrowser> Inner<B> {
    fn spawn_pump(
        self: &Arc<Self>,
        browse: u64,
        mut events: mpsc::UnboundedReceiver<BrowseEvent>,
    ) -> AbortHandle {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                match event {
                    BrowseEvent::Resolved(advert) => inner.upsert(browse, &advert),
                    BrowseEvent::Removed {
                        instance,
                        service_type,
                        domain,
                    } => inner.remove(browse, &instance, &service_type, &domain),
                    BrowseEvent::Stopped => break,
                }
            }
            if let Some(inner) = weak.upgrade() {
                inner.browse_ended(browse);
            }
        })
        .abort_handle()
    }

    /// The platform stopped delivering results: go idle so a later
    /// `start_discovery` browses again.
    fn browse_ended(&self, browse: u64) {
        let mut registry = self.registry.lock();
        if !registry.is_current(browse) {
            return;
        }
        registry.discovering = false;
        registry.gateways.clear();
        registry.pump = None;
        // Under the registry lock so a concurrent start cannot be stopped.
        self.browser.stop();
        warn!(service_type = %self.config.service_type, "browse ended by the platform");
    }

    fn upsert(&self, browse: u64, advert: &Advertisement) {
        let gateway = advert.resolve();
        let kind = {
            let mut registry = self.registry.lock();
            if !registry.is_current(browse) {
                return;
            }
            match registry
                .gateways
                .insert(gateway.stable_id.clone(), gateway.clone())
            {
                Some(_) => DiscoveryEventKind::Updated,
                None => DiscoveryEventKind::Found,
            }
        };
        debug!(
            stable_id = %gateway.stable_id,
            host = %gateway.host,
            port = gateway.port,
            kind = ?kind,
            "gateway advertisement"
        );
        self.bus
            .emit(&Notification::Discovery(DiscoveryEvent { kind, gateway }));
    }

    fn remove(&self, browse: u64, instance: &str, service_type: &str, domain: &str) {
        let id = stable_id(service_type, domain, &decode_service_name(instance));
        let removed = {
            let mut registry = self.registry.lock();
            if !registry.is_current(browse) {
                return;
            }
            registry.gateways.remove(&id)
        };
        if let Some(gateway) = removed {
            debug!(stable_id = %id, "gateway advertisement lost");
            self.bus.emit(&Notification::Discovery(DiscoveryEvent {
                kind: DiscoveryEventKind::Lost,
                gateway,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::ManualBrowser;
    use crate::error::DiscoveryError;

    fn advert(instance: &str) -> Advertisement {
        Advertisement::new(instance, SERVICE_TYPE, DEFAULT_DOMAIN, 18789)
            .with_host_name("gateway.local.")
    }

    async fn drain_pump() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    async fn discovery_events(
        rx: &mut mpsc::UnboundedReceiver<Notification>,
        count: usize,
    ) -> Vec<DiscoveryEvent> {
        let mut events = Vec::new();
        while events.len() < count {
            if let Some(Notification::Discovery(event)) = rx.recv().await {
                events.push(event);
            }
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_returns_snapshot_after_settle() {
        let browser = ManualBrowser::new();
        let service = DiscoveryService::new(browser.clone(), EventBus::new());

        let feeder = tokio::spawn({
            let browser = browser.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                browser.announce(advert("Zeta"));
                browser.announce(advert(r"alpha\032Lab"));
            }
        });

        let result = service.start_discovery().await.expect("start");
        feeder.await.expect("feeder");
        assert_eq!(result.status, "Discovering...");
        let names: Vec<_> = result.gateways.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["alpha Lab", "Zeta"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_advertisement_is_update() {
        let browser = ManualBrowser::new();
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let service = DiscoveryService::new(browser.clone(), bus);
        service.start_discovery().await.expect("start");

        browser.announce(advert(r"Office\032Gateway"));
        browser.announce(advert("office   gateway").with_txt("gatewayTls", "1"));

        let events = discovery_events(&mut rx, 2).await;
        assert_eq!(events[0].kind, DiscoveryEventKind::Found);
        assert_eq!(events[1].kind, DiscoveryEventKind::Updated);
        assert_eq!(events[0].gateway.stable_id, events[1].gateway.stable_id);

        let result = service.get_discovered_gateways();
        assert_eq!(result.gateways.len(), 1);
        assert!(result.gateways[0].tls_enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_only_when_removed() {
        let browser = ManualBrowser::new();
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let service = DiscoveryService::new(browser.clone(), bus);
        service.start_discovery().await.expect("start");

        browser.announce(advert(r"Office\032Gateway"));
        browser.withdraw("Unknown", SERVICE_TYPE, DEFAULT_DOMAIN);
        browser.withdraw(r"Office\032Gateway", SERVICE_TYPE, DEFAULT_DOMAIN);
        browser.announce(advert("Den"));

        let events = discovery_events(&mut rx, 3).await;
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiscoveryEventKind::Found,
                DiscoveryEventKind::Lost,
                DiscoveryEventKind::Found
            ]
        );
        assert_eq!(events[1].gateway.name, "Office Gateway");

        let names: Vec<_> = service
            .get_discovered_gateways()
            .gateways
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["Den".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let browser = ManualBrowser::new();
        let service = DiscoveryService::new(browser.clone(), EventBus::new());

        service.start_discovery().await.expect("start");
        browser.announce(advert("Den"));
        drain_pump().await;

        let started = tokio::time::Instant::now();
        let again = service.start_discovery().await.expect("start again");
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(again.gateways.len(), 1);
        assert_eq!(browser.browse_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_clears_and_is_safe_when_idle() {
        let browser = ManualBrowser::new();
        let service = DiscoveryService::new(browser.clone(), EventBus::new());
        service.stop_discovery();

        service.start_discovery().await.expect("start");
        browser.announce(advert("Den"));
        drain_pump().await;

        service.stop_discovery();
        assert!(!browser.is_browsing());
        let result = service.get_discovered_gateways();
        assert!(result.gateways.is_empty());
        assert_eq!(result.status, "Discovery stopped");

        service.stop_discovery();
        assert!(!service.is_discovering());
    }

    #[tokio::test(start_paused = true)]
    async fn test_platform_end_returns_to_idle() {
        let browser = ManualBrowser::new();
        let service = DiscoveryService::new(browser.clone(), EventBus::new());
        service.start_discovery().await.expect("start");
        browser.announce(advert("Den"));
        drain_pump().await;

        browser.stop();
        drain_pump().await;
        assert!(!service.is_discovering());
        let result = service.get_discovered_gateways();
        assert_eq!(result.status, "Discovery stopped");
        assert!(result.gateways.is_empty());

        service.start_discovery().await.expect("restart");
        assert!(service.is_discovering());
        assert!(browser.is_browsing());
        assert_eq!(browser.browse_count(), 2);
    }

    #[tokio::test]
    async fn test_start_failure_leaves_service_idle() {
        let browser = ManualBrowser::new();
        browser.fail_next_browse("multicast unavailable");
        let service = DiscoveryService::new(browser, EventBus::new());

        let err = service.start_discovery().await.expect_err("start fails");
        assert_eq!(err, DiscoveryError::StartFailed("multicast unavailable".into()));
        assert!(!service.is_discovering());
        assert_eq!(service.get_discovered_gateways().status, "Discovery stopped");
    }
}

//! mDNS browser backed by `mdns-sd`.

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::advert::Advertisement;
use crate::browser::{BrowseEvent, ServiceBrowser};
use crate::error::{DiscoveryError, Result};
use crate::names::instance_from_fullname;

struct ActiveBrowse {
    daemon: ServiceDaemon,
    ty_domain: String,
}

/// Browses the link-local domain with an in-process mDNS responder.
#[derive(Default)]
pub struct MdnsBrowser {
    active: Mutex<Option<ActiveBrowse>>,
}

impl MdnsBrowser {
    /// Create an idle browser. The daemon starts on the first browse.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ServiceBrowser for MdnsBrowser {
    fn browse(&self, service_type: &str, domain: &str) -> Result<mpsc::UnboundedReceiver<BrowseEvent>> {
        self.stop();

        let ty_domain = format!("{service_type}.{domain}");
        let daemon = ServiceDaemon::new().map_err(|e| DiscoveryError::StartFailed(e.to_string()))?;
        let receiver = daemon
            .browse(&ty_domain)
            .map_err(|e| DiscoveryError::StartFailed(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let service_type = service_type.to_string();
        let domain = domain.to_string();
        tokio::spawn(async move {
            while let Ok(event) = receiver.recv_async().await {
                let forwarded = match event {
                    ServiceEvent::ServiceResolved(info) => {
                        BrowseEvent::Resolved(advertisement(&info, &service_type, &domain))
                    }
                    ServiceEvent::ServiceRemoved(_, fullname) => BrowseEvent::Removed {
                        instance: instance_from_fullname(&fullname, &service_type, &domain)
                            .to_string(),
                        service_type: service_type.clone(),
                        domain: domain.clone(),
                    },
                    ServiceEvent::SearchStopped(_) => {
                        let _ = tx.send(BrowseEvent::Stopped);
                        break;
                    }
                    other => {
                        debug!(?other, "mDNS browse event");
                        continue;
                    }
                };
                if tx.send(forwarded).is_err() {
                    break;
                }
            }
        });

        info!(service_type = %ty_domain, "mDNS browse started");
        *self.active.lock() = Some(ActiveBrowse { daemon, ty_domain });
        Ok(rx)
    }

    fn stop(&self) {
        let Some(active) = self.active.lock().take() else {
            return;
        };
        if let Err(e) = active.daemon.stop_browse(&active.ty_domain) {
            debug!("mDNS stop_browse error: {e}");
        }
        match active.daemon.shutdown() {
            Ok(_) => info!(service_type = %active.ty_domain, "mDNS browse stopped"),
            Err(e) => warn!("mDNS shutdown error: {e}"),
        }
    }
}

fn advertisement(info: &ServiceInfo, service_type: &str, domain: &str) -> Advertisement {
    let fullname = info.get_fullname();
    let mut advert = Advertisement::new(
        instance_from_fullname(fullname, service_type, domain),
        service_type,
        domain,
        info.get_port(),
    )
    .with_host_name(info.get_hostname());

    let mut addresses: Vec<_> = info.get_addresses().iter().copied().collect();
    addresses.sort();
    advert.addresses = addresses;

    for property in info.get_properties().iter() {
        advert
            .txt
            .insert(property.key().to_string(), property.val_str().to_string());
    }
    advert
}

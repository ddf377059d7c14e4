//! Domain helpers over the scan context.
//!
//! The core stores payloads opaquely; these helpers interpret the `ports`
//! arrays produced by the nmap parser so workflows can branch on what has
//! been discovered so far.

use std::collections::BTreeMap;

use async_trait::async_trait;
use autoscout_core::{ScanContext, ScanResult};

/// Port and service views over accumulated scan payloads.
#[async_trait]
pub trait ContextExt {
    /// Sorted, de-duplicated list of discovered ports.
    async fn open_ports(&self) -> Vec<u16>;

    /// Whether any scan discovered a port.
    async fn has_open_ports(&self) -> bool;

    /// Port to service-name mapping, sorted by port. Later scans win.
    async fn services(&self) -> Vec<(u16, String)>;

    /// Ports whose service name contains `pattern` (case-insensitive).
    async fn ports_for_service(&self, pattern: &str) -> Vec<u16>;

    /// Port to product-string mapping for ports with an identified product.
    async fn products(&self) -> Vec<(u16, String)>;
}

#[async_trait]
impl ContextExt for ScanContext {
    async fn open_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self
            .results()
            .await
            .values()
            .flat_map(port_entries)
            .map(|entry| entry.port)
            .collect();
        ports.sort_unstable();
        ports.dedup();
        ports
    }

    async fn has_open_ports(&self) -> bool {
        !self.open_ports().await.is_empty()
    }

    async fn services(&self) -> Vec<(u16, String)> {
        let mut services = BTreeMap::new();
        for result in self.results().await.values() {
            for entry in port_entries(result) {
                if !entry.service.is_empty() {
                    services.insert(entry.port, entry.service);
                }
            }
        }
        services.into_iter().collect()
    }

    async fn ports_for_service(&self, pattern: &str) -> Vec<u16> {
        let pattern = pattern.to_lowercase();
        self.services()
            .await
            .into_iter()
            .filter(|(_, service)| service.to_lowercase().contains(&pattern))
            .map(|(port, _)| port)
            .collect()
    }

    async fn products(&self) -> Vec<(u16, String)> {
        let mut products = BTreeMap::new();
        for result in self.results().await.values() {
            for entry in port_entries(result) {
                if !entry.product.is_empty() {
                    products.insert(entry.port, entry.product);
                }
            }
        }
        products.into_iter().collect()
    }
}

struct PortEntry {
    port: u16,
    service: String,
    product: String,
}

/// Extract the port entries of one successful result's payload.
fn port_entries(result: &ScanResult) -> Vec<PortEntry> {
    if !result.success {
        return Vec::new();
    }
    let Some(ports) = result.payload.get("ports").and_then(|p| p.as_array()) else {
        return Vec::new();
    };
    ports
        .iter()
        .filter_map(|entry| {
            let port = entry.get("port").and_then(|v| v.as_u64())?;
            let port = u16::try_from(port).ok()?;
            let service = entry
                .get("service")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let product = entry
                .get("product")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            Some(PortEntry { port, service, product })
        })
        .collect()
}

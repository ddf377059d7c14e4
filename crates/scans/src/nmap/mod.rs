//! Nmap-backed scans.

mod detailed;
mod quick;
mod vuln;

pub use detailed::DetailedScan;
pub use quick::QuickScan;
pub use vuln::VulnScan;

fn join_ports(ports: &[u16]) -> String {
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

//! Concrete scans, output parsing, and workflows for autoscout.
//!
//! The core engine treats scan payloads as opaque; everything that knows
//! what a port or a service is lives here.

pub mod nmap;
pub mod nvd;
pub mod parser;
pub mod recon;
pub mod workflows;

pub use parser::{HostRecord, NmapParser, NmapReport, PortRecord};
pub use recon::ContextExt;

use autoscout_core::{Scan, ScanRegistry};

/// Register the builtin scans.
pub fn register_builtin(registry: &mut ScanRegistry) {
    registry.register(|| Box::new(nmap::QuickScan) as Box<dyn Scan>);
    registry.register(|| Box::new(nmap::DetailedScan) as Box<dyn Scan>);
    registry.register(|| Box::new(nmap::VulnScan) as Box<dyn Scan>);
    registry.register(|| Box::new(nvd::CveLookupScan) as Box<dyn Scan>);
}

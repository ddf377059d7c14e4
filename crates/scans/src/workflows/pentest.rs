//! Staged penetration-test workflow.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use autoscout_core::{Scan, ScanContext, ScanExecutor, Workflow};

use crate::nmap::{DetailedScan, QuickScan, VulnScan};
use crate::nvd::CveLookupScan;
use crate::recon::ContextExt;

/// Quick discovery, then detailed and vulnerability scanning of whatever
/// was found, then CVE lookups for identified products.
pub struct PentestWorkflow {
    context: Arc<ScanContext>,
    executor: ScanExecutor,
}

impl PentestWorkflow {
    /// Create the workflow for a target.
    pub fn new(target: impl Into<String>, output_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        Ok(Self {
            context: Arc::new(ScanContext::new(target, output_dir)?),
            executor: ScanExecutor::new(),
        })
    }
}

#[async_trait]
impl Workflow for PentestWorkflow {
    fn context(&self) -> &Arc<ScanContext> {
        &self.context
    }

    fn executor(&self) -> &ScanExecutor {
        &self.executor
    }

    async fn define(&self) -> anyhow::Result<()> {
        // Stage 1: discover open ports.
        self.execute_scan(&QuickScan).await;

        if !self.context.has_open_ports().await {
            info!("no open ports found, stopping workflow");
            return Ok(());
        }
        info!("found {} open ports", self.context.open_ports().await.len());

        // Stage 2: service detection and vuln scripts together; each gates
        // itself through its own precondition.
        let stage: Vec<Arc<dyn Scan>> = vec![Arc::new(DetailedScan), Arc::new(VulnScan)];
        self.execute_parallel(&stage).await;

        // Stage 3: CVE lookup for whatever products were identified.
        let have_products = !self.context.products().await.is_empty();
        self.execute_if(have_products, &CveLookupScan).await;

        Ok(())
    }
}

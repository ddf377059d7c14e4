//! Ad-hoc workflow over an explicit scan list.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use autoscout_core::{Scan, ScanContext, ScanExecutor, Workflow};

/// Runs a caller-selected set of scans in parallel.
///
/// The entry point instantiates the scans from the registry and hands them
/// over; this workflow only orchestrates.
pub struct ScanListWorkflow {
    context: Arc<ScanContext>,
    executor: ScanExecutor,
    scans: Vec<Arc<dyn Scan>>,
}

impl ScanListWorkflow {
    /// Create the workflow for a target and scan list.
    pub fn new(
        target: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        scans: Vec<Arc<dyn Scan>>,
    ) -> std::io::Result<Self> {
        Ok(Self {
            context: Arc::new(ScanContext::new(target, output_dir)?),
            executor: ScanExecutor::new(),
            scans,
        })
    }
}

#[async_trait]
impl Workflow for ScanListWorkflow {
    fn context(&self) -> &Arc<ScanContext> {
        &self.context
    }

    fn executor(&self) -> &ScanExecutor {
        &self.executor
    }

    async fn define(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.scans.is_empty(), "no scans selected");
        self.execute_parallel(&self.scans).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoscout_core::ScanResult;
    use chrono::Utc;

    struct EchoScan {
        name: &'static str,
    }

    #[async_trait]
    impl Scan for EchoScan {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(&self, _ctx: &ScanContext) -> anyhow::Result<ScanResult> {
            let now = Utc::now();
            Ok(ScanResult::ok(self.name, now, now, "", serde_json::Value::Null))
        }
    }

    #[tokio::test]
    async fn runs_every_selected_scan() {
        let scans: Vec<Arc<dyn Scan>> = vec![
            Arc::new(EchoScan { name: "one" }),
            Arc::new(EchoScan { name: "two" }),
        ];
        let workflow = ScanListWorkflow::new(
            "203.0.113.9",
            std::env::temp_dir().join("autoscout-scanlist-tests"),
            scans,
        )
        .unwrap();

        let ctx = workflow.run().await.unwrap();
        assert!(ctx.has_result("one").await);
        assert!(ctx.has_result("two").await);
    }

    #[tokio::test]
    async fn an_empty_selection_fails_the_run() {
        let workflow = ScanListWorkflow::new(
            "203.0.113.9",
            std::env::temp_dir().join("autoscout-scanlist-tests"),
            Vec::new(),
        )
        .unwrap();

        assert!(workflow.run().await.is_err());
    }
}

//! Workflow abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::context::ScanContext;
use crate::executor::ScanExecutor;
use crate::result::ScanResult;
use crate::scan::Scan;

/// A caller-authored orchestration script.
///
/// A workflow owns one context and one executor for its lifetime and
/// expresses an imperative plan in [`define`](Self::define): execute
/// scans, inspect the context, branch. There is no explicit state machine;
/// a run either returns the completed context or propagates the script's
/// error.
#[async_trait]
pub trait Workflow: Send + Sync {
    /// The context owned by this workflow.
    fn context(&self) -> &Arc<ScanContext>;

    /// The executor owned by this workflow.
    fn executor(&self) -> &ScanExecutor;

    /// The workflow plan.
    ///
    /// Failures here are not contained the way scan failures are:
    /// [`run`](Self::run) logs them and passes them through to the caller.
    async fn define(&self) -> anyhow::Result<()>;

    /// Execute a single scan against the workflow context.
    async fn execute_scan(&self, scan: &dyn Scan) -> ScanResult {
        self.executor().execute(scan, self.context()).await
    }

    /// Execute several scans concurrently against the workflow context.
    async fn execute_parallel(&self, scans: &[Arc<dyn Scan>]) -> Vec<ScanResult> {
        self.executor().execute_parallel(scans, self.context()).await
    }

    /// Execute a scan only when `condition` holds.
    ///
    /// The condition is evaluated by the caller beforehand; this is a pure
    /// boolean gate, not re-checked state. Returns `None` when the scan
    /// was not run.
    async fn execute_if(&self, condition: bool, scan: &dyn Scan) -> Option<ScanResult> {
        if condition {
            Some(self.execute_scan(scan).await)
        } else {
            debug!("skipping scan '{}' (condition not met)", scan.name());
            None
        }
    }

    /// Run the workflow.
    ///
    /// Invokes [`define`](Self::define); on failure the error is logged
    /// and propagated, and the context is not returned. On success the
    /// completed context is returned.
    async fn run(&self) -> anyhow::Result<Arc<ScanContext>> {
        info!("starting workflow for target: {}", self.context().target());
        if let Err(e) = self.define().await {
            error!("workflow failed: {e:#}");
            return Err(e);
        }
        info!("workflow completed");
        Ok(Arc::clone(self.context()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct StaticScan {
        name: &'static str,
    }

    #[async_trait]
    impl Scan for StaticScan {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(&self, _ctx: &ScanContext) -> anyhow::Result<ScanResult> {
            let now = Utc::now();
            Ok(ScanResult::ok(self.name, now, now, "", serde_json::Value::Null))
        }
    }

    struct TwoStageWorkflow {
        context: Arc<ScanContext>,
        executor: ScanExecutor,
        run_second_stage: bool,
    }

    impl TwoStageWorkflow {
        fn new(run_second_stage: bool) -> Self {
            let context = ScanContext::new(
                "192.0.2.7",
                std::env::temp_dir().join("autoscout-workflow-tests"),
            )
            .unwrap();
            Self {
                context: Arc::new(context),
                executor: ScanExecutor::new(),
                run_second_stage,
            }
        }
    }

    #[async_trait]
    impl Workflow for TwoStageWorkflow {
        fn context(&self) -> &Arc<ScanContext> {
            &self.context
        }

        fn executor(&self) -> &ScanExecutor {
            &self.executor
        }

        async fn define(&self) -> anyhow::Result<()> {
            self.execute_scan(&StaticScan { name: "first" }).await;
            self.execute_if(self.run_second_stage, &StaticScan { name: "second" })
                .await;
            Ok(())
        }
    }

    struct FailingWorkflow {
        context: Arc<ScanContext>,
        executor: ScanExecutor,
    }

    #[async_trait]
    impl Workflow for FailingWorkflow {
        fn context(&self) -> &Arc<ScanContext> {
            &self.context
        }

        fn executor(&self) -> &ScanExecutor {
            &self.executor
        }

        async fn define(&self) -> anyhow::Result<()> {
            anyhow::bail!("script error")
        }
    }

    #[tokio::test]
    async fn run_returns_the_completed_context() {
        let workflow = TwoStageWorkflow::new(true);
        let ctx = workflow.run().await.unwrap();

        assert!(ctx.has_result("first").await);
        assert!(ctx.has_result("second").await);
    }

    #[tokio::test]
    async fn execute_if_skips_when_the_condition_is_false() {
        let workflow = TwoStageWorkflow::new(false);
        let ctx = workflow.run().await.unwrap();

        assert!(ctx.has_result("first").await);
        assert!(!ctx.has_result("second").await);
    }

    #[tokio::test]
    async fn define_errors_propagate_out_of_run() {
        let workflow = FailingWorkflow {
            context: Arc::new(
                ScanContext::new(
                    "192.0.2.8",
                    std::env::temp_dir().join("autoscout-workflow-tests"),
                )
                .unwrap(),
            ),
            executor: ScanExecutor::new(),
        };

        let err = workflow.run().await.unwrap_err();
        assert!(err.to_string().contains("script error"));
    }
}

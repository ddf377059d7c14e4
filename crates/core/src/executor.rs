//! Scan execution engine.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::context::ScanContext;
use crate::error::ExecError;
use crate::result::ScanResult;
use crate::scan::Scan;

/// Runs scans against a context, bounding execution time and containing
/// failures.
///
/// Every failure mode is converted into a [`ScanResult`] with
/// `success == false`; nothing escapes [`execute`](Self::execute) or
/// [`execute_parallel`](Self::execute_parallel).
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanExecutor;

impl ScanExecutor {
    /// Create an executor.
    pub fn new() -> Self {
        Self
    }

    /// Execute a single scan.
    ///
    /// The result is stored in the context under the scan's name, except
    /// when the scan never began execution because its precondition
    /// returned false or failed to evaluate; in those cases the result is
    /// only returned.
    pub async fn execute(&self, scan: &dyn Scan, ctx: &ScanContext) -> ScanResult {
        let name = scan.name().to_string();

        match scan.can_run(ctx).await {
            Ok(true) => {}
            Ok(false) => {
                info!("scan '{name}' skipped (conditions not met)");
                let mut result = error_result(&name, &ExecError::ConditionsNotMet);
                result.skipped = true;
                return result;
            }
            Err(e) => {
                error!("error evaluating precondition for scan '{name}': {e:#}");
                return error_result(&name, &ExecError::Precondition(format!("{e:#}")));
            }
        }

        info!("executing scan '{name}'...");
        let started_at = Utc::now();
        let timeout = scan.timeout();

        let result = match tokio::time::timeout(timeout, scan.execute(ctx)).await {
            Ok(Ok(result)) => {
                let secs = result.duration().as_secs_f64();
                if result.success {
                    info!("scan '{name}' completed successfully in {secs:.2}s");
                } else {
                    warn!("scan '{name}' completed with errors in {secs:.2}s");
                }
                result
            }
            Ok(Err(e)) => {
                error!("error executing scan '{name}': {e:#}");
                let mut result = error_result(&name, &ExecError::Execution(format!("{e:#}")));
                result.started_at = started_at;
                result.finished_at = Utc::now();
                result
            }
            Err(_) => {
                let secs = timeout.as_secs();
                error!("scan '{name}' timed out after {secs}s");
                let mut result = error_result(&name, &ExecError::Timeout(secs));
                result.started_at = started_at;
                result.finished_at = Utc::now();
                result.timed_out = true;
                result
            }
        };

        ctx.insert_result(&name, result.clone()).await;
        result
    }

    /// Execute several scans concurrently.
    ///
    /// All scans run to completion regardless of individual failures;
    /// there is no fail-fast and no cancellation of siblings. The returned
    /// list is index-aligned with the input regardless of completion
    /// order. An empty input returns an empty list without touching any
    /// scan. A failure at the fan-out layer itself (a panicked or aborted
    /// task, as opposed to an error already contained inside
    /// [`execute`](Self::execute)) becomes an error result tagged with
    /// that scan's name.
    pub async fn execute_parallel(
        &self,
        scans: &[Arc<dyn Scan>],
        ctx: &Arc<ScanContext>,
    ) -> Vec<ScanResult> {
        if scans.is_empty() {
            return Vec::new();
        }

        info!("executing {} scans in parallel...", scans.len());

        let mut handles = Vec::with_capacity(scans.len());
        for scan in scans {
            let scan = Arc::clone(scan);
            let ctx = Arc::clone(ctx);
            let executor = *self;
            handles.push((
                scan.name().to_string(),
                tokio::spawn(async move { executor.execute(scan.as_ref(), &ctx).await }),
            ));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!("scan '{name}' task failed: {e}");
                    results.push(error_result(&name, &ExecError::Scheduling(e.to_string())));
                }
            }
        }

        let successful = results.iter().filter(|r| r.success).count();
        info!(
            "parallel execution complete: {successful}/{} scans successful",
            results.len()
        );

        results
    }
}

fn error_result(name: &str, error: &ExecError) -> ScanResult {
    let now = Utc::now();
    ScanResult::failed(name, now, now, "", error.to_string())
}

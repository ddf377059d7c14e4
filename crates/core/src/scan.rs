//! Scan abstraction.

use std::time::Duration;

use async_trait::async_trait;

use crate::context::ScanContext;
use crate::result::ScanResult;

/// Default execution timeout for scans that do not override
/// [`Scan::timeout`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// A scan that can be executed against a target.
///
/// Implementations are stateless and cheap to construct; the registry
/// instantiates one transiently just to read its name. Expected failures
/// should be reported as a [`ScanResult`] with `success == false`, but the
/// executor also tolerates [`Scan::execute`] returning `Err` and contains
/// it the same way.
#[async_trait]
pub trait Scan: Send + Sync {
    /// Stable, non-empty identifier, unique within a registry.
    fn name(&self) -> &str;

    /// Human-readable description of what this scan does.
    fn description(&self) -> &str {
        ""
    }

    /// Execution timeout.
    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    /// Whether this scan needs root privileges. Advisory only; the executor
    /// does not enforce it.
    fn requires_root(&self) -> bool {
        false
    }

    /// Whether this scan should run given the current context.
    async fn can_run(&self, _ctx: &ScanContext) -> anyhow::Result<bool> {
        Ok(true)
    }

    /// Execute the scan.
    async fn execute(&self, ctx: &ScanContext) -> anyhow::Result<ScanResult>;

    /// Parse raw output into a structured payload.
    ///
    /// The executor never calls this; scans and collaborators may.
    fn parse_output(&self, raw: &str) -> serde_json::Value {
        serde_json::Value::String(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct MinimalScan;

    #[async_trait]
    impl Scan for MinimalScan {
        fn name(&self) -> &str {
            "minimal"
        }

        async fn execute(&self, _ctx: &ScanContext) -> anyhow::Result<ScanResult> {
            let now = Utc::now();
            Ok(ScanResult::ok("minimal", now, now, "", serde_json::Value::Null))
        }
    }

    #[tokio::test]
    async fn defaults_apply_when_not_overridden() {
        let scan = MinimalScan;
        let ctx = ScanContext::new("10.0.0.1", std::env::temp_dir().join("autoscout-scan-tests"))
            .unwrap();

        assert_eq!(scan.description(), "");
        assert_eq!(scan.timeout(), Duration::from_secs(300));
        assert!(!scan.requires_root());
        assert!(scan.can_run(&ctx).await.unwrap());
        assert_eq!(
            scan.parse_output("raw text"),
            serde_json::Value::String("raw text".to_string())
        );
    }
}

//! JSON result store and text summary.

use std::path::{Path, PathBuf};

use autoscout_core::{ContextSnapshot, ScanContext};
use tokio::fs;
use tracing::info;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur while persisting or loading results.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes scan results and summaries into the context's output directory.
pub struct ResultStore;

impl ResultStore {
    /// Save the full context as pretty-printed JSON. Returns the file path.
    pub async fn save(ctx: &ScanContext) -> Result<PathBuf> {
        let path = ctx.output_dir().join("results.json");
        let snapshot = ctx.snapshot().await;
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(&path, json).await?;
        info!("results saved to {}", path.display());
        Ok(path)
    }

    /// Load a previously saved context snapshot.
    pub async fn load(path: impl AsRef<Path>) -> Result<ContextSnapshot> {
        let content = fs::read_to_string(path.as_ref()).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save a human-readable summary. Returns the file path.
    pub async fn save_summary(ctx: &ScanContext) -> Result<PathBuf> {
        let path = ctx.output_dir().join("summary.txt");
        let snapshot = ctx.snapshot().await;
        fs::write(&path, render_summary(&snapshot)).await?;
        info!("summary saved to {}", path.display());
        Ok(path)
    }
}

/// Render a text summary of a finished run.
pub fn render_summary(snapshot: &ContextSnapshot) -> String {
    let bar = "=".repeat(70);
    let mut lines = vec![
        bar.clone(),
        "AUTOSCOUT SCAN SUMMARY".to_string(),
        bar.clone(),
        format!("Target: {}", snapshot.target),
        format!("Output Directory: {}", snapshot.output_dir.display()),
    ];

    let successful = snapshot.results.values().filter(|r| r.success).count();
    lines.push(format!("Completed Scans: {successful}/{}", snapshot.results.len()));
    lines.push(String::new());

    for (name, result) in &snapshot.results {
        let status = if result.success { "ok" } else { "failed" };
        lines.push(format!(
            "[{status}] {name}: {:.2}s",
            result.duration().as_secs_f64()
        ));
        if let Some(error) = &result.error {
            lines.push(format!("    error: {error}"));
        }
    }

    lines.push(bar);
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoscout_core::ScanResult;
    use chrono::Utc;

    async fn context(dir: &Path) -> ScanContext {
        let ctx = ScanContext::new("198.51.100.4", dir).unwrap();
        let now = Utc::now();
        ctx.insert_result(
            "quick_nmap",
            ScanResult::ok("quick_nmap", now, now, "out", serde_json::json!({ "ports": [] })),
        )
        .await;
        ctx.insert_result(
            "vuln_nmap",
            ScanResult::failed("vuln_nmap", now, now, "", "nmap exited with code 1"),
        )
        .await;
        ctx.set_metadata("note", serde_json::json!("demo")).await;
        ctx
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path()).await;

        let path = ResultStore::save(&ctx).await.unwrap();
        let snapshot = ResultStore::load(&path).await.unwrap();

        assert_eq!(snapshot.target, "198.51.100.4");
        let names: Vec<&str> = snapshot.results.keys().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["quick_nmap", "vuln_nmap"]);
        assert_eq!(snapshot.metadata.get("note"), Some(&serde_json::json!("demo")));
    }

    #[tokio::test]
    async fn load_fails_for_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            ResultStore::load(&missing).await,
            Err(StorageError::Io(_))
        ));
    }

    #[tokio::test]
    async fn summary_mentions_target_and_scan_status() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path()).await;

        let path = ResultStore::save_summary(&ctx).await.unwrap();
        let summary = tokio::fs::read_to_string(&path).await.unwrap();

        assert!(summary.contains("Target: 198.51.100.4"));
        assert!(summary.contains("Completed Scans: 1/2"));
        assert!(summary.contains("[ok] quick_nmap"));
        assert!(summary.contains("[failed] vuln_nmap"));
        assert!(summary.contains("nmap exited with code 1"));
    }
}

//! Shared scan context.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::result::ScanResult;

/// Carries state and results through a workflow run.
///
/// One context is created per run and shared as `Arc<ScanContext>` between
/// the workflow, the executor, and every scan. The results map preserves
/// insertion order; re-running a scan name overwrites its previous entry,
/// keeping no history. A name appears in the results only if that scan
/// actually began execution: skipped and precondition-failed attempts are
/// never stored.
#[derive(Debug)]
pub struct ScanContext {
    target: String,
    output_dir: PathBuf,
    results: RwLock<IndexMap<String, ScanResult>>,
    metadata: RwLock<HashMap<String, serde_json::Value>>,
}

impl ScanContext {
    /// Create a context, ensuring the output directory exists.
    pub fn new(target: impl Into<String>, output_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            target: target.into(),
            output_dir,
            results: RwLock::new(IndexMap::new()),
            metadata: RwLock::new(HashMap::new()),
        })
    }

    /// Target identifier (IP address or hostname).
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Directory scan artifacts are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Store a result under a scan name, overwriting any prior entry.
    ///
    /// Normally only the executor stores results, and only for scans that
    /// began execution.
    pub async fn insert_result(&self, name: &str, result: ScanResult) {
        self.results.write().await.insert(name.to_string(), result);
    }

    /// Result of a specific scan, if it ran.
    pub async fn result(&self, name: &str) -> Option<ScanResult> {
        self.results.read().await.get(name).cloned()
    }

    /// Whether a scan has been executed.
    pub async fn has_result(&self, name: &str) -> bool {
        self.results.read().await.contains_key(name)
    }

    /// Number of stored results.
    pub async fn result_count(&self) -> usize {
        self.results.read().await.len()
    }

    /// Snapshot of all results, in insertion order.
    pub async fn results(&self) -> IndexMap<String, ScanResult> {
        self.results.read().await.clone()
    }

    /// Snapshot of all successful results, in insertion order.
    pub async fn successful_results(&self) -> IndexMap<String, ScanResult> {
        self.results
            .read()
            .await
            .iter()
            .filter(|(_, result)| result.success)
            .map(|(name, result)| (name.clone(), result.clone()))
            .collect()
    }

    /// Set a metadata value.
    pub async fn set_metadata(&self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.write().await.insert(key.into(), value);
    }

    /// Read a metadata value.
    pub async fn metadata(&self, key: &str) -> Option<serde_json::Value> {
        self.metadata.read().await.get(key).cloned()
    }

    /// Serializable snapshot of the whole context.
    pub async fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            target: self.target.clone(),
            output_dir: self.output_dir.clone(),
            results: self.results.read().await.clone(),
            metadata: self.metadata.read().await.clone(),
        }
    }
}

/// Owned, serializable view of a context, used for persistence and
/// reporting once a run has finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Target identifier.
    pub target: String,

    /// Directory scan artifacts were written to.
    pub output_dir: PathBuf,

    /// All stored results, in insertion order.
    pub results: IndexMap<String, ScanResult>,

    /// Free-form run metadata.
    pub metadata: HashMap<String, serde_json::Value>,
}

//! Scan result record.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Time;

/// Outcome of one scan execution.
///
/// Immutable once constructed: the executor builds it, stores it in the
/// context, and hands out clones. The `payload` is domain-defined and never
/// interpreted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Name of the scan that produced this result.
    pub scan_name: String,

    /// Whether the scan succeeded.
    pub success: bool,

    /// When execution began.
    pub started_at: Time,

    /// When execution finished.
    pub finished_at: Time,

    /// Raw textual output, typically captured stdout.
    pub raw_output: String,

    /// Structured payload parsed from the raw output. Opaque to the core.
    #[serde(default)]
    pub payload: serde_json::Value,

    /// Error message when the scan failed.
    pub error: Option<String>,

    /// The scan was skipped because its preconditions were not met.
    #[serde(default)]
    pub skipped: bool,

    /// Execution exceeded the scan's declared timeout.
    #[serde(default)]
    pub timed_out: bool,

    /// Free-form extension data.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ScanResult {
    /// Build a successful result.
    pub fn ok(
        scan_name: impl Into<String>,
        started_at: Time,
        finished_at: Time,
        raw_output: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            scan_name: scan_name.into(),
            success: true,
            started_at,
            finished_at,
            raw_output: raw_output.into(),
            payload,
            error: None,
            skipped: false,
            timed_out: false,
            extra: HashMap::new(),
        }
    }

    /// Build a failed result.
    pub fn failed(
        scan_name: impl Into<String>,
        started_at: Time,
        finished_at: Time,
        raw_output: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            scan_name: scan_name.into(),
            success: false,
            started_at,
            finished_at,
            raw_output: raw_output.into(),
            payload: serde_json::Value::Null,
            error: Some(error.into()),
            skipped: false,
            timed_out: false,
            extra: HashMap::new(),
        }
    }

    /// Attach an extension entry.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Wall-clock duration of the execution, clamped to zero for records
    /// whose timestamps ran backwards.
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at).to_std().unwrap_or_default()
    }
}

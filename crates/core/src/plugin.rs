//! Declarative plugin units.
//!
//! A plugin unit is a TOML file defining one or more command-backed scans:
//!
//! ```toml
//! [[scan]]
//! name = "curl_headers"
//! description = "Fetch HTTP response headers"
//! timeout_secs = 60
//! command = ["curl", "-sI", "http://{target}/"]
//! requires_results = ["quick_nmap"]
//! ```
//!
//! `{target}` and `{output_dir}` are substituted from the context at
//! execution time. `requires_results` gates the scan on previously stored
//! results, so a unit can sequence itself after the scans it depends on.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::context::ScanContext;
use crate::process;
use crate::registry::ScanRegistry;
use crate::result::ScanResult;
use crate::scan::{Scan, DEFAULT_TIMEOUT};

/// Result of loading one plugin unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// The unit loaded; these scan names were registered.
    Loaded(Vec<String>),

    /// The unit failed to load and was skipped.
    Failed(String),
}

/// Errors raised while loading a plugin unit.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The unit file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The unit file is not a valid scan definition.
    #[error("invalid definition: {0}")]
    Parse(#[from] toml::de::Error),

    /// The unit defines no scans at all.
    #[error("unit defines no scans")]
    Empty,

    /// A scan definition is missing its name.
    #[error("scan definition has an empty name")]
    EmptyName,

    /// A scan definition has no command to run.
    #[error("scan '{0}' has an empty command")]
    EmptyCommand(String),
}

/// One `[[scan]]` table in a plugin unit.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanDefinition {
    /// Unique scan name.
    pub name: String,

    /// Display description.
    #[serde(default)]
    pub description: String,

    /// Timeout in seconds; the engine default applies when absent.
    pub timeout_secs: Option<u64>,

    /// Whether the command needs root privileges.
    #[serde(default)]
    pub requires_root: bool,

    /// Command argv. `{target}` and `{output_dir}` are substituted.
    pub command: Vec<String>,

    /// Names of results that must already be present for this scan to run.
    #[serde(default)]
    pub requires_results: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PluginFile {
    #[serde(default, rename = "scan")]
    scans: Vec<ScanDefinition>,
}

/// A scan materialized from a [`ScanDefinition`].
pub struct DefinedScan {
    def: ScanDefinition,
}

impl DefinedScan {
    /// Wrap a definition.
    pub fn new(def: ScanDefinition) -> Self {
        Self { def }
    }

    fn substituted_command(&self, ctx: &ScanContext) -> Vec<String> {
        let output_dir = ctx.output_dir().to_string_lossy();
        self.def
            .command
            .iter()
            .map(|arg| {
                arg.replace("{target}", ctx.target())
                    .replace("{output_dir}", &output_dir)
            })
            .collect()
    }
}

#[async_trait]
impl Scan for DefinedScan {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn description(&self) -> &str {
        &self.def.description
    }

    fn timeout(&self) -> Duration {
        self.def
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    fn requires_root(&self) -> bool {
        self.def.requires_root
    }

    async fn can_run(&self, ctx: &ScanContext) -> anyhow::Result<bool> {
        for required in &self.def.requires_results {
            if !ctx.has_result(required).await {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn execute(&self, ctx: &ScanContext) -> anyhow::Result<ScanResult> {
        let started_at = Utc::now();
        let argv = self.substituted_command(ctx);
        let output = process::run_command(&argv, None).await?;
        let finished_at = Utc::now();

        let raw = if output.stderr.is_empty() {
            output.stdout.clone()
        } else {
            format!("{}\n{}", output.stdout, output.stderr)
        };

        if !output.success() {
            warn!("scan '{}' command exited with code {}", self.def.name, output.exit_code);
            return Ok(ScanResult::failed(
                self.def.name.clone(),
                started_at,
                finished_at,
                raw,
                format!("command exited with code {}", output.exit_code),
            ));
        }

        let payload = self.parse_output(&output.stdout);
        Ok(ScanResult {
            scan_name: self.def.name.clone(),
            success: true,
            started_at,
            finished_at,
            raw_output: raw,
            payload,
            error: None,
            skipped: false,
            timed_out: false,
            extra: HashMap::new(),
        })
    }
}

/// Parse a plugin unit's content into scan definitions.
pub fn parse_unit(content: &str) -> Result<Vec<ScanDefinition>, PluginError> {
    let file: PluginFile = toml::from_str(content)?;
    if file.scans.is_empty() {
        return Err(PluginError::Empty);
    }
    for def in &file.scans {
        if def.name.is_empty() {
            return Err(PluginError::EmptyName);
        }
        if def.command.is_empty() {
            return Err(PluginError::EmptyCommand(def.name.clone()));
        }
    }
    Ok(file.scans)
}

/// Load one unit file and register every scan it defines.
///
/// Returns the registered names; errors never escape past the caller's
/// per-unit boundary in [`ScanRegistry::discover`].
pub(crate) fn load_unit(
    path: &Path,
    registry: &mut ScanRegistry,
) -> Result<Vec<String>, PluginError> {
    let content = fs::read_to_string(path)?;
    let defs = parse_unit(&content)?;
    let mut names = Vec::with_capacity(defs.len());
    for def in defs {
        names.push(def.name.clone());
        registry.register(move || Box::new(DefinedScan::new(def.clone())) as Box<dyn Scan>);
    }
    Ok(names)
}

/// Recursively collect plugin unit files under `dir`, skipping hidden and
/// `_`-prefixed entries.
pub(crate) fn collect_units(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot read plugin directory {}: {e}", dir.display());
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        if path.is_dir() {
            collect_units(&path, out);
        } else if path.extension().map_or(false, |ext| ext == "toml") {
            out.push(path);
        }
    }
}

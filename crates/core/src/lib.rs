//! Core orchestration engine for autoscout.
//!
//! This crate defines the scan abstraction, the scan registry with plugin
//! discovery, the timeout- and failure-containing executor, and the workflow
//! layer that composes them against a shared context.

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod executor;
pub mod plugin;
pub mod process;
pub mod registry;
pub mod result;
pub mod scan;
pub mod workflow;

pub use context::{ContextSnapshot, ScanContext};
pub use error::ExecError;
pub use executor::ScanExecutor;
pub use plugin::{DefinedScan, DiscoveryOutcome, PluginError, ScanDefinition};
pub use process::{run_command, CommandOutput};
pub use registry::{ScanConstructor, ScanRegistry};
pub use result::ScanResult;
pub use scan::{Scan, DEFAULT_TIMEOUT};
pub use workflow::Workflow;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

//! Result persistence and reporting for autoscout.
//!
//! Consumes a finished scan context read-only and writes it to disk as
//! JSON plus a human-readable summary.

#![warn(missing_docs)]

mod store;

pub use store::{render_summary, Result, ResultStore, StorageError};

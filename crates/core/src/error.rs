//! Executor failure taxonomy.

use thiserror::Error;

/// Failure modes the executor contains into a failed
/// [`ScanResult`](crate::result::ScanResult).
///
/// None of these escape `execute`/`execute_parallel`; each is rendered into
/// the result's error string.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The scan's precondition returned false.
    #[error("scan conditions not met")]
    ConditionsNotMet,

    /// The scan's precondition itself failed to evaluate.
    #[error("error evaluating precondition: {0}")]
    Precondition(String),

    /// Execution exceeded the scan's declared timeout.
    #[error("scan timed out after {0}s")]
    Timeout(u64),

    /// The scan's execute operation returned an error.
    #[error("{0}")]
    Execution(String),

    /// Failure at the fan-out layer, distinct from an error already
    /// contained inside a single execution.
    #[error("scan task failed: {0}")]
    Scheduling(String),
}

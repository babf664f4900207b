//! Request-level errors for job operations.

use duscope_core::ScanError;
use thiserror::Error;

use crate::job::JobId;

/// Errors returned to callers of the job manager.
///
/// These describe bad requests. Problems inside a running scan become node
/// notes or a job in the `error` state instead.
#[derive(Debug, Error)]
pub enum JobError {
    /// No job was ever issued with this id.
    #[error("Job not found: {id}")]
    NotFound { id: String },

    /// The scan request was rejected before a job was created.
    #[error("Invalid scan request: {0}")]
    InvalidInput(#[from] ScanError),

    /// The job has not reached a terminal state yet.
    #[error("Job is still running: {id}")]
    StillRunning { id: JobId },
}

impl JobError {
    /// Create a not-found error for an id.
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound { id: id.to_string() }
    }
}

//! Scan job state, progress and snapshots.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use duscope_core::Node;
use duscope_scan::{ProgressSink, ScanOutcome, ScanProgress};

use crate::error::JobError;

/// Unique identifier of a scan job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Strings that are not valid ids can never have been issued.
impl FromStr for JobId {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| JobError::not_found(s))
    }
}

/// Lifecycle state of a scan job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// The scan is in progress.
    Running,
    /// The scan finished and a result is attached.
    Done,
    /// Cancellation was observed before the scan finished.
    Canceled,
    /// The scan failed unexpectedly.
    Error,
}

impl JobState {
    /// Check if the job can no longer change state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
            Self::Canceled => write!(f, "canceled"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Consistent copy of a job's state taken for a status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Job id.
    pub id: JobId,
    /// Requested root path.
    pub root: PathBuf,
    /// Current state.
    pub state: JobState,
    /// File entries processed.
    pub files: u64,
    /// Bytes of those files.
    pub bytes: u64,
    /// Path most recently visited.
    pub current: String,
    /// When the job started.
    pub started_at: DateTime<Utc>,
    /// When progress was last written.
    pub updated_at: DateTime<Utc>,
    /// When the job reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Result tree, only for `done` jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Node>,
    /// Failure message, only for `error` jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Mutable part of a job, written only by the job's own execution.
#[derive(Debug)]
struct JobRecord {
    state: JobState,
    files: u64,
    bytes: u64,
    current: String,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    result: Option<Node>,
    error: Option<String>,
}

impl JobRecord {
    fn apply_progress(&mut self, progress: &ScanProgress) {
        self.files = progress.files_scanned;
        self.bytes = progress.bytes_scanned;
        self.current = progress.current_path.to_string_lossy().into_owned();
        self.updated_at = Utc::now();
    }

    fn finish(&mut self, state: JobState) {
        let now = Utc::now();
        self.state = state;
        self.updated_at = now;
        self.finished_at = Some(now);
    }
}

/// One registered job: identity, cancellation signal and guarded record.
#[derive(Debug)]
pub(crate) struct JobEntry {
    pub(crate) id: JobId,
    pub(crate) root: PathBuf,
    pub(crate) cancel: CancellationToken,
    record: Mutex<JobRecord>,
}

impl JobEntry {
    pub(crate) fn new(id: JobId, root: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id,
            root,
            cancel: CancellationToken::new(),
            record: Mutex::new(JobRecord {
                state: JobState::Running,
                files: 0,
                bytes: 0,
                current: String::new(),
                started_at: now,
                updated_at: now,
                finished_at: None,
                result: None,
                error: None,
            }),
        }
    }

    // A panicking job must not make the record unreadable for status callers.
    fn lock(&self) -> MutexGuard<'_, JobRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> JobState {
        self.lock().state
    }

    pub(crate) fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.lock().finished_at
    }

    /// Copy the record under its lock.
    pub(crate) fn snapshot(&self, include_result: bool) -> JobSnapshot {
        let record = self.lock();
        JobSnapshot {
            id: self.id,
            root: self.root.clone(),
            state: record.state,
            files: record.files,
            bytes: record.bytes,
            current: record.current.clone(),
            started_at: record.started_at,
            updated_at: record.updated_at,
            finished_at: record.finished_at,
            result: if include_result {
                record.result.clone()
            } else {
                None
            },
            error: record.error.clone(),
        }
    }

    /// Record the outcome of a walk. Ignored once the job is terminal.
    pub(crate) fn complete(&self, outcome: ScanOutcome) -> JobState {
        let mut record = self.lock();
        if record.state.is_terminal() {
            return record.state;
        }

        record.apply_progress(&outcome.progress);
        if outcome.canceled {
            record.finish(JobState::Canceled);
        } else {
            record.result = Some(outcome.root);
            record.finish(JobState::Done);
        }
        record.state
    }

    /// Record an unexpected failure. Ignored once the job is terminal.
    pub(crate) fn fail(&self, message: String) -> JobState {
        let mut record = self.lock();
        if record.state.is_terminal() {
            return record.state;
        }

        record.error = Some(message);
        record.finish(JobState::Error);
        record.state
    }
}

/// Progress reports from the walk land directly in the job record.
impl ProgressSink for JobEntry {
    fn report(&self, progress: &ScanProgress) {
        let mut record = self.lock();
        if !record.state.is_terminal() {
            record.apply_progress(progress);
        }
    }
}

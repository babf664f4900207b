//! Registry of concurrent, cancellable scan jobs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use duscope_core::ScanConfig;
use duscope_scan::{ProgressSink, ScanOutcome, Scanner};

use crate::error::JobError;
use crate::job::{JobEntry, JobId, JobSnapshot, JobState};

/// Delay between polls in [`JobManager::wait`].
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Thread-safe registry of scan jobs keyed by id.
///
/// Construct one per process (or per test) and share it behind an `Arc`.
/// Jobs are kept until removed with [`JobManager::remove`] or
/// [`JobManager::prune_finished`].
#[derive(Debug, Default)]
pub struct JobManager {
    jobs: Mutex<HashMap<JobId, Arc<JobEntry>>>,
}

impl JobManager {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a scan in the background and return its id immediately.
    ///
    /// The root is not validated; see [`JobManager::start_checked`].
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, config: ScanConfig) -> JobId {
        self.spawn_job(config, |config, cancel, sink| {
            Scanner::new(config).run(cancel, sink)
        })
    }

    /// Validate that the root exists, then start a scan.
    pub fn start_checked(&self, config: ScanConfig) -> Result<JobId, JobError> {
        config.validate_root()?;
        Ok(self.start(config))
    }

    fn spawn_job<F>(&self, config: ScanConfig, body: F) -> JobId
    where
        F: FnOnce(ScanConfig, &CancellationToken, &dyn ProgressSink) -> ScanOutcome
            + Send
            + 'static,
    {
        let id = JobId::new();
        let entry = Arc::new(JobEntry::new(id, config.root.clone()));
        self.lock_jobs().insert(id, Arc::clone(&entry));

        info!(job_id = %id, root = %config.root.display(), "Scan job started");

        tokio::spawn(async move {
            let worker = Arc::clone(&entry);
            let result = tokio::task::spawn_blocking(move || {
                body(config, &worker.cancel, worker.as_ref())
            })
            .await;

            let state = match result {
                Ok(outcome) => entry.complete(outcome),
                Err(err) => {
                    let message = join_error_message(err);
                    warn!(job_id = %entry.id, error = %message, "Scan job failed");
                    entry.fail(message)
                }
            };

            info!(job_id = %entry.id, %state, "Scan job finished");
        });

        id
    }

    /// Take a consistent snapshot of a job, including its result tree.
    ///
    /// Returns `None` for ids that were never issued (or were removed).
    pub fn status(&self, id: &JobId) -> Option<JobSnapshot> {
        let entry = self.entry(id)?;
        Some(entry.snapshot(true))
    }

    /// Request cooperative cancellation. Returns whether the job exists.
    pub fn cancel(&self, id: &JobId) -> bool {
        match self.entry(id) {
            Some(entry) => {
                debug!(job_id = %id, "Cancellation requested");
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Snapshots of all jobs, oldest first, without result trees.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let entries: Vec<_> = self.lock_jobs().values().cloned().collect();
        let mut snapshots: Vec<_> = entries.iter().map(|e| e.snapshot(false)).collect();
        snapshots.sort_by_key(|s| s.started_at);
        snapshots
    }

    /// Poll a job until it reaches a terminal state.
    ///
    /// Returns `None` if the job does not exist.
    pub async fn wait(&self, id: &JobId) -> Option<JobSnapshot> {
        loop {
            let snapshot = self.status(id)?;
            if snapshot.state.is_terminal() {
                return Some(snapshot);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// Remove a terminal job from the registry and return its final snapshot.
    pub fn remove(&self, id: &JobId) -> Result<JobSnapshot, JobError> {
        let mut jobs = self.lock_jobs();
        let entry = jobs.get(id).ok_or_else(|| JobError::not_found(id))?;
        if !entry.state().is_terminal() {
            return Err(JobError::StillRunning { id: *id });
        }
        let entry = jobs.remove(id).ok_or_else(|| JobError::not_found(id))?;
        drop(jobs);
        Ok(entry.snapshot(true))
    }

    /// Remove terminal jobs that finished at least `older_than` ago.
    ///
    /// Running jobs are never removed. Returns the number of jobs removed.
    pub fn prune_finished(&self, older_than: Duration) -> usize {
        let age = TimeDelta::from_std(older_than).unwrap_or(TimeDelta::MAX);
        let cutoff = Utc::now().checked_sub_signed(age);

        let mut jobs = self.lock_jobs();
        let before = jobs.len();
        jobs.retain(|_, entry| match (entry.finished_at(), cutoff) {
            (Some(finished), Some(cutoff)) => finished > cutoff,
            _ => true,
        });
        let removed = before - jobs.len();

        if removed > 0 {
            debug!(removed, remaining = jobs.len(), "Pruned finished jobs");
        }
        removed
    }

    /// Number of registered jobs.
    pub fn len(&self) -> usize {
        self.lock_jobs().len()
    }

    /// Check if no jobs are registered.
    pub fn is_empty(&self) -> bool {
        self.lock_jobs().is_empty()
    }

    fn entry(&self, id: &JobId) -> Option<Arc<JobEntry>> {
        self.lock_jobs().get(id).cloned()
    }

    fn lock_jobs(&self) -> MutexGuard<'_, HashMap<JobId, Arc<JobEntry>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return "scan task was cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("scan panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("scan panicked: {msg}")
    } else {
        "scan panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use duscope_core::Node;
    use duscope_scan::ScanProgress;

    use super::*;

    #[tokio::test]
    async fn test_panicking_job_becomes_error() {
        let manager = JobManager::new();
        let id = manager.spawn_job(ScanConfig::new("/data"), |_, _, _| {
            panic!("disk on fire");
        });

        let snapshot = manager.wait(&id).await.unwrap();
        assert_eq!(snapshot.state, JobState::Error);
        assert!(snapshot.error.unwrap().contains("disk on fire"));
        assert!(snapshot.result.is_none());
    }

    #[tokio::test]
    async fn test_other_jobs_survive_a_panic() {
        let manager = JobManager::new();
        let bad = manager.spawn_job(ScanConfig::new("/bad"), |_, _, _| panic!("boom"));
        let good = manager.spawn_job(ScanConfig::new("/good"), |config, _, sink| {
            let mut progress = ScanProgress::new();
            progress.files_scanned = 1;
            progress.bytes_scanned = 9;
            sink.report(&progress);
            ScanOutcome {
                root: Node::leaf(&config.root, 9),
                canceled: false,
                progress,
            }
        });

        assert_eq!(manager.wait(&bad).await.unwrap().state, JobState::Error);
        let snapshot = manager.wait(&good).await.unwrap();
        assert_eq!(snapshot.state, JobState::Done);
        assert_eq!(snapshot.bytes, 9);
        assert_eq!(snapshot.result.unwrap().path, "/good");
    }

    #[tokio::test]
    async fn test_remove_refuses_running_job() {
        let manager = JobManager::new();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let id = manager.spawn_job(ScanConfig::new("/slow"), move |config, _, _| {
            let _ = release_rx.recv();
            ScanOutcome {
                root: Node::leaf(Path::new(&config.root), 0),
                canceled: false,
                progress: ScanProgress::new(),
            }
        });

        assert!(matches!(
            manager.remove(&id),
            Err(JobError::StillRunning { .. })
        ));
        release_tx.send(()).unwrap();

        manager.wait(&id).await.unwrap();
        assert!(manager.remove(&id).is_ok());
        assert!(manager.status(&id).is_none());
        assert!(matches!(
            manager.remove(&id),
            Err(JobError::NotFound { .. })
        ));
    }
}

//! Progress reporting for scan operations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

/// Progress update during scanning.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanProgress {
    /// Number of file entries processed so far.
    pub files_scanned: u64,
    /// Total bytes of those files.
    pub bytes_scanned: u64,
    /// Path most recently visited.
    pub current_path: PathBuf,
    /// Time elapsed since scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_scanned: 0,
            bytes_scanned: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives periodic progress reports from a running scan.
///
/// Reports arrive on the scanning thread, so implementations should return
/// quickly.
pub trait ProgressSink {
    /// Handle one progress report.
    fn report(&self, progress: &ScanProgress);
}

/// Sink that discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: &ScanProgress) {}
}

/// Forward reports to broadcast subscribers. Lagging or absent receivers are
/// ignored.
impl ProgressSink for broadcast::Sender<ScanProgress> {
    fn report(&self, progress: &ScanProgress) {
        let _ = self.send(progress.clone());
    }
}

impl<T: ProgressSink + ?Sized> ProgressSink for &T {
    fn report(&self, progress: &ScanProgress) {
        (**self).report(progress);
    }
}

impl<T: ProgressSink + ?Sized> ProgressSink for Arc<T> {
    fn report(&self, progress: &ScanProgress) {
        (**self).report(progress);
    }
}

/// Running counters for one scan, with report cadence.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    files_scanned: u64,
    bytes_scanned: u64,
    current_path: PathBuf,
    interval: u64,
    since_report: u64,
}

impl ProgressTracker {
    pub fn new(interval: u64) -> Self {
        Self {
            start_time: Instant::now(),
            files_scanned: 0,
            bytes_scanned: 0,
            current_path: PathBuf::new(),
            interval: interval.max(1),
            since_report: 0,
        }
    }

    pub fn record_file(&mut self, size: u64) {
        self.files_scanned += 1;
        self.bytes_scanned += size;
    }

    pub fn set_current_path(&mut self, path: PathBuf) {
        self.current_path = path;
    }

    /// Count one processed entry. Returns `true` when a report is due.
    pub fn tick(&mut self) -> bool {
        self.since_report += 1;
        if self.since_report >= self.interval {
            self.since_report = 0;
            true
        } else {
            false
        }
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            files_scanned: self.files_scanned,
            bytes_scanned: self.bytes_scanned,
            current_path: self.current_path.clone(),
            elapsed: self.start_time.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_cadence() {
        let mut tracker = ProgressTracker::new(3);
        assert!(!tracker.tick());
        assert!(!tracker.tick());
        assert!(tracker.tick());
        assert!(!tracker.tick());
    }

    #[test]
    fn test_tracker_zero_interval_reports_every_entry() {
        let mut tracker = ProgressTracker::new(0);
        assert!(tracker.tick());
        assert!(tracker.tick());
    }

    #[test]
    fn test_tracker_snapshot() {
        let mut tracker = ProgressTracker::new(10);
        tracker.record_file(100);
        tracker.record_file(50);
        tracker.set_current_path(PathBuf::from("/tmp/b"));

        let progress = tracker.snapshot();
        assert_eq!(progress.files_scanned, 2);
        assert_eq!(progress.bytes_scanned, 150);
        assert_eq!(progress.current_path, PathBuf::from("/tmp/b"));
    }

    #[test]
    fn test_broadcast_sink() {
        let (tx, mut rx) = broadcast::channel(4);
        let mut progress = ScanProgress::new();
        progress.files_scanned = 7;

        tx.report(&progress);
        assert_eq!(rx.try_recv().unwrap().files_scanned, 7);
    }
}

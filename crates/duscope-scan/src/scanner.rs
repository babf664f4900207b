//! Recursive, cycle-safe directory size scanner.

use std::fs::{self, DirEntry, Metadata};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use duscope_core::{Node, NodeNote, ScanConfig};

use crate::cancel::CancelCheck;
use crate::hidden::is_hidden;
use crate::progress::{ProgressSink, ProgressTracker, ScanProgress};
use crate::visited::VisitedPaths;

/// Scanner that walks one subtree and builds a size-annotated [`Node`] tree.
#[derive(Debug, Clone)]
pub struct Scanner {
    config: ScanConfig,
}

/// Everything a finished walk produced.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Root of the result tree.
    pub root: Node,
    /// Whether cancellation was observed at any polling point.
    pub canceled: bool,
    /// Final counters.
    pub progress: ScanProgress,
}

/// Why a directory entry was left out of its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Hidden entry while hidden entries are excluded.
    Hidden,
    /// Symbolic link while links are not followed.
    Symlink,
    /// Entry vanished between listing and inspection.
    Vanished,
    /// Permission denied while inspecting the entry.
    PermissionDenied,
    /// Any other I/O failure.
    Io(io::ErrorKind),
}

impl SkipReason {
    fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::Vanished,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            kind => Self::Io(kind),
        }
    }
}

/// Result of processing one directory entry.
#[derive(Debug)]
pub enum EntryOutcome {
    /// The entry contributes this node to its parent.
    Node(Node),
    /// The entry was left out.
    Skipped(SkipReason),
}

impl Scanner {
    /// Create a scanner for the given configuration.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Walk the configured root and return the result tree.
    ///
    /// Never fails: problems with individual entries are skipped or recorded
    /// as notes on the affected node.
    pub fn scan<C, P>(&self, cancel: &C, progress: &P) -> Node
    where
        C: CancelCheck + ?Sized,
        P: ProgressSink + ?Sized,
    {
        self.run(cancel, progress).root
    }

    /// Walk the configured root and return the tree with walk metadata.
    pub fn run<C, P>(&self, cancel: &C, progress: &P) -> ScanOutcome
    where
        C: CancelCheck + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let root_path =
            std::path::absolute(&self.config.root).unwrap_or_else(|_| self.config.root.clone());

        debug!(
            root = %root_path.display(),
            max_depth = self.config.max_depth,
            follow_symlinks = self.config.follow_symlinks,
            exclude_hidden = self.config.exclude_hidden,
            "Starting scan"
        );

        let mut walk = Walk {
            config: &self.config,
            cancel,
            sink: progress,
            visited: VisitedPaths::new(),
            tracker: ProgressTracker::new(self.config.progress_interval),
            canceled: false,
        };

        let root = walk.visit(&root_path, 0);
        let progress_now = walk.tracker.snapshot();
        walk.sink.report(&progress_now);

        debug!(
            root = %root_path.display(),
            files = progress_now.files_scanned,
            bytes = progress_now.bytes_scanned,
            canceled = walk.canceled,
            elapsed_ms = progress_now.elapsed.as_millis() as u64,
            "Scan finished"
        );

        ScanOutcome {
            root,
            canceled: walk.canceled,
            progress: progress_now,
        }
    }
}

/// State threaded through one recursive walk.
struct Walk<'a, C: ?Sized, P: ?Sized> {
    config: &'a ScanConfig,
    cancel: &'a C,
    sink: &'a P,
    visited: VisitedPaths,
    tracker: ProgressTracker,
    canceled: bool,
}

impl<C, P> Walk<'_, C, P>
where
    C: CancelCheck + ?Sized,
    P: ProgressSink + ?Sized,
{
    fn visit(&mut self, path: &Path, depth: u32) -> Node {
        if !self.visited.enter(path) {
            trace!(path = %path.display(), "Skipping already visited path");
            return Node::noted(path, 0, NodeNote::SkippedCycle);
        }

        if self.poll_cancel() {
            return Node::noted(path, 0, NodeNote::Canceled);
        }

        self.tracker.set_current_path(path.to_path_buf());

        let stat = if depth == 0 {
            self.stat_root(path)
        } else {
            self.stat(path)
        };
        let metadata = match stat {
            Ok(m) => m,
            Err(err) => {
                trace!(path = %path.display(), error = %err, "Stat failed");
                return Node::noted(path, 0, NodeNote::StatFailed);
            }
        };

        if !metadata.is_dir() {
            let size = metadata.len();
            self.tracker.record_file(size);
            return Node::leaf(path, size);
        }

        if depth >= self.config.max_depth {
            return Node::noted(path, metadata.len(), NodeNote::MaxDepthReached);
        }

        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "Cannot list directory");
                return Node::noted(path, metadata.len(), NodeNote::UnreadableDirectory);
            }
        };

        let mut children = Vec::new();
        for entry in entries {
            if self.poll_cancel() {
                return Node::noted(path, 0, NodeNote::Canceled);
            }

            match self.visit_entry(entry, depth) {
                EntryOutcome::Node(node) => children.push(node),
                EntryOutcome::Skipped(reason) => {
                    trace!(parent = %path.display(), ?reason, "Skipped entry");
                }
            }

            if self.tracker.tick() {
                self.sink.report(&self.tracker.snapshot());
            }
        }

        Node::directory(path, children)
    }

    fn visit_entry(&mut self, entry: io::Result<DirEntry>, depth: u32) -> EntryOutcome {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => return EntryOutcome::Skipped(SkipReason::from_io(&err)),
        };

        if self.config.exclude_hidden && is_hidden(&entry) {
            return EntryOutcome::Skipped(SkipReason::Hidden);
        }

        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(err) => return EntryOutcome::Skipped(SkipReason::from_io(&err)),
        };

        let path = entry.path();
        let is_dir = if file_type.is_symlink() {
            if !self.config.follow_symlinks {
                return EntryOutcome::Skipped(SkipReason::Symlink);
            }
            fs::metadata(&path).is_ok_and(|m| m.is_dir())
        } else {
            file_type.is_dir()
        };

        if is_dir {
            return EntryOutcome::Node(self.visit(&path, depth + 1));
        }

        EntryOutcome::Node(self.file_leaf(path))
    }

    /// Leaf for a non-directory entry. A failed stat counts as size 0.
    fn file_leaf(&mut self, path: PathBuf) -> Node {
        let size = self.stat(&path).map(|m| m.len()).unwrap_or(0);
        self.tracker.record_file(size);
        let node = Node::leaf(&path, size);
        self.tracker.set_current_path(path);
        node
    }

    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        if self.config.follow_symlinks {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        }
    }

    /// The root always resolves symlinks so a linked root is walked as its
    /// target. A dangling root link falls back to the link itself.
    fn stat_root(&self, path: &Path) -> io::Result<Metadata> {
        fs::metadata(path).or_else(|_| fs::symlink_metadata(path))
    }

    fn poll_cancel(&mut self) -> bool {
        if !self.canceled && self.cancel.is_canceled() {
            debug!(
                current = %self.tracker.snapshot().current_path.display(),
                "Cancellation observed"
            );
            self.canceled = true;
        }
        self.canceled
    }
}

//! Real-path tracking for cycle detection.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Tracks the canonical paths visited during one scan.
///
/// A symlink or bind mount that leads back to an ancestor resolves to a real
/// path that is already present, which is how the scanner breaks cycles.
/// Each scan owns its own tracker.
#[derive(Debug, Default)]
pub struct VisitedPaths {
    seen: HashSet<PathBuf>,
}

impl VisitedPaths {
    /// Create a new tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a real path. Returns `true` if this is the first time seeing it.
    pub fn track(&mut self, real: PathBuf) -> bool {
        self.seen.insert(real)
    }

    /// Canonicalize `path` and track it.
    ///
    /// Returns `false` only when the real path was seen before. Paths that
    /// cannot be canonicalized are not tracked and count as new.
    pub fn enter(&mut self, path: &Path) -> bool {
        match std::fs::canonicalize(path) {
            Ok(real) => self.track(real),
            Err(_) => true,
        }
    }

    /// Check if a real path has been seen (without tracking).
    pub fn has_seen(&self, real: &Path) -> bool {
        self.seen.contains(real)
    }

    /// Get the number of real paths tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if nothing has been tracked.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

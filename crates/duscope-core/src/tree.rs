//! Summary statistics for a scanned tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeNote};

/// Summary statistics computed from a finished tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Total size in bytes.
    pub total_size: u64,
    /// Total number of files.
    pub total_files: u64,
    /// Total number of enumerated directories, including the root.
    pub total_dirs: u64,
    /// Deepest level reached (root is 0).
    pub max_depth: u32,
    /// Largest file (path, size).
    pub largest_file: Option<(String, u64)>,
    /// Number of degraded nodes by note.
    pub notes: BTreeMap<String, u64>,
}

impl TreeStats {
    /// Walk a tree and collect its statistics.
    pub fn from_node(root: &Node) -> Self {
        let mut stats = Self {
            total_size: root.size,
            ..Self::default()
        };
        stats.visit(root, 0);
        stats
    }

    fn visit(&mut self, node: &Node, depth: u32) {
        self.max_depth = self.max_depth.max(depth);

        if let Some(note) = node.note {
            self.record_note(note);
            return;
        }

        match &node.children {
            Some(children) => {
                self.total_dirs += 1;
                for child in children {
                    self.visit(child, depth + 1);
                }
            }
            None => self.record_file(&node.path, node.size),
        }
    }

    /// Update stats with a file entry.
    pub fn record_file(&mut self, path: &str, size: u64) {
        self.total_files += 1;

        if self.largest_file.as_ref().is_none_or(|(_, s)| size > *s) {
            self.largest_file = Some((path.to_string(), size));
        }
    }

    /// Record a degraded node.
    pub fn record_note(&mut self, note: NodeNote) {
        *self.notes.entry(note.as_str().to_string()).or_default() += 1;
    }

    /// Check if any node in the tree was degraded.
    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }
}

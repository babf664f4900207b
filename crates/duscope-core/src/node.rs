//! Size-annotated result tree nodes.

use std::fmt;
use std::path::{Component, Path};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Tag marking a node whose size is a best-effort value rather than a true
/// subtree sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeNote {
    /// The real path was already visited during this scan.
    SkippedCycle,
    /// The entry could not be stat'ed.
    StatFailed,
    /// The depth limit stopped descent into this directory.
    MaxDepthReached,
    /// The directory exists but could not be listed.
    UnreadableDirectory,
    /// Cancellation was observed before this node finished.
    Canceled,
}

impl NodeNote {
    /// All notes, in declaration order.
    pub const ALL: [NodeNote; 5] = [
        NodeNote::SkippedCycle,
        NodeNote::StatFailed,
        NodeNote::MaxDepthReached,
        NodeNote::UnreadableDirectory,
        NodeNote::Canceled,
    ];

    /// Wire name of the note.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SkippedCycle => "skipped_cycle",
            Self::StatFailed => "stat_failed",
            Self::MaxDepthReached => "max_depth_reached",
            Self::UnreadableDirectory => "unreadable_directory",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for NodeNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single file or directory in the result tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Base name, or the full path when the path has no base name.
    pub name: CompactString,

    /// Absolute path of the entry.
    pub path: String,

    /// Size in bytes (aggregate for fully enumerated directories).
    pub size: u64,

    /// Children, present only for fully enumerated directories, sorted by
    /// size descending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,

    /// Degradation marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<NodeNote>,
}

impl Node {
    /// Create a leaf node (a file, or anything that is not descended into).
    pub fn leaf(path: &Path, size: u64) -> Self {
        Self {
            name: Self::name_for(path),
            path: path.to_string_lossy().into_owned(),
            size,
            children: None,
            note: None,
        }
    }

    /// Create a degraded node carrying `note`. Never has children.
    pub fn noted(path: &Path, size: u64, note: NodeNote) -> Self {
        Self {
            note: Some(note),
            ..Self::leaf(path, size)
        }
    }

    /// Create a fully enumerated directory node.
    ///
    /// The size is the sum of the children's sizes and the children are
    /// sorted by size descending, keeping enumeration order on ties.
    pub fn directory(path: &Path, mut children: Vec<Node>) -> Self {
        let size = children.iter().map(|c| c.size).sum();
        children.sort_by(|a, b| b.size.cmp(&a.size));
        Self {
            name: Self::name_for(path),
            path: path.to_string_lossy().into_owned(),
            size,
            children: Some(children),
            note: None,
        }
    }

    /// Display name for a path: its last component (`..` included), or the
    /// whole path for roots and prefixes.
    pub fn name_for(path: &Path) -> CompactString {
        match path.components().next_back() {
            Some(component @ (Component::Normal(_) | Component::ParentDir)) => {
                CompactString::new(component.as_os_str().to_string_lossy())
            }
            _ => CompactString::new(path.to_string_lossy()),
        }
    }

    /// Check if this node is an enumerated directory.
    pub fn is_dir(&self) -> bool {
        self.children.is_some()
    }

    /// Children slice (empty for leaves and degraded nodes).
    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Get the number of direct children.
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// Count leaf entries in this subtree that are not directories.
    pub fn file_count(&self) -> u64 {
        match &self.children {
            Some(children) => children.iter().map(Node::file_count).sum(),
            None if self.note.is_none() => 1,
            None => 0,
        }
    }

    /// Find a node by its path string.
    pub fn find(&self, path: &str) -> Option<&Node> {
        if self.path == path {
            return Some(self);
        }
        if !Path::new(path).starts_with(&self.path) {
            return None;
        }
        self.children().iter().find_map(|c| c.find(path))
    }

    /// Depth-first iterator over this node and all descendants.
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter { stack: vec![self] }
    }

    /// Iterate over every degraded node in this subtree.
    pub fn notes(&self) -> impl Iterator<Item = (&Node, NodeNote)> {
        self.iter().filter_map(|n| n.note.map(|note| (n, note)))
    }
}

/// Pre-order iterator over a node tree.
pub struct NodeIter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

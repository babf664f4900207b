//! Scan configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Depth limit applied when none is given.
pub const DEFAULT_MAX_DEPTH: u32 = 50;

/// Number of processed entries between progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 256;

/// Configuration for one scan.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Directories at this depth are reported but not descended into.
    #[builder(default = "DEFAULT_MAX_DEPTH")]
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Follow symbolic links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Skip hidden entries (dot-files, plus attribute-hidden on Windows).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub exclude_hidden: bool,

    /// Entries processed between progress reports.
    #[builder(default = "DEFAULT_PROGRESS_INTERVAL")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

fn default_progress_interval() -> u64 {
    DEFAULT_PROGRESS_INTERVAL
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                Err("Root path cannot be empty".to_string())
            }
            Some(_) => {
                if self.progress_interval == Some(0) {
                    return Err("Progress interval must be at least 1".to_string());
                }
                Ok(())
            }
            None => Err("Root path is required".to_string()),
        }
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a config with default options for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            follow_symlinks: false,
            exclude_hidden: true,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Check that the root exists.
    ///
    /// The engine itself never calls this; callers that accept paths from
    /// users run it before starting a scan.
    pub fn validate_root(&self) -> Result<(), ScanError> {
        if self.root.as_os_str().is_empty() {
            return Err(ScanError::InvalidConfig {
                message: "Root path cannot be empty".to_string(),
            });
        }
        std::fs::symlink_metadata(&self.root)
            .map(|_| ())
            .map_err(|e| ScanError::io(&self.root, e))
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

//! Directory size scanning engine for duscope.
//!
//! This crate walks a directory tree and builds a size-annotated
//! [`Node`] tree. Key features:
//!
//! - **Cycle safety** via real-path tracking (symlinks, junctions, bind mounts)
//! - **Depth limits** with best-effort sizes at the cut-off
//! - **Best-effort traversal**: unreadable entries are skipped or noted, never
//!   raised as errors
//! - **Cooperative cancellation** through any [`CancelCheck`]
//! - **Progress reports** at a bounded cadence through any [`ProgressSink`]
//!
//! # Example
//!
//! ```rust,no_run
//! use duscope_scan::{NeverCancel, NoProgress, ScanConfig, Scanner};
//!
//! let scanner = Scanner::new(ScanConfig::new("/path/to/scan"));
//! let root = scanner.scan(&NeverCancel, &NoProgress);
//!
//! println!("Total size: {} bytes", root.size);
//! println!("Total files: {}", root.file_count());
//! ```
//!
//! # Progress Monitoring
//!
//! A `tokio::sync::broadcast::Sender` is a progress sink, so subscribers can
//! follow a scan running on another thread:
//!
//! ```rust,no_run
//! use duscope_scan::{NeverCancel, ScanConfig, ScanProgress, Scanner};
//! use tokio::sync::broadcast;
//!
//! let (tx, mut progress_rx) = broadcast::channel::<ScanProgress>(100);
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("Scanned {} files", progress.files_scanned);
//!     }
//! });
//!
//! let root = Scanner::new(ScanConfig::new(".")).scan(&NeverCancel, &tx);
//! ```

mod cancel;
mod hidden;
mod progress;
mod scanner;
mod visited;

pub use cancel::{CancelCheck, NeverCancel};
pub use hidden::{is_hidden, is_hidden_name};
pub use progress::{NoProgress, ProgressSink, ScanProgress};
pub use scanner::{EntryOutcome, ScanOutcome, Scanner, SkipReason};
pub use visited::VisitedPaths;

// Re-export core types for convenience
pub use duscope_core::{Node, NodeNote, ScanConfig, ScanError, TreeStats};

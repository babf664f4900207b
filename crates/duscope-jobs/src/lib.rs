//! Background scan jobs for duscope.
//!
//! [`JobManager`] owns a registry of scan jobs. Each job runs one
//! [`duscope_scan::Scanner`] walk on the Tokio blocking pool while callers
//! poll consistent [`JobSnapshot`]s and may request cooperative cancellation.
//!
//! # Example
//!
//! ```rust,no_run
//! use duscope_jobs::{JobManager, JobState};
//! use duscope_core::ScanConfig;
//!
//! # async fn demo() {
//! let manager = JobManager::new();
//! let id = manager.start(ScanConfig::new("/var/log"));
//!
//! let snapshot = manager.wait(&id).await.unwrap();
//! if snapshot.state == JobState::Done {
//!     println!("{} bytes", snapshot.result.unwrap().size);
//! }
//! # }
//! ```

mod error;
mod job;
mod manager;

pub use error::JobError;
pub use job::{JobId, JobSnapshot, JobState};
pub use manager::{JobManager, WAIT_POLL_INTERVAL};

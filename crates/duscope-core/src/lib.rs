//! Core types for duscope.
//!
//! This crate provides the data structures shared by the scanner and the job
//! manager: the size-annotated [`Node`] tree, scan configuration, error types
//! and summary statistics.

mod config;
mod error;
mod node;
mod tree;

pub use config::{
    DEFAULT_MAX_DEPTH, DEFAULT_PROGRESS_INTERVAL, ScanConfig, ScanConfigBuilder,
    ScanConfigBuilderError,
};
pub use error::ScanError;
pub use node::{Node, NodeIter, NodeNote};
pub use tree::TreeStats;

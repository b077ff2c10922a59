//! Directory size estimation for fileprovider.
//!
//! This crate walks directory trees with jwalk to answer "how many bytes so
//! far / in total" for long-running copy and move operations.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use fileprovider_scan::ProgressEstimator;
//!
//! let estimator = ProgressEstimator::new();
//! let summary = estimator.estimate(Path::new("/path/to/tree"), true);
//!
//! println!("{} folders, {} files, {} bytes", summary.folders, summary.files, summary.bytes);
//! ```
//!
//! Walks are blocking and potentially slow; poll them from a background
//! thread, never from an async executor or UI thread.

mod estimator;
mod summary;

pub use estimator::ProgressEstimator;
pub use summary::TreeSummary;

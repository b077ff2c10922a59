//! Walk results and progress snapshots.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Aggregate counts for a directory tree.
///
/// Returned by a finished estimate and also sent, partially filled, as a
/// progress snapshot while a long walk is running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSummary {
    /// Number of folders below the root (the root itself is not counted).
    pub folders: u64,
    /// Number of non-folder entries.
    pub files: u64,
    /// Sum of file sizes in bytes.
    pub bytes: u64,
    /// Entries that could not be read and were left out.
    pub skipped: u64,
    /// Path most recently visited.
    pub current_path: PathBuf,
    /// Time spent walking.
    pub elapsed: Duration,
}

impl TreeSummary {
    /// Summary of a single file.
    pub fn single_file(path: PathBuf, bytes: u64) -> Self {
        Self {
            files: 1,
            bytes,
            current_path: path,
            ..Self::default()
        }
    }

    /// Get total items counted (files + folders).
    pub fn total_items(&self) -> u64 {
        self.files + self.folders
    }

    /// Calculate walk rate in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.bytes as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// The counts as a `(folders, files, bytes)` tuple.
    pub fn counts(&self) -> (u64, u64, u64) {
        (self.folders, self.files, self.bytes)
    }
}

/// Running tally kept while walking.
#[derive(Debug)]
pub(crate) struct Tally {
    start_time: Instant,
    summary: TreeSummary,
}

impl Tally {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            summary: TreeSummary::default(),
        }
    }

    pub fn record_file(&mut self, path: PathBuf, size: u64) {
        self.summary.files += 1;
        self.summary.bytes += size;
        self.summary.current_path = path;
    }

    pub fn record_folder(&mut self, path: PathBuf) {
        self.summary.folders += 1;
        self.summary.current_path = path;
    }

    pub fn record_skipped(&mut self) {
        self.summary.skipped += 1;
    }

    pub fn items(&self) -> u64 {
        self.summary.total_items() + self.summary.skipped
    }

    pub fn snapshot(&self) -> TreeSummary {
        TreeSummary {
            elapsed: self.start_time.elapsed(),
            ..self.summary.clone()
        }
    }

    pub fn finish(mut self) -> TreeSummary {
        self.summary.elapsed = self.start_time.elapsed();
        self.summary
    }
}

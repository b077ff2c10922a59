//! JWalk-based tree size estimation.

use std::path::Path;
use std::time::Duration;

use jwalk::{Parallelism, WalkDir};
use tokio::sync::broadcast;
use tracing::debug;

use crate::summary::{Tally, TreeSummary};

/// Number of visited entries between two progress snapshots.
const PROGRESS_INTERVAL: u64 = 1000;

/// Walks directory trees to count folders and files and sum file sizes.
///
/// Estimates are advisory: entries that cannot be read are left out of the
/// tally instead of failing the walk. Every call performs a full traversal and
/// blocks the calling thread, so keep it off latency-sensitive threads.
pub struct ProgressEstimator {
    threads: usize,
    progress_tx: broadcast::Sender<TreeSummary>,
}

impl ProgressEstimator {
    /// Create an estimator that walks on the shared rayon pool.
    pub fn new() -> Self {
        Self::with_threads(0)
    }

    /// Create an estimator with a dedicated pool of `threads` (0 = shared pool).
    pub fn with_threads(threads: usize) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            threads,
            progress_tx,
        }
    }

    /// Subscribe to progress snapshots of running walks.
    pub fn subscribe(&self) -> broadcast::Receiver<TreeSummary> {
        self.progress_tx.subscribe()
    }

    /// Count folders, files and bytes below `root`.
    ///
    /// With `recursive == false` only the direct children are visited. A root
    /// that is not a folder counts as one file; a missing root counts as
    /// nothing.
    pub fn estimate(&self, root: &Path, recursive: bool) -> TreeSummary {
        let metadata = match std::fs::symlink_metadata(root) {
            Ok(m) => m,
            Err(err) => {
                debug!(path = %root.display(), %err, "Estimate root unreadable");
                return TreeSummary::default();
            }
        };

        if !metadata.is_dir() {
            return TreeSummary::single_file(root.to_path_buf(), metadata.len());
        }

        let parallelism = match self.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        let walker = WalkDir::new(root)
            .parallelism(parallelism)
            .skip_hidden(false)
            .follow_links(false)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 });

        let mut tally = Tally::new();

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    debug!(path = ?err.path(), %err, "Skipping unreadable entry");
                    tally.record_skipped();
                    continue;
                }
            };

            let path = entry.path();
            if entry.file_type().is_dir() {
                tally.record_folder(path);
            } else {
                match entry.metadata() {
                    Ok(metadata) => tally.record_file(path, metadata.len()),
                    Err(err) => {
                        debug!(path = %path.display(), %err, "Skipping entry without metadata");
                        tally.record_skipped();
                    }
                }
            }

            if tally.items() % PROGRESS_INTERVAL == 0 {
                let _ = self.progress_tx.send(tally.snapshot());
            }
        }

        tally.finish()
    }

    /// Total bytes stored at `path`, recursively.
    pub fn size_of(&self, path: &Path) -> u64 {
        self.estimate(path, true).bytes
    }
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/a.bin"), vec![0u8; 10]).unwrap();
        fs::write(root.join("sub/b.bin"), vec![0u8; 20]).unwrap();
        fs::write(root.join("sub/c.bin"), vec![0u8; 30]).unwrap();

        temp
    }

    #[test]
    fn test_recursive_estimate() {
        let temp = create_test_tree();
        let summary = ProgressEstimator::new().estimate(temp.path(), true);
        assert_eq!(summary.counts(), (1, 3, 60));
        assert_eq!(summary.skipped, 0);
    }

    #[test]
    fn test_shallow_estimate() {
        let temp = create_test_tree();
        let summary = ProgressEstimator::new().estimate(temp.path(), false);
        assert_eq!(summary.counts(), (1, 0, 0));
    }

    #[test]
    fn test_hidden_entries_counted() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".hidden"), "abcd").unwrap();

        let summary = ProgressEstimator::new().estimate(temp.path(), true);
        assert_eq!(summary.counts(), (0, 1, 4));
    }

    #[test]
    fn test_single_file_root() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("only.txt");
        fs::write(&file, "12345").unwrap();

        let summary = ProgressEstimator::new().estimate(&file, true);
        assert_eq!(summary.counts(), (0, 1, 5));
    }

    #[test]
    fn test_missing_root() {
        let temp = TempDir::new().unwrap();
        let summary = ProgressEstimator::new().estimate(&temp.path().join("nope"), true);
        assert_eq!(summary, TreeSummary::default());
    }

    #[test]
    fn test_dedicated_pool() {
        let temp = create_test_tree();
        let estimator = ProgressEstimator::with_threads(2);
        assert_eq!(estimator.size_of(temp.path()), 60);
    }
}

//! Handles returned by the local engine.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use fileprovider_core::{OperationHandle, OperationKind};
use fileprovider_scan::ProgressEstimator;

/// Absolute locations used to measure an operation's progress.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgressPaths {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    /// Bytes the operation is known to transfer, when known up front.
    pub expected_total: Option<u64>,
}

impl ProgressPaths {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn transfer(source: &Path, destination: &Path) -> Self {
        Self {
            source: Some(source.to_path_buf()),
            destination: Some(destination.to_path_buf()),
            expected_total: None,
        }
    }

    pub fn write(destination: &Path, total: u64) -> Self {
        Self {
            source: None,
            destination: Some(destination.to_path_buf()),
            expected_total: Some(total),
        }
    }
}

/// Handle to an operation scheduled on a [`LocalEngine`](crate::LocalEngine).
///
/// Progress figures are measured on the filesystem when asked for, which
/// walks whole trees for copies and moves. Query them from a blocking
/// context.
#[derive(Clone)]
pub struct LocalOperationHandle {
    inner: Arc<Inner>,
}

struct Inner {
    operation: OperationKind,
    root: PathBuf,
    progress: ProgressPaths,
    estimator: Arc<ProgressEstimator>,
    finished: AtomicBool,
    cached_total: OnceLock<u64>,
}

impl LocalOperationHandle {
    pub(crate) fn new(
        operation: OperationKind,
        root: PathBuf,
        progress: ProgressPaths,
        estimator: Arc<ProgressEstimator>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                operation,
                root,
                progress,
                estimator,
                finished: AtomicBool::new(false),
                cached_total: OnceLock::new(),
            }),
        }
    }

    /// The storage root the operation runs against.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub(crate) fn finish(&self) {
        self.inner.finished.store(true, Ordering::Release);
    }

    fn measure(&self, path: Option<&PathBuf>) -> u64 {
        path.map_or(0, |p| self.inner.estimator.size_of(p))
    }
}

impl OperationHandle for LocalOperationHandle {
    fn operation(&self) -> &OperationKind {
        &self.inner.operation
    }

    fn bytes_so_far(&self) -> u64 {
        let progress = &self.inner.progress;
        match &self.inner.operation {
            OperationKind::Modify { .. } => progress
                .destination
                .as_ref()
                .and_then(|p| std::fs::metadata(p).ok())
                .map_or(0, |m| m.len()),
            OperationKind::Copy { .. } | OperationKind::Move { .. } => {
                self.measure(progress.destination.as_ref())
            }
            _ => 0,
        }
    }

    fn total_bytes(&self) -> u64 {
        let progress = &self.inner.progress;
        match &self.inner.operation {
            OperationKind::Modify { .. } => progress.expected_total.unwrap_or(0),
            OperationKind::Copy { .. } => *self
                .inner
                .cached_total
                .get_or_init(|| self.measure(progress.source.as_ref())),
            OperationKind::Move { .. } => {
                if let Some(total) = self.inner.cached_total.get() {
                    return *total;
                }
                let source_present = progress
                    .source
                    .as_ref()
                    .is_some_and(|p| p.symlink_metadata().is_ok());
                if source_present {
                    *self
                        .inner
                        .cached_total
                        .get_or_init(|| self.measure(progress.source.as_ref()))
                } else if self.inner.finished.load(Ordering::Acquire) {
                    // The source is gone once a move lands
                    *self
                        .inner
                        .cached_total
                        .get_or_init(|| self.measure(progress.destination.as_ref()))
                } else {
                    0
                }
            }
            _ => 0,
        }
    }

    fn in_progress(&self) -> bool {
        !self.inner.finished.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for LocalOperationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalOperationHandle")
            .field("operation", &self.inner.operation)
            .field("in_progress", &self.in_progress())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn handle(operation: OperationKind, root: &Path, progress: ProgressPaths) -> LocalOperationHandle {
        LocalOperationHandle::new(
            operation,
            root.to_path_buf(),
            progress,
            Arc::new(ProgressEstimator::new()),
        )
    }

    #[test]
    fn test_modify_progress() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out.bin");
        let h = handle(
            OperationKind::modify("/out.bin"),
            temp.path(),
            ProgressPaths::write(&target, 10),
        );

        assert_eq!(h.bytes_so_far(), 0);
        assert_eq!(h.total_bytes(), 10);

        fs::write(&target, [0u8; 4]).unwrap();
        assert_eq!(h.bytes_so_far(), 4);
        assert_eq!(h.fraction_completed(), Some(0.4));
    }

    #[test]
    fn test_copy_total_is_cached() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("a"), [0u8; 30]).unwrap();

        let h = handle(
            OperationKind::copy("/src", "/dst"),
            temp.path(),
            ProgressPaths::transfer(&source, &temp.path().join("dst")),
        );
        assert_eq!(h.total_bytes(), 30);
        assert_eq!(h.bytes_so_far(), 0);

        fs::write(source.join("b"), [0u8; 30]).unwrap();
        assert_eq!(h.total_bytes(), 30);
    }

    #[test]
    fn test_finished_move_measures_destination() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("moved");
        fs::write(&destination, [0u8; 12]).unwrap();

        let h = handle(
            OperationKind::move_to("/orig", "/moved"),
            temp.path(),
            ProgressPaths::transfer(&temp.path().join("orig"), &destination),
        );
        assert!(h.in_progress());
        assert_eq!(h.total_bytes(), 0);

        h.finish();
        assert!(!h.in_progress());
        assert_eq!(h.total_bytes(), 12);
        assert_eq!(h.bytes_so_far(), 12);
    }

    #[test]
    fn test_other_kinds_are_zero() {
        let temp = TempDir::new().unwrap();
        let h = handle(OperationKind::remove("/x"), temp.path(), ProgressPaths::none());
        assert_eq!(h.bytes_so_far(), 0);
        assert_eq!(h.total_bytes(), 0);
        assert!(!h.cancel());
        assert_eq!(h.fraction_completed(), None);
        assert_eq!(h.root(), temp.path());
    }
}

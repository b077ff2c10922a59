//! The contract every storage backend implements.
//!
//! Operations are asynchronous: each call schedules work, returns a handle
//! right away and reports exactly one terminal outcome through the boxed
//! completion callback.

use std::path::Path;
use std::sync::Arc;

use crate::{FileObject, OperationKind, ProviderError};

/// Callback receiving the terminal outcome of an operation.
pub type Completion<T> = Box<dyn FnOnce(Result<T, ProviderError>) + Send + 'static>;

/// Callback invoked when a watched directory changes.
pub type ChangeHandler = Arc<dyn Fn() + Send + Sync + 'static>;

/// Predicate deciding whether a search visits-and-returns an item.
pub type SearchPredicate = Arc<dyn Fn(&FileObject) -> bool + Send + Sync + 'static>;

/// Callback streaming search hits as they are found.
pub type FoundHandler = Arc<dyn Fn(&FileObject) + Send + Sync + 'static>;

/// A scheduled or finished operation.
pub trait OperationHandle: Send + Sync {
    /// The operation this handle tracks.
    fn operation(&self) -> &OperationKind;

    /// Bytes already transferred. May be expensive to compute.
    fn bytes_so_far(&self) -> u64;

    /// Total bytes the operation will transfer, 0 when unknown.
    fn total_bytes(&self) -> u64;

    /// Whether the operation has not yet reported its outcome.
    fn in_progress(&self) -> bool;

    /// Try to cancel the operation. Returns `true` if it was cancelled.
    ///
    /// Backends without cancellation keep the default.
    fn cancel(&self) -> bool {
        false
    }

    /// Fraction complete in `0.0..=1.0`, or `None` when the total is unknown.
    fn fraction_completed(&self) -> Option<f64> {
        let total = self.total_bytes();
        if total == 0 {
            return None;
        }
        Some((self.bytes_so_far() as f64 / total as f64).min(1.0))
    }
}

/// Uniform asynchronous file access.
pub trait FileProvider: Send + Sync {
    /// Handle type returned by every operation.
    type Handle: OperationHandle;

    /// List the direct children of a folder.
    fn contents_of_directory(
        &self,
        path: &Path,
        completion: Completion<Vec<FileObject>>,
    ) -> Self::Handle;

    /// Describe a single item.
    fn attributes_of_item(&self, path: &Path, completion: Completion<FileObject>) -> Self::Handle;

    /// Read the whole contents of a file.
    fn contents(&self, path: &Path, completion: Completion<Vec<u8>>) -> Self::Handle;

    /// Read up to `length` bytes starting at `offset`.
    fn contents_range(
        &self,
        path: &Path,
        offset: u64,
        length: usize,
        completion: Completion<Vec<u8>>,
    ) -> Self::Handle;

    /// Find items under `path` matching `query`.
    ///
    /// `found` is called from the worker thread for every hit as it is found.
    fn search_files(
        &self,
        path: &Path,
        recursive: bool,
        query: SearchPredicate,
        found: Option<FoundHandler>,
        completion: Completion<Vec<FileObject>>,
    ) -> Self::Handle;

    /// Create a folder named `name` inside `at`.
    fn create_folder(&self, name: &str, at: &Path, completion: Completion<()>) -> Self::Handle;

    /// Write `data` to a file, creating it if needed.
    fn write_contents(
        &self,
        path: &Path,
        data: Vec<u8>,
        overwrite: bool,
        atomically: bool,
        completion: Completion<()>,
    ) -> Self::Handle;

    /// Move an item.
    fn move_item(
        &self,
        path: &Path,
        to: &Path,
        overwrite: bool,
        completion: Completion<()>,
    ) -> Self::Handle;

    /// Copy an item.
    fn copy_item(
        &self,
        path: &Path,
        to: &Path,
        overwrite: bool,
        completion: Completion<()>,
    ) -> Self::Handle;

    /// Remove an item and everything under it.
    fn remove_item(&self, path: &Path, completion: Completion<()>) -> Self::Handle;

    /// Create a symbolic link at `path` pointing to `destination`.
    fn create_symbolic_link(
        &self,
        path: &Path,
        destination: &Path,
        completion: Completion<()>,
    ) -> Self::Handle;

    /// Copy a local file into storage.
    fn copy_in(
        &self,
        local: &Path,
        to: &Path,
        overwrite: bool,
        completion: Completion<()>,
    ) -> Self::Handle;

    /// Copy an item out of storage to a local path.
    fn copy_out(
        &self,
        path: &Path,
        local: &Path,
        overwrite: bool,
        completion: Completion<()>,
    ) -> Self::Handle;
}

/// Change notification for backends that can watch folders.
pub trait FileProviderMonitor: Send + Sync {
    /// Start watching `path`, replacing any existing watch on it.
    ///
    /// Best effort: a path that cannot be watched is silently ignored.
    fn register_notifying(&self, path: &Path, handler: ChangeHandler);

    /// Stop watching `path`. No-op if it is not watched.
    fn unregister_notifying(&self, path: &Path);

    /// Whether `path` is currently watched.
    fn is_registered(&self, path: &Path) -> bool;
}

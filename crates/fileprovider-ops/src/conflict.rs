//! Per-item conflict and error policy for recursive operations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fileprovider_core::{OperationKind, PathResolver, ProviderError};
use tracing::{debug, warn};

/// Policy consulted for every item of a recursive copy, move, remove or link.
///
/// Called synchronously on the worker running the operation. Paths in the
/// [`OperationKind`] are storage-relative where possible and absolute for
/// locations outside the storage root.
pub trait ConflictResolver: Send + Sync {
    /// Whether the item should be acted on. Vetoed items are skipped silently;
    /// a vetoed folder is skipped with everything below it.
    fn should_proceed(&self, operation: &OperationKind) -> bool {
        let _ = operation;
        true
    }

    /// Whether the tree operation should continue after `error` on this item.
    ///
    /// Returning `false` makes `error` the terminal outcome of the whole
    /// operation.
    fn should_continue_after_error(&self, error: &ProviderError, operation: &OperationKind) -> bool {
        let _ = (error, operation);
        false
    }
}

/// Absorbs every per-item error and carries on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinueOnError;

impl ConflictResolver for ContinueOnError {
    fn should_continue_after_error(&self, _error: &ProviderError, _operation: &OperationKind) -> bool {
        true
    }
}

/// The resolver snapshot a single operation runs with.
#[derive(Clone)]
pub(crate) struct ItemPolicy {
    resolver: Option<Arc<dyn ConflictResolver>>,
    paths: PathResolver,
}

impl ItemPolicy {
    pub fn new(resolver: Option<Arc<dyn ConflictResolver>>, paths: PathResolver) -> Self {
        Self { resolver, paths }
    }

    /// Storage-relative form of an absolute location, when it has one.
    pub fn describe(&self, path: &Path) -> PathBuf {
        self.paths.relative(path).unwrap_or_else(|| path.to_path_buf())
    }

    pub fn proceed(&self, operation: &OperationKind) -> bool {
        let proceed = self
            .resolver
            .as_ref()
            .is_none_or(|r| r.should_proceed(operation));
        if !proceed {
            debug!(%operation, "Skipped by conflict resolver");
        }
        proceed
    }

    /// Either absorb `error` (resolver opted to continue) or hand it back.
    pub fn absorb(&self, error: ProviderError, operation: &OperationKind) -> Result<(), ProviderError> {
        match &self.resolver {
            Some(resolver) if resolver.should_continue_after_error(&error, operation) => {
                warn!(%operation, %error, "Continuing after item error");
                Ok(())
            }
            _ => Err(error),
        }
    }

    pub fn copy_kind(&self, source: &Path, destination: &Path) -> OperationKind {
        OperationKind::copy(self.describe(source), self.describe(destination))
    }

    pub fn move_kind(&self, source: &Path, destination: &Path) -> OperationKind {
        OperationKind::move_to(self.describe(source), self.describe(destination))
    }

    pub fn remove_kind(&self, path: &Path) -> OperationKind {
        OperationKind::remove(self.describe(path))
    }

    pub fn link_kind(&self, link: &Path, target: &Path) -> OperationKind {
        OperationKind::link(self.describe(link), self.describe(target))
    }
}

impl std::fmt::Debug for ItemPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemPolicy")
            .field("resolver", &self.resolver.is_some())
            .field("root", &self.paths.root())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Veto;

    impl ConflictResolver for Veto {
        fn should_proceed(&self, _operation: &OperationKind) -> bool {
            false
        }
    }

    fn io_error() -> ProviderError {
        ProviderError::io(
            "/x",
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        )
    }

    #[test]
    fn test_defaults_without_resolver() {
        let policy = ItemPolicy::new(None, PathResolver::new("/root"));
        let op = OperationKind::remove("/a");

        assert!(policy.proceed(&op));
        assert!(policy.absorb(io_error(), &op).is_err());
    }

    #[test]
    fn test_default_trait_methods() {
        struct Plain;
        impl ConflictResolver for Plain {}

        let policy = ItemPolicy::new(Some(Arc::new(Plain)), PathResolver::new("/root"));
        let op = OperationKind::remove("/a");
        assert!(policy.proceed(&op));
        assert!(policy.absorb(io_error(), &op).is_err());
    }

    #[test]
    fn test_custom_resolver() {
        let policy = ItemPolicy::new(Some(Arc::new(Veto)), PathResolver::new("/root"));
        assert!(!policy.proceed(&OperationKind::remove("/a")));

        let policy = ItemPolicy::new(Some(Arc::new(ContinueOnError)), PathResolver::new("/root"));
        assert!(policy.absorb(io_error(), &OperationKind::remove("/a")).is_ok());
    }

    #[test]
    fn test_kinds_use_relative_paths() {
        let policy = ItemPolicy::new(None, PathResolver::new("/root"));
        let op = policy.copy_kind(Path::new("/root/a/b"), Path::new("/elsewhere/b"));
        assert_eq!(op, OperationKind::copy("/a/b", "/elsewhere/b"));
    }
}

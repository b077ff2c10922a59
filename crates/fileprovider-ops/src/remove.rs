//! Recursive removal.

use std::fs;
use std::path::Path;

use fileprovider_core::ProviderError;
use tracing::debug;

use crate::conflict::ItemPolicy;

/// Remove `path` and everything below it.
pub(crate) fn remove_item(path: &Path, policy: &ItemPolicy) -> Result<(), ProviderError> {
    remove_entry(path, policy).map(|_| ())
}

/// Remove a single item. Returns whether it is gone.
///
/// A folder is only removed once every child is; a vetoed or absorbed child
/// keeps its ancestors in place.
fn remove_entry(path: &Path, policy: &ItemPolicy) -> Result<bool, ProviderError> {
    let operation = policy.remove_kind(path);
    if !policy.proceed(&operation) {
        return Ok(false);
    }

    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) => {
            policy.absorb(ProviderError::io(path, e), &operation)?;
            return Ok(false);
        }
    };

    if metadata.is_dir() {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                policy.absorb(ProviderError::cannot_open(path, e), &operation)?;
                return Ok(false);
            }
        };

        let mut emptied = true;
        for entry in entries {
            match entry {
                Ok(entry) => emptied &= remove_entry(&entry.path(), policy)?,
                Err(e) => {
                    policy.absorb(ProviderError::io(path, e), &operation)?;
                    emptied = false;
                }
            }
        }

        if !emptied {
            debug!(path = %path.display(), "Keeping folder with remaining children");
            return Ok(false);
        }

        if let Err(e) = fs::remove_dir(path) {
            policy.absorb(ProviderError::io(path, e), &operation)?;
            return Ok(false);
        }
        return Ok(true);
    }

    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) => {
            policy.absorb(ProviderError::io(path, e), &operation)?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ConflictResolver;
    use fileprovider_core::{OperationKind, PathResolver};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct KeepNamed(&'static str);

    impl ConflictResolver for KeepNamed {
        fn should_proceed(&self, operation: &OperationKind) -> bool {
            operation.source().file_name().is_none_or(|n| n != self.0)
        }
    }

    #[test]
    fn test_remove_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("dir/inner")).unwrap();
        fs::write(root.join("dir/inner/a.txt"), "a").unwrap();

        let policy = ItemPolicy::new(None, PathResolver::new(root));
        remove_item(&root.join("dir"), &policy).unwrap();
        assert!(!root.join("dir").exists());
    }

    #[test]
    fn test_remove_missing() {
        let temp = TempDir::new().unwrap();
        let policy = ItemPolicy::new(None, PathResolver::new(temp.path()));

        let err = remove_item(&temp.path().join("nope"), &policy).unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[test]
    fn test_vetoed_child_keeps_parent() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("dir")).unwrap();
        fs::write(root.join("dir/keep.txt"), "k").unwrap();
        fs::write(root.join("dir/drop.txt"), "d").unwrap();

        let policy = ItemPolicy::new(Some(Arc::new(KeepNamed("keep.txt"))), PathResolver::new(root));
        remove_item(&root.join("dir"), &policy).unwrap();

        assert!(root.join("dir/keep.txt").exists());
        assert!(!root.join("dir/drop.txt").exists());
    }
}

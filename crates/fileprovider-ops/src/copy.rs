//! Recursive copy.

use std::fs;
use std::path::Path;

use fileprovider_core::{OperationKind, ProviderError};
use tracing::debug;

use crate::conflict::ItemPolicy;
use crate::link::make_symlink;

/// Copy `source` to `destination`, consulting `policy` for every item.
pub(crate) fn copy_item(
    source: &Path,
    destination: &Path,
    overwrite: bool,
    policy: &ItemPolicy,
) -> Result<(), ProviderError> {
    ensure_not_into_itself(source, destination)?;

    let operation = policy.copy_kind(source, destination);
    if !policy.proceed(&operation) {
        return Ok(());
    }

    clear_destination(destination, overwrite)?;
    copy_unchecked(source, destination, &operation, policy)
}

/// Fail when `destination` is `source` itself, one of its ancestors, or a
/// location inside the folder `source`. Checked before anything is cleared.
pub(crate) fn ensure_not_into_itself(source: &Path, destination: &Path) -> Result<(), ProviderError> {
    if source.starts_with(destination) || (source.is_dir() && destination.starts_with(source)) {
        return Err(ProviderError::IntoItself {
            path: source.to_path_buf(),
        });
    }
    Ok(())
}

/// Make room at `destination`.
///
/// Without `overwrite` an existing item is a collision and nothing is
/// touched. With it, the existing item is removed.
pub(crate) fn clear_destination(destination: &Path, overwrite: bool) -> Result<(), ProviderError> {
    let existing = match fs::symlink_metadata(destination) {
        Ok(metadata) => metadata,
        Err(_) => return Ok(()),
    };

    if !overwrite {
        return Err(ProviderError::Collision {
            path: destination.to_path_buf(),
        });
    }

    debug!(path = %destination.display(), "Removing existing destination");
    let result = if existing.is_dir() {
        fs::remove_dir_all(destination)
    } else {
        fs::remove_file(destination)
    };
    result.map_err(|e| ProviderError::io(destination, e))
}

/// Copy a single item, descending into folders.
fn copy_entry(source: &Path, destination: &Path, policy: &ItemPolicy) -> Result<(), ProviderError> {
    let operation = policy.copy_kind(source, destination);
    if !policy.proceed(&operation) {
        return Ok(());
    }
    copy_unchecked(source, destination, &operation, policy)
}

fn copy_unchecked(
    source: &Path,
    destination: &Path,
    operation: &OperationKind,
    policy: &ItemPolicy,
) -> Result<(), ProviderError> {
    let metadata = match fs::symlink_metadata(source) {
        Ok(m) => m,
        Err(e) => return policy.absorb(ProviderError::io(source, e), operation),
    };

    if metadata.is_dir() {
        if let Err(e) = fs::create_dir(destination) {
            return policy.absorb(ProviderError::cannot_create(destination, e), operation);
        }

        let entries = match fs::read_dir(source) {
            Ok(entries) => entries,
            Err(e) => return policy.absorb(ProviderError::cannot_open(source, e), operation),
        };

        for entry in entries {
            match entry {
                Ok(entry) => {
                    copy_entry(&entry.path(), &destination.join(entry.file_name()), policy)?
                }
                Err(e) => policy.absorb(ProviderError::io(source, e), operation)?,
            }
        }
        Ok(())
    } else if metadata.file_type().is_symlink() {
        let result = fs::read_link(source)
            .and_then(|target| make_symlink(&target, destination))
            .map_err(|e| ProviderError::io(source, e));
        match result {
            Ok(()) => Ok(()),
            Err(err) => policy.absorb(err, operation),
        }
    } else {
        match fs::copy(source, destination) {
            Ok(bytes) => {
                debug!(source = %source.display(), bytes, "Copied file");
                Ok(())
            }
            Err(e) => policy.absorb(ProviderError::io(source, e), operation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileprovider_core::PathResolver;
    use tempfile::TempDir;

    fn policy(root: &Path) -> ItemPolicy {
        ItemPolicy::new(None, PathResolver::new(root))
    }

    #[test]
    fn test_copy_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::write(root.join("src/a.txt"), "alpha").unwrap();
        fs::write(root.join("src/nested/b.txt"), "beta").unwrap();

        copy_item(&root.join("src"), &root.join("dst"), false, &policy(root)).unwrap();

        assert_eq!(fs::read_to_string(root.join("dst/a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(root.join("dst/nested/b.txt")).unwrap(), "beta");
        assert!(root.join("src/a.txt").exists());
    }

    #[test]
    fn test_collision_leaves_destination() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("a.txt"), "new").unwrap();
        fs::write(root.join("b.txt"), "old").unwrap();

        let err = copy_item(&root.join("a.txt"), &root.join("b.txt"), false, &policy(root))
            .unwrap_err();
        assert!(err.is_collision());
        assert_eq!(fs::read_to_string(root.join("b.txt")).unwrap(), "old");
    }

    #[test]
    fn test_overwrite_replaces_folder_with_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("a.txt"), "file").unwrap();
        fs::create_dir_all(root.join("b/inner")).unwrap();

        copy_item(&root.join("a.txt"), &root.join("b"), true, &policy(root)).unwrap();
        assert_eq!(fs::read_to_string(root.join("b")).unwrap(), "file");
    }

    #[test]
    fn test_copy_into_itself() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("dir")).unwrap();

        let err = copy_item(&root.join("dir"), &root.join("dir/inner"), false, &policy(root))
            .unwrap_err();
        assert!(matches!(err, ProviderError::IntoItself { .. }));
    }

    #[test]
    fn test_overwrite_onto_itself_keeps_source() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("precious.txt"), "keep").unwrap();

        let err = copy_item(
            &root.join("precious.txt"),
            &root.join("precious.txt"),
            true,
            &policy(root),
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::IntoItself { .. }));
        assert_eq!(fs::read_to_string(root.join("precious.txt")).unwrap(), "keep");
    }

    #[test]
    fn test_overwrite_onto_ancestor_keeps_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("dir")).unwrap();
        fs::write(root.join("dir/a.txt"), "a").unwrap();

        let err = copy_item(&root.join("dir/a.txt"), &root.join("dir"), true, &policy(root))
            .unwrap_err();
        assert!(matches!(err, ProviderError::IntoItself { .. }));
        assert!(root.join("dir/a.txt").exists());
    }

    #[test]
    fn test_missing_source() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        let err = copy_item(&root.join("nope"), &root.join("dst"), false, &policy(root))
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_copied_as_links() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("src")).unwrap();
        std::os::unix::fs::symlink("missing-target", root.join("src/link")).unwrap();

        copy_item(&root.join("src"), &root.join("dst"), false, &policy(root)).unwrap();
        assert_eq!(
            fs::read_link(root.join("dst/link")).unwrap(),
            Path::new("missing-target")
        );
    }
}

//! Symbolic link creation.

use std::io;
use std::path::Path;

use fileprovider_core::ProviderError;

use crate::conflict::ItemPolicy;

/// Create a symbolic link at `link` pointing to `target`.
pub(crate) fn create_link(link: &Path, target: &Path, policy: &ItemPolicy) -> Result<(), ProviderError> {
    let operation = policy.link_kind(link, target);
    if !policy.proceed(&operation) {
        return Ok(());
    }

    if link.symlink_metadata().is_ok() {
        return policy.absorb(
            ProviderError::Collision {
                path: link.to_path_buf(),
            },
            &operation,
        );
    }

    match make_symlink(target, link) {
        Ok(()) => Ok(()),
        Err(e) => policy.absorb(ProviderError::cannot_create(link, e), &operation),
    }
}

#[cfg(unix)]
pub(crate) fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
pub(crate) fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use fileprovider_core::PathResolver;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_create_link() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("target.txt"), "data").unwrap();
        let policy = ItemPolicy::new(None, PathResolver::new(root));

        create_link(&root.join("link"), &root.join("target.txt"), &policy).unwrap();
        assert_eq!(fs::read_to_string(root.join("link")).unwrap(), "data");

        let err = create_link(&root.join("link"), &root.join("target.txt"), &policy).unwrap_err();
        assert!(err.is_collision());
    }
}

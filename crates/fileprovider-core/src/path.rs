//! Mapping between storage-relative paths and absolute locations.

use std::path::{Component, Path, PathBuf};

use crate::ProviderError;

/// Resolves paths relative to a storage root.
///
/// Relative paths are written with a leading `/` meaning "the root"
/// (`/docs/a.txt`), but a missing leading slash is accepted too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for a root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a relative path.
    ///
    /// `.` and `..` components are folded; a path that climbs above the root
    /// is rejected.
    pub fn absolute(&self, relative: impl AsRef<Path>) -> Result<PathBuf, ProviderError> {
        let relative = relative.as_ref();
        let mut parts: Vec<&std::ffi::OsStr> = Vec::new();

        for component in relative.components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => parts.push(part),
                Component::ParentDir => {
                    if parts.pop().is_none() {
                        return Err(ProviderError::InvalidPath {
                            path: relative.to_path_buf(),
                        });
                    }
                }
                Component::Prefix(_) => {
                    return Err(ProviderError::InvalidPath {
                        path: relative.to_path_buf(),
                    });
                }
            }
        }

        let mut absolute = self.root.clone();
        absolute.extend(parts);
        Ok(absolute)
    }

    /// Relative path of an absolute location, or `None` outside the root.
    pub fn relative(&self, absolute: impl AsRef<Path>) -> Option<PathBuf> {
        let stripped = absolute.as_ref().strip_prefix(&self.root).ok()?;
        Some(Path::new("/").join(stripped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_and_back() {
        let resolver = PathResolver::new("/srv/storage");
        let abs = resolver.absolute("/docs/a.txt").unwrap();
        assert_eq!(abs, PathBuf::from("/srv/storage/docs/a.txt"));
        assert_eq!(resolver.relative(&abs), Some(PathBuf::from("/docs/a.txt")));
    }

    #[test]
    fn test_root_maps_to_slash() {
        let resolver = PathResolver::new("/srv/storage");
        assert_eq!(resolver.absolute("/").unwrap(), PathBuf::from("/srv/storage"));
        assert_eq!(
            resolver.relative("/srv/storage"),
            Some(PathBuf::from("/"))
        );
        assert_eq!(resolver.relative("/elsewhere/file"), None);
    }

    #[test]
    fn test_parent_components() {
        let resolver = PathResolver::new("/srv/storage");
        assert_eq!(
            resolver.absolute("docs/../notes/./b.md").unwrap(),
            PathBuf::from("/srv/storage/notes/b.md")
        );
        assert!(matches!(
            resolver.absolute("/../etc/passwd"),
            Err(ProviderError::InvalidPath { .. })
        ));
    }
}

//! Directory listing, attributes and search.

use std::fs;
use std::path::Path;

use fileprovider_core::{FileObject, FoundHandler, PathResolver, ProviderError, SearchPredicate};
use jwalk::{Parallelism, WalkDir};
use tracing::debug;

/// Describe the item at an absolute location with a storage-relative path.
pub(crate) fn describe(path: &Path, paths: &PathResolver) -> Result<FileObject, ProviderError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| ProviderError::io(path, e))?;
    let target = if metadata.file_type().is_symlink() {
        fs::read_link(path).ok()
    } else {
        None
    };
    let relative = paths.relative(path).unwrap_or_else(|| path.to_path_buf());
    Ok(FileObject::from_metadata(relative, &metadata, target.as_deref()))
}

/// Direct children of a folder, sorted by name.
///
/// Children that vanish or cannot be described while listing are left out.
pub(crate) fn list(path: &Path, paths: &PathResolver) -> Result<Vec<FileObject>, ProviderError> {
    let entries = fs::read_dir(path).map_err(|e| ProviderError::io(path, e))?;

    let mut children: Vec<FileObject> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => match describe(&entry.path(), paths) {
                Ok(object) => Some(object),
                Err(err) => {
                    debug!(%err, "Skipping entry while listing");
                    None
                }
            },
            Err(err) => {
                debug!(path = %path.display(), %err, "Skipping unreadable entry");
                None
            }
        })
        .collect();

    children.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(children)
}

/// Items below `path` accepted by `query`, in walk order.
///
/// `found` sees every hit as soon as it is accepted.
pub(crate) fn search(
    path: &Path,
    recursive: bool,
    query: &SearchPredicate,
    found: Option<&FoundHandler>,
    paths: &PathResolver,
) -> Result<Vec<FileObject>, ProviderError> {
    let metadata = fs::metadata(path).map_err(|e| ProviderError::io(path, e))?;
    if !metadata.is_dir() {
        return Err(ProviderError::cannot_open(
            path,
            std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a folder"),
        ));
    }

    let walker = WalkDir::new(path)
        .parallelism(Parallelism::Serial)
        .sort(true)
        .skip_hidden(false)
        .follow_links(false)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 });

    let mut hits = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(path = ?err.path(), %err, "Skipping entry while searching");
                continue;
            }
        };

        let object = match describe(&entry.path(), paths) {
            Ok(object) => object,
            Err(err) => {
                debug!(%err, "Skipping entry while searching");
                continue;
            }
        };

        if query(&object) {
            if let Some(found) = found {
                found(&object);
            }
            hits.push(object);
        }
    }

    Ok(hits)
}

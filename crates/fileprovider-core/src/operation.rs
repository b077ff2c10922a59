//! Operation kinds.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One scheduled unit of work.
///
/// Paths are relative to the storage root of the provider that scheduled the
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// A file or folder is created.
    Create { path: PathBuf },
    /// File contents are written.
    Modify { path: PathBuf },
    /// An item is moved.
    Move {
        source: PathBuf,
        destination: PathBuf,
    },
    /// An item is copied.
    Copy {
        source: PathBuf,
        destination: PathBuf,
    },
    /// An item is removed.
    Remove { path: PathBuf },
    /// A symbolic link is created at `link` pointing to `target`.
    Link { link: PathBuf, target: PathBuf },
    /// Contents or metadata are read.
    Fetch { path: PathBuf },
}

impl OperationKind {
    /// Create a create operation.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self::Create { path: path.into() }
    }

    /// Create a modify operation.
    pub fn modify(path: impl Into<PathBuf>) -> Self {
        Self::Modify { path: path.into() }
    }

    /// Create a move operation.
    pub fn move_to(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Move {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Create a copy operation.
    pub fn copy(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Copy {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Create a remove operation.
    pub fn remove(path: impl Into<PathBuf>) -> Self {
        Self::Remove { path: path.into() }
    }

    /// Create a link operation.
    pub fn link(link: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self::Link {
            link: link.into(),
            target: target.into(),
        }
    }

    /// Create a fetch operation.
    pub fn fetch(path: impl Into<PathBuf>) -> Self {
        Self::Fetch { path: path.into() }
    }

    /// The item the operation reads from or acts on.
    pub fn source(&self) -> &Path {
        match self {
            Self::Create { path }
            | Self::Modify { path }
            | Self::Remove { path }
            | Self::Fetch { path } => path,
            Self::Move { source, .. } | Self::Copy { source, .. } => source,
            Self::Link { link, .. } => link,
        }
    }

    /// The item the operation produces, for kinds that have one.
    pub fn destination(&self) -> Option<&Path> {
        match self {
            Self::Move { destination, .. } | Self::Copy { destination, .. } => Some(destination),
            Self::Link { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Whether this operation changes the filesystem.
    ///
    /// Mutations go through the serial queue; everything else may run
    /// concurrently.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Fetch { .. })
    }

    /// Directories whose listing changes when this operation completes.
    pub fn affected_directories(&self) -> Vec<PathBuf> {
        let parent = |p: &Path| p.parent().map(Path::to_path_buf);
        let mut dirs: Vec<PathBuf> = match self {
            Self::Create { path } | Self::Modify { path } | Self::Remove { path } => {
                parent(path).into_iter().collect()
            }
            Self::Move {
                source,
                destination,
            } => parent(source).into_iter().chain(parent(destination)).collect(),
            Self::Copy { destination, .. } => parent(destination).into_iter().collect(),
            Self::Link { link, .. } => parent(link).into_iter().collect(),
            Self::Fetch { .. } => Vec::new(),
        };
        dirs.dedup();
        dirs
    }

    /// Short verb describing the operation.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Create { .. } => "Create",
            Self::Modify { .. } => "Modify",
            Self::Move { .. } => "Move",
            Self::Copy { .. } => "Copy",
            Self::Remove { .. } => "Remove",
            Self::Link { .. } => "Link",
            Self::Fetch { .. } => "Fetch",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.destination() {
            Some(destination) => write!(
                f,
                "{} {} -> {}",
                self.verb(),
                self.source().display(),
                destination.display()
            ),
            None => write!(f, "{} {}", self.verb(), self.source().display()),
        }
    }
}

//! Error types for provider operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The destination already exists and overwriting was not requested.
    #[error("Item already exists: {path}")]
    Collision { path: PathBuf },

    /// An item could not be created.
    #[error("Cannot create {path}: {source}")]
    CannotCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An item could not be opened for reading.
    #[error("Cannot open {path}: {source}")]
    CannotOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An item could not be written.
    #[error("Cannot write {path}: {source}")]
    CannotWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Generic I/O error, surfaced verbatim from the OS.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file or folder name that cannot be used.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A folder cannot be copied or moved into its own subtree.
    #[error("Cannot copy or move {path} into itself")]
    IntoItself { path: PathBuf },

    /// A relative path that resolves outside the storage root.
    #[error("Path escapes the storage root: {path}")]
    InvalidPath { path: PathBuf },

    /// The engine was created outside of a Tokio runtime.
    #[error("No Tokio runtime available")]
    NoRuntime,

    /// The worker running the operation went away before reporting.
    #[error("Operation interrupted")]
    Interrupted,
}

impl ProviderError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::AlreadyExists => Self::Collision { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create a "cannot create" error.
    pub fn cannot_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CannotCreate {
            path: path.into(),
            source,
        }
    }

    /// Create a "cannot open" error.
    pub fn cannot_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CannotOpen {
            path: path.into(),
            source,
        }
    }

    /// Create a "cannot write" error.
    pub fn cannot_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CannotWrite {
            path: path.into(),
            source,
        }
    }

    /// The path this error refers to, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Collision { path }
            | Self::CannotCreate { path, .. }
            | Self::CannotOpen { path, .. }
            | Self::CannotWrite { path, .. }
            | Self::NotFound { path }
            | Self::PermissionDenied { path }
            | Self::Io { path, .. }
            | Self::IntoItself { path }
            | Self::InvalidPath { path } => Some(path),
            Self::InvalidName { .. } | Self::NoRuntime | Self::Interrupted => None,
        }
    }

    /// Check if this is a destination collision.
    pub fn is_collision(&self) -> bool {
        matches!(self, Self::Collision { .. })
    }
}

/// Serializable, cloneable summary of a [`ProviderError`].
///
/// This is what event subscribers receive; every subscriber gets its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    /// The path that caused the error.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl From<&ProviderError> for OperationError {
    fn from(error: &ProviderError) -> Self {
        Self::new(error.path().cloned().unwrap_or_default(), error.to_string())
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_io() {
        let err = ProviderError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ProviderError::PermissionDenied { .. }));

        let err = ProviderError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "exists"),
        );
        assert!(err.is_collision());
    }

    #[test]
    fn test_operation_error_from_provider_error() {
        let err = ProviderError::Collision {
            path: PathBuf::from("/a/b"),
        };
        let summary = OperationError::from(&err);
        assert_eq!(summary.path, PathBuf::from("/a/b"));
        assert!(summary.message.contains("already exists"));
    }

    #[test]
    fn test_error_without_path() {
        assert!(ProviderError::NoRuntime.path().is_none());
        let summary = OperationError::from(&ProviderError::Interrupted);
        assert_eq!(summary.path, PathBuf::new());
    }
}

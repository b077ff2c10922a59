//! File description records.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// File metadata timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// Last modification time.
    pub modified: SystemTime,
    /// Last access time (if available).
    pub accessed: Option<SystemTime>,
    /// Creation time (if available, platform-dependent).
    pub created: Option<SystemTime>,
}

impl Timestamps {
    /// Create timestamps with only modified time.
    pub fn with_modified(modified: SystemTime) -> Self {
        Self {
            modified,
            accessed: None,
            created: None,
        }
    }

    /// Read all available times from metadata.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            modified: metadata.modified().unwrap_or(std::time::UNIX_EPOCH),
            accessed: metadata.accessed().ok(),
            created: metadata.created().ok(),
        }
    }
}

/// Type of a file system item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink {
        /// Link target as stored in the link.
        target: CompactString,
    },
    /// Other file types (sockets, devices, etc.).
    Other,
}

impl FileKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileKind::File)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, FileKind::Symlink { .. })
    }
}

/// Description of a single file or folder in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObject {
    /// Item name (last path component).
    pub name: CompactString,

    /// Path relative to the storage root, starting with `/`.
    pub path: PathBuf,

    /// Item type.
    pub kind: FileKind,

    /// Size in bytes.
    pub size: u64,

    /// Bytes actually allocated on disk.
    pub allocated_size: u64,

    /// Timestamps.
    pub timestamps: Timestamps,

    /// Name starts with a dot.
    pub hidden: bool,

    /// The owner cannot write to the item.
    pub read_only: bool,
}

impl FileObject {
    /// Build a description from `symlink_metadata` of the item at `path`.
    ///
    /// `link_target` is only consulted when the metadata describes a symlink.
    pub fn from_metadata(
        path: impl Into<PathBuf>,
        metadata: &Metadata,
        link_target: Option<&Path>,
    ) -> Self {
        let path = path.into();
        let name: CompactString = path
            .file_name()
            .map(|n| n.to_string_lossy().into())
            .unwrap_or_else(|| "/".into());

        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            FileKind::Symlink {
                target: link_target
                    .map(|t| CompactString::new(t.to_string_lossy()))
                    .unwrap_or_default(),
            }
        } else if file_type.is_dir() {
            FileKind::Directory
        } else if file_type.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        };

        Self {
            hidden: name.starts_with('.'),
            name,
            path,
            kind,
            size: metadata.len(),
            allocated_size: allocated_size(metadata),
            timestamps: Timestamps::from_metadata(metadata),
            read_only: metadata.permissions().readonly(),
        }
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        self.kind.is_symlink()
    }
}

#[cfg(unix)]
fn allocated_size(metadata: &Metadata) -> u64 {
    metadata.blocks() * 512
}

#[cfg(not(unix))]
fn allocated_size(metadata: &Metadata) -> u64 {
    // Round up to whole 4K clusters
    metadata.len().div_ceil(4096) * 4096
}

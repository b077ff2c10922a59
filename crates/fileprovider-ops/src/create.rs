//! Folder creation.

use std::fs;
use std::path::{Path, PathBuf};

use fileprovider_core::ProviderError;

/// Create the folder `name` inside `parent`. Returns the new folder's location.
///
/// Missing ancestors of `parent` are created as well. An existing item with
/// the same name is a collision.
pub(crate) fn create_folder(name: &str, parent: &Path) -> Result<PathBuf, ProviderError> {
    validate_filename(name).map_err(|reason| ProviderError::InvalidName {
        name: name.to_string(),
        reason,
    })?;

    let path = parent.join(name);
    if path.symlink_metadata().is_ok() {
        return Err(ProviderError::Collision { path });
    }

    fs::create_dir_all(&path).map_err(|e| ProviderError::cannot_create(&path, e))?;
    Ok(path)
}

/// Validate a file or folder name for cross-platform use.
pub fn validate_filename(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name cannot be empty".into());
    }

    if name.len() > 255 {
        return Err("Name is too long (max 255 bytes)".into());
    }

    if name == "." || name == ".." {
        return Err("'.' and '..' are reserved names".into());
    }

    for c in ['/', '\0'] {
        if name.contains(c) {
            return Err(format!("Name cannot contain '{}'", c.escape_default()));
        }
    }

    #[cfg(target_os = "windows")]
    {
        for c in ['\\', ':', '*', '?', '"', '<', '>', '|'] {
            if name.contains(c) {
                return Err(format!("Name cannot contain '{}'", c));
            }
        }

        let reserved = [
            "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
            "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
        ];
        let upper = name.to_uppercase();
        if reserved.contains(&upper.split('.').next().unwrap_or("")) {
            return Err("Reserved filename".into());
        }
    }

    if name.starts_with(' ') || name.ends_with(' ') {
        return Err("Name cannot start or end with spaces".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("notes").is_ok());
        assert!(validate_filename(".config").is_ok());
        assert!(validate_filename("two words").is_ok());

        assert!(validate_filename("").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename("a/b").is_err());
        assert!(validate_filename(" padded ").is_err());
        assert!(validate_filename(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_create_folder() {
        let temp = TempDir::new().unwrap();
        let path = create_folder("new", &temp.path().join("missing/parent")).unwrap();
        assert!(path.is_dir());

        let err = create_folder("new", &temp.path().join("missing/parent")).unwrap_err();
        assert!(err.is_collision());
    }

    #[test]
    fn test_invalid_name() {
        let temp = TempDir::new().unwrap();
        let err = create_folder("a/b", temp.path()).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidName { .. }));
    }
}

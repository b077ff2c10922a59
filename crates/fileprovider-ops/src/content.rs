//! Reading and writing file contents.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use fileprovider_core::ProviderError;
use tempfile::NamedTempFile;

/// Read a whole file.
pub(crate) fn read_all(path: &Path) -> Result<Vec<u8>, ProviderError> {
    let mut file = open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .map_err(|e| ProviderError::io(path, e))?;
    Ok(data)
}

/// Read up to `length` bytes starting at `offset`. Short at end of file.
pub(crate) fn read_range(path: &Path, offset: u64, length: usize) -> Result<Vec<u8>, ProviderError> {
    let mut file = open(path)?;
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| ProviderError::io(path, e))?;

    let mut data = Vec::with_capacity(length.min(1 << 20));
    file.take(length as u64)
        .read_to_end(&mut data)
        .map_err(|e| ProviderError::io(path, e))?;
    Ok(data)
}

fn open(path: &Path) -> Result<File, ProviderError> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
            ProviderError::io(path, e)
        }
        _ => ProviderError::cannot_open(path, e),
    })
}

/// Write `data` to `path`, creating missing parent folders.
///
/// With `atomically` the data goes to a temporary file next to the target,
/// which then replaces it in one rename.
pub(crate) fn write(path: &Path, data: &[u8], overwrite: bool, atomically: bool) -> Result<(), ProviderError> {
    if !overwrite && path.symlink_metadata().is_ok() {
        return Err(ProviderError::Collision {
            path: path.to_path_buf(),
        });
    }

    let parent = path.parent().ok_or_else(|| ProviderError::InvalidPath {
        path: path.to_path_buf(),
    })?;
    fs::create_dir_all(parent).map_err(|e| ProviderError::cannot_create(parent, e))?;

    if atomically {
        let mut temp = NamedTempFile::new_in(parent).map_err(|e| ProviderError::cannot_write(path, e))?;
        temp.write_all(data)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| ProviderError::cannot_write(path, e))?;
        temp.persist(path)
            .map_err(|e| ProviderError::cannot_write(path, e.error))?;
    } else {
        fs::write(path, data).map_err(|e| ProviderError::cannot_write(path, e))?;
    }
    Ok(())
}

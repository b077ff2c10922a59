//! Move operation.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use fileprovider_core::ProviderError;
use tracing::debug;

use crate::conflict::ItemPolicy;
use crate::copy::{clear_destination, ensure_not_into_itself};
use crate::link::make_symlink;

/// Move `source` to `destination`.
///
/// A plain rename when both sides live on the same filesystem; otherwise the
/// tree is relocated item by item.
pub(crate) fn move_item(
    source: &Path,
    destination: &Path,
    overwrite: bool,
    policy: &ItemPolicy,
) -> Result<(), ProviderError> {
    ensure_not_into_itself(source, destination)?;

    let operation = policy.move_kind(source, destination);
    if !policy.proceed(&operation) {
        return Ok(());
    }

    clear_destination(destination, overwrite)?;

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            debug!(
                source = %source.display(),
                destination = %destination.display(),
                "Rename crosses devices, relocating"
            );
            relocate(source, destination, policy).map(|_| ())
        }
        Err(e) => policy.absorb(ProviderError::io(source, e), &operation),
    }
}

/// Copy-then-delete a single item. Returns whether the source is fully gone.
fn relocate(source: &Path, destination: &Path, policy: &ItemPolicy) -> Result<bool, ProviderError> {
    let operation = policy.move_kind(source, destination);

    let metadata = match fs::symlink_metadata(source) {
        Ok(m) => m,
        Err(e) => {
            policy.absorb(ProviderError::io(source, e), &operation)?;
            return Ok(false);
        }
    };

    if metadata.is_dir() {
        if let Err(e) = fs::create_dir(destination) {
            policy.absorb(ProviderError::cannot_create(destination, e), &operation)?;
            return Ok(false);
        }

        let entries = match fs::read_dir(source) {
            Ok(entries) => entries,
            Err(e) => {
                policy.absorb(ProviderError::cannot_open(source, e), &operation)?;
                return Ok(false);
            }
        };

        let mut complete = true;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    policy.absorb(ProviderError::io(source, e), &operation)?;
                    complete = false;
                    continue;
                }
            };
            let (from, to) = (entry.path(), destination.join(entry.file_name()));
            if !policy.proceed(&policy.move_kind(&from, &to)) {
                complete = false;
                continue;
            }
            complete &= relocate(&from, &to, policy)?;
        }

        // Skipped children stay behind in the source folder
        if complete {
            if let Err(e) = fs::remove_dir(source) {
                policy.absorb(ProviderError::io(source, e), &operation)?;
                return Ok(false);
            }
        }
        return Ok(complete);
    }

    let placed = if metadata.file_type().is_symlink() {
        fs::read_link(source).and_then(|target| make_symlink(&target, destination))
    } else {
        fs::copy(source, destination).map(|_| ())
    };

    if let Err(e) = placed.and_then(|()| fs::remove_file(source)) {
        policy.absorb(ProviderError::io(source, e), &operation)?;
        return Ok(false);
    }
    Ok(true)
}

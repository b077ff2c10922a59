//! Registry of directory watches.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use fileprovider_core::{ChangeHandler, ProviderError};
use tokio::runtime::Handle;
use tracing::debug;

use crate::debounce::DebounceSettings;
use crate::entry::WatchEntry;

/// Watches directory subtrees and reports debounced "something changed"
/// callbacks.
///
/// Registration is best effort: paths that are not existing directories, or
/// that the OS refuses to watch, are ignored without an error.
pub struct ChangeNotifier {
    watches: DashMap<PathBuf, WatchEntry>,
    settings: DebounceSettings,
    runtime: Handle,
}

impl ChangeNotifier {
    /// Create a notifier that schedules handler calls on the current Tokio runtime.
    pub fn new(settings: DebounceSettings) -> Result<Self, ProviderError> {
        let runtime = Handle::try_current().map_err(|_| ProviderError::NoRuntime)?;
        Ok(Self::with_runtime(settings, runtime))
    }

    /// Create a notifier that schedules handler calls on `runtime`.
    pub fn with_runtime(settings: DebounceSettings, runtime: Handle) -> Self {
        Self {
            watches: DashMap::new(),
            settings,
            runtime,
        }
    }

    /// Start watching an absolute directory, replacing any watch on it.
    pub fn register(&self, path: &Path, handler: ChangeHandler) {
        if !path.is_dir() {
            debug!(path = %path.display(), "Not a directory, ignoring watch request");
            return;
        }

        self.unregister(path);

        let mut entry =
            match WatchEntry::new(path, handler, self.settings, self.runtime.clone()) {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(path = %path.display(), %err, "Unable to create watch");
                    return;
                }
            };

        if let Err(err) = entry.start() {
            debug!(path = %path.display(), %err, "Unable to start watch");
            return;
        }

        // A concurrent register may have slipped in; dropping it releases its watch
        if let Some(mut previous) = self.watches.insert(path.to_path_buf(), entry) {
            previous.stop();
            previous.dispose();
        }
    }

    /// Stop watching a directory. No-op if it is not watched.
    pub fn unregister(&self, path: &Path) {
        if let Some((_, mut entry)) = self.watches.remove(path) {
            entry.stop();
            entry.dispose();
        }
    }

    /// Whether the exact path is watched.
    pub fn is_registered(&self, path: &Path) -> bool {
        self.watches.contains_key(path)
    }

    /// Temporarily stop delivering events for a watched path.
    ///
    /// Returns `false` if the path is not watched.
    pub fn pause(&self, path: &Path) -> bool {
        match self.watches.get_mut(path) {
            Some(mut entry) => {
                entry.stop();
                true
            }
            None => false,
        }
    }

    /// Resume a paused watch. Returns `false` if the path is not watched or
    /// the OS watch could not be restarted.
    pub fn resume(&self, path: &Path) -> bool {
        match self.watches.get_mut(path) {
            Some(mut entry) => match entry.start() {
                Ok(()) => true,
                Err(err) => {
                    debug!(path = %path.display(), %err, "Unable to resume watch");
                    false
                }
            },
            None => false,
        }
    }

    /// Paths currently watched.
    pub fn registered_paths(&self) -> Vec<PathBuf> {
        self.watches.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of active watches.
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    /// Whether no watch is active.
    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Release every watch.
    pub fn clear(&self) {
        self.watches.retain(|_, entry| {
            entry.stop();
            entry.dispose();
            false
        });
    }
}

impl Drop for ChangeNotifier {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("watches", &self.watches.len())
            .field("settings", &self.settings)
            .finish()
    }
}

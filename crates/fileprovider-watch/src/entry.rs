//! A single directory watch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use fileprovider_core::ChangeHandler;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tracing::{debug, trace};

use crate::debounce::{DebounceSettings, Debouncer};

/// Lifecycle of a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Created or stopped; events are ignored.
    Stopped,
    /// The OS watch is active and events reach the handler.
    Running,
    /// The OS watch was released. Terminal.
    Disposed,
}

impl WatchState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Stopped,
            1 => Self::Running,
            _ => Self::Disposed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Running => 1,
            Self::Disposed => 2,
        }
    }
}

/// State shared with the OS callback and pending handler calls.
struct Shared {
    state: AtomicU8,
    debouncer: Debouncer,
    handler: ChangeHandler,
}

impl Shared {
    fn state(&self) -> WatchState {
        WatchState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: WatchState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

/// One active subtree watch.
///
/// Owns its OS watch exclusively; the watch is released once, on
/// [`dispose`](Self::dispose) or when the entry is dropped.
pub struct WatchEntry {
    path: PathBuf,
    watcher: Option<RecommendedWatcher>,
    shared: Arc<Shared>,
}

impl WatchEntry {
    /// Create a stopped watch for an absolute directory.
    pub fn new(
        path: impl Into<PathBuf>,
        handler: ChangeHandler,
        settings: DebounceSettings,
        runtime: Handle,
    ) -> notify::Result<Self> {
        let path = path.into();
        let shared = Arc::new(Shared {
            state: AtomicU8::new(WatchState::Stopped.as_u8()),
            debouncer: Debouncer::new(settings.min_interval),
            handler,
        });

        let callback_shared = Arc::clone(&shared);
        let watch_path = path.clone();
        let watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                let event = match result {
                    Ok(event) => event,
                    Err(err) => {
                        debug!(path = %watch_path.display(), %err, "Watch error");
                        return;
                    }
                };

                if callback_shared.state() != WatchState::Running || !is_write(&event.kind) {
                    return;
                }

                if !callback_shared.debouncer.accept(Instant::now()) {
                    trace!(path = %watch_path.display(), kind = ?event.kind, "Dropping change event");
                    return;
                }

                let pending = Arc::clone(&callback_shared);
                runtime.spawn(async move {
                    tokio::time::sleep(settings.delay).await;
                    if pending.state() == WatchState::Running {
                        (pending.handler)();
                    }
                });
            },
            Config::default(),
        )?;

        Ok(Self {
            path,
            watcher: Some(watcher),
            shared,
        })
    }

    /// The watched directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WatchState {
        self.shared.state()
    }

    /// Whether events currently reach the handler.
    pub fn is_enabled(&self) -> bool {
        self.state() == WatchState::Running
    }

    /// Begin delivering events. No-op unless stopped.
    pub fn start(&mut self) -> notify::Result<()> {
        if self.state() != WatchState::Stopped {
            return Ok(());
        }
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.watch(&self.path, RecursiveMode::Recursive)?;
            self.shared.debouncer.reset();
            self.shared.set_state(WatchState::Running);
            debug!(path = %self.path.display(), "Watch started");
        }
        Ok(())
    }

    /// Stop delivering events. Handler calls already scheduled are dropped.
    pub fn stop(&mut self) {
        if self.state() != WatchState::Running {
            return;
        }
        self.shared.set_state(WatchState::Stopped);
        if let Some(watcher) = self.watcher.as_mut() {
            if let Err(err) = watcher.unwatch(&self.path) {
                debug!(path = %self.path.display(), %err, "Unable to unwatch");
            }
        }
        debug!(path = %self.path.display(), "Watch stopped");
    }

    /// Release the OS watch. Terminal; safe to call more than once.
    pub fn dispose(&mut self) {
        self.shared.set_state(WatchState::Disposed);
        if self.watcher.take().is_some() {
            debug!(path = %self.path.display(), "Watch released");
        }
    }
}

impl Drop for WatchEntry {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for WatchEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchEntry")
            .field("path", &self.path)
            .field("state", &self.state())
            .finish()
    }
}

/// Whether an event reflects write activity.
fn is_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    #[test]
    fn test_write_events() {
        assert!(is_write(&EventKind::Create(CreateKind::File)));
        assert!(is_write(&EventKind::Modify(ModifyKind::Any)));
        assert!(!is_write(&EventKind::Access(AccessKind::Any)));
        assert!(!is_write(&EventKind::Other));
    }

    #[test]
    fn test_state_round_trip() {
        for state in [WatchState::Stopped, WatchState::Running, WatchState::Disposed] {
            assert_eq!(WatchState::from_u8(state.as_u8()), state);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_lifecycle() {
        let temp = tempfile::TempDir::new().unwrap();
        let handler: ChangeHandler = Arc::new(|| {});
        let mut entry = WatchEntry::new(
            temp.path(),
            handler,
            DebounceSettings::default(),
            Handle::current(),
        )
        .unwrap();

        assert_eq!(entry.state(), WatchState::Stopped);
        entry.start().unwrap();
        assert!(entry.is_enabled());
        entry.stop();
        assert_eq!(entry.state(), WatchState::Stopped);
        entry.start().unwrap();
        entry.dispose();
        assert_eq!(entry.state(), WatchState::Disposed);

        // Disposed entries never restart
        entry.start().unwrap();
        assert_eq!(entry.state(), WatchState::Disposed);
    }
}

//! Debounced directory change notifications for fileprovider.
//!
//! The OS reports write activity many times per second during bulk I/O. The
//! [`ChangeNotifier`] turns that stream into a handful of "something changed"
//! callbacks per watched directory:
//!
//! - events closer than `min_interval` (200ms) to the last accepted one are dropped
//! - each accepted event fires the handler `delay` (250ms) later
//!
//! The guarantee is an eventual notification that something changed, not one
//! callback per change.

mod debounce;
mod entry;
mod notifier;

pub use debounce::{DebounceSettings, Debouncer};
pub use entry::{WatchEntry, WatchState};
pub use notifier::ChangeNotifier;

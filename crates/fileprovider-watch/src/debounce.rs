//! Two-stage coalescing of change events.
//!
//! Stage one drops any event arriving less than `min_interval` after the last
//! accepted one. Stage two delays the handler call for each accepted event by
//! `delay`, so a burst collapses into roughly one call per interval.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Timing settings for change coalescing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceSettings {
    /// Minimum spacing between accepted events.
    pub min_interval: Duration,
    /// Delay between an accepted event and the handler call.
    pub delay: Duration,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(200),
            delay: Duration::from_millis(250),
        }
    }
}

/// Drop-if-too-soon gate.
#[derive(Debug)]
pub struct Debouncer {
    min_interval: Duration,
    last_accepted: Mutex<Option<Instant>>,
}

impl Debouncer {
    /// Create a gate with the given minimum spacing.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: Mutex::new(None),
        }
    }

    /// Decide whether an event observed at `now` is accepted.
    ///
    /// Dropped events are gone for good; they do not extend the window.
    pub fn accept(&self, now: Instant) -> bool {
        let mut last = self.last_accepted.lock();
        match *last {
            Some(previous) if now.saturating_duration_since(previous) < self.min_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Forget the last accepted event.
    pub fn reset(&self) {
        *self.last_accepted.lock() = None;
    }
}

//! Engine configuration types.

use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for a local provider engine.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Storage root every relative path is resolved against.
    pub root: PathBuf,

    /// Maximum number of reads running at once (0 = number of CPUs).
    #[builder(default = "0")]
    #[serde(default)]
    pub max_concurrent_reads: usize,

    /// Threads used by the size estimator (0 = shared rayon pool).
    #[builder(default = "0")]
    #[serde(default)]
    pub estimate_threads: usize,

    /// Minimum spacing between accepted change events, in milliseconds.
    #[builder(default = "200")]
    #[serde(default = "default_watch_min_interval_ms")]
    pub watch_min_interval_ms: u64,

    /// Delay between an accepted change event and the handler call, in milliseconds.
    #[builder(default = "250")]
    #[serde(default = "default_watch_delay_ms")]
    pub watch_delay_ms: u64,

    /// Buffer size of the operation event broadcast channel.
    #[builder(default = "100")]
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_watch_min_interval_ms() -> u64 {
    200
}

fn default_watch_delay_ms() -> u64 {
    250
}

fn default_event_capacity() -> usize {
    100
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        if self.event_capacity == Some(0) {
            return Err("Event capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new engine config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Create a config with default settings for a root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_concurrent_reads: 0,
            estimate_threads: 0,
            watch_min_interval_ms: default_watch_min_interval_ms(),
            watch_delay_ms: default_watch_delay_ms(),
            event_capacity: default_event_capacity(),
        }
    }

    /// Effective number of concurrent read permits.
    pub fn read_permits(&self) -> usize {
        match self.max_concurrent_reads {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            n => n,
        }
    }

    /// Minimum spacing between accepted change events.
    pub fn watch_min_interval(&self) -> Duration {
        Duration::from_millis(self.watch_min_interval_ms)
    }

    /// Delay before a change handler fires.
    pub fn watch_delay(&self) -> Duration {
        Duration::from_millis(self.watch_delay_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::builder()
            .root("/srv/files")
            .max_concurrent_reads(4usize)
            .watch_delay_ms(100u64)
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/srv/files"));
        assert_eq!(config.read_permits(), 4);
        assert_eq!(config.watch_delay(), Duration::from_millis(100));
        assert_eq!(config.watch_min_interval(), Duration::from_millis(200));
    }

    #[test]
    fn test_config_builder_requires_root() {
        assert!(EngineConfig::builder().build().is_err());
        assert!(EngineConfig::builder().root("").build().is_err());
    }

    #[test]
    fn test_config_rejects_zero_capacity() {
        let result = EngineConfig::builder()
            .root("/srv")
            .event_capacity(0usize)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_auto_read_permits() {
        let config = EngineConfig::new("/srv");
        assert!(config.read_permits() >= 1);
    }
}

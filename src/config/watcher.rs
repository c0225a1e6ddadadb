use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::WATCH_POLL_INTERVAL_IN_MS;
use crate::Error;
use crate::Result;

/// Filesystem notification mechanism used to detect mapfile changes
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WatchBackend {
    /// Periodic directory scans. Does not consume inotify instances.
    #[default]
    Poll,
    /// Platform notification API (inotify, FSEvents, ...)
    Native,
}

/// Configuration of the invalidation watcher
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatcherConfig {
    /// Flush the pool when the mapfile directory changes
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub backend: WatchBackend,

    /// Scan interval of the poll backend (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backend: WatchBackend::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl WatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.backend == WatchBackend::Poll && self.poll_interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "poll_interval_ms must be greater than 0 for the poll backend".into(),
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_enabled() -> bool {
    true
}
fn default_poll_interval_ms() -> u64 {
    WATCH_POLL_INTERVAL_IN_MS
}

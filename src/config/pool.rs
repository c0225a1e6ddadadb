use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::MAX_UNUSED_HANDLES;
use crate::constants::RECLAIM_SLACK;
use crate::Error;
use crate::Result;

/// Sizing of the per-process handle pool
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PoolConfig {
    /// Capacity of each idle queue, keyed by (process, mapfile).
    ///
    /// Idle handles beyond this number are released immediately.
    #[serde(default = "default_max_unused_handles")]
    pub max_unused_handles: usize,

    /// Number of dead-thread entries tolerated before a reclaim scan runs.
    ///
    /// A scan is paid for only when the active entries of the process exceed
    /// `live threads + reclaim_slack`.
    #[serde(default = "default_reclaim_slack")]
    pub reclaim_slack: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_unused_handles: default_max_unused_handles(),
            reclaim_slack: default_reclaim_slack(),
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_unused_handles == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_unused_handles must be at least 1".into(),
            )));
        }
        Ok(())
    }
}

fn default_max_unused_handles() -> usize {
    MAX_UNUSED_HANDLES
}
fn default_reclaim_slack() -> usize {
    RECLAIM_SLACK
}

//! Components shared by the unit tests: a counting fake engine and small
//! builders around the pool manager.
mod engine;

pub use engine::*;

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use crate::CallerIdentity;
use crate::PoolConfig;
use crate::PoolManager;
use crate::ProcessId;
use crate::ThreadKey;
use crate::WatcherConfig;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

pub fn caller(
    pid: u32,
    tid: u64,
) -> CallerIdentity {
    CallerIdentity::new(ProcessId::new(pid), ThreadKey::new(tid))
}

pub fn mapfile(name: &str) -> PathBuf {
    Path::new("/srv/maps").join(name)
}

/// Manager over `engine` with the watcher disabled
pub fn manager_without_watcher(
    engine: Arc<FakeEngine>,
    pool: PoolConfig,
) -> PoolManager<FakeEngine> {
    PoolManager::builder(engine)
        .pool_config(pool)
        .watcher_config(WatcherConfig {
            enabled: false,
            ..WatcherConfig::default()
        })
        .build()
}

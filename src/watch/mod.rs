//! Mapfile change detection
//!
//! ```text
//! notify backend (poll / native)
//!   callback -> send(WatchSignal) [never touches pool state]
//!                     ↓
//! Dispatcher thread:
//!   recv -> upgrade Weak<dyn Invalidate> -> invalidate() -> PoolManager flush
//! ```
//!
//! There is no debouncing. A burst of events produces one flush per event;
//! flushing an empty pool is a no-op.

mod invalidation_watcher;
pub use invalidation_watcher::*;

use std::path::PathBuf;

/// Receiver of change notifications
pub trait Invalidate: Send + Sync {
    fn invalidate(
        &self,
        changed: &[PathBuf],
    );
}

/// Lifecycle of the watcher owned by a pool manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// No handle created yet, or watching disabled
    Idle,
    /// Bound to the mapfile directories for the rest of the manager's life
    Watching,
}

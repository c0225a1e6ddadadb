use std::collections::HashSet;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tracing::debug;
use tracing::trace;

use super::scope::live_thread_count;
use super::scope::live_thread_keys;
use crate::CacheKey;
use crate::Deactivated;
use crate::Handle;
use crate::HandleRegistry;
use crate::ProcessId;
use crate::ThreadKey;
use crate::RECLAIM_SCANS;

/// Source of thread liveness for the reclaim sweep
#[cfg_attr(test, automock)]
pub trait ThreadLiveness: Send + Sync {
    /// Number of live threads in this process
    fn active_count(&self) -> usize;

    /// Identities of the live threads in this process
    fn live_threads(&self) -> HashSet<ThreadKey>;
}

/// Liveness of the threads that asked for a [`ThreadKey`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemThreads;

impl ThreadLiveness for SystemThreads {
    fn active_count(&self) -> usize {
        live_thread_count()
    }

    fn live_threads(&self) -> HashSet<ThreadKey> {
        live_thread_keys()
    }
}

/// Moves handles of exited threads back into the idle pool
///
/// A scan is only paid for once the process holds more than
/// `active_count + slack` assignments, so up to `slack` dead entries linger.
pub struct Reclaimer {
    liveness: Arc<dyn ThreadLiveness>,
    slack: usize,
}

impl Reclaimer {
    pub fn new(
        liveness: Arc<dyn ThreadLiveness>,
        slack: usize,
    ) -> Self {
        Self { liveness, slack }
    }

    pub fn should_scan(
        &self,
        active_entries: usize,
    ) -> bool {
        active_entries > self.liveness.active_count() + self.slack
    }

    /// Sweeps the assignments of `process`.
    ///
    /// Returns the handles that overflowed their idle queue; the caller must
    /// release them outside of the registry lock.
    pub fn sweep<M>(
        &self,
        registry: &HandleRegistry<M>,
        process: ProcessId,
    ) -> Vec<Handle<M>> {
        let active_entries = registry.blocking_read(|state| {
            state
                .active
                .keys()
                .filter(|key| key.process == Some(process))
                .count()
        });

        if !self.should_scan(active_entries) {
            trace!(%process, active_entries, "Reclaim scan skipped");
            return Vec::new();
        }

        RECLAIM_SCANS.inc();
        let live = self.liveness.live_threads();

        registry.blocking_write(|state| {
            let stale: Vec<CacheKey> = state
                .active
                .keys()
                .filter(|key| key.process == Some(process))
                .filter(|key| key.thread.is_some_and(|thread| !live.contains(&thread)))
                .cloned()
                .collect();

            let mut overflow = Vec::new();
            for key in stale {
                match state.deactivate(&key) {
                    Deactivated::Parked => {
                        debug!(%key, "Reclaimed handle of exited thread");
                    }
                    Deactivated::Overflow(handle) | Deactivated::Unpooled(handle) => {
                        overflow.push(handle);
                    }
                    // Removed concurrently
                    Deactivated::Absent => {}
                }
            }
            overflow
        })
    }
}

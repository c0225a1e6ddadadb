use std::collections::hash_map::Entry;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;

use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::CacheKey;
use crate::CallerIdentity;
use crate::Deactivated;
use crate::Handle;
use crate::HandleFactory;
use crate::HandleRegistry;
use crate::Invalidate;
use crate::InvalidationWatcher;
use crate::MapHandle;
use crate::PoolConfig;
use crate::PoolKey;
use crate::ProcessId;
use crate::Reclaimer;
use crate::RegistryState;
use crate::RenderEngine;
use crate::RenderPoolConfig;
use crate::Result;
use crate::ScopeResolver;
use crate::SharingMode;
use crate::SystemThreads;
use crate::ThreadLiveness;
use crate::WatchState;
use crate::WatcherConfig;
use crate::FLUSHES;
use crate::HANDLES_RELEASED;
use crate::HANDLES_REUSED;

/// Per-process owner of the handle pool
///
/// Construct one manager per worker process, share it between map sources
/// with an `Arc`, and drop it (or call [`PoolManager::shutdown`]) at process exit.
///
/// # Thread Safety
///
/// All methods can be called concurrently. Registry and idle queues are
/// mutated under a single lock which is never held while a handle is built,
/// released or rendered.
///
/// # Example
///
/// ```ignore
/// let manager = Arc::new(PoolManager::builder(Arc::new(engine)).from_config(&config).build());
/// let handle = manager.acquire_current(Path::new("/srv/maps/osm.xml"), SharingMode::Exclusive)?;
/// let bytes = handle.with_map(|map| manager.engine().render(map, &request))?;
/// ```
pub struct PoolManager<E: RenderEngine> {
    shared: Arc<PoolShared<E>>,
    watcher: Mutex<Option<InvalidationWatcher>>,
    watcher_config: WatcherConfig,
    closed: AtomicBool,
}

/// State reachable from the watch dispatcher
pub(crate) struct PoolShared<E: RenderEngine> {
    factory: HandleFactory<E>,
    registry: HandleRegistry<E::Map>,
    reclaimer: Reclaimer,
}

enum Lookup<M> {
    Hit(Handle<M>),
    Reused(Handle<M>),
    Miss { discarded: Option<Handle<M>> },
}

struct Acquired<M> {
    handle: Handle<M>,
    registry_was_empty: bool,
    created: bool,
}

impl<E: RenderEngine> PoolShared<E> {
    fn acquire(
        &self,
        key: &CacheKey,
        pool_key: Option<&PoolKey>,
        process: ProcessId,
    ) -> Result<Acquired<E::Map>> {
        let (lookup, registry_was_empty) = self.registry.blocking_write(|state| {
            let was_empty = state.active.is_empty();
            if let Some(handle) = state.lookup(key) {
                return (Lookup::Hit(handle), was_empty);
            }

            let mut discarded = None;
            if let Some(handle) = pool_key.and_then(|pool_key| state.take_idle(pool_key)) {
                // Handles must never move between processes
                if handle.owner() == process {
                    state.active.insert(key.clone(), handle.clone());
                    return (Lookup::Reused(handle), was_empty);
                }
                discarded = Some(handle);
            }
            (Lookup::Miss { discarded }, was_empty)
        });

        let (handle, created) = match lookup {
            Lookup::Hit(handle) => (handle, false),
            Lookup::Reused(handle) => {
                HANDLES_REUSED.inc();
                debug!(handle_id = handle.id(), %key, "Reusing idle map handle");
                (handle, false)
            }
            Lookup::Miss { discarded } => {
                if let Some(foreign) = discarded {
                    warn!(
                        handle_id = foreign.id(),
                        owner = %foreign.owner(),
                        %process,
                        "Discarding idle map handle owned by another process"
                    );
                    self.retire_handle(&foreign, "foreign_owner");
                }

                let fresh = self.factory.create(&key.mapfile, process)?;
                let (handle, duplicate) = self.registry.blocking_write(|state| {
                    match state.active.entry(key.clone()) {
                        Entry::Occupied(entry) => (entry.get().clone(), Some(fresh)),
                        Entry::Vacant(entry) => {
                            entry.insert(fresh.clone());
                            (fresh, None)
                        }
                    }
                });
                // Lost a shared-mode race; the registered handle wins
                if let Some(duplicate) = duplicate {
                    self.retire_handle(&duplicate, "duplicate");
                }
                (handle, true)
            }
        };

        Ok(Acquired {
            handle,
            registry_was_empty,
            created,
        })
    }

    fn deactivate(
        &self,
        key: &CacheKey,
    ) -> bool {
        match self.registry.blocking_write(|state| state.deactivate(key)) {
            Deactivated::Absent => false,
            Deactivated::Parked => {
                debug!(%key, "Map handle parked in idle pool");
                true
            }
            Deactivated::Overflow(handle) => {
                self.retire_handle(&handle, "overflow");
                true
            }
            Deactivated::Unpooled(handle) => {
                self.retire_handle(&handle, "shared");
                true
            }
        }
    }

    fn reclaim(
        &self,
        process: ProcessId,
    ) {
        for handle in self.reclaimer.sweep(&self.registry, process) {
            self.retire_handle(&handle, "overflow");
        }
    }

    fn flush(&self) -> usize {
        let handles = self.registry.blocking_write(RegistryState::drain);
        FLUSHES.inc();
        info!(handles = handles.len(), "Flushing map handles");

        for handle in &handles {
            self.retire_handle(handle, "flush");
        }
        // Handles not held by a render are released as they drop here
        handles.len()
    }

    /// Takes `handle` out of circulation.
    ///
    /// The engine release runs when the last reference drops, i.e. right away
    /// unless a render still holds the handle.
    fn retire_handle(
        &self,
        handle: &MapHandle<E::Map>,
        reason: &'static str,
    ) {
        if handle.retire() {
            HANDLES_RELEASED.with_label_values(&[reason]).inc();
            debug!(handle_id = handle.id(), reason, "Retired map handle");
        }
    }
}

impl<E: RenderEngine> Invalidate for PoolShared<E> {
    fn invalidate(
        &self,
        changed: &[PathBuf],
    ) {
        info!("Changed {:?} - clear cache", changed);
        self.flush();
    }
}

impl<E: RenderEngine> PoolManager<E> {
    pub fn builder(engine: Arc<E>) -> PoolManagerBuilder<E> {
        PoolManagerBuilder::new(engine)
    }

    pub fn engine(&self) -> &Arc<E> {
        self.shared.factory.engine()
    }

    /// Returns the handle assigned to the caller's scope, building one if needed.
    ///
    /// Lookup order: active assignment, idle queue of the caller's process,
    /// fresh load. A load failure is returned as is. Every call is followed by
    /// an amortized reclaim sweep of the caller's process.
    pub fn acquire(
        &self,
        mapfile: &Path,
        mode: SharingMode,
        caller: CallerIdentity,
    ) -> Result<Handle<E::Map>> {
        let (key, pool_key) = ScopeResolver::resolve(mapfile, mode, caller);
        let acquired = self.shared.acquire(&key, pool_key.as_ref(), caller.process)?;

        if acquired.registry_was_empty || acquired.created {
            self.ensure_watching(mapfile);
        }

        self.shared.reclaim(caller.process);
        Ok(acquired.handle)
    }

    /// [`PoolManager::acquire`] for the calling thread
    pub fn acquire_current(
        &self,
        mapfile: &Path,
        mode: SharingMode,
    ) -> Result<Handle<E::Map>> {
        self.acquire(mapfile, mode, CallerIdentity::current())
    }

    /// Ends the caller's assignment and parks its handle for reuse.
    ///
    /// Returns `false` when nothing was assigned.
    pub fn release(
        &self,
        mapfile: &Path,
        mode: SharingMode,
        caller: CallerIdentity,
    ) -> bool {
        let (key, _) = ScopeResolver::resolve(mapfile, mode, caller);
        self.release_key(&key)
    }

    pub fn release_current(
        &self,
        mapfile: &Path,
        mode: SharingMode,
    ) -> bool {
        self.release(mapfile, mode, CallerIdentity::current())
    }

    /// Moves the handle of `key` into the idle queue of its (process, mapfile).
    ///
    /// A full queue retires the handle instead. Shared handles have no queue
    /// and are retired.
    pub fn release_key(
        &self,
        key: &CacheKey,
    ) -> bool {
        self.shared.deactivate(key)
    }

    /// Runs the reclaim sweep for `process` outside of an acquire.
    pub fn reclaim(
        &self,
        process: ProcessId,
    ) {
        self.shared.reclaim(process);
    }

    /// Retires every active and idle handle and empties the pool.
    ///
    /// Renders already holding a handle finish against the live map, which is
    /// released once they drop it. Returns the number of handles that were held.
    pub fn flush(&self) -> usize {
        self.shared.flush()
    }

    pub fn watch_state(&self) -> WatchState {
        if self.watcher.lock().is_some() {
            WatchState::Watching
        } else {
            WatchState::Idle
        }
    }

    pub fn watched_roots(&self) -> Vec<PathBuf> {
        self.watcher
            .lock()
            .as_ref()
            .map(|watcher| watcher.roots().map(Path::to_path_buf).collect())
            .unwrap_or_default()
    }

    pub fn contains(
        &self,
        key: &CacheKey,
    ) -> bool {
        self.shared
            .registry
            .blocking_read(|state| state.active.contains_key(key))
    }

    pub fn active_count(&self) -> usize {
        self.shared.registry.blocking_read(RegistryState::active_len)
    }

    pub fn idle_count(
        &self,
        pool_key: &PoolKey,
    ) -> usize {
        self.shared
            .registry
            .blocking_read(|state| state.idle_len(pool_key))
    }

    pub fn idle_total(&self) -> usize {
        self.shared.registry.blocking_read(RegistryState::idle_total)
    }

    /// Stops the watcher and retires every handle.
    ///
    /// Meant for process exit; the watcher is not restarted afterwards.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let watcher = self.watcher.lock().take();
        drop(watcher);
        let retired = self.shared.flush();
        info!(retired, "Pool manager shut down");
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &HandleRegistry<E::Map> {
        &self.shared.registry
    }

    /// Idle → Watching on the first handle, then keeps new mapfile directories watched.
    fn ensure_watching(
        &self,
        mapfile: &Path,
    ) {
        if !self.watcher_config.enabled || self.closed.load(Ordering::Acquire) {
            return;
        }

        let root = watch_root(mapfile);
        let mut guard = self.watcher.lock();
        match guard.as_mut() {
            Some(watcher) => {
                if let Err(e) = watcher.watch(&root) {
                    warn!(root = %root.display(), "Failed to extend invalidation watcher: {}", e);
                }
            }
            None => {
                let target: Weak<dyn Invalidate> = Arc::downgrade(&self.shared) as Weak<dyn Invalidate>;
                match InvalidationWatcher::start(&root, &self.watcher_config, target) {
                    Ok(watcher) => *guard = Some(watcher),
                    Err(e) => {
                        error!(root = %root.display(), "Failed to start invalidation watcher: {}", e);
                    }
                }
            }
        }
    }
}

/// Directory whose tree is watched for a mapfile
pub(crate) fn watch_root(mapfile: &Path) -> PathBuf {
    match mapfile.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub struct PoolManagerBuilder<E: RenderEngine> {
    engine: Arc<E>,
    pool: PoolConfig,
    watcher: WatcherConfig,
    liveness: Arc<dyn ThreadLiveness>,
}

impl<E: RenderEngine> PoolManagerBuilder<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            pool: PoolConfig::default(),
            watcher: WatcherConfig::default(),
            liveness: Arc::new(SystemThreads),
        }
    }

    pub fn from_config(
        self,
        config: &RenderPoolConfig,
    ) -> Self {
        self.pool_config(config.pool.clone())
            .watcher_config(config.watcher.clone())
    }

    pub fn pool_config(
        mut self,
        pool: PoolConfig,
    ) -> Self {
        self.pool = pool;
        self
    }

    pub fn watcher_config(
        mut self,
        watcher: WatcherConfig,
    ) -> Self {
        self.watcher = watcher;
        self
    }

    pub fn liveness(
        mut self,
        liveness: Arc<dyn ThreadLiveness>,
    ) -> Self {
        self.liveness = liveness;
        self
    }

    pub fn build(self) -> PoolManager<E> {
        PoolManager {
            shared: Arc::new(PoolShared {
                factory: HandleFactory::new(self.engine),
                registry: HandleRegistry::new(self.pool.max_unused_handles),
                reclaimer: Reclaimer::new(self.liveness, self.pool.reclaim_slack),
            }),
            watcher: Mutex::new(None),
            watcher_config: self.watcher,
            closed: AtomicBool::new(false),
        }
    }
}

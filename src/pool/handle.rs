use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::utils::ScopedTimer;
use crate::EngineError;
use crate::PoolError;
use crate::ProcessId;
use crate::RenderEngine;
use crate::Result;
use crate::HANDLES_CREATED;
use crate::RELEASE_FAILURES;

type ReleaseHook<M> = Box<dyn Fn(&mut M) -> std::result::Result<(), EngineError> + Send + Sync>;

/// Loaded map state bound to the process that built it
///
/// The owner is fixed at construction and checked every time the handle is
/// taken out of an idle queue. Leaving the pool only retires the handle; the
/// engine resources are freed once the last reference is dropped, so a
/// render holding the handle always runs against a live map.
pub struct MapHandle<M> {
    id: u64,
    owner: ProcessId,
    mapfile: PathBuf,
    map: Mutex<M>,
    retired: AtomicBool,
    release: ReleaseHook<M>,
}

/// Reference counted handle. In-flight renders keep the map alive after it
/// left the registry.
pub type Handle<M> = Arc<MapHandle<M>>;

impl<M> MapHandle<M> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn owner(&self) -> ProcessId {
        self.owner
    }

    pub fn mapfile(&self) -> &Path {
        &self.mapfile
    }

    /// `true` once the handle left the pool through a flush, an overflow or a discard
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Marks the handle as out of the pool. Returns `false` if it already was.
    pub(crate) fn retire(&self) -> bool {
        !self.retired.swap(true, Ordering::AcqRel)
    }

    /// Runs `f` with exclusive access to the map state.
    pub fn with_map<R>(
        &self,
        f: impl FnOnce(&mut M) -> R,
    ) -> R {
        let mut guard = self.map.lock();
        f(&mut guard)
    }
}

impl<M> Drop for MapHandle<M> {
    fn drop(&mut self) {
        let _timer = ScopedTimer::new("release_map");

        match (self.release)(self.map.get_mut()) {
            Ok(()) => debug!(handle_id = self.id, "Released map handle"),
            Err(source) => {
                RELEASE_FAILURES.inc();
                let e = PoolError::Release {
                    handle_id: self.id,
                    source,
                };
                error!(owner = %self.owner, mapfile = %self.mapfile.display(), "{}", e);
            }
        }
    }
}

impl<M> fmt::Debug for MapHandle<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("MapHandle")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("mapfile", &self.mapfile)
            .field("retired", &self.is_retired())
            .finish_non_exhaustive()
    }
}

/// Builds handles through the engine
pub struct HandleFactory<E: RenderEngine> {
    engine: Arc<E>,
    next_id: AtomicU64,
}

impl<E: RenderEngine> HandleFactory<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Loads `mapfile` into a new handle owned by `owner`.
    ///
    /// Load failures are returned as [`PoolError::ConfigLoad`] without retry.
    /// The handle releases its map through the engine when dropped.
    pub fn create(
        &self,
        mapfile: &Path,
        owner: ProcessId,
    ) -> Result<Handle<E::Map>> {
        let _timer = ScopedTimer::new("load_map");

        let map = self
            .engine
            .load_map(mapfile)
            .map_err(|source| PoolError::ConfigLoad {
                path: mapfile.to_path_buf(),
                source,
            })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!(handle_id = id, %owner, mapfile = %mapfile.display(), "New map handle");
        HANDLES_CREATED.inc();

        let engine = self.engine.clone();
        Ok(Arc::new(MapHandle {
            id,
            owner,
            mapfile: mapfile.to_path_buf(),
            map: Mutex::new(map),
            retired: AtomicBool::new(false),
            release: Box::new(move |map| engine.release(map)),
        }))
    }
}

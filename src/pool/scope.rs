use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use serde::Deserialize;
use serde::Serialize;

/// Operating system process identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(u32);

impl ProcessId {
    pub const fn new(pid: u32) -> Self {
        Self(pid)
    }

    pub fn current() -> Self {
        Self(std::process::id())
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "pid:{}", self.0)
    }
}

/// Process-unique thread identity
///
/// Keys are handed out on first use by a thread and are never reused while
/// the process lives. A thread stays in the live set until its thread-local
/// storage is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadKey(u64);

static NEXT_THREAD_KEY: AtomicU64 = AtomicU64::new(1);

lazy_static! {
    static ref LIVE_THREADS: Mutex<HashSet<ThreadKey>> = Mutex::new(HashSet::new());
}

struct ThreadRegistration {
    key: ThreadKey,
}

impl ThreadRegistration {
    fn register() -> Self {
        let key = ThreadKey(NEXT_THREAD_KEY.fetch_add(1, Ordering::Relaxed));
        LIVE_THREADS.lock().insert(key);
        Self { key }
    }
}

impl Drop for ThreadRegistration {
    fn drop(&mut self) {
        LIVE_THREADS.lock().remove(&self.key);
    }
}

thread_local! {
    static CURRENT_THREAD: ThreadRegistration = ThreadRegistration::register();
}

impl ThreadKey {
    pub const fn new(key: u64) -> Self {
        Self(key)
    }

    /// Key of the calling thread. Registers the thread as live on first call.
    pub fn current() -> Self {
        CURRENT_THREAD.with(|registration| registration.key)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "tid:{}", self.0)
    }
}

/// Snapshot of the registered live threads
pub(crate) fn live_thread_keys() -> HashSet<ThreadKey> {
    LIVE_THREADS.lock().clone()
}

pub(crate) fn live_thread_count() -> usize {
    LIVE_THREADS.lock().len()
}

/// Who is asking for a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallerIdentity {
    pub process: ProcessId,
    pub thread: ThreadKey,
}

impl CallerIdentity {
    pub const fn new(
        process: ProcessId,
        thread: ThreadKey,
    ) -> Self {
        Self { process, thread }
    }

    pub fn current() -> Self {
        Self {
            process: ProcessId::current(),
            thread: ThreadKey::current(),
        }
    }
}

/// How handles are shared between callers using the same mapfile
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SharingMode {
    /// One handle per calling thread and mapfile
    #[default]
    Exclusive,
    /// One handle per mapfile for every caller
    Shared,
}

/// Key of an active handle assignment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub process: Option<ProcessId>,
    pub thread: Option<ThreadKey>,
    pub mapfile: PathBuf,
}

impl CacheKey {
    /// Projection onto the idle pool. Shared keys have no pool.
    pub fn pool_key(&self) -> Option<PoolKey> {
        self.process.map(|process| PoolKey {
            process,
            mapfile: self.mapfile.clone(),
        })
    }

    pub fn is_shared(&self) -> bool {
        self.process.is_none()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match (self.process, self.thread) {
            (Some(process), Some(thread)) => {
                write!(f, "({process}, {thread}, {})", self.mapfile.display())
            }
            (Some(process), None) => write!(f, "({process}, -, {})", self.mapfile.display()),
            _ => write!(f, "(shared, {})", self.mapfile.display()),
        }
    }
}

/// Key of an idle queue. Any thread of the process may reuse its handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub process: ProcessId,
    pub mapfile: PathBuf,
}

/// Derives registry keys from the caller and the sharing mode
pub struct ScopeResolver;

impl ScopeResolver {
    pub fn resolve(
        mapfile: &Path,
        mode: SharingMode,
        caller: CallerIdentity,
    ) -> (CacheKey, Option<PoolKey>) {
        match mode {
            SharingMode::Shared => (
                CacheKey {
                    process: None,
                    thread: None,
                    mapfile: mapfile.to_path_buf(),
                },
                None,
            ),
            SharingMode::Exclusive => {
                let key = CacheKey {
                    process: Some(caller.process),
                    thread: Some(caller.thread),
                    mapfile: mapfile.to_path_buf(),
                };
                let pool_key = key.pool_key();
                (key, pool_key)
            }
        }
    }
}

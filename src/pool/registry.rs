use std::collections::HashMap;
use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::CacheKey;
use crate::Handle;
use crate::PoolKey;

/// Active assignments and idle queues, guarded together by one lock
pub struct HandleRegistry<M> {
    inner: Mutex<RegistryState<M>>,
}

pub struct RegistryState<M> {
    /// Handle currently assigned to each scope
    pub active: HashMap<CacheKey, Handle<M>>,
    /// Handles not assigned to any scope, reusable within their process
    pub idle: HashMap<PoolKey, VecDeque<Handle<M>>>,
    /// Capacity of each idle queue
    capacity: usize,
}

impl<M> HandleRegistry<M> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(RegistryState {
                active: HashMap::new(),
                idle: HashMap::new(),
                capacity,
            }),
        }
    }

    /// Provides read access to the state
    pub fn blocking_read<R>(
        &self,
        f: impl FnOnce(&RegistryState<M>) -> R,
    ) -> R {
        let guard = self.inner.lock();
        f(&guard)
    }

    /// Provides write access to the state
    pub fn blocking_write<R>(
        &self,
        f: impl FnOnce(&mut RegistryState<M>) -> R,
    ) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }
}

impl<M> RegistryState<M> {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn lookup(
        &self,
        key: &CacheKey,
    ) -> Option<Handle<M>> {
        self.active.get(key).cloned()
    }

    /// Pops the oldest idle handle of `pool_key`.
    pub fn take_idle(
        &mut self,
        pool_key: &PoolKey,
    ) -> Option<Handle<M>> {
        self.idle.get_mut(pool_key).and_then(VecDeque::pop_front)
    }

    /// Queues `handle` as idle.
    ///
    /// Returns the handle back when the queue is full; the caller must release it.
    #[must_use]
    pub fn put_idle(
        &mut self,
        pool_key: PoolKey,
        handle: Handle<M>,
    ) -> Option<Handle<M>> {
        let capacity = self.capacity;
        let queue = self.idle.entry(pool_key).or_default();
        if queue.len() >= capacity {
            return Some(handle);
        }
        queue.push_back(handle);
        None
    }

    /// Removes the assignment of `key` and parks its handle in the idle pool.
    ///
    /// Returns a handle that did not fit anywhere: a shared handle, or the
    /// overflow of a full queue.
    #[must_use]
    pub fn deactivate(
        &mut self,
        key: &CacheKey,
    ) -> Deactivated<M> {
        let Some(handle) = self.active.remove(key) else {
            return Deactivated::Absent;
        };
        match key.pool_key() {
            Some(pool_key) => match self.put_idle(pool_key, handle) {
                None => Deactivated::Parked,
                Some(overflow) => Deactivated::Overflow(overflow),
            },
            None => Deactivated::Unpooled(handle),
        }
    }

    /// Empties both collections and hands back every handle they held.
    pub fn drain(&mut self) -> Vec<Handle<M>> {
        let mut handles: Vec<Handle<M>> = self.active.drain().map(|(_, handle)| handle).collect();
        for (_, queue) in self.idle.drain() {
            handles.extend(queue);
        }
        handles
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn idle_len(
        &self,
        pool_key: &PoolKey,
    ) -> usize {
        self.idle.get(pool_key).map_or(0, VecDeque::len)
    }

    pub fn idle_total(&self) -> usize {
        self.idle.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.idle_total() == 0
    }
}

/// Outcome of [`RegistryState::deactivate`]
pub enum Deactivated<M> {
    /// No handle was assigned to the key
    Absent,
    /// The handle now waits in its idle queue
    Parked,
    /// The idle queue was full
    Overflow(Handle<M>),
    /// Shared handles have no idle queue
    Unpooled(Handle<M>),
}

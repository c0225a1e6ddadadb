use std::any::Any;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use parking_lot::Mutex;

use crate::BBox;

/// Geographic coverage of a source
#[cfg_attr(test, automock)]
pub trait Coverage: Send + Sync {
    fn intersects(
        &self,
        bbox: &BBox,
        srs: &str,
    ) -> bool;
}

/// Resolution range a source renders at
#[cfg_attr(test, automock)]
pub trait ResolutionRange: Send + Sync {
    fn contains(
        &self,
        bbox: &BBox,
        size: (u32, u32),
        srs: &str,
    ) -> bool;
}

/// Lock wrapped around a whole render, e.g. a cross-process file lock
#[cfg_attr(test, automock)]
pub trait RenderLock: Send + Sync {
    /// Blocks until the lock is held. Dropping the guard releases it.
    fn lock(&self) -> Box<dyn Any>;
}

/// In-process render lock serializing every render that shares it
#[derive(Debug, Default, Clone)]
pub struct LocalRenderLock {
    inner: Arc<Mutex<()>>,
}

impl LocalRenderLock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderLock for LocalRenderLock {
    fn lock(&self) -> Box<dyn Any> {
        Box::new(self.inner.lock_arc())
    }
}

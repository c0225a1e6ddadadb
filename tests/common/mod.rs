use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use renderpool::EngineError;
use renderpool::RenderEngine;
use renderpool::RenderRequest;

pub const WAIT_FOR_FLUSH_IN_SEC: u64 = 5;

pub const POLL_INTERVAL_IN_MS: u64 = 50;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for integration test.");
}

/// Map state of [`FileEngine`]: the mapfile contents at load time
#[derive(Debug)]
pub struct FileMap {
    pub contents: String,
}

/// Engine whose renders echo the mapfile contents seen at load time
#[derive(Debug, Default)]
pub struct FileEngine {
    loads: AtomicUsize,
    releases: AtomicUsize,
}

#[allow(dead_code)]
impl FileEngine {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl RenderEngine for FileEngine {
    type Map = FileMap;

    fn load_map(
        &self,
        mapfile: &Path,
    ) -> Result<FileMap, EngineError> {
        let contents = std::fs::read_to_string(mapfile)?;
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(FileMap { contents })
    }

    fn render(
        &self,
        map: &mut FileMap,
        _request: &RenderRequest<'_>,
    ) -> Result<Vec<u8>, EngineError> {
        Ok(map.contents.clone().into_bytes())
    }

    fn release(
        &self,
        _map: &mut FileMap,
    ) -> Result<(), EngineError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Polls `condition` until it holds or the flush deadline passes.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(WAIT_FOR_FLUSH_IN_SEC);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_IN_MS)).await;
    }
    condition()
}

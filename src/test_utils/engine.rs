use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use parking_lot::Mutex;

use crate::EngineError;
use crate::RenderEngine;
use crate::RenderRequest;

/// Map state built by [`FakeEngine`]
#[derive(Debug)]
pub struct FakeMap {
    pub mapfile: PathBuf,
    pub renders: usize,
    pub released: bool,
}

/// Parameters of the last render seen by [`FakeEngine`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub mapfile: PathBuf,
    pub layers: Option<Vec<String>>,
    pub scale_factor: Option<f64>,
    pub format: String,
}

/// Engine that counts every call and fails on demand
#[derive(Debug, Default)]
pub struct FakeEngine {
    loads: AtomicUsize,
    renders: AtomicUsize,
    releases: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_load: AtomicBool,
    fail_render: AtomicBool,
    fail_release: AtomicBool,
    render_delay: Mutex<Option<Duration>>,
    last_request: Mutex<Option<RecordedRequest>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Highest number of renders observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fail_load(
        &self,
        fail: bool,
    ) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    pub fn fail_render(
        &self,
        fail: bool,
    ) {
        self.fail_render.store(fail, Ordering::SeqCst);
    }

    pub fn fail_release(
        &self,
        fail: bool,
    ) {
        self.fail_release.store(fail, Ordering::SeqCst);
    }

    pub fn set_render_delay(
        &self,
        delay: Duration,
    ) {
        *self.render_delay.lock() = Some(delay);
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.last_request.lock().clone()
    }

    /// Bytes rendered for `mapfile`
    pub fn image_for(mapfile: &Path) -> Vec<u8> {
        format!("image:{}", mapfile.display()).into_bytes()
    }
}

impl RenderEngine for FakeEngine {
    type Map = FakeMap;

    fn load_map(
        &self,
        mapfile: &Path,
    ) -> Result<FakeMap, EngineError> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(format!("cannot parse {}", mapfile.display()).into());
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(FakeMap {
            mapfile: mapfile.to_path_buf(),
            renders: 0,
            released: false,
        })
    }

    fn render(
        &self,
        map: &mut FakeMap,
        request: &RenderRequest<'_>,
    ) -> Result<Vec<u8>, EngineError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.render_delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        *self.last_request.lock() = Some(RecordedRequest {
            mapfile: map.mapfile.clone(),
            layers: request.layers.map(<[String]>::to_vec),
            scale_factor: request.scale_factor,
            format: request.format.to_string(),
        });

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_render.load(Ordering::SeqCst) {
            return Err("datasource unreachable".into());
        }
        self.renders.fetch_add(1, Ordering::SeqCst);
        map.renders += 1;
        Ok(Self::image_for(&map.mapfile))
    }

    fn release(
        &self,
        map: &mut FakeMap,
    ) -> Result<(), EngineError> {
        if self.fail_release.load(Ordering::SeqCst) {
            return Err("layer still referenced".into());
        }
        self.releases.fetch_add(1, Ordering::SeqCst);
        map.released = true;
        Ok(())
    }
}

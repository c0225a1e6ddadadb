//! Map-layer facade over the handle pool
//!
//! Rejects queries outside of coverage or resolution range before touching
//! the pool, resolves templated mapfiles and runs the render on the blocking
//! thread pool so the caller's scheduler is never stalled.

mod grid;
mod limits;
mod query;

pub use grid::*;
pub use limits::*;
pub use query::*;

#[cfg(test)]
mod grid_test;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::error;
use tracing::Span;

use crate::utils::log_request;
use crate::utils::RequestStatus;
use crate::utils::ScopedTimer;
use crate::PoolManager;
use crate::RenderEngine;
use crate::RenderError;
use crate::RenderRequest;
use crate::Result;
use crate::SharingMode;
use crate::SourceConfig;

pub struct MapSource<E: RenderEngine> {
    pool: Arc<PoolManager<E>>,
    mapfile: String,
    layers: Option<Arc<[String]>>,
    sharing: SharingMode,
    scale_factor: Option<f64>,
    opacity: Option<f64>,
    lock: Option<Arc<dyn RenderLock>>,
    coverage: Option<Arc<dyn Coverage>>,
    res_range: Option<Arc<dyn ResolutionRange>>,
}

impl<E: RenderEngine> MapSource<E> {
    pub fn new(
        pool: Arc<PoolManager<E>>,
        config: &SourceConfig,
    ) -> Self {
        let layers = if config.layers.is_empty() {
            None
        } else {
            Some(Arc::from(config.layers.clone()))
        };
        let lock: Option<Arc<dyn RenderLock>> = if config.serialize_renders {
            Some(Arc::new(LocalRenderLock::new()))
        } else {
            None
        };

        Self {
            pool,
            mapfile: config.mapfile.clone(),
            layers,
            sharing: config.sharing_mode(),
            scale_factor: config.scale_factor,
            opacity: config.opacity,
            lock,
            coverage: None,
            res_range: None,
        }
    }

    pub fn with_coverage(
        mut self,
        coverage: Arc<dyn Coverage>,
    ) -> Self {
        self.coverage = Some(coverage);
        self
    }

    pub fn with_res_range(
        mut self,
        res_range: Arc<dyn ResolutionRange>,
    ) -> Self {
        self.res_range = Some(res_range);
        self
    }

    /// Replaces the render lock, e.g. with a lock shared between processes.
    pub fn with_lock(
        mut self,
        lock: Arc<dyn RenderLock>,
    ) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn sharing_mode(&self) -> SharingMode {
        self.sharing
    }

    /// Renders `query`.
    ///
    /// Returns [`RenderError::BlankImage`] without touching the pool when the
    /// query is outside of the resolution range or coverage.
    pub async fn get_map(
        &self,
        query: &MapQuery,
    ) -> Result<ImageSource> {
        if let Some(res_range) = &self.res_range {
            if !res_range.contains(&query.bbox, query.size, &query.srs) {
                return Err(RenderError::BlankImage.into());
            }
        }
        if let Some(coverage) = &self.coverage {
            if !coverage.intersects(&query.bbox, &query.srs) {
                return Err(RenderError::BlankImage.into());
            }
        }

        let mut image = self.render(query).await?;
        image.opacity = self.opacity;
        Ok(image)
    }

    async fn render(
        &self,
        query: &MapQuery,
    ) -> Result<ImageSource> {
        let mapfile = resolve_mapfile(&self.mapfile, query)?;

        let job = RenderJob {
            pool: self.pool.clone(),
            mapfile,
            query: query.clone(),
            layers: self.layers.clone(),
            sharing: self.sharing,
            scale_factor: self.scale_factor,
            lock: self.lock.clone(),
        };

        let span = Span::current();
        tokio::task::spawn_blocking(move || span.in_scope(|| job.run()))
            .await
            .map_err(RenderError::TaskFailed)?
    }
}

/// Everything a render needs on the blocking thread
struct RenderJob<E: RenderEngine> {
    pool: Arc<PoolManager<E>>,
    mapfile: PathBuf,
    query: MapQuery,
    layers: Option<Arc<[String]>>,
    sharing: SharingMode,
    scale_factor: Option<f64>,
    lock: Option<Arc<dyn RenderLock>>,
}

impl<E: RenderEngine> RenderJob<E> {
    fn run(self) -> Result<ImageSource> {
        let _guard = self.lock.as_ref().map(|lock| lock.lock());

        let start = Instant::now();
        let handle = self.pool.acquire_current(&self.mapfile, self.sharing)?;

        let request = RenderRequest {
            bbox: self.query.bbox,
            size: self.query.size,
            srs: &self.query.srs,
            format: &self.query.format,
            layers: self.layers.as_deref(),
            scale_factor: self.scale_factor,
        };
        let engine = self.pool.engine();
        let rendered = {
            let _timer = ScopedTimer::new("render_map");
            handle.with_map(|map| engine.render(map, &request))
        };
        let elapsed = start.elapsed();

        let (status, size) = match &rendered {
            Ok(data) if !data.is_empty() => (RequestStatus::Ok, Some(data.len())),
            _ => (RequestStatus::Failed, None),
        };
        let key = self.query.log_key(&self.mapfile.to_string_lossy());
        log_request(&key, status, size, elapsed);

        let data = rendered.map_err(|e| {
            error!(
                key = %key,
                bbox = %self.query.bbox,
                srs = %self.query.srs,
                size = ?self.query.size,
                status = status.code(),
                duration_ms = elapsed.as_secs_f64() * 1000.0,
                "could not render map: {}",
                e
            );
            RenderError::Engine(e)
        })?;

        Ok(ImageSource {
            data,
            size: self.query.size,
            format: self.query.format.clone(),
            opacity: None,
        })
    }
}

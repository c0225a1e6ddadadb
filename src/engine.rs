//! Seam to the rendering engine.
//!
//! The engine compiles a mapfile into an opaque map state and renders images
//! from it. Both operations are expensive and the map state must never leave
//! the process that built it, which is what the handle pool is for.

use std::path::Path;

use crate::BBox;
use crate::EngineError;

/// Parameters of a single render call
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub bbox: BBox,
    /// Image size in pixels (width, height)
    pub size: (u32, u32),
    /// Spatial reference code, e.g. `EPSG:3857`
    pub srs: &'a str,
    /// Output image format, e.g. `image/png`
    pub format: &'a str,
    /// Allow-list of layer names. `None` renders every layer.
    ///
    /// Engines must keep unnamed layers regardless of the list.
    pub layers: Option<&'a [String]>,
    pub scale_factor: Option<f64>,
}

pub trait RenderEngine: Send + Sync + 'static {
    /// Loaded and compiled mapfile
    type Map: Send + 'static;

    /// Loads `mapfile` and everything it references.
    fn load_map(
        &self,
        mapfile: &Path,
    ) -> Result<Self::Map, EngineError>;

    /// Renders and encodes one image.
    fn render(
        &self,
        map: &mut Self::Map,
        request: &RenderRequest<'_>,
    ) -> Result<Vec<u8>, EngineError>;

    /// Frees the engine resources held by `map` (layers, datasource caches).
    fn release(
        &self,
        map: &mut Self::Map,
    ) -> Result<(), EngineError>;
}

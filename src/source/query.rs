use std::fmt;

/// Bounding box `(minx, miny, maxx, maxy)` in query SRS units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox(pub [f64; 4]);

impl BBox {
    pub const fn new(
        minx: f64,
        miny: f64,
        maxx: f64,
        maxy: f64,
    ) -> Self {
        Self([minx, miny, maxx, maxy])
    }

    pub fn width(&self) -> f64 {
        self.0[2] - self.0[0]
    }

    pub fn height(&self) -> f64 {
        self.0[3] - self.0[1]
    }
}

impl fmt::Display for BBox {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let [minx, miny, maxx, maxy] = self.0;
        write!(f, "({minx}, {miny}, {maxx}, {maxy})")
    }
}

/// Map request as seen by a source
#[derive(Debug, Clone, PartialEq)]
pub struct MapQuery {
    pub bbox: BBox,
    /// Image size in pixels (width, height)
    pub size: (u32, u32),
    /// Spatial reference code, e.g. `EPSG:3857`
    pub srs: String,
    /// Output format, e.g. `image/png`
    pub format: String,
}

impl MapQuery {
    /// Key used in request logs: `mapfile:bbox:srs:size`
    pub fn log_key(
        &self,
        mapfile: &str,
    ) -> String {
        format!(
            "{}:{}:{}:({}, {})",
            mapfile, self.bbox, self.srs, self.size.0, self.size.1
        )
    }
}

/// Encoded image returned by a source
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    pub data: Vec<u8>,
    pub size: (u32, u32),
    pub format: String,
    pub opacity: Option<f64>,
}

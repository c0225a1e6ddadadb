use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;
use crate::SharingMode;

/// Map source parameters
///
/// `mapfile` may contain the `%(webmercator_level)` placeholder, which is
/// resolved per query with the zoom level the query falls into.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SourceConfig {
    /// Path of the engine configuration file
    #[serde(default)]
    pub mapfile: String,

    /// Layers to render. Empty means all layers.
    #[serde(default)]
    pub layers: Vec<String>,

    /// Share one handle per mapfile between all threads of all sources
    #[serde(default)]
    pub reuse_map_objects: bool,

    /// Scale factor handed to the engine, if any
    #[serde(default)]
    pub scale_factor: Option<f64>,

    /// Opacity attached to the rendered image
    #[serde(default)]
    pub opacity: Option<f64>,

    /// Serialize all renders of this source behind an in-process lock
    #[serde(default)]
    pub serialize_renders: bool,
}

impl SourceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.mapfile.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "mapfile cannot be empty".into(),
            )));
        }

        if let Some(scale_factor) = self.scale_factor {
            if !(scale_factor > 0.0) {
                return Err(Error::Config(ConfigError::Message(format!(
                    "scale_factor must be positive, got {scale_factor}"
                ))));
            }
        }

        if let Some(opacity) = self.opacity {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(Error::Config(ConfigError::Message(format!(
                    "opacity must be within [0, 1], got {opacity}"
                ))));
            }
        }

        Ok(())
    }

    pub fn sharing_mode(&self) -> SharingMode {
        if self.reuse_map_objects {
            SharingMode::Shared
        } else {
            SharingMode::Exclusive
        }
    }
}

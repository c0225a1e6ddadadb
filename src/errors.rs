//! Render Pool Error Hierarchy
//!
//! Defines the error types surfaced by the handle pool and the map source,
//! categorized by the layer that produced them.

use std::path::PathBuf;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

/// Opaque failure reported by a rendering engine implementation.
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Handle construction, release and watcher failures
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Request level failures of the map source
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl Error {
    /// `true` when the query fell outside the configured coverage or resolution range.
    ///
    /// This is a signal to answer with an empty image rather than a failure.
    pub fn is_blank(&self) -> bool {
        matches!(self, Error::Render(RenderError::BlankImage))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The map configuration could not be parsed or its data sources are unreachable
    #[error("Failed to load map configuration {path}: {source}")]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    /// Releasing the engine resources of a handle failed
    #[error("Failed to release map handle {handle_id}: {source}")]
    Release {
        handle_id: u64,
        #[source]
        source: EngineError,
    },

    /// The configuration directory could not be watched
    #[error("Failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Query outside of the coverage or resolution range
    #[error("Query is outside of the source coverage or resolution range")]
    BlankImage,

    /// Engine failure while rendering an already acquired handle
    #[error("Could not render map: {0}")]
    Engine(EngineError),

    /// Templated mapfiles need queries in the web mercator grid
    #[error("Templated mapfile requires EPSG:3857 queries, got {0}")]
    UnsupportedSrs(String),

    /// Blocking render task panicked or was cancelled
    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

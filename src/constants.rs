// -
// Pool sizing

/// Idle handles kept per (process, mapfile) before extra ones are released
pub(crate) const MAX_UNUSED_HANDLES: usize = 10;

/// Dead-thread entries tolerated before a reclaim scan is paid for
pub(crate) const RECLAIM_SLACK: usize = 5;

// -
// Watcher

pub(crate) const WATCH_POLL_INTERVAL_IN_MS: u64 = 1000;

// -
// Mapfile templating

/// Placeholder resolved with the web mercator level affected by a query
pub(crate) const WEBMERCATOR_LEVEL_PLACEHOLDER: &str = "%(webmercator_level)";

/// Number of levels of the global EPSG:3857 grid
pub(crate) const WEBMERCATOR_NUM_LEVELS: u8 = 20;

pub(crate) const WEBMERCATOR_TILE_SIZE: u32 = 256;

/// Half the circumference of the earth in EPSG:3857 units
pub(crate) const WEBMERCATOR_HALF_EXTENT: f64 = 20037508.342789244;

pub(crate) const WEBMERCATOR_SRS: &str = "EPSG:3857";

// -
// Request logging

pub(crate) const REQUEST_LOG_TARGET: &str = "request_log";

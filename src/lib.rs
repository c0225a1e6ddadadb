//! Pooling of expensive, process-bound map rendering handles.
//!
//! A [`PoolManager`] per worker process hands out engine handles per calling
//! thread (or one shared handle per mapfile), parks unused handles in bounded
//! idle queues, reclaims the handles of exited threads and drops everything
//! when the mapfile directory changes on disk. [`MapSource`] puts a map-layer
//! facade with coverage checks and request logging on top.

mod config;
mod constants;
mod engine;
mod errors;
mod metrics;
mod pool;
mod source;
mod watch;
pub mod utils;

pub use config::*;
pub use engine::*;
pub use errors::*;
pub use metrics::*;
pub use pool::*;
pub use source::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;

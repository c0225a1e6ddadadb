//! Per-process pool of map handles
//!
//! ```text
//! acquire(mapfile, mode, caller)
//!   ScopeResolver -> (CacheKey, PoolKey)
//!   ActiveRegistry hit ─────────────────────────────┐
//!   ReusePool take (owner == caller process) ───────┤-> handle
//!   HandleFactory create (outside the lock) ────────┘
//!   Reclaimer sweep (only past live threads + slack)
//! ```
//!
//! Registry and idle queues share one lock; building, releasing and rendering
//! always happen outside of it.

mod handle;
mod manager;
mod reclaim;
mod registry;
mod scope;

pub use handle::*;
pub use manager::*;
pub use reclaim::*;
pub use registry::*;
pub use scope::*;

//! A sharded, reference-counted LRU block cache for embedded storage engines.
//!
//! # Features
//! - **Low Contention**: Keys are spread over independently locked shards by
//!   the high bits of their hash; no operation ever holds two shard locks.
//! - **Pinning Handles**: `insert` and `lookup` return a [`Handle`]. While it
//!   is alive its entry is never evicted, and its value stays readable even
//!   after the entry is erased or replaced.
//! - **Charge-Based Capacity**: Each entry carries a caller-chosen charge, such
//!   as the byte size of a data block, and shards evict their least recently
//!   used unpinned entries to stay within capacity.
//! - **Deleters**: An optional callback receives each value exactly once, when
//!   its entry's last reference is dropped.
//! - **Observability**: Exposes hit, eviction and reclaim counters.
//!
//! ```
//! use fibre_block_cache::Cache;
//!
//! let cache = Cache::new(64 * 1024);
//! let handle = cache.insert(b"table-7/block-0", vec![0u8; 128], 128);
//! assert_eq!(handle.len(), 128);
//! handle.release();
//!
//! let hit = cache.lookup(b"table-7/block-0").unwrap();
//! assert_eq!(cache.value(&hit).len(), 128);
//! ```

// Public modules that form the API
pub mod builder;
pub mod config;
pub mod error;
pub mod metrics;

// Internal, crate-only modules
mod cache;
mod deleter;
mod entry;
mod handle;
mod list;
mod shard;
mod store;
mod table;

// Re-export the primary user-facing types for convenience
pub use builder::CacheBuilder;
pub use cache::Cache;
pub use config::CacheConfig;
pub use deleter::Deleter;
pub use error::BuildError;
pub use handle::Handle;
pub use metrics::MetricsSnapshot;

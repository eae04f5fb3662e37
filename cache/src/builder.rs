use crate::cache::Cache;
use crate::config::CacheConfig;
use crate::error::BuildError;
use crate::store::ShardedStore;

use core::fmt;
use std::hash::BuildHasher;
use std::marker::PhantomData;

/// The default capacity: 8 MiB worth of charge, the block cache size a
/// storage engine uses when the caller supplies none.
pub const DEFAULT_CAPACITY: usize = 8 << 20;

/// The default number of shards.
pub const DEFAULT_SHARDS: usize = 16;

/// The largest shard count accepted. Shards are picked from the top bits of a
/// 32-bit hash and the rest are left for bucket selection.
pub const MAX_SHARDS: usize = 1 << 16;

/// A builder for creating `Cache` instances.
pub struct CacheBuilder<V, H = ahash::RandomState> {
  pub(crate) capacity: usize,
  pub(crate) shards: usize,
  pub(crate) hasher: H,
  _value_marker: PhantomData<fn() -> V>,
}

// Manual Debug implementation for CacheBuilder.
impl<V, H> fmt::Debug for CacheBuilder<V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheBuilder")
      .field("capacity", &self.capacity)
      .field("shards", &self.shards)
      .finish_non_exhaustive()
  }
}

// --- General Configuration Methods ---
impl<V, H> CacheBuilder<V, H> {
  /// Sets the total capacity of the cache, in charge units.
  ///
  /// Each shard receives `capacity / shards`, rounded up. A capacity of zero
  /// disables caching.
  pub fn capacity(mut self, capacity: usize) -> Self {
    self.capacity = capacity;
    self
  }

  /// Sets the number of concurrent shards to use.
  pub fn shards(mut self, shards: usize) -> Self {
    // Ensure shards is at least 1 and a power of two so the top hash bits
    // select it directly.
    self.shards = shards.max(1).next_power_of_two();
    self
  }

  /// Sets the hasher used for both shard selection and the per-shard index.
  pub fn hasher<H2>(self, hasher: H2) -> CacheBuilder<V, H2> {
    CacheBuilder {
      capacity: self.capacity,
      shards: self.shards,
      hasher,
      _value_marker: PhantomData,
    }
  }
}

// --- Default Constructor ---
impl<V, H: BuildHasher + Default> CacheBuilder<V, H> {
  /// Creates a new `CacheBuilder` with default settings.
  pub fn new() -> Self {
    Self {
      capacity: DEFAULT_CAPACITY,
      shards: DEFAULT_SHARDS,
      hasher: H::default(),
      _value_marker: PhantomData,
    }
  }

  /// Creates a builder from plain-data settings. Unlike [`shards`](Self::shards),
  /// the shard count is taken as given and checked by `build`.
  pub fn from_config(config: &CacheConfig) -> Self {
    Self {
      capacity: config.capacity,
      shards: config.shards,
      hasher: H::default(),
      _value_marker: PhantomData,
    }
  }
}

impl<V> Default for CacheBuilder<V, ahash::RandomState> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(feature = "rapidhash")]
impl<V> CacheBuilder<V, rapidhash::RapidRandomState> {
  pub fn rapidhash() -> Self {
    Self::new()
  }
}

// --- Build Methods ---
impl<V, H: BuildHasher> CacheBuilder<V, H> {
  /// Builds the cache.
  pub fn build(self) -> Result<Cache<V, H>, BuildError> {
    self.validate()?;
    let store = ShardedStore::new(self.capacity, self.shards, self.hasher);
    tracing::debug!(
      capacity = self.capacity,
      shards = self.shards,
      per_shard = self.capacity.div_ceil(self.shards),
      "built block cache"
    );
    Ok(Cache::from_parts(self.capacity, store))
  }

  /// Validates the builder configuration.
  pub(crate) fn validate(&self) -> Result<(), BuildError> {
    if self.shards == 0 {
      return Err(BuildError::ZeroShards);
    }
    if !self.shards.is_power_of_two() {
      return Err(BuildError::ShardsNotPowerOfTwo(self.shards));
    }
    if self.shards > MAX_SHARDS {
      return Err(BuildError::TooManyShards {
        requested: self.shards,
        max: MAX_SHARDS,
      });
    }
    Ok(())
  }
}

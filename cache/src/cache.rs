use crate::builder::CacheBuilder;
use crate::deleter::Deleter;
use crate::handle::Handle;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::store::ShardedStore;

use std::fmt;
use std::hash::BuildHasher;

use generational_arena::Index;
use parking_lot::Mutex;

/// A thread-safe, sharded LRU block cache.
///
/// Keys are byte strings, values are owned by the cache from `insert` until
/// the entry's last reference is dropped. Every entry carries a caller
/// defined `charge`; each shard evicts its least recently used, unreferenced
/// entries whenever its charge total exceeds its share of the capacity.
/// Entries held through a [`Handle`] are never evicted, so the total may
/// exceed the capacity while many entries are pinned.
///
/// Every operation hashes its key once and touches exactly one shard, except
/// `prune`, `total_charge` and `metrics`, which visit the shards one at a
/// time.
pub struct Cache<V, H: BuildHasher = ahash::RandomState> {
  pub(crate) store: ShardedStore<V, H>,
  pub(crate) metrics: Metrics,
  // Guarded separately from every shard lock.
  last_id: Mutex<u64>,
  capacity: usize,
}

impl<V, H: BuildHasher> fmt::Debug for Cache<V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Cache")
      .field("capacity", &self.capacity)
      .field("store", &self.store)
      .field("metrics", &self.metrics())
      .finish_non_exhaustive()
  }
}

impl<V> Cache<V, ahash::RandomState> {
  /// Creates a cache with the given total capacity, measured in charge
  /// units, and the default shard count and hasher.
  ///
  /// A capacity of zero disables caching: inserts still return usable
  /// handles, but nothing can be looked up afterwards.
  pub fn new(capacity: usize) -> Self {
    Self::from_parts(
      capacity,
      ShardedStore::new(
        capacity,
        crate::builder::DEFAULT_SHARDS,
        ahash::RandomState::new(),
      ),
    )
  }

  /// Returns a builder for configuring shard count and hasher.
  pub fn builder() -> CacheBuilder<V> {
    CacheBuilder::new()
  }
}

impl<V, H: BuildHasher> Cache<V, H> {
  pub(crate) fn from_parts(capacity: usize, store: ShardedStore<V, H>) -> Self {
    Self {
      store,
      metrics: Metrics::new(),
      last_id: Mutex::new(0),
      capacity,
    }
  }

  /// Inserts `value` under `key` and returns a handle to the new entry.
  ///
  /// Any entry already cached under `key` is replaced; handles to the old
  /// entry stay valid. The value is dropped when the entry's last reference
  /// goes away.
  pub fn insert(&self, key: &[u8], value: V, charge: usize) -> Handle<'_, V, H> {
    self.insert_inner(key, value, charge, None)
  }

  /// Like [`insert`](Self::insert), but hands the value to `deleter` once the
  /// entry's last reference goes away.
  pub fn insert_with_deleter<D>(
    &self,
    key: &[u8],
    value: V,
    charge: usize,
    deleter: D,
  ) -> Handle<'_, V, H>
  where
    D: Deleter<V> + 'static,
  {
    self.insert_inner(key, value, charge, Some(Box::new(deleter)))
  }

  fn insert_inner(
    &self,
    key: &[u8],
    value: V,
    charge: usize,
    deleter: Option<Box<dyn Deleter<V>>>,
  ) -> Handle<'_, V, H> {
    let hash = self.store.hash(key);
    let pinned = self
      .store
      .shard_for_hash(hash)
      .insert(key, hash, value, charge, deleter, &self.metrics);
    Handle::new(self, hash, pinned.index, pinned.value)
  }

  /// Looks up `key`, pinning the entry if it is cached.
  ///
  /// A hit marks the entry as in use; once the returned handle is released it
  /// becomes the most recently used eviction candidate of its shard.
  pub fn lookup(&self, key: &[u8]) -> Option<Handle<'_, V, H>> {
    let hash = self.store.hash(key);
    self
      .store
      .shard_for_hash(hash)
      .lookup(key, hash, &self.metrics)
      .map(|pinned| Handle::new(self, hash, pinned.index, pinned.value))
  }

  /// Returns the value a handle refers to.
  pub fn value<'h>(&self, handle: &'h Handle<'_, V, H>) -> &'h V {
    debug_assert!(handle.belongs_to(self), "handle from another cache");
    handle.value()
  }

  /// Releases a handle previously returned by `insert` or `lookup`.
  pub fn release(&self, handle: Handle<'_, V, H>) {
    debug_assert!(handle.belongs_to(self), "handle from another cache");
    drop(handle);
  }

  /// Routes a released reference back to the shard that created it, chosen
  /// from the stored hash rather than by re-hashing the key.
  pub(crate) fn release_raw(&self, hash: u32, index: Index) {
    self
      .store
      .shard_for_hash(hash)
      .release(index, &self.metrics);
  }

  /// Removes `key` from the cache. Outstanding handles keep the value alive
  /// until they are released. Erasing an absent key does nothing.
  pub fn erase(&self, key: &[u8]) {
    let hash = self.store.hash(key);
    self
      .store
      .shard_for_hash(hash)
      .erase(key, hash, &self.metrics);
  }

  /// Drops every cached entry that is not currently held by a handle.
  pub fn prune(&self) {
    let pruned: usize = self
      .store
      .iter_shards()
      .map(|shard| shard.prune(&self.metrics))
      .sum();
    tracing::trace!(entries = pruned, "pruned unreferenced cache entries");
  }

  /// Returns the combined charge of all cached entries, saturating at
  /// `usize::MAX`.
  pub fn total_charge(&self) -> usize {
    self
      .store
      .iter_shards()
      .fold(0, |total, shard| total.saturating_add(shard.total_charge()))
  }

  /// Returns a new numeric id, starting at 1 and increasing on every call.
  ///
  /// Clients sharing one cache use these ids to partition the key space,
  /// typically as a key prefix.
  pub fn new_id(&self) -> u64 {
    let mut last_id = self.last_id.lock();
    *last_id += 1;
    *last_id
  }

  /// The total capacity the cache was created with.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn shard_count(&self) -> usize {
    self.store.shards.len()
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.metrics.snapshot(self.total_charge())
  }

  /// Verifies the bookkeeping of every shard, panicking on the first
  /// inconsistency. Intended for tests.
  #[doc(hidden)]
  pub fn check_invariants(&self) {
    for shard in self.store.iter_shards() {
      shard.check_invariants();
    }
  }
}

mod compile_time_assertions {
  use super::*;

  #[allow(unreachable_code, dead_code)]
  fn _assert_public_types_send_sync() {
    _assert_send_sync::<Cache<Vec<u8>>>(unreachable!());
    _assert_send_sync::<Handle<'static, Vec<u8>>>(unreachable!());
  }

  fn _assert_send_sync<S: Send + Sync>(_: &S) {}
}

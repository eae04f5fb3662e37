use crate::cache::Cache;

use std::fmt;
use std::hash::BuildHasher;
use std::ops::Deref;
use std::sync::Arc;

use generational_arena::Index;

/// One held reference to a cache entry.
///
/// While a handle is alive its entry cannot be evicted, and its value stays
/// readable even if the entry is erased, pruned or replaced by a newer insert
/// of the same key. Dropping the handle, or calling [`Handle::release`],
/// gives the reference back to the shard that created it.
///
/// Handles borrow the cache, so a cache can never be dropped while handles
/// to it are outstanding.
pub struct Handle<'a, V, H: BuildHasher = ahash::RandomState> {
  cache: &'a Cache<V, H>,
  hash: u32,
  index: Index,
  // Taken in `drop` so it is released before the entry's reference is.
  value: Option<Arc<V>>,
}

impl<'a, V, H: BuildHasher> Handle<'a, V, H> {
  pub(crate) fn new(cache: &'a Cache<V, H>, hash: u32, index: Index, value: Arc<V>) -> Self {
    Self {
      cache,
      hash,
      index,
      value: Some(value),
    }
  }

  /// Returns the cached value. No lock is taken.
  #[inline]
  pub fn value(&self) -> &V {
    match &self.value {
      Some(value) => &**value,
      None => unreachable!("handle value is only taken on drop"),
    }
  }

  /// The hash of the key this handle was created for.
  #[inline]
  pub fn hash(&self) -> u32 {
    self.hash
  }

  /// Returns `true` if both handles refer to the same entry.
  pub fn ptr_eq(&self, other: &Self) -> bool {
    std::ptr::eq(self.cache, other.cache) && self.index == other.index
  }

  /// Releases this handle's reference.
  ///
  /// Equivalent to dropping the handle; provided so the release point reads
  /// explicitly at call sites.
  pub fn release(self) {
    drop(self)
  }

  #[inline]
  pub(crate) fn belongs_to(&self, cache: &Cache<V, H>) -> bool {
    std::ptr::eq(self.cache, cache)
  }
}

impl<V, H: BuildHasher> Deref for Handle<'_, V, H> {
  type Target = V;

  fn deref(&self) -> &V {
    self.value()
  }
}

impl<V, H: BuildHasher> Drop for Handle<'_, V, H> {
  fn drop(&mut self) {
    drop(self.value.take());
    self.cache.release_raw(self.hash, self.index);
  }
}

impl<V: fmt::Debug, H: BuildHasher> fmt::Debug for Handle<'_, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Handle")
      .field("hash", &self.hash)
      .field("value", &self.value)
      .finish_non_exhaustive()
  }
}

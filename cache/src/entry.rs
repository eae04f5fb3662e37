use crate::deleter::Deleter;

use std::fmt;
use std::sync::Arc;

use generational_arena::Index;

/// Where an entry currently lives, relative to the shard that owns it.
///
/// This is the tagged form of the classic `in_cache` flag plus list
/// membership, so the two can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryState {
  /// Reachable through the hash index and held only by it (`refs == 1`).
  /// The entry sits on the LRU list and may be evicted.
  Unreferenced,
  /// Reachable through the hash index and pinned by at least one handle
  /// (`refs >= 2`). The entry sits on the in-use list.
  Referenced,
  /// No longer reachable through the hash index and on neither list. Kept
  /// alive only by outstanding handles.
  Orphaned,
}

/// A container for a value in a shard, holding all bookkeeping fields.
pub(crate) struct CacheEntry<V> {
  pub(crate) key: Box<[u8]>,
  /// Hash of `key`; drives both shard selection and bucket selection.
  pub(crate) hash: u32,
  /// The caller's value. Handles hold clones of this `Arc`, so the value can
  /// be read without the shard lock.
  pub(crate) value: Arc<V>,
  pub(crate) charge: usize,
  pub(crate) deleter: Option<Box<dyn Deleter<V>>>,
  /// One for the index while cached, plus one per outstanding handle.
  pub(crate) refs: u32,
  pub(crate) state: EntryState,
  /// Next entry in the same hash bucket.
  pub(crate) next_hash: Option<Index>,
  pub(crate) prev: Option<Index>,
  pub(crate) next: Option<Index>,
}

impl<V> CacheEntry<V> {
  /// Creates a detached entry holding a single reference for the handle that
  /// is about to be returned to the caller.
  pub(crate) fn new(
    key: &[u8],
    hash: u32,
    value: V,
    charge: usize,
    deleter: Option<Box<dyn Deleter<V>>>,
  ) -> Self {
    Self {
      key: key.into(),
      hash,
      value: Arc::new(value),
      charge,
      deleter,
      refs: 1,
      state: EntryState::Orphaned,
      next_hash: None,
      prev: None,
      next: None,
    }
  }

  #[inline]
  pub(crate) fn in_cache(&self) -> bool {
    self.state != EntryState::Orphaned
  }

  #[inline]
  pub(crate) fn matches(&self, key: &[u8], hash: u32) -> bool {
    self.hash == hash && *self.key == *key
  }
}

impl<V> fmt::Debug for CacheEntry<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheEntry")
      .field("key_len", &self.key.len())
      .field("hash", &self.hash)
      .field("charge", &self.charge)
      .field("refs", &self.refs)
      .field("state", &self.state)
      .field("has_deleter", &self.deleter.is_some())
      .finish_non_exhaustive()
  }
}

use crate::entry::CacheEntry;

use std::fmt;
use std::sync::Arc;

/// A destructor for a cached value, called when the entry holding it loses
/// its last reference.
///
/// The cache calls `delete` exactly once per entry, with the entry's key and
/// its value, at the moment the reference count reaches zero. That can be
/// during `release` of the last handle, during `erase`, `prune`, the eviction
/// performed by `insert`, the replacement of a duplicate key, or when the
/// cache itself is dropped.
///
/// Deleters run on the calling thread after the shard lock has been released,
/// so a deleter may touch the cache again. It still runs inline with the cache
/// operation that triggered it and should be cheap and non-blocking.
///
/// Any `FnOnce(&[u8], V) + Send` closure is a deleter. The cache only
/// accepts `'static` deleters, since they are stored until the entry dies.
pub trait Deleter<V>: Send {
  fn delete(self: Box<Self>, key: &[u8], value: V);
}

impl<V, F> Deleter<V> for F
where
  F: FnOnce(&[u8], V) + Send,
{
  fn delete(self: Box<Self>, key: &[u8], value: V) {
    (*self)(key, value)
  }
}

/// An entry whose reference count has reached zero, waiting for its deleter
/// to run once the shard lock is released.
pub(crate) struct Reclaimed<V> {
  key: Box<[u8]>,
  value: Arc<V>,
  deleter: Option<Box<dyn Deleter<V>>>,
}

impl<V> Reclaimed<V> {
  pub(crate) fn from_entry(entry: CacheEntry<V>) -> Self {
    debug_assert_eq!(entry.refs, 0);
    Self {
      key: entry.key,
      value: entry.value,
      deleter: entry.deleter,
    }
  }

  /// Hands the value to its deleter, or simply drops it when none was given.
  pub(crate) fn finish(self) {
    // Handles give up their `Arc` before releasing their reference, so by the
    // time the count reached zero this is the only owner left.
    match Arc::into_inner(self.value) {
      Some(value) => match self.deleter {
        Some(deleter) => deleter.delete(&self.key, value),
        None => drop(value),
      },
      None => debug_assert!(false, "reclaimed value is still shared"),
    }
  }
}

impl<V> fmt::Debug for Reclaimed<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Reclaimed")
      .field("key_len", &self.key.len())
      .field("has_deleter", &self.deleter.is_some())
      .finish()
  }
}

/// Runs the deleters of everything a shard operation reclaimed.
pub(crate) fn finish_all<V>(reclaimed: Vec<Reclaimed<V>>) {
  for entry in reclaimed {
    entry.finish();
  }
}

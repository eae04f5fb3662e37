use crate::deleter::{self, Deleter, Reclaimed};
use crate::entry::{CacheEntry, EntryState};
use crate::list::EntryList;
use crate::metrics::Metrics;
use crate::table::HandleTable;

use std::fmt;
use std::sync::Arc;

use generational_arena::{Arena, Index};
use parking_lot::Mutex;

/// A reference acquired from a shard on behalf of a handle.
#[derive(Debug)]
pub(crate) struct Pinned<V> {
  pub(crate) index: Index,
  pub(crate) value: Arc<V>,
}

/// The only ways an entry's reference count changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
  /// A handle takes a reference.
  Acquire,
  /// A handle, or the index itself via `Detach`, gives one back.
  Release,
  /// The entry has been unlinked from the hash index; take it off its list,
  /// stop charging for it and drop the index's reference.
  Detach,
}

/// Everything guarded by a shard's lock.
struct ShardState<V> {
  entries: Arena<CacheEntry<V>>,
  table: HandleTable,
  // Entries with refs == 1 and in cache, oldest first.
  lru: EntryList,
  // Entries with refs >= 2 and in cache, in no particular order.
  in_use: EntryList,
  // Pinned entries are never evicted, so usage has no upper bound; it is
  // kept wide enough that summing usize charges cannot overflow.
  usage: u128,
  capacity: usize,
}

#[derive(Debug, Default)]
struct InsertOutcome {
  replaced: bool,
  evicted: usize,
}

impl<V> ShardState<V> {
  fn new(capacity: usize) -> Self {
    Self {
      entries: Arena::new(),
      table: HandleTable::new(),
      lru: EntryList::new(),
      in_use: EntryList::new(),
      usage: 0,
      capacity,
    }
  }

  fn transition(&mut self, index: Index, transition: Transition, reclaimed: &mut Vec<Reclaimed<V>>) {
    match transition {
      Transition::Acquire => {
        let entry = &mut self.entries[index];
        if entry.state == EntryState::Unreferenced {
          debug_assert_eq!(entry.refs, 1);
          entry.state = EntryState::Referenced;
          self.lru.remove(&mut self.entries, index);
          self.in_use.push_back(&mut self.entries, index);
        }
        self.entries[index].refs += 1;
      }
      Transition::Release => {
        let entry = &mut self.entries[index];
        debug_assert!(entry.refs > 0, "released an entry with no references");
        entry.refs -= 1;
        match (entry.refs, entry.state) {
          (0, state) => {
            debug_assert_eq!(state, EntryState::Orphaned);
            if let Some(entry) = self.entries.remove(index) {
              reclaimed.push(Reclaimed::from_entry(entry));
            }
          }
          (1, EntryState::Referenced) => {
            // No longer in use; the entry becomes the newest LRU candidate.
            entry.state = EntryState::Unreferenced;
            self.in_use.remove(&mut self.entries, index);
            self.lru.push_back(&mut self.entries, index);
          }
          _ => {}
        }
      }
      Transition::Detach => {
        let entry = &mut self.entries[index];
        let (state, charge) = (entry.state, entry.charge);
        debug_assert!(entry.in_cache(), "detached an entry that is not cached");
        debug_assert!(entry.next_hash.is_none());
        entry.state = EntryState::Orphaned;
        match state {
          EntryState::Unreferenced => self.lru.remove(&mut self.entries, index),
          EntryState::Referenced => self.in_use.remove(&mut self.entries, index),
          EntryState::Orphaned => return,
        }
        self.usage -= charge as u128;
        self.transition(index, Transition::Release, reclaimed);
      }
    }
  }

  fn insert(
    &mut self,
    entry: CacheEntry<V>,
    reclaimed: &mut Vec<Reclaimed<V>>,
  ) -> (Pinned<V>, InsertOutcome) {
    let value = entry.value.clone();
    let index = self.entries.insert(entry);
    let mut outcome = InsertOutcome::default();

    // A zero capacity turns caching off: the entry is handed back as a bare
    // handle and never linked anywhere.
    if self.capacity > 0 {
      {
        let entry = &mut self.entries[index];
        entry.refs += 1;
        entry.state = EntryState::Referenced;
        self.usage += entry.charge as u128;
      }
      self.in_use.push_back(&mut self.entries, index);
      if let Some(old) = self.table.insert(&mut self.entries, index) {
        outcome.replaced = true;
        self.transition(old, Transition::Detach, reclaimed);
      }
    }

    outcome.evicted = self.evict(Some(self.capacity), reclaimed);
    (Pinned { index, value }, outcome)
  }

  fn lookup(&mut self, key: &[u8], hash: u32) -> Option<Pinned<V>> {
    let index = self.table.lookup(&self.entries, key, hash)?;
    // Acquiring never reclaims anything.
    self.transition(index, Transition::Acquire, &mut Vec::new());
    Some(Pinned {
      index,
      value: self.entries[index].value.clone(),
    })
  }

  fn erase(&mut self, key: &[u8], hash: u32, reclaimed: &mut Vec<Reclaimed<V>>) -> bool {
    match self.table.remove(&mut self.entries, key, hash) {
      Some(index) => {
        self.transition(index, Transition::Detach, reclaimed);
        true
      }
      None => false,
    }
  }

  /// Evicts unreferenced entries, oldest first, until usage is at most
  /// `limit` or nothing evictable remains. `None` drains the whole LRU list.
  fn evict(&mut self, limit: Option<usize>, reclaimed: &mut Vec<Reclaimed<V>>) -> usize {
    let mut evicted = 0;
    while let Some(oldest) = self.lru.front() {
      if limit.is_some_and(|limit| self.usage <= limit as u128) {
        break;
      }
      debug_assert_eq!(self.entries[oldest].refs, 1);
      let removed = self.table.remove_entry(&mut self.entries, oldest);
      debug_assert!(removed, "LRU entry missing from the index");
      self.transition(oldest, Transition::Detach, reclaimed);
      evicted += 1;
    }
    evicted
  }

  fn check_invariants(&self) {
    let mut charged: u128 = 0;
    for (list, state) in [
      (&self.lru, EntryState::Unreferenced),
      (&self.in_use, EntryState::Referenced),
    ] {
      for index in list.iter(&self.entries) {
        let entry = &self.entries[index];
        assert_eq!(entry.state, state, "entry on the wrong list");
        match state {
          EntryState::Unreferenced => assert_eq!(entry.refs, 1),
          _ => assert!(entry.refs >= 2),
        }
        assert_eq!(
          self.table.lookup(&self.entries, &entry.key, entry.hash),
          Some(index),
          "cached entry is not reachable through the index"
        );
        charged += entry.charge as u128;
      }
    }
    assert_eq!(self.table.len(), self.lru.len() + self.in_use.len());
    assert_eq!(self.usage, charged, "usage does not match cached charge");
    for (_, entry) in self.entries.iter() {
      assert!(entry.refs >= 1);
      if entry.state == EntryState::Orphaned {
        assert!(entry.prev.is_none() && entry.next.is_none());
      }
    }
  }
}

/// A single, independently locked LRU cache. The sharded cache routes every
/// key to exactly one of these.
pub(crate) struct Shard<V> {
  state: Mutex<ShardState<V>>,
  capacity: usize,
}

impl<V> fmt::Debug for Shard<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Shard")
      .field("capacity", &self.capacity)
      .finish_non_exhaustive()
  }
}

impl<V> Shard<V> {
  pub(crate) fn new(capacity: usize) -> Self {
    Self {
      state: Mutex::new(ShardState::new(capacity)),
      capacity,
    }
  }

  #[cfg(test)]
  pub(crate) fn capacity(&self) -> usize {
    self.capacity
  }

  pub(crate) fn insert(
    &self,
    key: &[u8],
    hash: u32,
    value: V,
    charge: usize,
    deleter: Option<Box<dyn Deleter<V>>>,
    metrics: &Metrics,
  ) -> Pinned<V> {
    // Build the entry before taking the lock.
    let entry = CacheEntry::new(key, hash, value, charge, deleter);
    let mut reclaimed = Vec::new();
    let (pinned, outcome) = self.state.lock().insert(entry, &mut reclaimed);

    Metrics::add(&metrics.inserts, 1);
    if self.capacity == 0 {
      Metrics::add(&metrics.uncached_inserts, 1);
    }
    if outcome.replaced {
      Metrics::add(&metrics.replacements, 1);
    }
    Metrics::add(&metrics.evicted_by_capacity, outcome.evicted as u64);
    Self::finish(reclaimed, metrics);
    pinned
  }

  pub(crate) fn lookup(&self, key: &[u8], hash: u32, metrics: &Metrics) -> Option<Pinned<V>> {
    let pinned = self.state.lock().lookup(key, hash);
    match pinned {
      Some(_) => Metrics::add(&metrics.hits, 1),
      None => Metrics::add(&metrics.misses, 1),
    }
    pinned
  }

  pub(crate) fn release(&self, index: Index, metrics: &Metrics) {
    let mut reclaimed = Vec::new();
    self
      .state
      .lock()
      .transition(index, Transition::Release, &mut reclaimed);
    Self::finish(reclaimed, metrics);
  }

  pub(crate) fn erase(&self, key: &[u8], hash: u32, metrics: &Metrics) -> bool {
    let mut reclaimed = Vec::new();
    let erased = self.state.lock().erase(key, hash, &mut reclaimed);
    if erased {
      Metrics::add(&metrics.erased, 1);
    }
    Self::finish(reclaimed, metrics);
    erased
  }

  /// Drops every cached entry that no handle is holding.
  pub(crate) fn prune(&self, metrics: &Metrics) -> usize {
    let mut reclaimed = Vec::new();
    let pruned = self.state.lock().evict(None, &mut reclaimed);
    Metrics::add(&metrics.pruned, pruned as u64);
    Self::finish(reclaimed, metrics);
    pruned
  }

  pub(crate) fn total_charge(&self) -> usize {
    usize::try_from(self.state.lock().usage).unwrap_or(usize::MAX)
  }

  /// Panics if any bookkeeping invariant is broken.
  pub(crate) fn check_invariants(&self) {
    self.state.lock().check_invariants();
  }

  // Deleters run here, after the shard lock has been released.
  fn finish(reclaimed: Vec<Reclaimed<V>>, metrics: &Metrics) {
    Metrics::add(&metrics.reclaimed, reclaimed.len() as u64);
    deleter::finish_all(reclaimed);
  }
}

impl<V> Drop for Shard<V> {
  fn drop(&mut self) {
    let state = self.state.get_mut();
    // Handles borrow the cache, so only a leaked handle can still be in use.
    // Its entry is leaked with it.
    if !state.in_use.is_empty() {
      tracing::warn!(
        entries = state.in_use.len(),
        "shard dropped with leaked handles"
      );
    }
    let mut reclaimed = Vec::new();
    let dropped = state.evict(None, &mut reclaimed);
    if dropped > 0 {
      tracing::trace!(entries = dropped, "released cached entries on shard teardown");
    }
    deleter::finish_all(reclaimed);
  }
}

use crate::entry::CacheEntry;

use generational_arena::{Arena, Index};

const INITIAL_BUCKETS: usize = 4;

/// The link that points at a chain element: either a bucket head or the
/// `next_hash` field of the previous entry in the chain.
#[derive(Debug, Clone, Copy)]
enum Slot {
  Bucket(usize),
  Chain(Index),
}

/// An open-chaining hash table over arena indices.
///
/// The table never owns entries. Each bucket holds the head of a chain linked
/// through `CacheEntry::next_hash`, and buckets are chosen from the low bits
/// of the precomputed hash. Since each cache entry is fairly large, the table
/// keeps the average chain length at or below one by doubling whenever it
/// holds more entries than buckets.
#[derive(Debug)]
pub(crate) struct HandleTable {
  buckets: Box<[Option<Index>]>,
  elems: usize,
}

impl HandleTable {
  pub fn new() -> Self {
    Self {
      buckets: vec![None; INITIAL_BUCKETS].into_boxed_slice(),
      elems: 0,
    }
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.elems
  }

  #[cfg(test)]
  pub fn bucket_count(&self) -> usize {
    self.buckets.len()
  }

  #[inline]
  fn bucket_of(&self, hash: u32) -> usize {
    hash as usize & (self.buckets.len() - 1)
  }

  /// Returns the slot pointing at the entry matching `key`/`hash` together
  /// with that entry, or the trailing slot of the bucket chain if there is
  /// no such entry.
  fn find_slot<V>(
    &self,
    entries: &Arena<CacheEntry<V>>,
    key: &[u8],
    hash: u32,
  ) -> (Slot, Option<Index>) {
    let bucket = self.bucket_of(hash);
    let mut slot = Slot::Bucket(bucket);
    let mut current = self.buckets[bucket];
    while let Some(index) = current {
      let entry = &entries[index];
      if entry.matches(key, hash) {
        return (slot, Some(index));
      }
      slot = Slot::Chain(index);
      current = entry.next_hash;
    }
    (slot, None)
  }

  /// Like `find_slot`, but looks for one specific entry by identity.
  fn slot_of<V>(&self, entries: &Arena<CacheEntry<V>>, target: Index) -> Option<Slot> {
    let bucket = self.bucket_of(entries[target].hash);
    let mut slot = Slot::Bucket(bucket);
    let mut current = self.buckets[bucket];
    while let Some(index) = current {
      if index == target {
        return Some(slot);
      }
      slot = Slot::Chain(index);
      current = entries[index].next_hash;
    }
    None
  }

  fn set_slot<V>(&mut self, entries: &mut Arena<CacheEntry<V>>, slot: Slot, link: Option<Index>) {
    match slot {
      Slot::Bucket(bucket) => self.buckets[bucket] = link,
      Slot::Chain(index) => entries[index].next_hash = link,
    }
  }

  pub fn lookup<V>(&self, entries: &Arena<CacheEntry<V>>, key: &[u8], hash: u32) -> Option<Index> {
    self.find_slot(entries, key, hash).1
  }

  /// Links `index` into the table. If an entry with the same key was present
  /// it is unlinked and returned; the new entry takes its place in the chain.
  pub fn insert<V>(&mut self, entries: &mut Arena<CacheEntry<V>>, index: Index) -> Option<Index> {
    let (slot, old) = {
      let entry = &entries[index];
      self.find_slot(entries, &entry.key, entry.hash)
    };

    let next = match old {
      Some(old_index) => entries[old_index].next_hash.take(),
      None => None,
    };
    entries[index].next_hash = next;
    self.set_slot(entries, slot, Some(index));

    if old.is_none() {
      self.elems += 1;
      if self.elems > self.buckets.len() {
        self.resize(entries);
      }
    }
    old
  }

  pub fn remove<V>(
    &mut self,
    entries: &mut Arena<CacheEntry<V>>,
    key: &[u8],
    hash: u32,
  ) -> Option<Index> {
    let (slot, found) = self.find_slot(entries, key, hash);
    let index = found?;
    self.unlink(entries, slot, index);
    Some(index)
  }

  /// Removes a specific entry. Returns `false` if it was not in the table.
  pub fn remove_entry<V>(&mut self, entries: &mut Arena<CacheEntry<V>>, index: Index) -> bool {
    match self.slot_of(entries, index) {
      Some(slot) => {
        self.unlink(entries, slot, index);
        true
      }
      None => false,
    }
  }

  fn unlink<V>(&mut self, entries: &mut Arena<CacheEntry<V>>, slot: Slot, index: Index) {
    let next = entries[index].next_hash.take();
    self.set_slot(entries, slot, next);
    self.elems -= 1;
  }

  fn resize<V>(&mut self, entries: &mut Arena<CacheEntry<V>>) {
    let mut new_len = INITIAL_BUCKETS;
    while new_len < self.elems {
      new_len *= 2;
    }

    let old = std::mem::replace(&mut self.buckets, vec![None; new_len].into_boxed_slice());
    let mask = new_len - 1;
    let mut count = 0;
    for head in old.iter() {
      let mut current = *head;
      while let Some(index) = current {
        let entry = &mut entries[index];
        current = entry.next_hash;
        let bucket = entry.hash as usize & mask;
        entry.next_hash = self.buckets[bucket];
        self.buckets[bucket] = Some(index);
        count += 1;
      }
    }
    debug_assert_eq!(self.elems, count);
  }
}

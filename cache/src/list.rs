use crate::entry::CacheEntry;

use generational_arena::{Arena, Index};

// A doubly-linked list threaded through the `prev`/`next` links of entries
// stored in a shard's arena. The list owns nothing; it only records the ends.
// Head is the oldest entry, tail the newest.
#[derive(Debug, Default)]
pub(crate) struct EntryList {
  head: Option<Index>,
  tail: Option<Index>,
  len: usize,
}

impl EntryList {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn front(&self) -> Option<Index> {
    self.head
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.len
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  /// Appends an unlinked entry as the newest element.
  pub fn push_back<V>(&mut self, entries: &mut Arena<CacheEntry<V>>, index: Index) {
    let old_tail = self.tail;
    {
      let node = &mut entries[index];
      debug_assert!(node.prev.is_none() && node.next.is_none());
      node.prev = old_tail;
      node.next = None;
    }

    match old_tail {
      Some(tail) => entries[tail].next = Some(index),
      None => self.head = Some(index),
    }
    self.tail = Some(index);
    self.len += 1;
  }

  /// Unlinks an entry that is known to be on this list.
  pub fn remove<V>(&mut self, entries: &mut Arena<CacheEntry<V>>, index: Index) {
    let (prev, next) = {
      let node = &mut entries[index];
      (node.prev.take(), node.next.take())
    };

    // Update the 'next' pointer of the previous node.
    match prev {
      Some(prev_idx) => entries[prev_idx].next = next,
      // We are unlinking the head of the list.
      None => self.head = next,
    }

    // Update the 'prev' pointer of the next node.
    match next {
      Some(next_idx) => entries[next_idx].prev = prev,
      // We are unlinking the tail of the list.
      None => self.tail = prev,
    }

    debug_assert!(self.len > 0);
    self.len -= 1;
  }

  /// Walks the list from oldest to newest.
  pub fn iter<'a, V>(&self, entries: &'a Arena<CacheEntry<V>>) -> Iter<'a, V> {
    Iter {
      entries,
      current: self.head,
    }
  }
}

pub(crate) struct Iter<'a, V> {
  entries: &'a Arena<CacheEntry<V>>,
  current: Option<Index>,
}

impl<'a, V> Iterator for Iter<'a, V> {
  type Item = Index;

  fn next(&mut self) -> Option<Index> {
    let index = self.current?;
    self.current = self.entries[index].next;
    Some(index)
  }
}

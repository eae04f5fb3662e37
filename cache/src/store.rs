use crate::shard::Shard;

use core::fmt;
use std::hash::{BuildHasher, Hasher};

use crossbeam_utils::CachePadded;

/// Hashes a key with the configured `BuildHasher` and folds the result to the
/// 32 bits used for both shard and bucket selection.
#[inline]
pub(crate) fn hash_key<H: BuildHasher>(hasher: &H, key: &[u8]) -> u32 {
  let mut state = hasher.build_hasher();
  state.write(key);
  let hash = state.finish();
  (hash ^ (hash >> 32)) as u32
}

/// A cache store that is partitioned into multiple, independently locked
/// shards.
///
/// Shards are selected from the high bits of the key hash, while each shard's
/// hash index buckets on the low bits, so the two choices stay independent.
pub(crate) struct ShardedStore<V, H> {
  pub(crate) shards: Box<[CachePadded<Shard<V>>]>,
  pub(crate) hasher: H,
  shard_bits: u32,
}

impl<V, H> fmt::Debug for ShardedStore<V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ShardedStore")
      .field("num_shards", &self.shards.len())
      .field("shard_bits", &self.shard_bits)
      .finish()
  }
}

impl<V, H> ShardedStore<V, H>
where
  H: BuildHasher,
{
  /// Creates a store of `num_shards` shards sharing `capacity` between them.
  /// `num_shards` must be a power of two; the builder guarantees it.
  pub(crate) fn new(capacity: usize, num_shards: usize, hasher: H) -> Self {
    debug_assert!(num_shards.is_power_of_two());
    let per_shard = capacity.div_ceil(num_shards);
    let shards = (0..num_shards)
      .map(|_| CachePadded::new(Shard::new(per_shard)))
      .collect();

    Self {
      shards,
      hasher,
      shard_bits: num_shards.trailing_zeros(),
    }
  }

  #[inline]
  pub(crate) fn hash(&self, key: &[u8]) -> u32 {
    hash_key(&self.hasher, key)
  }

  /// Maps a hash to its shard using the top `shard_bits` bits.
  #[inline]
  pub(crate) fn shard_index(&self, hash: u32) -> usize {
    // A shift by the full width yields zero: a single shard.
    hash.checked_shr(32 - self.shard_bits).unwrap_or(0) as usize
  }

  #[inline]
  pub(crate) fn shard_for_hash(&self, hash: u32) -> &Shard<V> {
    &self.shards[self.shard_index(hash)]
  }

  /// Returns an iterator over all the shards.
  pub(crate) fn iter_shards(&self) -> impl Iterator<Item = &Shard<V>> {
    self.shards.iter().map(|padded| &**padded)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use std::hash::BuildHasherDefault;

  // Returns the last eight bytes written, so tests can choose a hash.
  #[derive(Default)]
  struct Passthrough(u64);

  impl Hasher for Passthrough {
    fn finish(&self) -> u64 {
      self.0
    }
    fn write(&mut self, bytes: &[u8]) {
      let mut buf = [0u8; 8];
      let n = bytes.len().min(8);
      buf[..n].copy_from_slice(&bytes[..n]);
      self.0 = u64::from_le_bytes(buf);
    }
  }

  type PassthroughState = BuildHasherDefault<Passthrough>;

  #[test]
  fn shard_index_uses_top_bits() {
    let store: ShardedStore<(), _> = ShardedStore::new(160, 16, PassthroughState::default());
    assert_eq!(store.shards.len(), 16);
    assert_eq!(store.shard_index(0x0000_0000), 0);
    assert_eq!(store.shard_index(0x0fff_ffff), 0, "Low bits must not affect the shard");
    assert_eq!(store.shard_index(0x1000_0000), 1);
    assert_eq!(store.shard_index(0xf000_0000), 15);
  }

  #[test]
  fn single_shard_takes_every_hash() {
    let store: ShardedStore<(), _> = ShardedStore::new(10, 1, PassthroughState::default());
    assert_eq!(store.shard_index(0), 0);
    assert_eq!(store.shard_index(u32::MAX), 0);
  }

  #[test]
  fn capacity_is_split_rounding_up() {
    let store: ShardedStore<(), _> = ShardedStore::new(17, 16, PassthroughState::default());
    assert!(store.iter_shards().all(|s| s.capacity() == 2));

    let store: ShardedStore<(), _> = ShardedStore::new(0, 4, PassthroughState::default());
    assert!(store.iter_shards().all(|s| s.capacity() == 0));
  }

  #[test]
  fn hash_folds_high_and_low_halves() {
    let hasher = PassthroughState::default();
    let key = 0x0000_0001_0000_0002u64.to_le_bytes();
    assert_eq!(hash_key(&hasher, &key), 3);
  }
}

#![allow(dead_code)]

use std::hash::{BuildHasher, Hasher};
use std::sync::{Arc, Mutex, Once};

use fibre_block_cache::{Cache, CacheBuilder};

// A custom hasher that allows us to control which shard a key is assigned to.
// The first four bytes of the key, read big-endian, become the hash. With 16
// shards the top nibble picks the shard:
// - key [0x00, ..] -> shard 0
// - key [0x10, ..] -> shard 1
// - key [0xf0, ..] -> shard 15
#[derive(Clone, Default)]
pub struct ShardControllingHasher;
impl BuildHasher for ShardControllingHasher {
  type Hasher = TestHasher;
  fn build_hasher(&self) -> Self::Hasher {
    TestHasher(0)
  }
}
pub struct TestHasher(u64);
impl Hasher for TestHasher {
  fn finish(&self) -> u64 {
    self.0
  }
  fn write(&mut self, bytes: &[u8]) {
    let mut buf = [0u8; 4];
    let n = bytes.len().min(4);
    buf[..n].copy_from_slice(&bytes[..n]);
    self.0 = u32::from_be_bytes(buf) as u64;
  }
}

/// Builds a key that `ShardControllingHasher` routes to `shard` of a
/// 16-shard cache. `n` keeps keys in the same shard distinct.
pub fn key_in_shard(shard: u8, n: u16) -> Vec<u8> {
  let [hi, lo] = n.to_be_bytes();
  vec![shard << 4, 0, hi, lo]
}

// Helper to build a cache for testing purposes.
pub fn build_test_cache(shards: usize, capacity: usize) -> Cache<u32, ShardControllingHasher> {
  CacheBuilder::<u32>::new()
    .shards(shards)
    .capacity(capacity)
    .hasher(ShardControllingHasher)
    .build()
    .unwrap()
}

/// A single-shard cache, for tests that depend on exact LRU order.
pub fn build_single_shard_cache(capacity: usize) -> Cache<u32> {
  CacheBuilder::<u32>::new()
    .shards(1)
    .capacity(capacity)
    .build()
    .unwrap()
}

/// Records every deleter invocation in order.
#[derive(Clone, Default)]
pub struct DeleteLog(Arc<Mutex<Vec<(Vec<u8>, u32)>>>);

impl DeleteLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn deleter(&self) -> impl FnOnce(&[u8], u32) + Send + 'static {
    let log = self.0.clone();
    move |key, value| log.lock().unwrap().push((key.to_vec(), value))
  }

  pub fn values(&self) -> Vec<u32> {
    self.0.lock().unwrap().iter().map(|(_, v)| *v).collect()
  }

  pub fn keys(&self) -> Vec<Vec<u8>> {
    self.0.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
  }

  pub fn len(&self) -> usize {
    self.0.lock().unwrap().len()
  }
}

static TRACING: Once = Once::new();

/// Routes `tracing` output through the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
  TRACING.call_once(|| {
    let _ = tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .with_test_writer()
      .try_init();
  });
}

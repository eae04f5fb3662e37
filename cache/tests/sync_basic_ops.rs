mod common;

use common::{build_test_cache, key_in_shard, DeleteLog};
use fibre_block_cache::Cache;

#[test]
fn test_insert_and_lookup() {
  common::init_tracing();
  let cache = Cache::<u32>::new(100);
  let handle = cache.insert(b"key1", 10, 1);
  assert_eq!(*handle.value(), 10);
  cache.release(handle);

  let hit = cache.lookup(b"key1").expect("key1 should be cached");
  assert_eq!(*cache.value(&hit), 10);
  assert_eq!(*hit, 10, "Handles deref to their value");
  cache.release(hit);

  assert!(cache.lookup(b"missing").is_none());

  let metrics = cache.metrics();
  assert_eq!(metrics.inserts, 1);
  assert_eq!(metrics.hits, 1);
  assert_eq!(metrics.misses, 1);
  assert_eq!(metrics.total_charge, 1);
  cache.check_invariants();
}

#[test]
fn test_empty_key_is_a_valid_key() {
  let cache = Cache::<u32>::new(100);
  cache.insert(b"", 1, 1).release();
  assert_eq!(cache.lookup(b"").map(|h| *h), Some(1));
  cache.erase(b"");
  assert!(cache.lookup(b"").is_none());
}

#[test]
fn test_duplicate_insert_replaces_and_deletes_old_value() {
  let cache = Cache::<u32>::new(100);
  let log = DeleteLog::new();

  cache.insert_with_deleter(b"k", 1, 1, log.deleter()).release();
  cache.insert_with_deleter(b"k", 2, 5, log.deleter()).release();

  assert_eq!(cache.lookup(b"k").map(|h| *h), Some(2));
  assert_eq!(log.values(), vec![1], "Old value deleted exactly once");
  assert_eq!(cache.total_charge(), 5, "Only the new charge is counted");
  assert_eq!(cache.metrics().replacements, 1);
  cache.check_invariants();
}

#[test]
fn test_replaced_value_stays_readable_through_its_handle() {
  let cache = Cache::<u32>::new(100);
  let log = DeleteLog::new();

  let old = cache.insert_with_deleter(b"k", 1, 1, log.deleter());
  cache.insert_with_deleter(b"k", 2, 1, log.deleter()).release();

  assert_eq!(*old, 1, "Replaced entry is still valid through its handle");
  assert_eq!(cache.lookup(b"k").map(|h| *h), Some(2));
  assert!(log.values().is_empty());

  cache.release(old);
  assert_eq!(log.values(), vec![1]);
}

#[test]
fn test_erase_is_idempotent() {
  let cache = Cache::<u32>::new(100);
  let log = DeleteLog::new();
  cache.insert_with_deleter(b"a", 1, 3, log.deleter()).release();
  cache.insert_with_deleter(b"b", 2, 4, log.deleter()).release();

  cache.erase(b"a");
  assert!(cache.lookup(b"a").is_none());
  assert_eq!(cache.total_charge(), 4);
  assert_eq!(log.values(), vec![1]);

  cache.erase(b"a");
  cache.erase(b"never-inserted");
  assert_eq!(cache.total_charge(), 4);
  assert_eq!(log.values(), vec![1], "Repeated erase has no further effect");
  assert_eq!(cache.metrics().erased, 1);
  assert_eq!(cache.lookup(b"b").map(|h| *h), Some(2));
}

#[test]
fn test_erase_while_held_defers_deletion() {
  let cache = Cache::<u32>::new(100);
  let log = DeleteLog::new();
  let handle = cache.insert_with_deleter(b"a", 7, 2, log.deleter());

  cache.erase(b"a");
  assert!(cache.lookup(b"a").is_none());
  assert_eq!(cache.total_charge(), 0, "Erased entries stop counting immediately");
  assert_eq!(*handle, 7);
  assert!(log.values().is_empty());
  cache.check_invariants();

  handle.release();
  assert_eq!(log.values(), vec![7]);
}

#[test]
fn test_zero_capacity_disables_caching() {
  let cache = Cache::<u32>::new(0);
  let log = DeleteLog::new();

  let handle = cache.insert_with_deleter(b"a", 5, 1, log.deleter());
  assert_eq!(*handle, 5, "Uncached inserts still return a usable handle");
  assert!(cache.lookup(b"a").is_none());
  assert_eq!(cache.total_charge(), 0);

  handle.release();
  assert_eq!(log.values(), vec![5]);
  assert_eq!(cache.metrics().uncached_inserts, 1);
}

#[test]
fn test_new_id_is_monotonic() {
  let cache = Cache::<u32>::new(10);
  let ids: Vec<u64> = (0..5).map(|_| cache.new_id()).collect();
  assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_keys_in_different_shards_are_independent() {
  let cache = build_test_cache(16, 16 * 10);
  let a = key_in_shard(1, 0);
  let b = key_in_shard(2, 0);
  cache.insert(&a, 1, 10).release();
  cache.insert(&b, 2, 10).release();

  // Each shard holds exactly its own key at full per-shard capacity.
  assert_eq!(cache.lookup(&a).map(|h| *h), Some(1));
  assert_eq!(cache.lookup(&b).map(|h| *h), Some(2));
  assert_eq!(cache.total_charge(), 20);
  cache.check_invariants();
}

#[test]
fn test_drop_runs_deleters_of_cached_entries() {
  let log = DeleteLog::new();
  {
    let cache = Cache::<u32>::new(100);
    for i in 0..5u32 {
      cache
        .insert_with_deleter(&i.to_le_bytes(), i, 1, log.deleter())
        .release();
    }
    assert_eq!(log.len(), 0);
  }
  let mut deleted = log.values();
  deleted.sort_unstable();
  assert_eq!(deleted, vec![0, 1, 2, 3, 4]);
}

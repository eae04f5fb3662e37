use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// A thread-safe, internal metrics collector for the cache.
/// All fields are atomic so shards can update them without extra locking.
#[derive(Debug)]
pub struct Metrics {
  // --- Hit/Miss Ratios ---
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,

  // --- Throughput ---
  pub(crate) inserts: CachePadded<AtomicU64>,
  pub(crate) uncached_inserts: CachePadded<AtomicU64>,
  pub(crate) replacements: CachePadded<AtomicU64>,

  // --- Removal Stats ---
  pub(crate) evicted_by_capacity: CachePadded<AtomicU64>,
  pub(crate) erased: CachePadded<AtomicU64>,
  pub(crate) pruned: CachePadded<AtomicU64>,
  pub(crate) reclaimed: CachePadded<AtomicU64>,

  // --- Timestamps for Uptime ---
  created_at: Instant,
}

impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      inserts: CachePadded::new(AtomicU64::new(0)),
      uncached_inserts: CachePadded::new(AtomicU64::new(0)),
      replacements: CachePadded::new(AtomicU64::new(0)),
      evicted_by_capacity: CachePadded::new(AtomicU64::new(0)),
      erased: CachePadded::new(AtomicU64::new(0)),
      pruned: CachePadded::new(AtomicU64::new(0)),
      reclaimed: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub(crate) fn add(counter: &AtomicU64, n: u64) {
    if n > 0 {
      counter.fetch_add(n, Ordering::Relaxed);
    }
  }

  /// Creates a point-in-time snapshot of the counters. `total_charge` is
  /// gathered from the shards by the caller.
  pub(crate) fn snapshot(&self, total_charge: usize) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      inserts: self.inserts.load(Ordering::Relaxed),
      uncached_inserts: self.uncached_inserts.load(Ordering::Relaxed),
      replacements: self.replacements.load(Ordering::Relaxed),
      evicted_by_capacity: self.evicted_by_capacity.load(Ordering::Relaxed),
      erased: self.erased.load(Ordering::Relaxed),
      pruned: self.pruned.load(Ordering::Relaxed),
      reclaimed: self.reclaimed.load(Ordering::Relaxed),
      total_charge,
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A point-in-time, public-facing snapshot of the cache's metrics.
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// The number of lookups that found an entry.
  pub hits: u64,
  /// The number of lookups that found nothing.
  pub misses: u64,
  /// The cache hit ratio (hits / (hits + misses)).
  pub hit_ratio: f64,
  /// The total number of inserts, including uncached ones.
  pub inserts: u64,
  /// Inserts into a shard with zero capacity, which were handed back as
  /// bare handles and never cached.
  pub uncached_inserts: u64,
  /// Inserts that displaced an existing entry with the same key.
  pub replacements: u64,
  /// Entries removed from the index to bring usage back under capacity.
  pub evicted_by_capacity: u64,
  /// Entries removed by an explicit `erase`.
  pub erased: u64,
  /// Entries removed by `prune`.
  pub pruned: u64,
  /// Entries whose last reference was dropped.
  pub reclaimed: u64,
  /// The combined charge of every cached entry across all shards.
  pub total_charge: usize,
  /// The number of seconds the cache has been running.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("inserts", &self.inserts)
      .field("uncached_inserts", &self.uncached_inserts)
      .field("replacements", &self.replacements)
      .field("evicted_by_capacity", &self.evicted_by_capacity)
      .field("erased", &self.erased)
      .field("pruned", &self.pruned)
      .field("reclaimed", &self.reclaimed)
      .field("total_charge", &self.total_charge)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}

use crate::builder::{DEFAULT_CAPACITY, DEFAULT_SHARDS};

/// Plain-data cache settings, suitable for embedding in engine option files.
///
/// With the `serde` feature enabled, missing fields fall back to their
/// defaults and unknown fields are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct CacheConfig {
  /// Total capacity in charge units. Zero disables caching.
  pub capacity: usize,
  /// Number of independently locked shards. Must be a power of two.
  pub shards: usize,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      capacity: DEFAULT_CAPACITY,
      shards: DEFAULT_SHARDS,
    }
  }
}

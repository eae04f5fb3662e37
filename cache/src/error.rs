use thiserror::Error;

/// Errors that can occur when building a cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
  /// The cache was configured with zero shards.
  #[error("shard count cannot be zero")]
  ZeroShards,
  /// Shard selection uses the top bits of the key hash, which only works
  /// for a power-of-two shard count.
  #[error("shard count must be a power of two, got {0}")]
  ShardsNotPowerOfTwo(usize),
  /// More shards were requested than the 32-bit key hash can address
  /// sensibly.
  #[error("shard count {requested} exceeds the maximum of {max}")]
  TooManyShards { requested: usize, max: usize },
}

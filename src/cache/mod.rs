//! Content-addressable build artifact cache
//!
//! Repeated builds with identical inputs skip redundant work: the cache
//! key is a deterministic fingerprint of source contents, build options,
//! dependencies, and toolchain identity.
//!
//! # Layout
//!
//! ```text
//! <cache_root>/
//!   build_index.json      hash -> entry metadata
//!   cache_stats.json      hit/miss/build counters
//!   <build_hash>/...      stored artifact trees
//! ```
//!
//! # Coherence
//!
//! - Index and stats writes are atomic (temp file + rename), so readers
//!   in other processes never see a torn file.
//! - `get` self-heals: an index row whose directory vanished out-of-band
//!   becomes a miss and the stale row is dropped.
//! - `store` stages the copy and commits with one rename; a failed copy
//!   is never indexed.

pub mod evict;
pub mod hash;
pub mod index;
pub mod info;
pub mod stats;
pub mod store;

pub use evict::{EvictionManager, EvictionSummary};
pub use hash::{compute_build_hash, hash_file, is_valid_hash};
pub use index::CacheIndex;
pub use info::{
    format_bytes, gb_to_bytes, BuildInfo, BuildOptions, BuildType, CacheEntry, CacheStats,
    OptionValue, Toolchain,
};
pub use stats::StatsTracker;
pub use store::CacheStore;

pub(crate) use store::short;

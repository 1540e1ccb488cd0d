//! Cache eviction
//!
//! Reclaims entries by age and enforces the configured size ceiling.
//! Removal is all-or-nothing per entry: the artifact directory goes
//! first, and only then the index row, so a failed removal never leaves
//! the index pointing at nothing.

use crate::cache::store::{short, CacheStore};
use crate::error::KilnResult;
use chrono::{Duration, Utc};
use tracing::{info, warn};

/// Outcome of an eviction pass
#[derive(Debug, Clone, Copy, Default)]
pub struct EvictionSummary {
    /// Entries removed (directory and index row)
    pub removed: usize,
    /// Entries whose removal failed; their index rows were retained
    pub failed: usize,
    /// Bytes reclaimed
    pub bytes_freed: u64,
}

/// Age- and size-based reclamation over a [`CacheStore`]
pub struct EvictionManager {
    /// Size ceiling in bytes; 0 disables size-based eviction
    max_size_bytes: u64,
}

impl EvictionManager {
    pub fn new(max_size_bytes: u64) -> Self {
        Self { max_size_bytes }
    }

    /// Remove entries older than the window, or everything when `None`
    ///
    /// Only `created_at` is consulted; recently accessed but old entries
    /// are still removed. Failures are tallied, not fatal.
    pub fn clear(
        &self,
        store: &mut CacheStore,
        older_than: Option<Duration>,
    ) -> KilnResult<EvictionSummary> {
        let cutoff = older_than.map(|window| Utc::now() - window);

        let candidates: Vec<String> = store
            .index()
            .iter()
            .filter(|(_, entry)| match cutoff {
                Some(cutoff) => entry.created_at < cutoff,
                None => true,
            })
            .map(|(hash, _)| hash.clone())
            .collect();

        let summary = self.remove_all(store, &candidates);
        store.save_index()?;

        info!(
            "Eviction pass removed {} entr(ies), freed {} bytes, {} failure(s)",
            summary.removed, summary.bytes_freed, summary.failed
        );
        Ok(summary)
    }

    /// Evict least-recently-accessed entries until total size fits the
    /// ceiling. No-op when no ceiling is configured or usage is under it.
    pub fn enforce_max_size(&self, store: &mut CacheStore) -> KilnResult<EvictionSummary> {
        if self.max_size_bytes == 0 {
            return Ok(EvictionSummary::default());
        }

        let mut total = store.total_size();
        if total <= self.max_size_bytes {
            return Ok(EvictionSummary::default());
        }

        // Oldest access first
        let mut candidates: Vec<(String, u64, chrono::DateTime<Utc>)> = store
            .index()
            .iter()
            .map(|(hash, entry)| (hash.clone(), entry.size_bytes, entry.last_accessed))
            .collect();
        candidates.sort_by(|a, b| a.2.cmp(&b.2));

        let mut summary = EvictionSummary::default();
        for (hash, size, _) in candidates {
            if total <= self.max_size_bytes {
                break;
            }
            match store.evict_entry(&hash) {
                Ok(freed) => {
                    summary.removed += 1;
                    summary.bytes_freed += freed;
                    total = total.saturating_sub(size);
                }
                Err(e) => {
                    warn!("Failed to evict {}: {}", short(&hash), e);
                    summary.failed += 1;
                }
            }
        }

        store.save_index()?;
        Ok(summary)
    }

    fn remove_all(&self, store: &mut CacheStore, hashes: &[String]) -> EvictionSummary {
        let mut summary = EvictionSummary::default();
        for hash in hashes {
            match store.evict_entry(hash) {
                Ok(freed) => {
                    summary.removed += 1;
                    summary.bytes_freed += freed;
                }
                Err(e) => {
                    warn!("Failed to evict {}: {}", short(hash), e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

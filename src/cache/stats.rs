//! Hit/miss accounting persisted alongside the index

use crate::cache::index::write_atomic;
use crate::cache::info::CacheStats;
use crate::error::{KilnError, KilnResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stats file name inside the cache root
pub const STATS_FILE: &str = "cache_stats.json";

/// Tracks lookup and build-attempt counters, persisting on every change
pub struct StatsTracker {
    path: PathBuf,
    stats: CacheStats,
}

impl StatsTracker {
    /// Load counters from `cache_root`, starting at zero if absent
    pub fn open(cache_root: &Path) -> KilnResult<Self> {
        let path = cache_root.join(STATS_FILE);

        let stats = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| KilnError::io(format!("reading stats {}", path.display()), e))?;
            serde_json::from_str(&content).map_err(|e| KilnError::IndexCorrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?
        } else {
            debug!("No stats at {}, starting at zero", path.display());
            CacheStats::default()
        };

        Ok(Self { path, stats })
    }

    /// Record a cache hit and persist
    pub fn record_hit(&mut self) -> KilnResult<()> {
        self.stats.cache_hits += 1;
        self.save()
    }

    /// Record a cache miss and persist
    pub fn record_miss(&mut self) -> KilnResult<()> {
        self.stats.cache_misses += 1;
        self.save()
    }

    /// Record a build attempt and persist
    pub fn record_build_attempt(&mut self) -> KilnResult<()> {
        self.stats.total_builds += 1;
        self.save()
    }

    /// Current counter values
    pub fn snapshot(&self) -> CacheStats {
        self.stats
    }

    /// Reset all counters to zero and persist
    pub fn reset(&mut self) -> KilnResult<()> {
        self.stats = CacheStats::default();
        self.save()
    }

    fn save(&self) -> KilnResult<()> {
        let content = serde_json::to_vec_pretty(&self.stats)?;
        write_atomic(&self.path, &content)
    }
}

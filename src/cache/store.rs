//! On-disk content-addressable artifact store
//!
//! Artifact trees live at `<cache_root>/<build_hash>/`, with metadata in
//! the index and lookup counters in the stats file. Stores are staged
//! into a hidden sibling directory and committed with a single rename,
//! so a half-copied tree is never indexed.

use crate::cache::hash::is_valid_hash;
use crate::cache::index::CacheIndex;
use crate::cache::info::{BuildInfo, CacheEntry, CacheStats};
use crate::cache::stats::StatsTracker;
use crate::error::{KilnError, KilnResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Content-addressable store for build artifact trees
pub struct CacheStore {
    root: PathBuf,
    index: CacheIndex,
    stats: StatsTracker,
}

impl CacheStore {
    /// Open (or initialize) a cache at `root`
    pub fn open(root: impl Into<PathBuf>) -> KilnResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| KilnError::CacheDirCreate {
            path: root.clone(),
            source: e,
        })?;

        let index = CacheIndex::open(&root)?;
        let stats = StatsTracker::open(&root)?;

        Ok(Self { root, index, stats })
    }

    /// The cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory an entry's artifacts live in
    pub fn entry_path(&self, hash: &str) -> PathBuf {
        self.root.join(hash)
    }

    /// Look up a build hash, returning the artifact directory on a hit
    ///
    /// A hit bumps the entry's last-accessed timestamp. An index row whose
    /// directory vanished out-of-band is dropped and the lookup reported
    /// as a miss; the caller falls through to a real build.
    pub fn get(&mut self, hash: &str) -> KilnResult<Option<PathBuf>> {
        if !self.index.contains(hash) {
            debug!("Cache miss for {}", short(hash));
            self.stats.record_miss()?;
            return Ok(None);
        }

        let path = self.entry_path(hash);
        if !path.is_dir() {
            warn!(
                "Index entry {} points at missing directory, healing",
                short(hash)
            );
            self.index.remove(hash);
            self.index.save()?;
            self.stats.record_miss()?;
            return Ok(None);
        }

        self.index.touch(hash);
        self.index.save()?;
        self.stats.record_hit()?;
        debug!("Cache hit for {}", short(hash));
        Ok(Some(path))
    }

    /// Check whether a lookup would hit, without touching counters or
    /// access times
    pub fn peek(&self, hash: &str) -> bool {
        self.index.contains(hash) && self.entry_path(hash).is_dir()
    }

    /// Copy an artifact tree into the cache under `hash`
    ///
    /// The tree is copied (the caller keeps its own), staged next to the
    /// final location, and committed with one rename. Returns `Ok(false)`
    /// without mutating the index when the source directory is missing or
    /// the copy fails partway. Storing an existing hash replaces the
    /// previous content; the index keeps exactly one row.
    pub fn store(
        &mut self,
        hash: &str,
        artifact_dir: &Path,
        build_info: BuildInfo,
    ) -> KilnResult<bool> {
        if !is_valid_hash(hash) {
            return Err(KilnError::InvalidHash(hash.to_string()));
        }

        if !artifact_dir.is_dir() {
            warn!(
                "Artifact directory {} does not exist, not caching",
                artifact_dir.display()
            );
            return Ok(false);
        }

        let staging = self.root.join(format!(".staging-{}", Uuid::new_v4()));
        if let Err(e) = copy_tree(artifact_dir, &staging) {
            warn!("Failed to copy artifact tree into cache: {}", e);
            let _ = fs::remove_dir_all(&staging);
            return Ok(false);
        }

        let size_bytes = match dir_size(&staging) {
            Ok(size) => size,
            Err(e) => {
                warn!("Failed to size staged artifacts: {}", e);
                let _ = fs::remove_dir_all(&staging);
                return Ok(false);
            }
        };

        let final_path = self.entry_path(hash);
        if final_path.exists() {
            // Idempotent re-store: last write wins
            if let Err(e) = fs::remove_dir_all(&final_path) {
                warn!("Failed to replace existing entry {}: {}", short(hash), e);
                let _ = fs::remove_dir_all(&staging);
                return Ok(false);
            }
        }

        if let Err(e) = fs::rename(&staging, &final_path) {
            warn!("Failed to commit staged artifacts: {}", e);
            let _ = fs::remove_dir_all(&staging);
            return Ok(false);
        }

        self.index
            .insert(hash.to_string(), CacheEntry::new(size_bytes, build_info));
        self.index.save()?;

        info!(
            "Stored {} ({} bytes) under {}",
            artifact_dir.display(),
            size_bytes,
            short(hash)
        );
        Ok(true)
    }

    /// All entries, sorted by last-accessed descending
    pub fn list(&self) -> Vec<(String, CacheEntry)> {
        let mut entries: Vec<(String, CacheEntry)> = self
            .index
            .iter()
            .map(|(hash, entry)| (hash.clone(), entry.clone()))
            .collect();
        entries.sort_by(|a, b| b.1.last_accessed.cmp(&a.1.last_accessed));
        entries
    }

    /// Look up an entry's metadata without counting it as a lookup
    pub fn entry(&self, hash: &str) -> Option<&CacheEntry> {
        self.index.get(hash)
    }

    /// Number of cached builds
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total bytes across stored artifact trees
    pub fn total_size(&self) -> u64 {
        self.index.total_size()
    }

    /// Record that a real build ran (hit or not)
    pub fn record_build_attempt(&mut self) -> KilnResult<()> {
        self.stats.record_build_attempt()
    }

    /// Current counter snapshot
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Remove one entry, directory first, then the index row
    ///
    /// Returns the bytes freed. A directory-removal failure keeps the
    /// index row so the entry is never orphaned on disk while invisible
    /// in the index. The caller saves the index when its pass is done.
    pub(crate) fn evict_entry(&mut self, hash: &str) -> KilnResult<u64> {
        let Some(entry) = self.index.get(hash) else {
            return Err(KilnError::EntryNotFound(hash.to_string()));
        };
        let size = entry.size_bytes;

        let path = self.entry_path(hash);
        if path.exists() {
            fs::remove_dir_all(&path)
                .map_err(|e| KilnError::io(format!("removing {}", path.display()), e))?;
        }

        self.index.remove(hash);
        debug!("Evicted {}", short(hash));
        Ok(size)
    }

    pub(crate) fn index(&self) -> &CacheIndex {
        &self.index
    }

    pub(crate) fn save_index(&self) -> KilnResult<()> {
        self.index.save()
    }
}

/// Abbreviate a hash for log lines
pub(crate) fn short(hash: &str) -> &str {
    &hash[..hash.len().min(12)]
}

/// Recursively copy a directory tree
fn copy_tree(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Total size in bytes of all files under a directory
pub fn dir_size(dir: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

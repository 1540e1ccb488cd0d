//! Persistent cache index
//!
//! Whole-file JSON store mapping build hash to [`CacheEntry`], living at
//! `<cache_root>/build_index.json`. Writes go through a temp file and an
//! atomic rename so concurrent readers never observe a partially written
//! index. A reader that loses a race against another process recovers
//! through the self-healing lookup in the store.

use crate::cache::info::CacheEntry;
use crate::error::{KilnError, KilnResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Index file name inside the cache root
pub const INDEX_FILE: &str = "build_index.json";

/// Write `content` to `path` atomically via a temp-file sibling + rename
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> KilnResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| KilnError::PathInvalid {
            path: path.to_path_buf(),
            reason: "no parent directory".to_string(),
        })?;

    let tmp = dir.join(format!(".tmp-{}", Uuid::new_v4()));
    fs::write(&tmp, content)
        .map_err(|e| KilnError::io(format!("writing {}", tmp.display()), e))?;

    fs::rename(&tmp, path).map_err(|e| {
        // Leave no temp litter behind on failure
        let _ = fs::remove_file(&tmp);
        KilnError::io(format!("renaming {} to {}", tmp.display(), path.display()), e)
    })
}

/// In-memory view of the persisted index
pub struct CacheIndex {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl CacheIndex {
    /// Load the index from `cache_root`, starting empty if absent
    pub fn open(cache_root: &Path) -> KilnResult<Self> {
        let path = cache_root.join(INDEX_FILE);

        let entries = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| KilnError::io(format!("reading index {}", path.display()), e))?;
            serde_json::from_str(&content).map_err(|e| KilnError::IndexCorrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?
        } else {
            debug!("No index at {}, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self { path, entries })
    }

    /// Persist the index atomically
    pub fn save(&self) -> KilnResult<()> {
        let content = serde_json::to_vec_pretty(&self.entries)?;
        write_atomic(&self.path, &content)
    }

    pub fn get(&self, hash: &str) -> Option<&CacheEntry> {
        self.entries.get(hash)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn insert(&mut self, hash: String, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries.insert(hash, entry)
    }

    pub fn remove(&mut self, hash: &str) -> Option<CacheEntry> {
        self.entries.remove(hash)
    }

    /// Bump an entry's last-accessed timestamp to now
    pub fn touch(&mut self, hash: &str) -> bool {
        match self.entries.get_mut(hash) {
            Some(entry) => {
                entry.last_accessed = chrono::Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of stored artifact tree sizes
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.size_bytes).sum()
    }
}

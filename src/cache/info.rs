//! Build metadata records persisted in the cache index

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Convert GB to bytes
pub fn gb_to_bytes(gb: u32) -> u64 {
    u64::from(gb) * 1024 * 1024 * 1024
}

/// Build type, a closed set matching common build-system conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildType {
    Debug,
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl BuildType {
    /// Parse from the common build-system spellings
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Debug" | "debug" => Some(Self::Debug),
            "Release" | "release" => Some(Self::Release),
            "RelWithDebInfo" => Some(Self::RelWithDebInfo),
            "MinSizeRel" => Some(Self::MinSizeRel),
            _ => None,
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "Debug",
            Self::Release => "Release",
            Self::RelWithDebInfo => "RelWithDebInfo",
            Self::MinSizeRel => "MinSizeRel",
        };
        write!(f, "{}", name)
    }
}

/// A build option value: a closed set so hash canonicalization is
/// unambiguous regardless of map iteration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

/// Build options keyed by name; BTreeMap keeps iteration sorted
pub type BuildOptions = BTreeMap<String, OptionValue>;

/// Toolchain identity that contributes to the build hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    /// Compiler name (e.g. "gcc")
    pub compiler: String,

    /// Compiler version string (e.g. "11.0")
    pub version: String,

    /// Target architecture (e.g. "x86_64")
    pub target_arch: String,

    /// Build type
    pub build_type: BuildType,
}

impl Toolchain {
    pub fn new(
        compiler: impl Into<String>,
        version: impl Into<String>,
        target_arch: impl Into<String>,
        build_type: BuildType,
    ) -> Self {
        Self {
            compiler: compiler.into(),
            version: version.into(),
            target_arch: target_arch.into(),
            build_type,
        }
    }
}

/// Immutable record describing one build attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Unique ID for this build attempt
    pub id: Uuid,

    /// Source files that went into the build, in declaration order
    pub source_files: Vec<PathBuf>,

    /// Build options
    pub build_options: BuildOptions,

    /// Dependency names, in declaration order
    pub dependencies: Vec<String>,

    /// Toolchain identity
    pub toolchain: Toolchain,

    /// When the build started
    pub started_at: DateTime<Utc>,

    /// Computed build hash (64 hex chars)
    pub build_hash: String,

    /// Where the build wrote its artifacts
    pub artifacts_path: PathBuf,

    /// Wall-clock build duration in seconds
    pub build_time_secs: f64,

    /// Whether the build succeeded
    pub success: bool,
}

impl BuildInfo {
    /// Create a record for a build that is about to run
    pub fn new(
        source_files: Vec<PathBuf>,
        build_options: BuildOptions,
        dependencies: Vec<String>,
        toolchain: Toolchain,
        build_hash: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_files,
            build_options,
            dependencies,
            toolchain,
            started_at: Utc::now(),
            build_hash,
            artifacts_path: PathBuf::new(),
            build_time_secs: 0.0,
            success: false,
        }
    }

    /// Finalize the record after the build completed
    pub fn completed(mut self, artifacts_path: PathBuf, build_time_secs: f64, success: bool) -> Self {
        self.artifacts_path = artifacts_path;
        self.build_time_secs = build_time_secs;
        self.success = success;
        self
    }
}

/// Index record for one cached artifact tree, keyed by build hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// When the entry was first stored
    pub created_at: DateTime<Utc>,

    /// Last successful retrieval (monotonically bumped by `get`)
    pub last_accessed: DateTime<Utc>,

    /// Total size of the stored artifact tree in bytes
    pub size_bytes: u64,

    /// Snapshot of the build that produced the artifacts
    pub build_info: BuildInfo,
}

impl CacheEntry {
    /// Create an entry for a freshly stored artifact tree
    pub fn new(size_bytes: u64, build_info: BuildInfo) -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_accessed: now,
            size_bytes,
            build_info,
        }
    }

    /// Check if this entry was created more than `days` days ago
    pub fn is_older_than_days(&self, days: u32) -> bool {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        self.created_at < cutoff
    }
}

/// Hit/miss/build counters, persisted alongside the index
///
/// `total_builds` counts build attempts; hits and misses count cache
/// lookups. The two are tracked independently.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_builds: u64,
}

impl CacheStats {
    /// Hit rate over recorded lookups; 0.0 when nothing was recorded
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / lookups as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_ranges() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn build_type_parse() {
        assert_eq!(BuildType::parse("Release"), Some(BuildType::Release));
        assert_eq!(BuildType::parse("debug"), Some(BuildType::Debug));
        assert_eq!(BuildType::parse("Bogus"), None);
    }

    #[test]
    fn build_type_display_roundtrip() {
        for bt in [
            BuildType::Debug,
            BuildType::Release,
            BuildType::RelWithDebInfo,
            BuildType::MinSizeRel,
        ] {
            assert_eq!(BuildType::parse(&bt.to_string()), Some(bt));
        }
    }

    #[test]
    fn option_value_display() {
        assert_eq!(OptionValue::Bool(true).to_string(), "true");
        assert_eq!(OptionValue::from("fast").to_string(), "fast");
    }

    #[test]
    fn hit_rate_zero_lookups() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn hit_rate_computed() {
        let stats = CacheStats {
            cache_hits: 3,
            cache_misses: 1,
            total_builds: 4,
        };
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn entry_age_check() {
        let info = BuildInfo::new(
            vec![],
            BuildOptions::new(),
            vec![],
            Toolchain::new("gcc", "11.0", "x86_64", BuildType::Debug),
            "0".repeat(64),
        );
        let mut entry = CacheEntry::new(100, info);
        assert!(!entry.is_older_than_days(1));

        entry.created_at = Utc::now() - chrono::Duration::days(10);
        assert!(entry.is_older_than_days(7));
        assert!(!entry.is_older_than_days(30));
    }

    #[test]
    fn build_info_completed() {
        let info = BuildInfo::new(
            vec![PathBuf::from("main.c")],
            BuildOptions::new(),
            vec!["openssl".to_string()],
            Toolchain::new("gcc", "11.0", "x86_64", BuildType::Release),
            "a".repeat(64),
        );
        let done = info.completed(PathBuf::from("/tmp/out"), 12.5, true);
        assert!(done.success);
        assert_eq!(done.build_time_secs, 12.5);
        assert_eq!(done.artifacts_path, PathBuf::from("/tmp/out"));
    }
}

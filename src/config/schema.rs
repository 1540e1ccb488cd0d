//! Configuration schema for Kiln
//!
//! Configuration is stored at `~/.config/kiln/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Artifact cache settings
    pub cache: CacheConfig,

    /// Build command optimization settings
    pub build: BuildConfig,

    /// Compiler cache (ccache/sccache) settings
    pub ccache: CompilerCacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Artifact cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable artifact caching (default: true)
    pub enabled: bool,

    /// Cache root directory (defaults to ~/.cache/kiln)
    pub root: Option<PathBuf>,

    /// Maximum total cache size in GB before eviction (0 = unlimited)
    pub max_size_gb: u32,

    /// Remove entries older than N days during clean (0 = disabled)
    pub max_age_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: None,
            max_size_gb: 10,
            max_age_days: 30,
        }
    }
}

/// Build command optimization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Parallel jobs for build commands (0 = detect from CPU count)
    pub jobs: u32,

    /// Append optimization flags keyed by build type
    pub optimize: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: 0,
            optimize: true,
        }
    }
}

/// Compiler cache (object-level) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerCacheConfig {
    /// Probe for ccache/sccache and report wrapper configuration
    pub enabled: bool,

    /// Compiler cache directory (defaults to ~/.cache/kiln/ccache)
    pub dir: Option<PathBuf>,

    /// Maximum compiler cache size (tool syntax, e.g. "5G")
    pub max_size: String,

    /// Enable cache compression where the tool supports it
    pub compression: bool,
}

impl Default for CompilerCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            max_size: "5G".to_string(),
            compression: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[cache]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.max_size_gb, 10);
        assert!(config.cache.enabled);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [cache]
            max_age_days = 7
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.max_age_days, 7);
        assert_eq!(config.cache.max_size_gb, 10); // default preserved
    }

    #[test]
    fn ccache_defaults() {
        let config = Config::default();
        assert!(config.ccache.enabled);
        assert_eq!(config.ccache.max_size, "5G");
        assert!(config.ccache.compression);
    }
}

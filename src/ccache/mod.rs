//! Object-level compiler cache integration (ccache/sccache)
//!
//! Probes for an external compiler cache tool and, when one is found,
//! returns a configuration record the caller applies to its own build
//! subprocess environment. Nothing here mutates process-wide state;
//! cross-build interference through shared environment variables is the
//! failure mode this design removes.

use crate::config::schema::CompilerCacheConfig;
use crate::config::{Config, ConfigManager};
use crate::error::{KilnError, KilnResult};
use async_trait::async_trait;
use semver::Version;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Bound on version/stats probe subprocesses
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A parsed statistics value from a tool's stats output
#[derive(Debug, Clone, PartialEq)]
pub enum StatsValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for StatsValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Configuration record for one detected compiler cache tool
///
/// The caller applies `env` to the build subprocess and prefixes
/// compiler invocations with `wrapper_prefix`.
#[derive(Debug, Clone)]
pub struct CompilerCacheSetup {
    /// Tool name ("ccache" or "sccache")
    pub tool: &'static str,
    /// Parsed tool version, when the probe output yielded one
    pub version: Option<Version>,
    /// Cache directory the tool should use
    pub cache_dir: PathBuf,
    /// Maximum cache size in the tool's own syntax (e.g. "5G")
    pub max_size: String,
    /// Whether compression was requested
    pub compression: bool,
    /// Compiler wrapper prefix (e.g. ["ccache"])
    pub wrapper_prefix: Vec<String>,
    /// Environment to apply to the build subprocess
    pub env: Vec<(String, String)>,
}

/// One external compiler cache tool
#[async_trait]
pub trait CompilerCacheTool: Send + Sync {
    /// Binary name, also used to invoke the tool
    fn name(&self) -> &'static str;

    /// Arguments for the tool's statistics subcommand
    fn stats_args(&self) -> &'static [&'static str];

    /// Environment variables configuring the tool for a build
    fn env(&self, cache_dir: &Path, max_size: &str, compression: bool) -> Vec<(String, String)>;

    /// Compiler wrapper prefix strings
    fn wrapper_prefix(&self) -> Vec<String> {
        vec![self.name().to_string()]
    }

    /// Probe availability via `<tool> --version` with a bounded timeout
    ///
    /// Timeout and spawn failure both mean "unavailable", never an error.
    async fn probe(&self) -> Option<Option<Version>> {
        let result = timeout(
            PROBE_TIMEOUT,
            Command::new(self.name())
                .arg("--version")
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                Some(parse_version(&stdout))
            }
            Ok(Ok(_)) | Ok(Err(_)) => {
                debug!("{} not available", self.name());
                None
            }
            Err(_) => {
                warn!(
                    "{} version probe timed out after {:?}, treating as unavailable",
                    self.name(),
                    PROBE_TIMEOUT
                );
                None
            }
        }
    }

    /// Run the tool's statistics subcommand and parse `key: value` lines
    async fn stats(&self) -> KilnResult<BTreeMap<String, StatsValue>> {
        let command_line = format!("{} {}", self.name(), self.stats_args().join(" "));

        let result = timeout(
            PROBE_TIMEOUT,
            Command::new(self.name())
                .args(self.stats_args())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| KilnError::CommandTimeout {
            command: command_line.clone(),
            seconds: PROBE_TIMEOUT.as_secs(),
        })?
        .map_err(|e| KilnError::command_failed(command_line.clone(), e))?;

        if !result.status.success() {
            return Err(KilnError::command_exec(
                command_line,
                String::from_utf8_lossy(&result.stderr),
            ));
        }

        Ok(parse_stats(&String::from_utf8_lossy(&result.stdout)))
    }
}

/// ccache (C/C++ object cache)
pub struct Ccache;

#[async_trait]
impl CompilerCacheTool for Ccache {
    fn name(&self) -> &'static str {
        "ccache"
    }

    fn stats_args(&self) -> &'static [&'static str] {
        &["-s"]
    }

    fn env(&self, cache_dir: &Path, max_size: &str, compression: bool) -> Vec<(String, String)> {
        let mut env = vec![
            ("CCACHE_DIR".to_string(), cache_dir.display().to_string()),
            ("CCACHE_MAXSIZE".to_string(), max_size.to_string()),
        ];
        if compression {
            env.push(("CCACHE_COMPRESS".to_string(), "1".to_string()));
            env.push(("CCACHE_COMPRESSLEVEL".to_string(), "6".to_string()));
        }
        env
    }
}

/// sccache (multi-language, Rust-aware object cache)
pub struct Sccache;

#[async_trait]
impl CompilerCacheTool for Sccache {
    fn name(&self) -> &'static str {
        "sccache"
    }

    fn stats_args(&self) -> &'static [&'static str] {
        &["--show-stats"]
    }

    fn env(&self, cache_dir: &Path, max_size: &str, _compression: bool) -> Vec<(String, String)> {
        vec![
            ("SCCACHE_DIR".to_string(), cache_dir.display().to_string()),
            ("SCCACHE_CACHE_SIZE".to_string(), max_size.to_string()),
            ("RUSTC_WRAPPER".to_string(), self.name().to_string()),
        ]
    }
}

/// Detection and configuration over the known compiler cache tools
pub struct CompilerCacheAdapter {
    settings: CompilerCacheConfig,
    cache_dir: PathBuf,
}

impl CompilerCacheAdapter {
    /// Create an adapter from application configuration
    pub fn new(config: &Config) -> Self {
        Self {
            settings: config.ccache.clone(),
            cache_dir: ConfigManager::compiler_cache_dir(config),
        }
    }

    /// Tools in detection priority order
    pub fn tools() -> Vec<Box<dyn CompilerCacheTool>> {
        vec![Box::new(Ccache), Box::new(Sccache)]
    }

    /// Probe for the first available tool and build its setup record
    ///
    /// Returns `None` when disabled in config or when no tool responds.
    pub async fn detect(&self) -> Option<CompilerCacheSetup> {
        if !self.settings.enabled {
            debug!("Compiler cache integration disabled in config");
            return None;
        }

        for tool in Self::tools() {
            if let Some(version) = tool.probe().await {
                debug!("Detected compiler cache tool: {}", tool.name());
                return Some(CompilerCacheSetup {
                    tool: tool.name(),
                    version,
                    cache_dir: self.cache_dir.clone(),
                    max_size: self.settings.max_size.clone(),
                    compression: self.settings.compression,
                    wrapper_prefix: tool.wrapper_prefix(),
                    env: tool.env(
                        &self.cache_dir,
                        &self.settings.max_size,
                        self.settings.compression,
                    ),
                });
            }
        }

        None
    }

    /// Statistics from the first available tool, if any
    pub async fn stats(
        &self,
    ) -> KilnResult<Option<(&'static str, BTreeMap<String, StatsValue>)>> {
        for tool in Self::tools() {
            if tool.probe().await.is_some() {
                let stats = tool.stats().await?;
                return Ok(Some((tool.name(), stats)));
            }
        }
        Ok(None)
    }
}

/// Find a semver-looking token in version probe output
fn parse_version(output: &str) -> Option<Version> {
    let first_line = output.lines().next()?;
    first_line
        .split_whitespace()
        .filter_map(|token| Version::parse(token.trim_start_matches('v')).ok())
        .next()
}

/// Parse `key: value` lines, tolerating numeric and string values
fn parse_stats(output: &str) -> BTreeMap<String, StatsValue> {
    let mut stats = BTreeMap::new();

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase().replace(' ', "_");
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }

        let parsed = if let Ok(n) = value.parse::<i64>() {
            StatsValue::Int(n)
        } else if let Ok(x) = value.parse::<f64>() {
            StatsValue::Float(x)
        } else {
            StatsValue::Text(value.to_string())
        };
        stats.insert(key, parsed);
    }

    stats
}

//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Kiln - Content-addressable build artifact cache
///
/// Caches build outputs keyed by a fingerprint of sources, options,
/// dependencies, and toolchain, so identical builds are never repeated.
#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "KILN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache root directory (overrides config)
    #[arg(long, global = true, env = "KILN_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Skip local .kiln.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List cached builds
    List(ListArgs),

    /// Show cache statistics
    Stats(StatsArgs),

    /// Remove old entries and enforce the size ceiling
    Clean(CleanArgs),

    /// Show details for one cached build
    Info(InfoArgs),

    /// Compute the build hash for a set of inputs
    Hash(HashArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only show entries whose hash starts with this prefix
    #[arg(short, long)]
    pub build: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the stats command
#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Also show compiler cache (ccache/sccache) statistics
    #[arg(long)]
    pub ccache: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clean command
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Remove entries older than N days (default: from config)
    #[arg(long, conflicts_with = "all")]
    pub days: Option<u32>,

    /// Remove every entry regardless of age
    #[arg(long)]
    pub all: bool,

    /// Show what would be removed without removing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the info command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Build hash (or unique prefix) to inspect
    pub hash: String,
}

/// Arguments for the hash command
#[derive(Parser, Debug)]
pub struct HashArgs {
    /// Source file (repeatable)
    #[arg(short, long = "source", required = true)]
    pub sources: Vec<PathBuf>,

    /// Build option as KEY=VALUE (repeatable)
    #[arg(short, long = "option", value_parser = parse_key_val)]
    pub options: Vec<(String, String)>,

    /// Dependency name (repeatable)
    #[arg(short, long = "dep")]
    pub deps: Vec<String>,

    /// Also extract dependencies from include/import directives
    #[arg(long)]
    pub scan_deps: bool,

    /// Compiler name
    #[arg(long, default_value = "cc")]
    pub compiler: String,

    /// Compiler version
    #[arg(long, default_value = "unknown")]
    pub compiler_version: String,

    /// Target architecture (defaults to the host architecture)
    #[arg(long)]
    pub arch: Option<String>,

    /// Build type (Debug, Release, RelWithDebInfo, MinSizeRel)
    #[arg(long, default_value = "Debug")]
    pub build_type: String,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cache.max_size_gb)
        key: String,
        /// Value to set
        value: String,
        /// Write to project-local .kiln.toml instead of global config
        #[arg(long)]
        local: bool,
    },
}

/// Output format for list/stats commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Parse a KEY=VALUE pair
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE format: no '=' found in '{s}'"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

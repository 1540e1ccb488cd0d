//! Build planning on top of the artifact cache
//!
//! Decides whether a build can be served from cache and augments build
//! commands with parallelism and build-type flags.

pub mod deps;

pub use deps::extract_dependencies;

use crate::cache::info::BuildType;
use crate::cache::store::CacheStore;
use crate::config::Config;
use std::thread;
use tracing::debug;

/// Optimization/debug flags appended per build type
const RELEASE_FLAGS: &[&str] = &["-O3", "-DNDEBUG"];
const DEBUG_FLAGS: &[&str] = &["-O0", "-g"];

/// Build command planner
pub struct BuildOptimizer {
    jobs: u32,
    optimize: bool,
    cache_enabled: bool,
}

impl BuildOptimizer {
    /// Create a planner from application configuration
    pub fn new(config: &Config) -> Self {
        Self {
            jobs: config.build.jobs,
            optimize: config.build.optimize,
            cache_enabled: config.cache.enabled,
        }
    }

    /// Decide whether a cached artifact should be used for this build
    ///
    /// Uses a non-counting peek so planning never skews hit/miss
    /// accounting; only a real `get` moves the counters.
    pub fn should_use_cache(&self, store: &CacheStore, hash: &str, force_rebuild: bool) -> bool {
        if !self.cache_enabled {
            debug!("Artifact caching disabled in config");
            return false;
        }
        if force_rebuild {
            debug!("Force rebuild requested, skipping cache");
            return false;
        }
        store.peek(hash)
    }

    /// Augment a build command with parallelism and build-type flags
    ///
    /// Appends `-j<N>` sized to available CPU concurrency (or the
    /// configured job count), then the flag set for the build type:
    /// Release gets speed + assertions-off, Debug gets no-optimization +
    /// symbols, other types pass through unchanged.
    pub fn optimize_command(&self, base_command: &[String], build_type: BuildType) -> Vec<String> {
        let mut command = base_command.to_vec();
        command.push(format!("-j{}", self.job_count()));

        if self.optimize {
            let flags: &[&str] = match build_type {
                BuildType::Release => RELEASE_FLAGS,
                BuildType::Debug => DEBUG_FLAGS,
                _ => &[],
            };
            command.extend(flags.iter().map(|f| f.to_string()));
        }

        command
    }

    /// Parallel job count: configured value, or detected CPU concurrency
    /// with a floor of 1
    pub fn job_count(&self) -> usize {
        if self.jobs > 0 {
            return self.jobs as usize;
        }
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::info::{BuildInfo, BuildOptions, Toolchain};
    use tempfile::TempDir;

    fn optimizer(jobs: u32) -> BuildOptimizer {
        let mut config = Config::default();
        config.build.jobs = jobs;
        config.build.optimize = true;
        BuildOptimizer::new(&config)
    }

    #[test]
    fn release_flags_appended() {
        let command = optimizer(4).optimize_command(
            &["make".to_string(), "all".to_string()],
            BuildType::Release,
        );

        assert_eq!(command[0], "make");
        assert_eq!(command[1], "all");
        assert!(command.contains(&"-j4".to_string()));
        assert!(command.contains(&"-O3".to_string()));
        assert!(command.contains(&"-DNDEBUG".to_string()));
    }

    #[test]
    fn debug_flags_appended() {
        let command = optimizer(2).optimize_command(&["make".to_string()], BuildType::Debug);

        assert!(command.contains(&"-j2".to_string()));
        assert!(command.contains(&"-O0".to_string()));
        assert!(command.contains(&"-g".to_string()));
    }

    #[test]
    fn other_build_types_pass_through() {
        let command =
            optimizer(1).optimize_command(&["make".to_string()], BuildType::RelWithDebInfo);

        assert_eq!(command, vec!["make".to_string(), "-j1".to_string()]);
    }

    #[test]
    fn optimize_disabled_skips_flags() {
        let mut config = Config::default();
        config.build.jobs = 1;
        config.build.optimize = false;
        let planner = BuildOptimizer::new(&config);
        let command = planner.optimize_command(&["make".to_string()], BuildType::Release);

        assert_eq!(command, vec!["make".to_string(), "-j1".to_string()]);
    }

    #[test]
    fn job_count_detects_when_unset() {
        assert!(optimizer(0).job_count() >= 1);
        assert_eq!(optimizer(8).job_count(), 8);
    }

    #[test]
    fn should_use_cache_respects_force_rebuild() {
        let temp = TempDir::new().unwrap();
        let artifacts = temp.path().join("artifacts");
        std::fs::create_dir_all(&artifacts).unwrap();
        std::fs::write(artifacts.join("out.o"), "obj").unwrap();

        let hash = "a".repeat(64);
        let mut store = CacheStore::open(temp.path().join("cache")).unwrap();
        let info = BuildInfo::new(
            vec![],
            BuildOptions::new(),
            vec![],
            Toolchain::new("gcc", "11.0", "x86_64", BuildType::Debug),
            hash.clone(),
        );
        assert!(store.store(&hash, &artifacts, info).unwrap());

        let planner = optimizer(1);
        assert!(planner.should_use_cache(&store, &hash, false));
        assert!(!planner.should_use_cache(&store, &hash, true));
        assert!(!planner.should_use_cache(&store, &"b".repeat(64), false));

        // Planning must not move the counters
        let stats = store.stats();
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 0);
    }

    #[test]
    fn should_use_cache_respects_disabled_cache() {
        let temp = TempDir::new().unwrap();
        let artifacts = temp.path().join("artifacts");
        std::fs::create_dir_all(&artifacts).unwrap();
        std::fs::write(artifacts.join("out.o"), "obj").unwrap();

        let hash = "c".repeat(64);
        let mut store = CacheStore::open(temp.path().join("cache")).unwrap();
        let info = BuildInfo::new(
            vec![],
            BuildOptions::new(),
            vec![],
            Toolchain::new("gcc", "11.0", "x86_64", BuildType::Debug),
            hash.clone(),
        );
        assert!(store.store(&hash, &artifacts, info).unwrap());

        let mut config = Config::default();
        config.cache.enabled = false;
        let planner = BuildOptimizer::new(&config);
        assert!(!planner.should_use_cache(&store, &hash, false));
    }
}

//! Integration tests for Kiln

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn kiln() -> Command {
        let mut cmd = cargo_bin_cmd!("kiln");
        cmd.env_remove("KILN_CONFIG").env_remove("KILN_CACHE_DIR");
        cmd
    }

    /// A kiln invocation isolated inside a temp directory
    fn kiln_in(temp: &TempDir) -> Command {
        let mut cmd = kiln();
        cmd.current_dir(temp.path())
            .arg("--no-local")
            .arg("--config")
            .arg(temp.path().join("config.toml"))
            .arg("--cache-dir")
            .arg(temp.path().join("cache"));
        cmd
    }

    #[test]
    fn help_displays() {
        kiln()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build artifact cache"));
    }

    #[test]
    fn version_displays() {
        kiln()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("kiln"));
    }

    #[test]
    fn config_path() {
        kiln()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        kiln_in(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"));
    }

    #[test]
    fn config_init_and_set() {
        let temp = TempDir::new().unwrap();

        kiln_in(&temp).args(["config", "init"]).assert().success();

        kiln_in(&temp)
            .args(["config", "set", "cache.max_size_gb", "20"])
            .assert()
            .success();

        kiln_in(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("max_size_gb = 20"));
    }

    #[test]
    fn config_set_local_writes_kiln_toml() {
        let temp = TempDir::new().unwrap();

        kiln_in(&temp)
            .args(["config", "set", "--local", "cache.max_age_days", "7"])
            .assert()
            .success();

        let local = std::fs::read_to_string(temp.path().join(".kiln.toml")).unwrap();
        assert!(local.contains("max_age_days = 7"));
    }

    #[test]
    fn list_empty() {
        let temp = TempDir::new().unwrap();
        kiln_in(&temp)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached builds"));
    }

    #[test]
    fn stats_empty_cache() {
        let temp = TempDir::new().unwrap();
        kiln_in(&temp)
            .args(["stats", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"entries\": 0"))
            .stdout(predicate::str::contains("\"hit_rate\": 0.0"));
    }

    #[test]
    fn clean_empty_cache() {
        let temp = TempDir::new().unwrap();
        kiln_in(&temp)
            .args(["clean", "--days", "7"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached builds older than"));
    }

    #[test]
    fn info_unknown_hash_fails() {
        let temp = TempDir::new().unwrap();
        kiln_in(&temp)
            .args(["info", "deadbeef"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn hash_is_deterministic() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("main.c"), "int main() { return 0; }").unwrap();

        let run = || {
            let output = kiln_in(&temp)
                .args([
                    "hash",
                    "--source",
                    "main.c",
                    "--compiler",
                    "gcc",
                    "--compiler-version",
                    "11.0",
                    "--arch",
                    "x86_64",
                    "--build-type",
                    "Release",
                ])
                .output()
                .unwrap();
            assert!(output.status.success());
            String::from_utf8(output.stdout).unwrap().trim().to_string()
        };

        let first = run();
        let second = run();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_changes_with_options() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("main.c"), "int main() { return 0; }").unwrap();

        let run = |opt: &str| {
            let output = kiln_in(&temp)
                .args(["hash", "--source", "main.c", "--option", opt])
                .output()
                .unwrap();
            assert!(output.status.success());
            String::from_utf8(output.stdout).unwrap().trim().to_string()
        };

        assert_ne!(run("lto=true"), run("lto=false"));
    }

    #[test]
    fn hash_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        kiln_in(&temp)
            .args(["hash", "--source", "nope.c"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Source file not found"));
    }

    #[test]
    fn hash_rejects_bad_build_type() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("main.c"), "x").unwrap();
        kiln_in(&temp)
            .args(["hash", "--source", "main.c", "--build-type", "Fastest"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown build type"));
    }
}

mod workflow_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use kiln::cache::{
        compute_build_hash, BuildInfo, BuildOptions, BuildType, CacheStore, EvictionManager,
        OptionValue, Toolchain,
    };
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn kiln_with_cache(cache_root: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("kiln");
        cmd.env_remove("KILN_CONFIG")
            .env_remove("KILN_CACHE_DIR")
            .arg("--no-local")
            .arg("--cache-dir")
            .arg(cache_root);
        cmd
    }

    fn toolchain() -> Toolchain {
        Toolchain::new("gcc", "11.0", "x86_64", BuildType::Release)
    }

    /// Hash real sources, store an artifact tree, retrieve it, evict it.
    #[test]
    fn full_cache_lifecycle() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("main.c");
        fs::write(&src, "int main() { return 0; }").unwrap();

        let mut options = BuildOptions::new();
        options.insert("lto".to_string(), OptionValue::Bool(true));
        let deps = vec!["openssl".to_string()];

        let hash = compute_build_hash(&[src.clone()], &options, &deps, &toolchain()).unwrap();

        // Simulate build output
        let artifacts = temp.path().join("out");
        fs::create_dir_all(&artifacts).unwrap();
        fs::write(artifacts.join("app"), "binary").unwrap();

        let cache_root = temp.path().join("cache");
        let mut store = CacheStore::open(&cache_root).unwrap();

        // First lookup misses, then the build is stored
        assert!(store.get(&hash).unwrap().is_none());
        store.record_build_attempt().unwrap();
        let info = BuildInfo::new(vec![src], options, deps, toolchain(), hash.clone())
            .completed(artifacts.clone(), 2.5, true);
        assert!(store.store(&hash, &artifacts, info).unwrap());

        // Second lookup hits
        let cached = store.get(&hash).unwrap().expect("expected cache hit");
        assert_eq!(fs::read(cached.join("app")).unwrap(), b"binary");

        let stats = store.stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.total_builds, 1);
        assert_eq!(stats.hit_rate(), 0.5);

        // Evict everything
        let manager = EvictionManager::new(0);
        let summary = manager.clear(&mut store, None).unwrap();
        assert_eq!(summary.removed, 1);
        assert!(store.is_empty());
        assert!(!cache_root.join(&hash).exists());

        // Counters survive eviction
        assert_eq!(store.stats().cache_hits, 1);
    }

    /// Seed a cache through the library, then inspect it through the CLI.
    #[test]
    fn cli_sees_library_written_cache() {
        let temp = TempDir::new().unwrap();
        let cache_root = temp.path().join("cache");

        let artifacts = temp.path().join("out");
        fs::create_dir_all(&artifacts).unwrap();
        fs::write(artifacts.join("lib.a"), "archive").unwrap();

        let hash = "a1b2c3".to_string() + &"0".repeat(58);
        {
            let mut store = CacheStore::open(&cache_root).unwrap();
            let info = BuildInfo::new(
                vec![],
                BuildOptions::new(),
                vec!["zlib".to_string()],
                toolchain(),
                hash.clone(),
            );
            assert!(store.store(&hash, &artifacts, info).unwrap());
        }

        kiln_with_cache(&cache_root)
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(&hash));

        kiln_with_cache(&cache_root)
            .args(["list", "--build", "a1b2", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(&hash));

        kiln_with_cache(&cache_root)
            .args(["list", "--build", "ffff"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached builds matching"));

        kiln_with_cache(&cache_root)
            .args(["info", "a1b2c3"])
            .assert()
            .success()
            .stdout(predicate::str::contains(&hash))
            .stdout(predicate::str::contains("zlib"));

        kiln_with_cache(&cache_root)
            .args(["stats", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"entries\": 1"));
    }

    /// Clean with --dry-run reports but removes nothing; --all --yes removes.
    #[test]
    fn cli_clean_dry_run_then_all() {
        let temp = TempDir::new().unwrap();
        let cache_root = temp.path().join("cache");

        let artifacts = temp.path().join("out");
        fs::create_dir_all(&artifacts).unwrap();
        fs::write(artifacts.join("app"), "binary").unwrap();

        let hash = "b".repeat(64);
        {
            let mut store = CacheStore::open(&cache_root).unwrap();
            let info = BuildInfo::new(
                vec![],
                BuildOptions::new(),
                vec![],
                toolchain(),
                hash.clone(),
            );
            assert!(store.store(&hash, &artifacts, info).unwrap());
        }

        kiln_with_cache(&cache_root)
            .args(["clean", "--all", "--dry-run"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Dry run"));
        assert!(cache_root.join(&hash).exists());

        kiln_with_cache(&cache_root)
            .args(["clean", "--all", "--yes"])
            .assert()
            .success();
        assert!(!cache_root.join(&hash).exists());

        kiln_with_cache(&cache_root)
            .args(["list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached builds"));
    }
}

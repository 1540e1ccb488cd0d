//! Build hash computation
//!
//! Derives a deterministic cache key from a build's semantic inputs:
//! source file contents, canonicalized build options, sorted dependency
//! names, and toolchain identity. Equal inputs always produce the same
//! 64-hex-character SHA-256 digest. Source paths are folded in exactly
//! as given; callers wanting keys that survive a checkout moving roots
//! pass project-relative paths.
//!
//! Unreadable source files fail the computation rather than degrading to
//! an empty contribution; substituting emptiness would make a missing
//! file hash identically to an empty one.

use crate::cache::info::{BuildOptions, Toolchain};
use crate::error::{KilnError, KilnResult};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Hash a single file's contents, streaming in chunks
pub fn hash_file(path: &Path) -> KilnResult<String> {
    let mut file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            KilnError::SourceNotFound(path.to_path_buf())
        } else {
            KilnError::SourceUnreadable {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(|e| KilnError::SourceUnreadable {
            path: path.to_path_buf(),
            source: e,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the build hash for a set of inputs
///
/// Combination order is fixed: path-sorted (path, content digest) pairs,
/// options as sorted `key=value` lines, lexicographically sorted
/// dependencies, then toolchain identity fields. Field groups are
/// domain-separated so adjacent inputs cannot alias each other.
///
/// Paths contribute verbatim: renaming a source changes the key, and
/// absolute paths tie the key to the checkout location.
pub fn compute_build_hash(
    sources: &[PathBuf],
    options: &BuildOptions,
    dependencies: &[String],
    toolchain: &Toolchain,
) -> KilnResult<String> {
    let mut entries: Vec<(String, String)> = Vec::with_capacity(sources.len());
    for path in sources {
        let digest = hash_file(path)?;
        entries.push((path.to_string_lossy().into_owned(), digest));
    }
    entries.sort();

    let mut hasher = Sha256::new();

    hasher.update(b"sources\0");
    for (path, digest) in &entries {
        hasher.update(path.as_bytes());
        hasher.update(b"\0");
        hasher.update(digest.as_bytes());
        hasher.update(b"\0");
    }

    // BTreeMap iteration is already key-sorted
    hasher.update(b"options\0");
    for (key, value) in options {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.to_string().as_bytes());
        hasher.update(b"\0");
    }

    let mut deps: Vec<&str> = dependencies.iter().map(String::as_str).collect();
    deps.sort_unstable();
    hasher.update(b"dependencies\0");
    for dep in deps {
        hasher.update(dep.as_bytes());
        hasher.update(b"\0");
    }

    hasher.update(b"toolchain\0");
    hasher.update(toolchain.compiler.as_bytes());
    hasher.update(b"\0");
    hasher.update(toolchain.version.as_bytes());
    hasher.update(b"\0");
    hasher.update(toolchain.target_arch.as_bytes());
    hasher.update(b"\0");
    hasher.update(toolchain.build_type.to_string().as_bytes());

    let digest = hex::encode(hasher.finalize());
    debug!("Computed build hash {} from {} source(s)", &digest[..12], sources.len());
    Ok(digest)
}

/// Check that a string looks like a build hash (64 lowercase hex chars)
pub fn is_valid_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::info::{BuildType, OptionValue};
    use tempfile::TempDir;

    fn toolchain() -> Toolchain {
        Toolchain::new("gcc", "11.0", "x86_64", BuildType::Debug)
    }

    fn options(debug: bool) -> BuildOptions {
        let mut opts = BuildOptions::new();
        opts.insert("debug".to_string(), OptionValue::Bool(debug));
        opts
    }

    #[test]
    fn hash_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.c");
        let b = dir.path().join("b.c");
        std::fs::write(&a, "X").unwrap();
        std::fs::write(&b, "Y").unwrap();

        let sources = vec![a, b];
        let deps = vec!["openssl".to_string()];

        let h1 = compute_build_hash(&sources, &options(true), &deps, &toolchain()).unwrap();
        let h2 = compute_build_hash(&sources, &options(true), &deps, &toolchain()).unwrap();

        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert!(is_valid_hash(&h1));
    }

    #[test]
    fn hash_changes_with_option_value() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.c");
        std::fs::write(&a, "X").unwrap();

        let sources = vec![a];
        let deps = vec!["openssl".to_string()];

        let h1 = compute_build_hash(&sources, &options(true), &deps, &toolchain()).unwrap();
        let h2 = compute_build_hash(&sources, &options(false), &deps, &toolchain()).unwrap();

        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_changes_with_source_content() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.c");

        std::fs::write(&a, "int main() { return 0; }").unwrap();
        let h1 = compute_build_hash(&[a.clone()], &options(true), &[], &toolchain()).unwrap();

        std::fs::write(&a, "int main() { return 1; }").unwrap();
        let h2 = compute_build_hash(&[a], &options(true), &[], &toolchain()).unwrap();

        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_changes_with_source_path() {
        // Paths contribute verbatim, so the same bytes under a renamed
        // file produce a different key
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.c");
        let b = dir.path().join("b.c");
        std::fs::write(&a, "X").unwrap();
        std::fs::write(&b, "X").unwrap();

        let h1 = compute_build_hash(&[a], &options(true), &[], &toolchain()).unwrap();
        let h2 = compute_build_hash(&[b], &options(true), &[], &toolchain()).unwrap();

        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_changes_with_dependencies() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.c");
        std::fs::write(&a, "X").unwrap();

        let h1 = compute_build_hash(
            &[a.clone()],
            &options(true),
            &["openssl".to_string()],
            &toolchain(),
        )
        .unwrap();
        let h2 = compute_build_hash(
            &[a],
            &options(true),
            &["openssl".to_string(), "zlib".to_string()],
            &toolchain(),
        )
        .unwrap();

        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_ignores_source_declaration_order() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.c");
        let b = dir.path().join("b.c");
        std::fs::write(&a, "X").unwrap();
        std::fs::write(&b, "Y").unwrap();

        let h1 =
            compute_build_hash(&[a.clone(), b.clone()], &options(true), &[], &toolchain()).unwrap();
        let h2 = compute_build_hash(&[b, a], &options(true), &[], &toolchain()).unwrap();

        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_ignores_dependency_order() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.c");
        std::fs::write(&a, "X").unwrap();

        let d1 = vec!["zlib".to_string(), "openssl".to_string()];
        let d2 = vec!["openssl".to_string(), "zlib".to_string()];

        let h1 = compute_build_hash(&[a.clone()], &options(true), &d1, &toolchain()).unwrap();
        let h2 = compute_build_hash(&[a], &options(true), &d2, &toolchain()).unwrap();

        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_changes_with_toolchain() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.c");
        std::fs::write(&a, "X").unwrap();

        let clang = Toolchain::new("clang", "11.0", "x86_64", BuildType::Debug);

        let h1 = compute_build_hash(&[a.clone()], &options(true), &[], &toolchain()).unwrap();
        let h2 = compute_build_hash(&[a], &options(true), &[], &clang).unwrap();

        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_fails_on_missing_source() {
        // Divergence from legacy behavior, which substituted an empty
        // contribution and logged a warning. A missing file must not hash
        // identically to an empty one.
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.c");

        let result = compute_build_hash(&[missing.clone()], &options(true), &[], &toolchain());
        assert!(matches!(result, Err(KilnError::SourceNotFound(p)) if p == missing));
    }

    #[test]
    fn empty_file_hashes_successfully() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.c");
        std::fs::write(&empty, "").unwrap();

        let h = compute_build_hash(&[empty], &options(true), &[], &toolchain()).unwrap();
        assert_eq!(h.len(), 64);
    }

    #[test]
    fn is_valid_hash_checks() {
        assert!(is_valid_hash(&"a".repeat(64)));
        assert!(!is_valid_hash("abc"));
        assert!(!is_valid_hash(&"g".repeat(64)));
    }
}

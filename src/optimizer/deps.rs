//! Dependency extraction from source files
//!
//! Scans include/import directives and collects the referenced module or
//! header base names. Used both to enrich the build hash and to report
//! what a build logically depends on.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Extract dependency names from a set of source files
///
/// Both system-style (`#include <openssl/ssl.h>`) and quoted local
/// includes (`#include "util.h"`) are recognized, along with bare
/// `import` lines. Nested paths contribute their first component
/// (`openssl/ssl.h` -> `openssl`); flat headers their stem (`stdio.h`
/// -> `stdio`). Unreadable files are skipped with a warning; extraction
/// enriches a build description but never blocks one.
pub fn extract_dependencies(sources: &[PathBuf]) -> BTreeSet<String> {
    let mut deps = BTreeSet::new();

    for path in sources {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping unreadable source {}: {}", path.display(), e);
                continue;
            }
        };

        for line in content.lines() {
            if let Some(name) = parse_directive(line) {
                deps.insert(name);
            }
        }
    }

    deps
}

/// Parse one line as an include/import directive, returning the base name
fn parse_directive(line: &str) -> Option<String> {
    let trimmed = line.trim();

    let rest = if let Some(rest) = trimmed.strip_prefix('#') {
        rest.trim_start().strip_prefix("include")?
    } else if let Some(rest) = trimmed.strip_prefix("import") {
        rest
    } else {
        return None;
    };
    let rest = rest.trim_start();

    let target = if let Some(rest) = rest.strip_prefix('<') {
        rest.split('>').next()?
    } else if let Some(rest) = rest.strip_prefix('"') {
        rest.split('"').next()?
    } else {
        return None;
    };

    base_name(target)
}

/// Reduce an include target to a dependency name
fn base_name(target: &str) -> Option<String> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }

    if let Some((first, _)) = target.split_once('/') {
        if first.is_empty() {
            return None;
        }
        return Some(first.to_string());
    }

    Path::new(target)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

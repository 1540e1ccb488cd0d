//! Info command - show details for one cached build

use crate::cache::{format_bytes, CacheStore};
use crate::cli::args::InfoArgs;
use crate::config::{Config, ConfigManager};
use crate::error::{KilnError, KilnResult};
use crate::ui::{self, UiContext};

/// Execute the info command
pub async fn execute(args: InfoArgs, config: &Config) -> KilnResult<()> {
    let ctx = UiContext::detect();
    let store = CacheStore::open(ConfigManager::cache_root(config))?;

    let hash = resolve_prefix(&store, &args.hash)?;
    let entry = store
        .entry(&hash)
        .ok_or_else(|| KilnError::EntryNotFound(args.hash.clone()))?;
    let info = &entry.build_info;

    ui::section(&ctx, &format!("Build {}", &hash[..12]));
    ui::key_value(&ctx, "Hash", &hash);
    ui::key_value(&ctx, "Build ID", &info.id.to_string());
    ui::key_value_status(
        &ctx,
        "Result",
        if info.success { "success" } else { "failed" },
        info.success,
    );
    ui::key_value(
        &ctx,
        "Toolchain",
        &format!(
            "{} {} ({}, {})",
            info.toolchain.compiler,
            info.toolchain.version,
            info.toolchain.target_arch,
            info.toolchain.build_type
        ),
    );
    ui::key_value(
        &ctx,
        "Build time",
        &format!("{:.1}s", info.build_time_secs),
    );

    ui::key_value(&ctx, "Created", &entry.created_at.to_rfc3339());
    ui::key_value(&ctx, "Last used", &entry.last_accessed.to_rfc3339());
    ui::key_value(&ctx, "Size", &format_bytes(entry.size_bytes));
    ui::key_value(
        &ctx,
        "Artifacts",
        &store.entry_path(&hash).display().to_string(),
    );

    if !info.source_files.is_empty() {
        ui::section(&ctx, &format!("Sources ({})", info.source_files.len()));
        for source in &info.source_files {
            ui::remark(&ctx, &source.display().to_string());
        }
    }

    if !info.dependencies.is_empty() {
        ui::key_value(&ctx, "Dependencies", &info.dependencies.join(", "));
    }

    if !info.build_options.is_empty() {
        ui::section(&ctx, "Options");
        for (key, value) in &info.build_options {
            ui::key_value(&ctx, key, &value.to_string());
        }
    }

    Ok(())
}

/// Resolve a hash prefix to exactly one cached build
fn resolve_prefix(store: &CacheStore, prefix: &str) -> KilnResult<String> {
    let matches: Vec<String> = store
        .list()
        .into_iter()
        .map(|(hash, _)| hash)
        .filter(|hash| hash.starts_with(prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(KilnError::EntryNotFound(prefix.to_string())),
        [only] => Ok(only.clone()),
        many => Err(KilnError::User(format!(
            "Hash prefix '{}' is ambiguous ({} matches); use more characters",
            prefix,
            many.len()
        ))),
    }
}

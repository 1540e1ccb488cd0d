//! Clean command - remove old entries and enforce the size ceiling

use crate::cache::{
    format_bytes, gb_to_bytes, short, CacheStore, EvictionManager, EvictionSummary,
};
use crate::cli::args::CleanArgs;
use crate::config::{Config, ConfigManager};
use crate::error::KilnResult;
use crate::ui::{self, EntryProgress, UiContext};
use chrono::Utc;
use console::style;
use tracing::debug;

/// Execute the clean command
pub async fn execute(args: CleanArgs, config: &Config) -> KilnResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    ui::intro(&ctx, "kiln clean");

    let mut store = CacheStore::open(ConfigManager::cache_root(config))?;

    let days = if args.all {
        None
    } else {
        let days = args.days.unwrap_or(config.cache.max_age_days);
        if days == 0 {
            println!("Age-based cleaning is disabled (max_age_days = 0).");
            return enforce_ceiling(&ctx, &mut store, config);
        }
        Some(days)
    };

    let candidates: Vec<(String, u64)> = store
        .list()
        .into_iter()
        .filter(|(_, entry)| match days {
            Some(days) => entry.is_older_than_days(days),
            None => true,
        })
        .map(|(hash, entry)| (hash, entry.size_bytes))
        .collect();

    if candidates.is_empty() {
        match days {
            Some(days) => println!("No cached builds older than {} days.", days),
            None => println!("Cache is already empty."),
        }
        return enforce_ceiling(&ctx, &mut store, config);
    }

    let reclaim: u64 = candidates.iter().map(|(_, size)| size).sum();
    match days {
        Some(days) => println!(
            "Found {} build(s) older than {} days ({}):",
            candidates.len(),
            days,
            format_bytes(reclaim)
        ),
        None => println!(
            "This will remove all {} cached build(s) ({}):",
            candidates.len(),
            format_bytes(reclaim)
        ),
    }

    for (hash, _) in &candidates {
        let age_days = store
            .entry(hash)
            .map(|e| (Utc::now() - e.created_at).num_days())
            .unwrap_or(0);
        println!(
            "  {} {} ({} days old)",
            style("•").red(),
            short(hash),
            age_days
        );
    }

    if args.dry_run {
        println!();
        println!("Dry run - nothing removed.");
        return Ok(());
    }

    println!();
    if !ui::confirm(&ctx, "Remove these builds?", false).await? {
        println!("Aborted.");
        return Ok(());
    }

    let mut summary = EvictionSummary::default();
    let progress = EntryProgress::new(&ctx, "Removing", candidates.len() as u64);
    for (hash, _) in &candidates {
        progress.tick(short(hash));
        match store.evict_entry(hash) {
            Ok(freed) => {
                summary.removed += 1;
                summary.bytes_freed += freed;
            }
            Err(e) => {
                debug!("Failed to remove {}: {}", short(hash), e);
                summary.failed += 1;
            }
        }
    }
    progress.finish();
    store.save_index()?;

    report(&ctx, &summary);
    enforce_ceiling(&ctx, &mut store, config)?;

    if summary.failed > 0 {
        ui::outro_warn(&ctx, "Cache clean finished with failures");
    } else {
        ui::outro_success(&ctx, "Cache clean complete");
    }
    Ok(())
}

/// Evict least-recently-used entries until the cache fits its size limit
fn enforce_ceiling(ctx: &UiContext, store: &mut CacheStore, config: &Config) -> KilnResult<()> {
    let manager = EvictionManager::new(gb_to_bytes(config.cache.max_size_gb));
    let summary = manager.enforce_max_size(store)?;

    if summary.removed > 0 || summary.failed > 0 {
        ui::step_info(
            ctx,
            &format!("Cache exceeded its {} GB ceiling", config.cache.max_size_gb),
        );
        report(ctx, &summary);
    }

    Ok(())
}

fn report(ctx: &UiContext, summary: &EvictionSummary) {
    if summary.failed > 0 {
        ui::step_warn(
            ctx,
            &format!(
                "Removed {} build(s), freed {}, {} failure(s)",
                summary.removed,
                format_bytes(summary.bytes_freed),
                summary.failed
            ),
        );
    } else if summary.removed > 0 {
        ui::step_ok(
            ctx,
            &format!(
                "Removed {} build(s), freed {}",
                summary.removed,
                format_bytes(summary.bytes_freed)
            ),
        );
    }
}

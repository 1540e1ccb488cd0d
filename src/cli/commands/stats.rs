//! Stats command - show cache statistics

use crate::cache::{format_bytes, CacheStore};
use crate::ccache::CompilerCacheAdapter;
use crate::cli::args::{OutputFormat, StatsArgs};
use crate::config::{Config, ConfigManager};
use crate::error::KilnResult;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the stats command
pub async fn execute(args: StatsArgs, config: &Config) -> KilnResult<()> {
    let store = CacheStore::open(ConfigManager::cache_root(config))?;
    let stats = store.stats();

    match args.format {
        OutputFormat::Json => {
            #[derive(serde::Serialize)]
            struct StatsJson {
                entries: usize,
                total_size_bytes: u64,
                cache_hits: u64,
                cache_misses: u64,
                total_builds: u64,
                hit_rate: f64,
            }

            println!(
                "{}",
                serde_json::to_string_pretty(&StatsJson {
                    entries: store.len(),
                    total_size_bytes: store.total_size(),
                    cache_hits: stats.cache_hits,
                    cache_misses: stats.cache_misses,
                    total_builds: stats.total_builds,
                    hit_rate: stats.hit_rate(),
                })?
            );
        }
        OutputFormat::Table | OutputFormat::Plain => {
            let ctx = UiContext::detect();
            ui::section(&ctx, "Artifact cache");
            ui::key_value(&ctx, "Location", &store.root().display().to_string());
            ui::key_value(&ctx, "Entries", &store.len().to_string());
            ui::key_value(&ctx, "Total size", &format_bytes(store.total_size()));
            ui::key_value(&ctx, "Cache hits", &stats.cache_hits.to_string());
            ui::key_value(&ctx, "Cache misses", &stats.cache_misses.to_string());
            ui::key_value(&ctx, "Builds recorded", &stats.total_builds.to_string());
            ui::key_value(
                &ctx,
                "Hit rate",
                &format!("{:.1}%", stats.hit_rate() * 100.0),
            );
            ui::key_value(
                &ctx,
                "Size limit",
                &match config.cache.max_size_gb {
                    0 => "unlimited".to_string(),
                    gb => format!("{} GB", gb),
                },
            );
            ui::key_value(
                &ctx,
                "Age limit",
                &match config.cache.max_age_days {
                    0 => "disabled".to_string(),
                    days => format!("{} days", days),
                },
            );
        }
    }

    if args.ccache {
        show_compiler_cache_stats(config).await?;
    }

    Ok(())
}

/// Show stats from an external compiler cache tool, if one is available
async fn show_compiler_cache_stats(config: &Config) -> KilnResult<()> {
    let ctx = UiContext::detect();
    let adapter = CompilerCacheAdapter::new(config);

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Probing compiler cache tools...");
    let result = adapter.stats().await;
    match &result {
        Ok(Some((tool, _))) => spinner.stop(&format!("Found {}", tool)),
        Ok(None) => spinner.stop("No compiler cache tool found"),
        Err(_) => spinner.stop_error("Compiler cache probe failed"),
    }

    match result? {
        Some((tool, stats)) => {
            ui::section(&ctx, &format!("Compiler cache ({})", tool));
            if let Some(setup) = adapter.detect().await {
                if let Some(version) = &setup.version {
                    ui::key_value(&ctx, "version", &version.to_string());
                }
                ui::key_value(&ctx, "cache_dir", &setup.cache_dir.display().to_string());
                ui::key_value(&ctx, "max_size", &setup.max_size);
                ui::key_value(&ctx, "wrapper", &setup.wrapper_prefix.join(" "));
            }
            for (key, value) in &stats {
                ui::key_value(&ctx, key, &value.to_string());
            }
        }
        None => {
            ui::step_warn_hint(
                &ctx,
                "No compiler cache tool found",
                "Install ccache or sccache",
            );
        }
    }

    Ok(())
}

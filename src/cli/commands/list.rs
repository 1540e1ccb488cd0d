//! List command - show cached builds

use crate::cache::{format_bytes, CacheEntry, CacheStore};
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::KilnResult;

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> KilnResult<()> {
    let store = CacheStore::open(ConfigManager::cache_root(config))?;

    let entries: Vec<(String, CacheEntry)> = store
        .list()
        .into_iter()
        .filter(|(hash, _)| match args.build {
            Some(ref prefix) => hash.starts_with(prefix),
            None => true,
        })
        .collect();

    if entries.is_empty() {
        match args.build {
            Some(prefix) => println!("No cached builds matching '{}'.", prefix),
            None => println!("No cached builds."),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

fn print_table(entries: &[(String, CacheEntry)]) {
    println!(
        "{:<14} {:<16} {:<10} {:<17} {:<17}",
        "HASH", "TYPE", "SIZE", "CREATED", "LAST USED"
    );
    println!("{}", "-".repeat(76));

    for (hash, entry) in entries {
        println!(
            "{:<14} {:<16} {:<10} {:<17} {:<17}",
            &hash[..12],
            entry.build_info.toolchain.build_type.to_string(),
            format_bytes(entry.size_bytes),
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.last_accessed.format("%Y-%m-%d %H:%M"),
        );
    }

    println!();
    println!("Total: {} build(s)", entries.len());
}

fn print_json(entries: &[(String, CacheEntry)]) -> KilnResult<()> {
    #[derive(serde::Serialize)]
    struct EntryJson<'a> {
        hash: &'a str,
        build_type: String,
        compiler: &'a str,
        size_bytes: u64,
        created_at: String,
        last_accessed: String,
    }

    let json_entries: Vec<EntryJson> = entries
        .iter()
        .map(|(hash, entry)| EntryJson {
            hash,
            build_type: entry.build_info.toolchain.build_type.to_string(),
            compiler: &entry.build_info.toolchain.compiler,
            size_bytes: entry.size_bytes,
            created_at: entry.created_at.to_rfc3339(),
            last_accessed: entry.last_accessed.to_rfc3339(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json_entries)?);
    Ok(())
}

fn print_plain(entries: &[(String, CacheEntry)]) {
    for (hash, _) in entries {
        println!("{}", hash);
    }
}

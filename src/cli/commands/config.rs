//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, LOCAL_CONFIG_NAME};
use crate::error::{KilnError, KilnResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;
use tokio::fs;

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> KilnResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config),
        Some(ConfigAction::Path) => show_path(manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value, local }) => {
            if local {
                set_local_value(&key, &value).await?
            } else {
                set_value(manager, config, &key, &value).await?
            }
        }
    }

    Ok(())
}

fn show_config(config: &Config) {
    let toml =
        toml::to_string_pretty(config).unwrap_or_else(|_| "Error serializing config".to_string());
    println!("{}", toml);
}

fn show_path(manager: &ConfigManager) {
    println!("{}", manager.path().display());
}

async fn init_config(manager: &ConfigManager, force: bool) -> KilnResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok(
        &ctx,
        &format!("Configuration initialized at {}", path.display()),
    );

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> KilnResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        ["general", "verbose"] => config.general.verbose = parse_bool(value)?,
        ["general", "log_format"] => config.general.log_format = value.to_string(),

        ["cache", "enabled"] => config.cache.enabled = parse_bool(value)?,
        ["cache", "root"] => config.cache.root = Some(PathBuf::from(value)),
        ["cache", "max_size_gb"] => config.cache.max_size_gb = parse_u32(value)?,
        ["cache", "max_age_days"] => config.cache.max_age_days = parse_u32(value)?,

        ["build", "jobs"] => config.build.jobs = parse_u32(value)?,
        ["build", "optimize"] => config.build.optimize = parse_bool(value)?,

        ["ccache", "enabled"] => config.ccache.enabled = parse_bool(value)?,
        ["ccache", "dir"] => config.ccache.dir = Some(PathBuf::from(value)),
        ["ccache", "max_size"] => config.ccache.max_size = value.to_string(),
        ["ccache", "compression"] => config.ccache.compression = parse_bool(value)?,

        _ => {
            ui::step_error(&ctx, &format!("Unknown config key: {}", key));
            ui::remark(&ctx, "Valid keys:");
            print_valid_keys();
            return Ok(());
        }
    }

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

async fn set_local_value(key: &str, value: &str) -> KilnResult<()> {
    let ctx = UiContext::detect();

    let cwd = std::env::current_dir().map_err(|e| KilnError::io("getting current directory", e))?;
    let local_path = cwd.join(LOCAL_CONFIG_NAME);

    // Validate the key before touching the file
    validate_config_key(key)?;

    // Load existing local config or start with an empty TOML table
    let mut doc: toml::Value = if local_path.exists() {
        let content = fs::read_to_string(&local_path)
            .await
            .map_err(|e| KilnError::io(format!("reading {}", local_path.display()), e))?;
        content
            .parse()
            .map_err(|e: toml::de::Error| KilnError::ConfigInvalid {
                path: local_path.clone(),
                reason: e.to_string(),
            })?
    } else {
        toml::Value::Table(toml::map::Map::new())
    };

    set_toml_value(&mut doc, key, value)?;

    // Write back only the keys the user has explicitly set
    let content = toml::to_string_pretty(&doc)?;
    fs::write(&local_path, content)
        .await
        .map_err(|e| KilnError::io(format!("writing {}", local_path.display()), e))?;

    ui::step_ok(
        &ctx,
        &format!("Set {} = {} in {}", key, value, local_path.display()),
    );

    Ok(())
}

/// Validate that a config key is one we recognise.
fn validate_config_key(key: &str) -> KilnResult<()> {
    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        ["general", "verbose" | "log_format"]
        | ["cache", "enabled" | "root" | "max_size_gb" | "max_age_days"]
        | ["build", "jobs" | "optimize"]
        | ["ccache", "enabled" | "dir" | "max_size" | "compression"] => Ok(()),
        _ => Err(KilnError::User(format!("Unknown config key: {}", key))),
    }
}

/// Set a dot-separated key in a TOML value tree, creating intermediate tables as needed.
fn set_toml_value(doc: &mut toml::Value, key: &str, value: &str) -> KilnResult<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let mut current = doc;

    for &part in &parts[..parts.len() - 1] {
        current = current
            .as_table_mut()
            .ok_or_else(|| KilnError::User(format!("Expected table at key: {}", part)))?
            .entry(part)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    let leaf = parts.last().unwrap();
    let table = current
        .as_table_mut()
        .ok_or_else(|| KilnError::User(format!("Expected table for key: {}", key)))?;

    let toml_value = if value == "true" || value == "false" {
        toml::Value::Boolean(value.parse().unwrap())
    } else if let Ok(n) = value.parse::<i64>() {
        toml::Value::Integer(n)
    } else {
        toml::Value::String(value.to_string())
    };

    table.insert((*leaf).to_string(), toml_value);
    Ok(())
}

fn parse_bool(value: &str) -> KilnResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(KilnError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_u32(value: &str) -> KilnResult<u32> {
    value
        .parse()
        .map_err(|_| KilnError::User(format!("Invalid number: {}", value)))
}

fn print_valid_keys() {
    let keys = [
        "general.verbose",
        "general.log_format",
        "cache.enabled",
        "cache.root",
        "cache.max_size_gb",
        "cache.max_age_days",
        "build.jobs",
        "build.optimize",
        "ccache.enabled",
        "ccache.dir",
        "ccache.max_size",
        "ccache.compression",
    ];

    for key in keys {
        eprintln!("  {}", key);
    }
}

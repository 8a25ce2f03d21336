//! Configuration paths and the `config` command
//!
//! All paths are under ~/.golden_image/ unless GOLDEN_HOME says otherwise.

use crate::cli::error::HelpfulError;
use crate::cli::output::print_table;
use anyhow::{Context, Result};
use golden_core::CompareConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Get the config file path: ~/.golden_image/config.toml
pub fn default_config_path() -> Result<PathBuf> {
    Ok(golden_logging::golden_home()?.join("config.toml"))
}

/// Get the default label store: ~/.golden_image/labels.json
pub fn default_label_store_path() -> Result<PathBuf> {
    Ok(golden_logging::golden_home()?.join("labels.json"))
}

/// Where configuration was read from
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Explicit(PathBuf),
    Home(PathBuf),
    Defaults,
}

/// Load the effective configuration.
///
/// Priority:
/// 1. `--config <FILE>` (must exist)
/// 2. ~/.golden_image/config.toml when present
/// 3. Built-in defaults
pub fn load_config(explicit: Option<&Path>) -> Result<(CompareConfig, ConfigSource)> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(HelpfulError::config_not_found(path).into());
        }
        let config = read_config(path)?;
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    let home_config = default_config_path()?;
    if home_config.exists() {
        let config = read_config(&home_config)?;
        return Ok((config, ConfigSource::Home(home_config)));
    }

    debug!("No config file found; using defaults");
    Ok((CompareConfig::default(), ConfigSource::Defaults))
}

fn read_config(path: &Path) -> Result<CompareConfig> {
    CompareConfig::load(path)
        .map_err(|e| HelpfulError::invalid_config(path, &e.to_string()).into())
}

/// Label store path: flag, then config, then the home default
pub fn resolve_label_store(config: &CompareConfig, flag: Option<&Path>) -> Result<PathBuf> {
    match flag.or(config.label_store_path.as_deref()) {
        Some(path) => Ok(path.to_path_buf()),
        None => default_label_store_path(),
    }
}

/// Arguments for the config command
#[derive(Debug)]
pub struct ConfigArgs {
    pub config: Option<PathBuf>,
    /// Write a default config file instead of showing settings
    pub init: bool,
    /// Overwrite an existing file with `init`
    pub force: bool,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ConfigReport {
    home: PathBuf,
    config_source: ConfigSource,
    logs_dir: PathBuf,
    label_store: PathBuf,
    settings: CompareConfig,
}

/// Execute the config command
pub fn run(args: ConfigArgs) -> Result<()> {
    if args.init {
        let path = match &args.config {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        write_default_config(&path, args.force)?;
        if args.json {
            println!("{}", serde_json::json!({ "written": path }));
        } else {
            println!("Wrote default config to {}", path.display());
        }
        return Ok(());
    }

    let (config, source) = load_config(args.config.as_deref())?;
    let report = ConfigReport {
        home: golden_logging::golden_home()?,
        config_source: source,
        logs_dir: golden_logging::logs_dir()?,
        label_store: resolve_label_store(&config, None)?,
        settings: config,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let source = match &report.config_source {
        ConfigSource::Explicit(path) => format!("{} (--config)", path.display()),
        ConfigSource::Home(path) => path.display().to_string(),
        ConfigSource::Defaults => "built-in defaults".to_string(),
    };
    let settings = &report.settings;
    let labels = &settings.labels;

    print_table(
        &["Setting", "Value"],
        vec![
            row("Home", report.home.display()),
            row("Config", source),
            row("Logs", report.logs_dir.display()),
            row("Label store", report.label_store.display()),
            row("Workers", settings.workers),
            row("Progress interval", format!("{} ms", settings.progress_interval_ms)),
            row("Digest algorithm", settings.digest_algorithm),
            row("Follow symlinks", settings.follow_symlinks),
            row("Include hidden", settings.include_hidden),
            row("Unchanged label", &labels.unchanged.name),
            row("Changed label", &labels.changed.name),
            row("Missing label", format!("{}<dirty tree>", labels.missing_prefix)),
        ],
    );
    Ok(())
}

/// Write the built-in defaults as TOML. An existing file is kept unless
/// `force` is set.
fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(HelpfulError::new(format!(
            "Config file already exists: {}",
            path.display()
        ))
        .with_suggestions([
            "TRY: golden config --init --force to overwrite it".to_string(),
            "TRY: golden config to show the current settings".to_string(),
        ])
        .into());
    }
    CompareConfig::default()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn row(name: &str, value: impl std::fmt::Display) -> Vec<String> {
    vec![name.to_string(), value.to_string()]
}

//! Configuration command handlers
//!
//! Handles the `configure` subcommand for setting up dnt CLI defaults.

use crate::config::Config;
use anyhow::Result;
use std::path::PathBuf;

/// Handle the configure command
pub fn handle(
    catalog: Option<PathBuf>,
    output: Option<PathBuf>,
    resolve_columns: Vec<String>,
    show: bool,
) -> Result<()> {
    let mut config = Config::load()?;

    if show {
        show_config(&config);
        return Ok(());
    }

    if apply(&mut config, catalog, output, resolve_columns) {
        config.save()?;
        println!("Configuration updated");
        if let Ok(path) = Config::config_path() {
            println!("Config saved to: {}", path.display());
        }
    } else {
        show_usage();
    }

    Ok(())
}

/// Apply the given settings; returns whether anything changed
fn apply(
    config: &mut Config,
    catalog: Option<PathBuf>,
    output: Option<PathBuf>,
    resolve_columns: Vec<String>,
) -> bool {
    let mut changed = false;

    if let Some(path) = catalog {
        config.catalog = Some(path);
        changed = true;
    }
    if let Some(path) = output {
        config.output = Some(path);
        changed = true;
    }
    if !resolve_columns.is_empty() {
        config.resolve_columns = Some(resolve_columns);
        changed = true;
    }

    changed
}

/// Display current configuration
fn show_config(config: &Config) {
    match &config.catalog {
        Some(path) => println!("Catalog: {}", path.display()),
        None => println!("No catalog configured"),
    }
    match &config.output {
        Some(path) => println!("Output: {}", path.display()),
        None => println!("Output: output (default)"),
    }
    match &config.resolve_columns {
        Some(columns) => println!("Resolve columns: {}", columns.join(", ")),
        None => println!(
            "Resolve columns: {} (default)",
            dnt::DEFAULT_RESOLVE_COLUMNS.join(", ")
        ),
    }

    if let Ok(path) = Config::config_path() {
        println!("Config file: {}", path.display());
    }
}

/// Show usage help for the configure command
fn show_usage() {
    println!("Usage: dnt configure --catalog PATH");
    println!("   or: dnt configure --output DIR");
    println!("   or: dnt configure --resolve-column _NameID [--resolve-column ...]");
    println!("   or: dnt configure --show");
}

//! Sync command implementation.

use anyhow::{Context, Result};
use modbound_core::{CheckerBuilder, SyncMode, CONFIG_FILE};
use std::path::Path;

/// Runs the sync command.
pub fn run(path: &Path, prune: bool, dry_run: bool) -> Result<()> {
    let checker = CheckerBuilder::new(path)
        .build()
        .with_context(|| format!("failed to load project at {}", path.display()))?;

    let mode = if prune {
        SyncMode::Prune
    } else {
        SyncMode::Additive
    };
    let synced = checker.sync(mode).context("sync failed")?;
    let text = synced
        .to_toml_string()
        .context("failed to serialize synced config")?;

    if dry_run {
        print!("{text}");
        return Ok(());
    }

    let config_path = path.join(CONFIG_FILE);
    std::fs::write(&config_path, text)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    println!("Updated {}", config_path.display());
    Ok(())
}

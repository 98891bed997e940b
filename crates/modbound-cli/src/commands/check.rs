//! Check command implementation.

use anyhow::{Context, Result};
use modbound_core::{CheckOptions, CheckerBuilder};
use std::path::{Path, PathBuf};

use crate::OutputFormat;

/// Runs the check command.
pub fn run(path: &Path, format: OutputFormat, no_cache: bool, changed: Vec<PathBuf>) -> Result<()> {
    let checker = CheckerBuilder::new(path)
        .build()
        .with_context(|| format!("failed to load project at {}", path.display()))?;

    let options = CheckOptions {
        changed_files: if changed.is_empty() {
            None
        } else {
            Some(changed)
        },
        no_cache,
    };

    tracing::info!(
        "Checking {} ({} declared modules)",
        path.display(),
        checker.config().modules.len()
    );

    let result = checker.check(&options).context("check failed")?;

    super::output::print(&result, format)?;

    if !result.is_ok() {
        std::process::exit(1);
    }

    Ok(())
}

//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# modbound configuration
# Declare your modules and the dependencies each one is allowed to have,
# then run `modbound check`.

# Directories containing checked source files
source-roots = ["src"]

# Glob patterns to exclude from checking
exclude = [
    "**/target/**",
    "**/generated/**",
]

# Report dependency cycles between modules
forbid-circular-dependencies = true

# [external]
# allow = ["serde", "tracing"]
# exclude = []

# [[modules]]
# path = "app"
# depends-on = ["domain"]

# [[modules]]
# path = "domain"
# strict = true
# interface = ["Entity", "service::*"]
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    let config_path = Path::new("modbound.toml");

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(config_path, DEFAULT_CONFIG)?;

    println!("Created modbound.toml");
    println!("\nNext steps:");
    println!("  1. Declare your modules in modbound.toml (or run: modbound sync)");
    println!("  2. Run: modbound check");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_config_is_valid() {
        let config = modbound_core::ProjectConfig::parse(DEFAULT_CONFIG).unwrap();
        assert!(config.forbid_circular_dependencies);
        assert!(config.modules.is_empty());
    }
}

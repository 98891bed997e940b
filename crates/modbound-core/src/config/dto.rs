//! TOML (de)serialization types for `modbound.toml`.
//!
//! These types exist solely for serde. They are converted to the validated
//! domain model via [`super::loader`], and back again when sync rewrites
//! the configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw TOML representation of the project configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfigDto {
    /// Source root directories.
    #[serde(rename = "source-roots", default, skip_serializing_if = "Vec::is_empty")]
    pub source_roots: Vec<PathBuf>,

    /// Exclude glob patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Exact path matching toggle.
    #[serde(default)]
    pub exact: bool,

    /// Regex module matching toggle.
    #[serde(rename = "use-regex-matching", default)]
    pub use_regex_matching: bool,

    /// Ignore `#[cfg(test)]`-guarded imports (default: true).
    #[serde(rename = "ignore-test-imports", default = "default_true")]
    pub ignore_test_imports: bool,

    /// Forbid circular dependencies toggle.
    #[serde(rename = "forbid-circular-dependencies", default)]
    pub forbid_circular_dependencies: bool,

    /// Cache fingerprint file patterns.
    #[serde(
        rename = "cache-dependencies",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub cache_dependencies: Vec<String>,

    /// External package policy.
    #[serde(default)]
    pub external: ExternalDto,

    /// Module declarations.
    #[serde(default)]
    pub modules: Vec<ModuleDto>,
}

/// TOML representation of the `[external]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalDto {
    /// Allowed external packages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,

    /// Excluded external packages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// TOML representation of one `[[modules]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDto {
    /// Module path (e.g. `"app::util"`).
    pub path: String,

    /// Allowed dependencies: plain path strings or `{ path = "..." }`.
    #[serde(rename = "depends-on", default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<DependencyDto>,

    /// Strict public-interface enforcement.
    #[serde(default)]
    pub strict: bool,

    /// Public interface symbol patterns (used when `strict`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interface: Vec<String>,

    /// Per-module external exclude override.
    #[serde(
        rename = "external-exclude",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub external_exclude: Option<Vec<String>>,
}

/// One `depends-on` entry: either `"path"` or `{ path = "path" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyDto {
    /// Bare path string.
    Path(String),
    /// Table form, kept for forward-compatible per-dependency options.
    Detailed {
        /// The dependency path.
        path: String,
    },
}

impl DependencyDto {
    /// Returns the dependency path regardless of form.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Path(p) | Self::Detailed { path: p } => p,
        }
    }
}

fn default_true() -> bool {
    true
}

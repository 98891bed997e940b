//! Project and module configuration model.
//!
//! The domain model here is produced from the TOML DTO layer ([`dto`])
//! through the validating loader ([`loader`]). Load-time validation covers
//! everything that must be a hard configuration error: duplicate module
//! paths, `depends_on` entries naming undeclared modules, invalid glob and
//! regex patterns.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::module_path::{ModulePath, ModulePathError};

pub mod dto;
pub mod loader;

/// Project-wide settings plus the declared module set.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectConfig {
    /// Ordered directories (relative to the project root) that contain
    /// checked source files.
    pub source_roots: Vec<PathBuf>,
    /// Glob patterns for files excluded from checking.
    pub exclude: Vec<String>,
    /// Exact path matching: a module owns only paths equal to its own,
    /// never descendants.
    pub exact: bool,
    /// Treat declared module paths as anchored regexes when resolving.
    pub use_regex_matching: bool,
    /// Drop import facts guarded by `#[cfg(test)]` before any rule runs.
    pub ignore_test_imports: bool,
    /// Report dependency cycles among declared modules.
    pub forbid_circular_dependencies: bool,
    /// Glob patterns for files whose contents feed the cache fingerprint.
    pub cache_dependencies: Vec<String>,
    /// External (third-party) package policy.
    pub external: ExternalConfig,
    /// Declared modules, in declaration order.
    pub modules: Vec<ModuleConfig>,
}

impl ProjectConfig {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let dto: dto::ProjectConfigDto = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        loader::load(dto)
    }

    /// Serializes the configuration back to TOML (used by sync).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(&loader::to_dto(self)).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Looks up a declared module by path.
    #[must_use]
    pub fn module(&self, path: &ModulePath) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| &m.path == path)
    }

    /// Iterates over all declared module paths.
    pub fn module_paths(&self) -> impl Iterator<Item = &ModulePath> {
        self.modules.iter().map(|m| &m.path)
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            source_roots: vec![PathBuf::from("src")],
            exclude: vec!["**/target/**".to_string()],
            exact: false,
            use_regex_matching: false,
            ignore_test_imports: true,
            forbid_circular_dependencies: false,
            cache_dependencies: vec!["**/*.rs".to_string()],
            external: ExternalConfig::default(),
            modules: Vec::new(),
        }
    }
}

/// Third-party package policy.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExternalConfig {
    /// Packages modules may import freely.
    pub allow: Vec<String>,
    /// Packages exempt from checking entirely.
    pub exclude: Vec<String>,
}

/// One declared module and its boundary contract.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleConfig {
    /// Unique hierarchical path of this module.
    pub path: ModulePath,
    /// Modules this one is allowed to import from. Directional and
    /// non-transitive.
    pub depends_on: Vec<Dependency>,
    /// Restrict inbound imports to the declared public interface.
    pub strict: bool,
    /// Symbol patterns forming the public interface of a strict module.
    pub interface: Vec<String>,
    /// Per-module override of the project external exclude set.
    pub external_exclude: Option<Vec<String>>,
}

impl ModuleConfig {
    /// Creates a module declaration with no dependencies.
    #[must_use]
    pub fn new(path: ModulePath) -> Self {
        Self {
            path,
            depends_on: Vec::new(),
            strict: false,
            interface: Vec::new(),
            external_exclude: None,
        }
    }

    /// Tests whether a dependency on `target` is declared.
    #[must_use]
    pub fn declares_dependency_on(&self, target: &ModulePath) -> bool {
        self.depends_on.iter().any(|d| &d.path == target)
    }

    /// Tests whether `symbol` is part of the declared public interface.
    #[must_use]
    pub fn interface_contains(&self, symbol: &str) -> bool {
        self.interface
            .iter()
            .any(|pattern| crate::module_path::symbol_matches(symbol, pattern))
    }
}

/// One allowed-dependency entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    /// Path of the module that may be imported.
    pub path: ModulePath,
}

impl Dependency {
    /// Creates a dependency entry.
    #[must_use]
    pub fn new(path: ModulePath) -> Self {
        Self { path }
    }
}

/// Configuration errors. All of these abort a run before any parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the config file.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// TOML (de)serialization error.
    #[error("failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A field failed module-path validation.
    #[error("{context}: {source}")]
    Validation {
        /// Where the error occurred (e.g. `modules[2].path`).
        context: String,
        /// The underlying path error.
        source: ModulePathError,
    },

    /// Two module declarations share the same path.
    #[error("duplicate module path `{path}`")]
    DuplicateModule {
        /// The duplicated path.
        path: ModulePath,
    },

    /// A `depends_on` entry references a module that is not declared.
    #[error("module `{module}` depends on `{dependency}` which is not declared")]
    UnknownDependency {
        /// The declaring module.
        module: ModulePath,
        /// The missing dependency path.
        dependency: ModulePath,
    },

    /// An exclude or cache-dependency glob is invalid.
    #[error("invalid glob pattern `{pattern}`: {reason}")]
    InvalidGlob {
        /// The offending pattern.
        pattern: String,
        /// Why it is invalid.
        reason: String,
    },

    /// A declared module path does not compile as a regex.
    #[error("invalid module regex `{pattern}`: {reason}")]
    InvalidRegex {
        /// The offending pattern.
        pattern: String,
        /// Why it is invalid.
        reason: String,
    },

    /// Two declared module patterns matched the same import path.
    #[error("module path `{candidate}` is matched by multiple declarations: {patterns:?}")]
    AmbiguousMatch {
        /// The import path that matched more than once.
        candidate: String,
        /// The declarations that matched it.
        patterns: Vec<String>,
    },
}

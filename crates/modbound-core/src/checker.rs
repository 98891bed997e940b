//! The check pipeline driver.
//!
//! Wires discovery, caching, parallel parsing, graph assembly and the rule
//! passes together behind a small API: build a [`Checker`] with
//! [`CheckerBuilder`], then call [`Checker::check`] or [`Checker::sync`].

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cache::{
    compute_fingerprint, digest_hex, CacheEntry, CacheStore, FileSnapshot, JsonFileStore,
    NullStore, CACHE_SCHEMA,
};
use crate::check;
use crate::config::{ConfigError, ProjectConfig};
use crate::graph::{GraphBuilder, ModuleGraph};
use crate::parser::{ImportParser, SynParser};
use crate::resolve::ModuleResolver;
use crate::sync::{reconcile, SyncMode};
use crate::types::{CheckResult, ParseDiagnostic, Violation};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "modbound.toml";

/// Per-run options for [`Checker::check`].
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Project-relative paths known to have changed. Files not listed here
    /// may have their parsed facts reused when their content digest is
    /// unchanged.
    pub changed_files: Option<Vec<PathBuf>>,
    /// Skip both cache lookup and cache storage for this run.
    pub no_cache: bool,
}

/// Errors aborting a check or sync run.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// Filesystem access failed.
    #[error("io error on {path}: {source}")]
    Io {
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },

    /// The configuration is invalid (including resolve-time regex
    /// ambiguity).
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configures and constructs a [`Checker`].
pub struct CheckerBuilder {
    root: PathBuf,
    config: Option<ProjectConfig>,
    parser: Option<Box<dyn ImportParser>>,
    cache: Option<Box<dyn CacheStore>>,
}

impl CheckerBuilder {
    /// Starts a builder for the project at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: None,
            parser: None,
            cache: None,
        }
    }

    /// Supplies an already-loaded configuration instead of reading
    /// `modbound.toml` from the project root.
    #[must_use]
    pub fn config(mut self, config: ProjectConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replaces the default [`SynParser`].
    #[must_use]
    pub fn parser(mut self, parser: impl ImportParser + 'static) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Replaces the default [`JsonFileStore`].
    #[must_use]
    pub fn cache_store(mut self, store: impl CacheStore + 'static) -> Self {
        self.cache = Some(Box::new(store));
        self
    }

    /// Disables caching entirely.
    #[must_use]
    pub fn without_cache(self) -> Self {
        self.cache_store(NullStore)
    }

    /// Finalizes the checker.
    ///
    /// # Errors
    ///
    /// Returns an error when no configuration was supplied and
    /// `modbound.toml` cannot be loaded.
    pub fn build(self) -> Result<Checker, CheckError> {
        let config = match self.config {
            Some(config) => config,
            None => ProjectConfig::from_file(&self.root.join(CONFIG_FILE))?,
        };
        // Configs loaded from TOML were validated already, but one handed
        // in through `config()` may carry anything.
        let excludes = config
            .exclude
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| ConfigError::InvalidGlob {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Checker {
            cache: self
                .cache
                .unwrap_or_else(|| Box::new(JsonFileStore::new(&self.root))),
            parser: self.parser.unwrap_or_else(|| Box::new(SynParser::new())),
            root: self.root,
            config,
            excludes,
        })
    }
}

/// Runs boundary checks and sync over one project.
pub struct Checker {
    root: PathBuf,
    config: ProjectConfig,
    parser: Box<dyn ImportParser>,
    cache: Box<dyn CacheStore>,
    excludes: Vec<glob::Pattern>,
}

impl Checker {
    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Runs all boundary checks.
    ///
    /// Serves the cached result when the project fingerprint is unchanged;
    /// otherwise parses (in parallel, reusing unchanged files' facts from
    /// the previous entry), rebuilds the graph, runs every rule pass and
    /// stores the new entry.
    ///
    /// # Errors
    ///
    /// Returns an error on filesystem failures or invalid configuration.
    pub fn check(&self, options: &CheckOptions) -> Result<CheckResult, CheckError> {
        let fingerprint =
            compute_fingerprint(&self.root, &self.config).map_err(|e| CheckError::Io {
                path: self.root.clone(),
                source: e,
            })?;

        let previous = if options.no_cache {
            None
        } else {
            self.cache.load()
        };
        if let Some(entry) = &previous {
            if entry.fingerprint == fingerprint {
                info!(fingerprint = %fingerprint.as_str(), "cache hit, skipping analysis");
                return Ok(CheckResult {
                    violations: entry.violations.clone(),
                    diagnostics: entry.diagnostics(),
                    files_checked: entry.files.len(),
                    from_cache: true,
                });
            }
            debug!("cache fingerprint mismatch, rebuilding");
        }

        let snapshots = self.parse_all(previous.as_ref(), options.changed_files.as_deref())?;
        let graph = self.build_graph(&snapshots)?;

        let mut violations = check::boundary_violations(&self.config, &graph);
        violations.extend(check::cycle_violations(&self.config, &graph));
        violations.extend(check::external_violations(&self.config, &graph));
        violations.extend(check::unresolved_violations(&graph));
        violations.sort_by(Violation::stable_cmp);

        let diagnostics: Vec<ParseDiagnostic> = snapshots
            .iter()
            .filter_map(|(file, snapshot)| {
                snapshot.error.as_ref().map(|message| ParseDiagnostic {
                    file: file.clone(),
                    message: message.clone(),
                })
            })
            .collect();

        let files_checked = snapshots.len();
        let entry = CacheEntry {
            schema: CACHE_SCHEMA,
            fingerprint,
            violations: violations.clone(),
            files: snapshots,
        };
        if !options.no_cache {
            if let Err(e) = self.cache.store(&entry) {
                warn!(error = %e, "failed to store cache entry");
            }
        }

        info!(
            files = files_checked,
            violations = violations.len(),
            "check complete"
        );
        Ok(CheckResult {
            violations,
            diagnostics,
            files_checked,
            from_cache: false,
        })
    }

    /// Builds the graph and reconciles `depends_on` declarations with it.
    ///
    /// The returned configuration is in-memory only; persisting it is the
    /// caller's job.
    ///
    /// # Errors
    ///
    /// Returns an error on filesystem failures or invalid configuration.
    pub fn sync(&self, mode: SyncMode) -> Result<ProjectConfig, CheckError> {
        let snapshots = self.parse_all(None, None)?;
        let graph = self.build_graph(&snapshots)?;
        Ok(reconcile(&self.config, &graph, mode))
    }

    /// Drops any stored cache entry.
    ///
    /// # Errors
    ///
    /// Returns an error when removal fails.
    pub fn invalidate_cache(&self) -> Result<(), CheckError> {
        self.cache.invalidate().map_err(|e| CheckError::Io {
            path: self.root.clone(),
            source: e,
        })
    }

    fn parse_all(
        &self,
        previous: Option<&CacheEntry>,
        changed_files: Option<&[PathBuf]>,
    ) -> Result<BTreeMap<PathBuf, FileSnapshot>, CheckError> {
        let files = self.discover_files()?;
        let changed: Option<BTreeSet<&Path>> =
            changed_files.map(|list| list.iter().map(PathBuf::as_path).collect());

        files
            .par_iter()
            .map(|rel| {
                let abs = self.root.join(rel);
                let bytes = std::fs::read(&abs).map_err(|e| CheckError::Io {
                    path: abs.clone(),
                    source: e,
                })?;
                let digest = digest_hex(&bytes);

                let reusable = changed.as_ref().map_or(true, |c| !c.contains(rel.as_path()));
                if reusable {
                    if let Some(snapshot) =
                        previous.and_then(|entry| entry.files.get(rel.as_path()))
                    {
                        if snapshot.digest == digest {
                            return Ok((rel.clone(), snapshot.clone()));
                        }
                    }
                }

                // Malformed content is a per-file diagnostic, never a
                // run-level error.
                let snapshot = match String::from_utf8(bytes) {
                    Ok(content) => match self.parser.parse(rel, &content) {
                        Ok(facts) => FileSnapshot {
                            digest,
                            facts,
                            error: None,
                        },
                        Err(diag) => FileSnapshot {
                            digest,
                            facts: Vec::new(),
                            error: Some(diag.message),
                        },
                    },
                    Err(e) => FileSnapshot {
                        digest,
                        facts: Vec::new(),
                        error: Some(format!("invalid UTF-8: {e}")),
                    },
                };
                Ok((rel.clone(), snapshot))
            })
            .collect()
    }

    fn build_graph(
        &self,
        snapshots: &BTreeMap<PathBuf, FileSnapshot>,
    ) -> Result<ModuleGraph, CheckError> {
        let resolver = ModuleResolver::new(&self.config)?;
        let mut builder = GraphBuilder::new(
            &resolver,
            self.config.module_paths().cloned(),
            self.config.ignore_test_imports,
        );
        for (rel, snapshot) in snapshots {
            builder.add_file(rel, &snapshot.facts)?;
        }
        Ok(builder.build())
    }

    /// Enumerates project-relative `.rs` paths under the source roots,
    /// minus excluded ones. Sorted and deduplicated.
    fn discover_files(&self) -> Result<Vec<PathBuf>, CheckError> {
        let mut files = BTreeSet::new();
        for source_root in &self.config.source_roots {
            let dir = self.root.join(source_root);
            if !dir.is_dir() {
                debug!(dir = %dir.display(), "source root missing, skipping");
                continue;
            }
            for result in ignore::WalkBuilder::new(&dir).build() {
                let entry = result.map_err(|e| CheckError::Io {
                    path: dir.clone(),
                    source: io::Error::other(e),
                })?;
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    continue;
                }
                if entry.path().extension().map_or(true, |ext| ext != "rs") {
                    continue;
                }
                let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                    continue;
                };
                let rel_str = rel.to_string_lossy().replace('\\', "/");
                if self.excludes.iter().any(|p| p.matches(&rel_str)) {
                    continue;
                }
                files.insert(rel.to_path_buf());
            }
        }
        Ok(files.into_iter().collect())
    }
}

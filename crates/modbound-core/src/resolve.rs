//! Mapping files and import targets to declared modules.
//!
//! Two questions are answered here. First, which declared module *owns* a
//! source file (derived from the file's path under a source root). Second,
//! which declared module an import target written in source *refers to*.
//! Both answers depend on the matching mode: longest-prefix by default,
//! `exact` to disable descendant ownership, `use_regex_matching` to treat
//! declared paths as anchored regexes.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use regex::Regex;

use crate::config::{ConfigError, ProjectConfig};
use crate::module_path::ModulePath;

/// Leading segments that always denote the standard library.
const BUILTIN_ROOTS: &[&str] = &["std", "core", "alloc", "proc_macro", "test"];

/// Outcome of resolving an import target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The target belongs to a declared module.
    Module(ModulePath),
    /// The target is a third-party or standard-library package.
    External(String),
    /// The target sits inside the source tree but no declared module
    /// owns it.
    Unresolved,
}

/// Resolves files and import targets against the declared module set.
pub struct ModuleResolver {
    exact: bool,
    declared: BTreeSet<ModulePath>,
    /// First segments of declared modules. A bare import path is treated
    /// as internal only when its first segment appears here.
    top_segments: BTreeSet<String>,
    /// Anchored regexes per declared module, present only in regex mode.
    regexes: Option<Vec<(ModulePath, Regex)>>,
    source_roots: Vec<PathBuf>,
}

impl ModuleResolver {
    /// Builds a resolver from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRegex`] if regex matching is enabled
    /// and a declared path does not compile.
    pub fn new(config: &ProjectConfig) -> Result<Self, ConfigError> {
        let declared: BTreeSet<ModulePath> = config.module_paths().cloned().collect();
        let top_segments = declared
            .iter()
            .map(|p| p.first_segment().to_string())
            .collect();

        let regexes = if config.use_regex_matching {
            let compiled = config
                .module_paths()
                .map(|p| {
                    Regex::new(&format!("^(?:{})$", p.as_str()))
                        .map(|re| (p.clone(), re))
                        .map_err(|e| ConfigError::InvalidRegex {
                            pattern: p.as_str().to_string(),
                            reason: e.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(compiled)
        } else {
            None
        };

        Ok(Self {
            exact: config.exact,
            declared,
            top_segments,
            regexes,
            source_roots: config.source_roots.clone(),
        })
    }

    /// Derives the module path of a source file from its project-relative
    /// path.
    ///
    /// `src/app/util.rs` becomes `app::util`; `src/app/mod.rs`, as well as
    /// `src/lib.rs` and `src/main.rs`, collapse to their parent directory.
    /// Returns `None` for files that map to the source root itself or sit
    /// outside every source root.
    #[must_use]
    pub fn file_module(&self, rel_path: &Path) -> Option<ModulePath> {
        let under_root = self
            .source_roots
            .iter()
            .find_map(|root| rel_path.strip_prefix(root).ok())?;

        let mut segments: Vec<String> = Vec::new();
        for component in under_root.components() {
            if let Component::Normal(part) = component {
                segments.push(part.to_string_lossy().into_owned());
            }
        }
        let last = segments.pop()?;
        let stem = last.strip_suffix(".rs").unwrap_or(&last);
        if !matches!(stem, "mod" | "lib" | "main") {
            segments.push(stem.to_string());
        }
        if segments.is_empty() {
            return None;
        }
        ModulePath::from_segments(segments.iter().map(String::as_str))
    }

    /// Finds the declared module that owns `module` (itself or, outside
    /// exact mode, its closest declared ancestor).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AmbiguousMatch`] in regex mode when more than
    /// one declaration matches the same candidate.
    pub fn resolve_owner(&self, module: &ModulePath) -> Result<Option<ModulePath>, ConfigError> {
        self.match_longest(module.as_str(), module.len())
    }

    /// Resolves an import target written in source, relative to the file's
    /// own module.
    ///
    /// The target is first normalized (`crate`, `self` and `super` prefixes
    /// are rewritten against `file_module`), then matched against the
    /// declared set. The final path segment is assumed to possibly be a
    /// symbol rather than a module, so in exact mode both the full path and
    /// the path minus its last segment are tried.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AmbiguousMatch`] in regex mode when more than
    /// one declaration matches the same candidate.
    pub fn resolve_import(
        &self,
        file_module: &ModulePath,
        target: &str,
    ) -> Result<Resolution, ConfigError> {
        let Some(segments) = self.normalize(file_module, target) else {
            return Ok(Resolution::Unresolved);
        };
        let (segments, external_root) = match segments {
            Normalized::Internal(segs) => (segs, None),
            Normalized::External(root) => return Ok(Resolution::External(root)),
            Normalized::MaybeExternal(segs) => {
                let root = segs[0].clone();
                (segs, Some(root))
            }
        };

        let candidate = segments.join("::");
        // Limit prefix shortening to one stripped segment in exact mode;
        // any declared prefix wins otherwise.
        let min_len = if self.exact {
            segments.len().saturating_sub(1).max(1)
        } else {
            1
        };
        if let Some(owner) = self.match_longest(&candidate, min_len)? {
            return Ok(Resolution::Module(owner));
        }
        match external_root {
            Some(root) => Ok(Resolution::External(root)),
            None => Ok(Resolution::Unresolved),
        }
    }

    /// Matches `candidate` against declarations, longest prefix first, down
    /// to prefixes of `min_segments` segments.
    fn match_longest(
        &self,
        candidate: &str,
        min_segments: usize,
    ) -> Result<Option<ModulePath>, ConfigError> {
        let segments: Vec<&str> = candidate.split("::").collect();
        let upper = segments.len();
        let lower = if self.exact {
            min_segments.min(upper)
        } else {
            1
        };

        for len in (lower..=upper).rev() {
            let prefix = segments[..len].join("::");
            if let Some(found) = self.match_exactly(&prefix)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Matches one candidate string against the declared set (literal or
    /// regex, depending on mode).
    fn match_exactly(&self, candidate: &str) -> Result<Option<ModulePath>, ConfigError> {
        if let Some(regexes) = &self.regexes {
            let hits: Vec<&ModulePath> = regexes
                .iter()
                .filter(|(_, re)| re.is_match(candidate))
                .map(|(path, _)| path)
                .collect();
            return match hits.len() {
                0 => Ok(None),
                1 => Ok(Some(hits[0].clone())),
                _ => Err(ConfigError::AmbiguousMatch {
                    candidate: candidate.to_string(),
                    patterns: hits.iter().map(|p| p.as_str().to_string()).collect(),
                }),
            };
        }

        match ModulePath::new(candidate) {
            Ok(path) if self.declared.contains(&path) => Ok(Some(path)),
            _ => Ok(None),
        }
    }

    /// Rewrites `crate`, `self` and `super` prefixes and classifies bare
    /// paths. Returns `None` when normalization escapes the module tree.
    fn normalize(&self, file_module: &ModulePath, target: &str) -> Option<Normalized> {
        let raw: Vec<&str> = target.split("::").filter(|s| !s.is_empty()).collect();
        let first = *raw.first()?;

        match first {
            "crate" => {
                let rest: Vec<String> = raw[1..].iter().map(|s| (*s).to_string()).collect();
                if rest.is_empty() {
                    None
                } else {
                    Some(Normalized::Internal(rest))
                }
            }
            "self" => {
                let mut segs: Vec<String> = file_module
                    .segments()
                    .map(ToString::to_string)
                    .collect();
                segs.extend(raw[1..].iter().map(|s| (*s).to_string()));
                Some(Normalized::Internal(segs))
            }
            "super" => {
                let mut base: Vec<String> = file_module
                    .segments()
                    .map(ToString::to_string)
                    .collect();
                let mut idx = 0;
                while idx < raw.len() && raw[idx] == "super" {
                    base.pop()?;
                    idx += 1;
                }
                base.extend(raw[idx..].iter().map(|s| (*s).to_string()));
                if base.is_empty() {
                    None
                } else {
                    Some(Normalized::Internal(base))
                }
            }
            root if BUILTIN_ROOTS.contains(&root) => {
                Some(Normalized::External(root.to_string()))
            }
            root => {
                let segs: Vec<String> = raw.iter().map(|s| (*s).to_string()).collect();
                if self.top_segments.contains(root) || self.regexes.is_some() {
                    // In regex mode a declared pattern may match any bare
                    // path, so let matching decide before falling back to
                    // external.
                    Some(Normalized::MaybeExternal(segs))
                } else {
                    Some(Normalized::External(root.to_string()))
                }
            }
        }
    }
}

enum Normalized {
    /// Definitely inside the checked tree.
    Internal(Vec<String>),
    /// Definitely a third-party or builtin package.
    External(String),
    /// Bare path whose first segment collides with a declared module;
    /// falls back to external when nothing matches.
    MaybeExternal(Vec<String>),
}

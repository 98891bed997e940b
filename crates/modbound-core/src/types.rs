//! Core types for boundary violations and check results.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::module_path::ModulePath;

/// Source location of an import reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path relative to the project root.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: usize,
}

impl Location {
    /// Creates a new location.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// The category of a boundary violation, with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ViolationKind {
    /// An import edge whose target module is absent from the source
    /// module's `depends_on` list.
    UndeclaredDependency {
        /// Module the import originates from.
        source: ModulePath,
        /// Module the import targets.
        target: ModulePath,
    },

    /// An import into a strict module targeting a symbol outside its
    /// declared public interface.
    StrictInterfaceBreach {
        /// Module the import originates from.
        source: ModulePath,
        /// The strict module being imported.
        target: ModulePath,
        /// The non-interface symbol.
        symbol: String,
    },

    /// A dependency cycle among declared modules.
    ForbiddenCycle {
        /// Cycle members, sorted lexicographically.
        members: Vec<ModulePath>,
    },

    /// An import of a third-party package that is neither allowed nor
    /// excluded.
    UndeclaredExternal {
        /// Module the import originates from.
        source: ModulePath,
        /// The external package name.
        package: String,
    },

    /// An import inside the source roots that no declared module owns.
    UnresolvableImport {
        /// Module the import originates from.
        source: ModulePath,
        /// The import target as written.
        target: String,
    },
}

impl ViolationKind {
    /// Stable violation code (e.g. `MB001`).
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UndeclaredDependency { .. } => "MB001",
            Self::StrictInterfaceBreach { .. } => "MB002",
            Self::ForbiddenCycle { .. } => "MB003",
            Self::UndeclaredExternal { .. } => "MB004",
            Self::UnresolvableImport { .. } => "MB005",
        }
    }

    /// Human-readable rule name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::UndeclaredDependency { .. } => "undeclared-dependency",
            Self::StrictInterfaceBreach { .. } => "strict-interface-breach",
            Self::ForbiddenCycle { .. } => "forbidden-cycle",
            Self::UndeclaredExternal { .. } => "undeclared-external",
            Self::UnresolvableImport { .. } => "unresolvable-import",
        }
    }

    /// The module path used as the primary sort key.
    ///
    /// For cycles this is the lexicographically smallest member.
    #[must_use]
    pub fn subject(&self) -> &ModulePath {
        match self {
            Self::UndeclaredDependency { source, .. }
            | Self::StrictInterfaceBreach { source, .. }
            | Self::UndeclaredExternal { source, .. }
            | Self::UnresolvableImport { source, .. } => source,
            Self::ForbiddenCycle { members } => &members[0],
        }
    }

    /// Violation message rendered for humans.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::UndeclaredDependency { source, target } => {
                format!("`{source}` imports `{target}` but does not declare it in depends_on")
            }
            Self::StrictInterfaceBreach {
                source,
                target,
                symbol,
            } => format!(
                "`{source}` imports `{symbol}` which is not part of strict module `{target}`'s public interface"
            ),
            Self::ForbiddenCycle { members } => {
                let cycle = members
                    .iter()
                    .map(ModulePath::as_str)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                format!("circular dependency among modules: {cycle}")
            }
            Self::UndeclaredExternal { source, package } => {
                format!("`{source}` imports external package `{package}` which is not declared")
            }
            Self::UnresolvableImport { source, target } => {
                format!("`{source}` imports `{target}` which no declared module owns")
            }
        }
    }
}

/// A boundary violation found during a check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// What was violated.
    #[serde(flatten)]
    pub kind: ViolationKind,
    /// Where the offending import sits. For cycles, the first reference of
    /// the smallest intra-cycle edge.
    pub location: Location,
}

impl Violation {
    /// Creates a new violation.
    #[must_use]
    pub fn new(kind: ViolationKind, location: Location) -> Self {
        Self { kind, location }
    }

    /// Deterministic ordering: (subject module, file, line, code).
    #[must_use]
    pub fn stable_cmp(&self, other: &Self) -> Ordering {
        self.kind
            .subject()
            .cmp(other.kind.subject())
            .then_with(|| self.location.cmp(&other.location))
            .then_with(|| self.kind.code().cmp(other.kind.code()))
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: [{}] {}",
            self.location,
            self.kind.code(),
            self.kind.message()
        )
    }
}

/// A non-fatal per-file parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseDiagnostic {
    /// File that failed to parse, relative to the project root.
    pub file: PathBuf,
    /// Parser error message.
    pub message: String,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: parse error: {}", self.file.display(), self.message)
    }
}

/// Result of a boundary check run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckResult {
    /// All violations, in stable order.
    pub violations: Vec<Violation>,
    /// Per-file parse failures (the files contributed zero import facts).
    pub diagnostics: Vec<ParseDiagnostic>,
    /// Number of source files covered by this run.
    pub files_checked: usize,
    /// Whether the result was served from the cache without recomputation.
    pub from_cache: bool,
}

impl CheckResult {
    /// True when no violations were found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    /// Counts violations per kind name.
    #[must_use]
    pub fn count_of(&self, name: &str) -> usize {
        self.violations
            .iter()
            .filter(|v| v.kind.name() == name)
            .count()
    }
}

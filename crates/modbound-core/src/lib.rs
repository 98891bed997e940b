//! # modbound-core
//!
//! Module-boundary checking for Rust source trees based on `syn` AST
//! analysis.
//!
//! Projects declare their intended module structure in `modbound.toml`:
//! which modules exist, which other modules each one may depend on, whether
//! its public interface is strictly scoped, and which external packages are
//! permitted. This crate extracts the actual import graph from source and
//! verifies it against those declarations. It includes:
//!
//! - [`ProjectConfig`] and the `modbound.toml` loading layer
//! - [`ImportParser`] / [`SynParser`] for extracting import facts
//! - [`ModuleResolver`] and [`ModuleGraph`] for graph construction
//! - [`Checker`] for orchestrating check and sync runs
//! - [`Violation`] for representing boundary findings
//!
//! ## Example
//!
//! ```ignore
//! use modbound_core::{CheckOptions, CheckerBuilder};
//!
//! let checker = CheckerBuilder::new("./my-project").build()?;
//! let result = checker.check(&CheckOptions::default())?;
//! for violation in &result.violations {
//!     println!("{violation}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod check;
mod checker;
mod config;
mod graph;
mod module_path;
mod parser;
mod resolve;
mod sync;
mod types;

pub use cache::{
    compute_fingerprint, CacheEntry, CacheStore, FileSnapshot, Fingerprint, JsonFileStore,
    NullStore, CACHE_SCHEMA,
};
pub use checker::{CheckError, CheckOptions, Checker, CheckerBuilder, CONFIG_FILE};
pub use config::{ConfigError, Dependency, ExternalConfig, ModuleConfig, ProjectConfig};
pub use graph::{EdgeRef, EdgeTarget, GraphBuilder, ImportEdge, ModuleGraph};
pub use module_path::{symbol_matches, ModulePath, ModulePathError};
pub use parser::{ImportFact, ImportParser, SynParser};
pub use resolve::{ModuleResolver, Resolution};
pub use sync::{reconcile, SyncMode};
pub use types::{CheckResult, Location, ParseDiagnostic, Violation, ViolationKind};

//! The module-level import graph.
//!
//! Per-file import facts are aggregated into edges between declared
//! modules. Each edge keeps every distinct reference (file, line, symbol)
//! that produced it, so checks can point at real source locations while
//! still reporting one violation per module pair.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::config::ConfigError;
use crate::module_path::ModulePath;
use crate::parser::ImportFact;
use crate::resolve::{ModuleResolver, Resolution};

/// What an aggregated edge points at.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum EdgeTarget {
    /// A declared module.
    Module(ModulePath),
    /// A third-party or standard-library package, by leading segment.
    External(String),
    /// An in-tree path that no declared module owns, as written.
    Unresolved(String),
}

/// One concrete import reference contributing to an edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EdgeRef {
    /// File the import appears in, relative to the project root.
    pub file: PathBuf,
    /// Line of the import (1-indexed).
    pub line: usize,
    /// The imported symbol (`*` for glob imports).
    pub symbol: String,
    /// Whether the import is `#[cfg(test)]`-guarded.
    pub test_only: bool,
}

/// An aggregated edge from one declared module to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEdge {
    /// The declared module the imports originate from.
    pub source: ModulePath,
    /// What the imports point at.
    pub target: EdgeTarget,
    /// Distinct references, sorted by (file, line, symbol).
    pub refs: Vec<EdgeRef>,
}

impl ImportEdge {
    /// First reference of the edge, used as the reported location.
    #[must_use]
    pub fn first_ref(&self) -> &EdgeRef {
        // refs is non-empty by construction.
        &self.refs[0]
    }
}

/// Accumulates per-file facts into a [`ModuleGraph`].
pub struct GraphBuilder<'a> {
    resolver: &'a ModuleResolver,
    ignore_test_imports: bool,
    declared: BTreeSet<ModulePath>,
    edges: BTreeMap<(ModulePath, EdgeTarget), BTreeSet<EdgeRef>>,
}

impl<'a> GraphBuilder<'a> {
    /// Creates a builder over the declared module set.
    #[must_use]
    pub fn new(
        resolver: &'a ModuleResolver,
        declared: impl IntoIterator<Item = ModulePath>,
        ignore_test_imports: bool,
    ) -> Self {
        Self {
            resolver,
            ignore_test_imports,
            declared: declared.into_iter().collect(),
            edges: BTreeMap::new(),
        }
    }

    /// Feeds one file's import facts into the graph.
    ///
    /// Files outside every source root, files mapping to the source root
    /// itself, and files owned by no declared module contribute nothing.
    /// Test-only facts are dropped when configured. Imports of a module
    /// into itself never form an edge.
    ///
    /// # Errors
    ///
    /// Propagates regex ambiguity from resolution.
    pub fn add_file(&mut self, rel_path: &Path, facts: &[ImportFact]) -> Result<(), ConfigError> {
        let Some(file_module) = self.resolver.file_module(rel_path) else {
            return Ok(());
        };
        let Some(owner) = self.resolver.resolve_owner(&file_module)? else {
            return Ok(());
        };

        for fact in facts {
            if fact.test_only && self.ignore_test_imports {
                continue;
            }
            let target = match self.resolver.resolve_import(&file_module, &fact.target)? {
                Resolution::Module(module) if module == owner => continue,
                Resolution::Module(module) => EdgeTarget::Module(module),
                Resolution::External(package) => EdgeTarget::External(package),
                Resolution::Unresolved => EdgeTarget::Unresolved(fact.target.clone()),
            };
            self.edges
                .entry((owner.clone(), target))
                .or_default()
                .insert(EdgeRef {
                    file: rel_path.to_path_buf(),
                    line: fact.line,
                    symbol: fact.symbol.clone(),
                    test_only: fact.test_only,
                });
        }
        Ok(())
    }

    /// Finalizes the graph. Edge and reference order is deterministic.
    #[must_use]
    pub fn build(self) -> ModuleGraph {
        let edges = self
            .edges
            .into_iter()
            .map(|((source, target), refs)| ImportEdge {
                source,
                target,
                refs: refs.into_iter().collect(),
            })
            .collect();
        ModuleGraph {
            modules: self.declared,
            edges,
        }
    }
}

/// The aggregated import graph over declared modules.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    /// All declared modules, whether or not any file maps to them.
    pub modules: BTreeSet<ModulePath>,
    /// Aggregated edges, sorted by (source, target).
    pub edges: Vec<ImportEdge>,
}

impl ModuleGraph {
    /// Edges whose target is a declared module.
    pub fn internal_edges(&self) -> impl Iterator<Item = (&ImportEdge, &ModulePath)> {
        self.edges.iter().filter_map(|e| match &e.target {
            EdgeTarget::Module(m) => Some((e, m)),
            _ => None,
        })
    }

    /// Edges whose target is an external package.
    pub fn external_edges(&self) -> impl Iterator<Item = (&ImportEdge, &str)> {
        self.edges.iter().filter_map(|e| match &e.target {
            EdgeTarget::External(p) => Some((e, p.as_str())),
            _ => None,
        })
    }

    /// Edges whose target resolved to nothing.
    pub fn unresolved_edges(&self) -> impl Iterator<Item = (&ImportEdge, &str)> {
        self.edges.iter().filter_map(|e| match &e.target {
            EdgeTarget::Unresolved(t) => Some((e, t.as_str())),
            _ => None,
        })
    }

    /// Looks up the aggregated edge between two declared modules.
    #[must_use]
    pub fn edge_between(&self, source: &ModulePath, target: &ModulePath) -> Option<&ImportEdge> {
        self.internal_edges()
            .find(|(e, t)| &e.source == source && *t == target)
            .map(|(e, _)| e)
    }

    /// Strongly connected components with more than one member.
    ///
    /// Each cycle is reported once. Members are sorted lexicographically
    /// and the component list is sorted by first member.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<ModulePath>> {
        let nodes: Vec<&ModulePath> = self.modules.iter().collect();
        let index_of: BTreeMap<&ModulePath, usize> =
            nodes.iter().enumerate().map(|(i, m)| (*m, i)).collect();

        let mut adjacency = vec![Vec::new(); nodes.len()];
        for (edge, target) in self.internal_edges() {
            if let (Some(&s), Some(&t)) = (index_of.get(&edge.source), index_of.get(target)) {
                adjacency[s].push(t);
            }
        }

        let mut tarjan = Tarjan::new(nodes.len(), &adjacency);
        for node in 0..nodes.len() {
            if tarjan.index[node].is_none() {
                tarjan.visit(node);
            }
        }

        let mut cycles: Vec<Vec<ModulePath>> = tarjan
            .components
            .into_iter()
            .filter(|c| c.len() > 1)
            .map(|component| {
                let mut members: Vec<ModulePath> =
                    component.into_iter().map(|i| nodes[i].clone()).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }
}

/// Iterative Tarjan SCC. Explicit stack so deep module chains cannot
/// overflow the call stack.
struct Tarjan<'a> {
    adjacency: &'a [Vec<usize>],
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_index: usize,
    components: Vec<Vec<usize>>,
}

impl<'a> Tarjan<'a> {
    fn new(n: usize, adjacency: &'a [Vec<usize>]) -> Self {
        Self {
            adjacency,
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            next_index: 0,
            components: Vec::new(),
        }
    }

    fn visit(&mut self, root: usize) {
        // Each frame is (node, next unexplored neighbor position).
        let mut frames: Vec<(usize, usize)> = vec![(root, 0)];
        self.open(root);

        while let Some(frame) = frames.last_mut() {
            let node = frame.0;
            let pos = frame.1;
            if let Some(&next) = self.adjacency[node].get(pos) {
                frame.1 += 1;
                if self.index[next].is_none() {
                    self.open(next);
                    frames.push((next, 0));
                } else if self.on_stack[next] {
                    let next_index = self.index[next].unwrap_or(usize::MAX);
                    self.lowlink[node] = self.lowlink[node].min(next_index);
                }
            } else {
                frames.pop();
                if let Some(&(parent, _)) = frames.last() {
                    self.lowlink[parent] = self.lowlink[parent].min(self.lowlink[node]);
                }
                if self.index[node] == Some(self.lowlink[node]) {
                    let mut component = Vec::new();
                    while let Some(member) = self.stack.pop() {
                        self.on_stack[member] = false;
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    self.components.push(component);
                }
            }
        }
    }

    fn open(&mut self, node: usize) {
        self.index[node] = Some(self.next_index);
        self.lowlink[node] = self.next_index;
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack[node] = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;

    fn mp(s: &str) -> ModulePath {
        ModulePath::new(s).unwrap()
    }

    fn fact(target: &str, symbol: &str, line: usize) -> ImportFact {
        ImportFact {
            target: target.to_string(),
            symbol: symbol.to_string(),
            line,
            test_only: false,
        }
    }

    fn graph(toml_str: &str, files: &[(&str, Vec<ImportFact>)]) -> ModuleGraph {
        let config = ProjectConfig::parse(toml_str).unwrap();
        let resolver = ModuleResolver::new(&config).unwrap();
        let mut builder = GraphBuilder::new(
            &resolver,
            config.module_paths().cloned(),
            config.ignore_test_imports,
        );
        for (path, facts) in files {
            builder.add_file(Path::new(path), facts).unwrap();
        }
        builder.build()
    }

    const BASIC: &str = r#"
[[modules]]
path = "app"
[[modules]]
path = "domain"
"#;

    #[test]
    fn aggregates_and_dedups_refs() {
        let g = graph(
            BASIC,
            &[(
                "src/app/cli.rs",
                vec![
                    fact("crate::domain::Entity", "Entity", 1),
                    fact("crate::domain::Entity", "Entity", 1),
                    fact("crate::domain::Repo", "Repo", 2),
                ],
            )],
        );
        let edge = g.edge_between(&mp("app"), &mp("domain")).unwrap();
        assert_eq!(edge.refs.len(), 2);
        assert_eq!(edge.first_ref().line, 1);
        assert_eq!(edge.first_ref().symbol, "Entity");
    }

    #[test]
    fn self_edges_dropped() {
        let g = graph(
            BASIC,
            &[("src/app/cli.rs", vec![fact("crate::app::util::f", "f", 1)])],
        );
        assert!(g.edges.is_empty());
    }

    #[test]
    fn test_only_facts_dropped_by_default() {
        let mut test_fact = fact("crate::domain::Fake", "Fake", 9);
        test_fact.test_only = true;
        let g = graph(BASIC, &[("src/app/cli.rs", vec![test_fact])]);
        assert!(g.edges.is_empty());
    }

    #[test]
    fn test_only_facts_kept_when_configured() {
        let mut test_fact = fact("crate::domain::Fake", "Fake", 9);
        test_fact.test_only = true;
        let g = graph(
            &format!("ignore-test-imports = false\n{BASIC}"),
            &[("src/app/cli.rs", vec![test_fact])],
        );
        assert_eq!(g.edges.len(), 1);
        assert!(g.edges[0].refs[0].test_only);
    }

    #[test]
    fn unowned_files_skipped() {
        let g = graph(
            BASIC,
            &[("src/infra/db.rs", vec![fact("crate::domain::Entity", "Entity", 1)])],
        );
        assert!(g.edges.is_empty());
    }

    #[test]
    fn external_and_unresolved_classified() {
        let g = graph(
            BASIC,
            &[(
                "src/app/cli.rs",
                vec![
                    fact("serde::Serialize", "Serialize", 1),
                    fact("crate::infra::Db", "Db", 2),
                ],
            )],
        );
        let externals: Vec<&str> = g.external_edges().map(|(_, p)| p).collect();
        assert_eq!(externals, vec!["serde"]);
        let unresolved: Vec<&str> = g.unresolved_edges().map(|(_, t)| t).collect();
        assert_eq!(unresolved, vec!["crate::infra::Db"]);
    }

    #[test]
    fn detects_two_module_cycle() {
        let g = graph(
            BASIC,
            &[
                ("src/app/cli.rs", vec![fact("crate::domain::Entity", "Entity", 1)]),
                ("src/domain/model.rs", vec![fact("crate::app::Cli", "Cli", 1)]),
            ],
        );
        let cycles = g.cycles();
        assert_eq!(cycles, vec![vec![mp("app"), mp("domain")]]);
    }

    #[test]
    fn no_cycle_without_back_edge() {
        let g = graph(
            BASIC,
            &[("src/app/cli.rs", vec![fact("crate::domain::Entity", "Entity", 1)])],
        );
        assert!(g.cycles().is_empty());
    }

    #[test]
    fn three_module_cycle_reported_once() {
        let toml = r#"
[[modules]]
path = "a"
[[modules]]
path = "b"
[[modules]]
path = "c"
"#;
        let g = graph(
            toml,
            &[
                ("src/a/x.rs", vec![fact("crate::b::Y", "Y", 1)]),
                ("src/b/y.rs", vec![fact("crate::c::Z", "Z", 1)]),
                ("src/c/z.rs", vec![fact("crate::a::X", "X", 1)]),
            ],
        );
        let cycles = g.cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], vec![mp("a"), mp("b"), mp("c")]);
    }
}

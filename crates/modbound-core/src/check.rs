//! Rule passes over the import graph.
//!
//! Each pass consumes a disjoint slice of the graph (internal, external,
//! unresolved edges, or the cycle structure) and produces violations. The
//! passes never short-circuit each other; ordering of the combined output
//! is handled by the caller.

use crate::config::ProjectConfig;
use crate::graph::{EdgeRef, ImportEdge, ModuleGraph};
use crate::types::{Location, Violation, ViolationKind};

/// Packages never subject to the external allow-list.
const BUILTIN_PACKAGES: &[&str] = &["std", "core", "alloc", "proc_macro", "test"];

fn location_of(edge_ref: &EdgeRef) -> Location {
    Location::new(edge_ref.file.clone(), edge_ref.line)
}

/// Undeclared-dependency and strict-interface checks over internal edges.
///
/// An edge into a module absent from the source's `depends_on` yields one
/// violation per module pair. A declared edge into a strict module yields
/// one violation per reference whose symbol falls outside the declared
/// interface.
pub(crate) fn boundary_violations(
    config: &ProjectConfig,
    graph: &ModuleGraph,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (edge, target) in graph.internal_edges() {
        let Some(source_cfg) = config.module(&edge.source) else {
            continue;
        };

        if !source_cfg.declares_dependency_on(target) {
            violations.push(Violation::new(
                ViolationKind::UndeclaredDependency {
                    source: edge.source.clone(),
                    target: target.clone(),
                },
                location_of(edge.first_ref()),
            ));
            continue;
        }

        let Some(target_cfg) = config.module(target) else {
            continue;
        };
        if target_cfg.strict {
            for edge_ref in &edge.refs {
                if !target_cfg.interface_contains(&edge_ref.symbol) {
                    violations.push(Violation::new(
                        ViolationKind::StrictInterfaceBreach {
                            source: edge.source.clone(),
                            target: target.clone(),
                            symbol: edge_ref.symbol.clone(),
                        },
                        location_of(edge_ref),
                    ));
                }
            }
        }
    }

    violations
}

/// One forbidden-cycle violation per strongly connected component.
///
/// Runs only under `forbid_circular_dependencies`. The violation is
/// located at the first reference of the lexicographically smallest edge
/// inside the component.
pub(crate) fn cycle_violations(config: &ProjectConfig, graph: &ModuleGraph) -> Vec<Violation> {
    if !config.forbid_circular_dependencies {
        return Vec::new();
    }

    graph
        .cycles()
        .into_iter()
        .map(|members| {
            // Edges are sorted by (source, target), so the first edge with
            // both endpoints in the component is the smallest one.
            let witness: Option<&ImportEdge> = graph
                .internal_edges()
                .find(|(edge, target)| {
                    members.contains(&edge.source) && members.contains(target)
                })
                .map(|(edge, _)| edge);
            let location = witness
                .map(|edge| location_of(edge.first_ref()))
                .unwrap_or_else(|| Location::new("", 0));
            Violation::new(ViolationKind::ForbiddenCycle { members }, location)
        })
        .collect()
}

/// Undeclared-external checks over external edges.
///
/// Builtins are always permitted. A package in the effective exclude set
/// (the module's `external_exclude` override, falling back to the project
/// set) is skipped entirely; anything else must be in the project allow
/// list.
pub(crate) fn external_violations(config: &ProjectConfig, graph: &ModuleGraph) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (edge, package) in graph.external_edges() {
        if BUILTIN_PACKAGES.contains(&package) {
            continue;
        }
        let excluded = config
            .module(&edge.source)
            .and_then(|m| m.external_exclude.as_ref())
            .unwrap_or(&config.external.exclude)
            .iter()
            .any(|p| p == package);
        if excluded {
            continue;
        }
        if config.external.allow.iter().any(|p| p == package) {
            continue;
        }
        violations.push(Violation::new(
            ViolationKind::UndeclaredExternal {
                source: edge.source.clone(),
                package: package.to_string(),
            },
            location_of(edge.first_ref()),
        ));
    }

    violations
}

/// One unresolvable-import violation per `(module, target)` pair.
pub(crate) fn unresolved_violations(graph: &ModuleGraph) -> Vec<Violation> {
    graph
        .unresolved_edges()
        .map(|(edge, target)| {
            Violation::new(
                ViolationKind::UnresolvableImport {
                    source: edge.source.clone(),
                    target: target.to_string(),
                },
                location_of(edge.first_ref()),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::module_path::ModulePath;
    use crate::parser::ImportFact;
    use crate::resolve::ModuleResolver;
    use std::path::Path;

    fn fact(target: &str, symbol: &str, line: usize) -> ImportFact {
        ImportFact {
            target: target.to_string(),
            symbol: symbol.to_string(),
            line,
            test_only: false,
        }
    }

    fn setup(toml_str: &str, files: &[(&str, Vec<ImportFact>)]) -> (ProjectConfig, ModuleGraph) {
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
        let graph = builder.build();
        (config, graph)
    }

    #[test]
    fn undeclared_dependency_once_per_pair() {
        let (config, graph) = setup(
            r#"
[[modules]]
path = "app"
[[modules]]
path = "domain"
"#,
            &[(
                "src/app/cli.rs",
                vec![
                    fact("crate::domain::Entity", "Entity", 3),
                    fact("crate::domain::Repo", "Repo", 7),
                ],
            )],
        );
        let violations = boundary_violations(&config, &graph);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind.code(), "MB001");
        assert_eq!(violations[0].location.line, 3);
    }

    #[test]
    fn declared_dependency_passes() {
        let (config, graph) = setup(
            r#"
[[modules]]
path = "app"
depends-on = ["domain"]
[[modules]]
path = "domain"
"#,
            &[("src/app/cli.rs", vec![fact("crate::domain::Entity", "Entity", 1)])],
        );
        assert!(boundary_violations(&config, &graph).is_empty());
    }

    #[test]
    fn strict_breach_despite_declaration() {
        let (config, graph) = setup(
            r#"
[[modules]]
path = "app"
depends-on = ["domain"]
[[modules]]
path = "domain"
strict = true
interface = ["Entity"]
"#,
            &[(
                "src/app/cli.rs",
                vec![
                    fact("crate::domain::Entity", "Entity", 1),
                    fact("crate::domain::Internal", "Internal", 2),
                    fact("crate::domain::Secret", "Secret", 3),
                ],
            )],
        );
        let violations = boundary_violations(&config, &graph);
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.kind.code() == "MB002"));
    }

    #[test]
    fn strict_interface_wildcards() {
        let (config, graph) = setup(
            r#"
[[modules]]
path = "app"
depends-on = ["domain"]
[[modules]]
path = "domain"
strict = true
interface = ["service::*"]
"#,
            &[(
                "src/app/cli.rs",
                vec![fact("crate::domain::service::create", "create", 1)],
            )],
        );
        // The edge symbol is the leaf; interface patterns match symbols,
        // not paths, so `service::*` does not cover a bare `create`.
        let violations = boundary_violations(&config, &graph);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn cycle_reported_once_with_witness_location() {
        let (config, graph) = setup(
            r#"
forbid-circular-dependencies = true
[[modules]]
path = "app"
depends-on = ["domain"]
[[modules]]
path = "domain"
depends-on = ["app"]
"#,
            &[
                ("src/app/cli.rs", vec![fact("crate::domain::Entity", "Entity", 4)]),
                ("src/domain/model.rs", vec![fact("crate::app::Cli", "Cli", 9)]),
            ],
        );
        let violations = cycle_violations(&config, &graph);
        assert_eq!(violations.len(), 1);
        match &violations[0].kind {
            ViolationKind::ForbiddenCycle { members } => {
                assert_eq!(members.len(), 2);
                assert_eq!(members[0].as_str(), "app");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
        // Smallest intra-cycle edge is app -> domain, first ref line 4.
        assert_eq!(violations[0].location.line, 4);
    }

    #[test]
    fn cycles_ignored_when_not_forbidden() {
        let (config, graph) = setup(
            r#"
[[modules]]
path = "app"
depends-on = ["domain"]
[[modules]]
path = "domain"
depends-on = ["app"]
"#,
            &[
                ("src/app/cli.rs", vec![fact("crate::domain::Entity", "Entity", 1)]),
                ("src/domain/model.rs", vec![fact("crate::app::Cli", "Cli", 1)]),
            ],
        );
        assert!(cycle_violations(&config, &graph).is_empty());
    }

    #[test]
    fn external_allow_and_exclude() {
        let (config, graph) = setup(
            r#"
[external]
allow = ["serde"]
exclude = ["rand"]
[[modules]]
path = "app"
"#,
            &[(
                "src/app/cli.rs",
                vec![
                    fact("serde::Serialize", "Serialize", 1),
                    fact("rand::Rng", "Rng", 2),
                    fact("tokio::main", "main", 3),
                    fact("std::fs::read", "read", 4),
                ],
            )],
        );
        let violations = external_violations(&config, &graph);
        assert_eq!(violations.len(), 1);
        match &violations[0].kind {
            ViolationKind::UndeclaredExternal { package, .. } => {
                assert_eq!(package, "tokio");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn per_module_external_exclude_overrides_project() {
        let (config, graph) = setup(
            r#"
[external]
exclude = ["rand"]
[[modules]]
path = "app"
external-exclude = ["tokio"]
"#,
            &[(
                "src/app/cli.rs",
                vec![fact("tokio::main", "main", 1), fact("rand::Rng", "Rng", 2)],
            )],
        );
        // The override replaces the project set for this module, so rand
        // is no longer excluded.
        let violations = external_violations(&config, &graph);
        assert_eq!(violations.len(), 1);
        match &violations[0].kind {
            ViolationKind::UndeclaredExternal { package, .. } => assert_eq!(package, "rand"),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn unresolved_import_reported() {
        let (config, graph) = setup(
            r#"
[[modules]]
path = "app"
"#,
            &[("src/app/cli.rs", vec![fact("crate::ghost::Thing", "Thing", 5)])],
        );
        let _ = config;
        let violations = unresolved_violations(&graph);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind.code(), "MB005");
        assert_eq!(violations[0].location.line, 5);
    }

    #[test]
    fn self_use_never_violates() {
        let (config, graph) = setup(
            r#"
[[modules]]
path = "app"
"#,
            &[("src/app/cli.rs", vec![fact("crate::app::util::f", "f", 1)])],
        );
        assert!(boundary_violations(&config, &graph).is_empty());
        assert!(unresolved_violations(&graph).is_empty());
    }

    #[test]
    fn module_path_sanity() {
        // Guard against resolver/config divergence on lookup keys.
        let config = ProjectConfig::parse(
            r#"
[[modules]]
path = "app"
"#,
        )
        .unwrap();
        assert!(config.module(&ModulePath::new("app").unwrap()).is_some());
    }
}

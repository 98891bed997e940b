//! Reconciling declared dependencies with the observed graph.

use std::collections::BTreeSet;

use tracing::info;

use crate::config::{Dependency, ProjectConfig};
use crate::graph::ModuleGraph;
use crate::module_path::ModulePath;

/// How sync treats declarations with no backing edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Only add missing declarations.
    Additive,
    /// Add missing declarations and drop ones no edge backs.
    Prune,
}

/// Rewrites `depends_on` lists to match the observed import graph.
///
/// Missing declarations are appended in sorted order after the existing
/// entries, preserving manual ordering. Under [`SyncMode::Prune`], declared
/// dependencies with no backing edge are removed. Everything else in the
/// configuration (strictness, interfaces, external policy) is untouched.
#[must_use]
pub fn reconcile(config: &ProjectConfig, graph: &ModuleGraph, mode: SyncMode) -> ProjectConfig {
    let mut synced = config.clone();

    for module in &mut synced.modules {
        let backed: BTreeSet<ModulePath> = graph
            .internal_edges()
            .filter(|(edge, _)| edge.source == module.path)
            .map(|(_, target)| target.clone())
            .collect();

        if mode == SyncMode::Prune {
            let before = module.depends_on.len();
            module.depends_on.retain(|d| backed.contains(&d.path));
            let dropped = before - module.depends_on.len();
            if dropped > 0 {
                info!(module = %module.path, dropped, "pruned unbacked dependencies");
            }
        }

        let additions: Vec<ModulePath> = backed
            .into_iter()
            .filter(|t| !module.depends_on.iter().any(|d| &d.path == t))
            .collect();
        if !additions.is_empty() {
            info!(module = %module.path, added = additions.len(), "declared observed dependencies");
        }
        module
            .depends_on
            .extend(additions.into_iter().map(Dependency::new));
    }

    synced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::parser::ImportFact;
    use crate::resolve::ModuleResolver;
    use std::path::Path;

    fn fact(target: &str, line: usize) -> ImportFact {
        ImportFact {
            target: target.to_string(),
            symbol: target.rsplit("::").next().unwrap_or(target).to_string(),
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

    fn mp(s: &str) -> ModulePath {
        ModulePath::new(s).unwrap()
    }

    const LAYOUT: &str = r#"
[[modules]]
path = "app"
depends-on = ["util"]
[[modules]]
path = "domain"
[[modules]]
path = "util"
"#;

    #[test]
    fn adds_missing_declarations_after_existing() {
        let (config, graph) = setup(
            LAYOUT,
            &[(
                "src/app/cli.rs",
                vec![
                    fact("crate::util::trim", 1),
                    fact("crate::domain::Entity", 2),
                ],
            )],
        );
        let synced = reconcile(&config, &graph, SyncMode::Additive);
        let app = synced.module(&mp("app")).unwrap();
        let deps: Vec<&str> = app.depends_on.iter().map(|d| d.path.as_str()).collect();
        // Existing entry keeps its position; the new one is appended.
        assert_eq!(deps, vec!["util", "domain"]);
    }

    #[test]
    fn additive_keeps_unbacked_declarations() {
        let (config, graph) = setup(LAYOUT, &[]);
        let synced = reconcile(&config, &graph, SyncMode::Additive);
        let app = synced.module(&mp("app")).unwrap();
        assert_eq!(app.depends_on.len(), 1);
    }

    #[test]
    fn prune_drops_unbacked_declarations() {
        let (config, graph) = setup(
            LAYOUT,
            &[("src/app/cli.rs", vec![fact("crate::domain::Entity", 1)])],
        );
        let synced = reconcile(&config, &graph, SyncMode::Prune);
        let app = synced.module(&mp("app")).unwrap();
        let deps: Vec<&str> = app.depends_on.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(deps, vec!["domain"]);
    }

    #[test]
    fn additions_are_sorted() {
        let (config, graph) = setup(
            LAYOUT,
            &[(
                "src/app/cli.rs",
                vec![fact("crate::util::trim", 1), fact("crate::domain::Entity", 2)],
            )],
        );
        let mut bare = config.clone();
        for module in &mut bare.modules {
            module.depends_on.clear();
        }
        let synced = reconcile(&bare, &graph, SyncMode::Additive);
        let app = synced.module(&mp("app")).unwrap();
        let deps: Vec<&str> = app.depends_on.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(deps, vec!["domain", "util"]);
    }

    #[test]
    fn synced_config_round_trips_as_toml() {
        let (config, graph) = setup(
            LAYOUT,
            &[("src/app/cli.rs", vec![fact("crate::domain::Entity", 1)])],
        );
        let synced = reconcile(&config, &graph, SyncMode::Additive);
        let text = synced.to_toml_string().unwrap();
        let back = ProjectConfig::parse(&text).unwrap();
        assert!(back
            .module(&mp("app"))
            .unwrap()
            .declares_dependency_on(&mp("domain")));
    }
}

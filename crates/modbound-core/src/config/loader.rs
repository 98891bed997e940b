//! DTO → domain conversion with load-time validation.

use std::collections::BTreeSet;

use crate::module_path::ModulePath;

use super::dto::{DependencyDto, ExternalDto, ModuleDto, ProjectConfigDto};
use super::{ConfigError, Dependency, ExternalConfig, ModuleConfig, ProjectConfig};

/// Converts a raw DTO into a validated [`ProjectConfig`].
///
/// # Errors
///
/// Returns the first configuration error encountered: invalid module path,
/// duplicate declaration, `depends_on` naming an undeclared module, or an
/// invalid glob/regex pattern.
pub fn load(dto: ProjectConfigDto) -> Result<ProjectConfig, ConfigError> {
    let defaults = ProjectConfig::default();

    let source_roots = if dto.source_roots.is_empty() {
        defaults.source_roots
    } else {
        dto.source_roots
    };
    let cache_dependencies = if dto.cache_dependencies.is_empty() {
        defaults.cache_dependencies
    } else {
        dto.cache_dependencies
    };

    let modules = dto
        .modules
        .into_iter()
        .enumerate()
        .map(|(i, m)| convert_module(m, i))
        .collect::<Result<Vec<_>, _>>()?;

    let config = ProjectConfig {
        source_roots,
        exclude: dto.exclude,
        exact: dto.exact,
        use_regex_matching: dto.use_regex_matching,
        ignore_test_imports: dto.ignore_test_imports,
        forbid_circular_dependencies: dto.forbid_circular_dependencies,
        cache_dependencies,
        external: ExternalConfig {
            allow: dto.external.allow,
            exclude: dto.external.exclude,
        },
        modules,
    };

    validate(&config)?;
    Ok(config)
}

/// Converts a validated config back into its DTO form for serialization.
#[must_use]
pub fn to_dto(config: &ProjectConfig) -> ProjectConfigDto {
    ProjectConfigDto {
        source_roots: config.source_roots.clone(),
        exclude: config.exclude.clone(),
        exact: config.exact,
        use_regex_matching: config.use_regex_matching,
        ignore_test_imports: config.ignore_test_imports,
        forbid_circular_dependencies: config.forbid_circular_dependencies,
        cache_dependencies: config.cache_dependencies.clone(),
        external: ExternalDto {
            allow: config.external.allow.clone(),
            exclude: config.external.exclude.clone(),
        },
        modules: config
            .modules
            .iter()
            .map(|m| ModuleDto {
                path: m.path.as_str().to_string(),
                depends_on: m
                    .depends_on
                    .iter()
                    .map(|d| DependencyDto::Path(d.path.as_str().to_string()))
                    .collect(),
                strict: m.strict,
                interface: m.interface.clone(),
                external_exclude: m.external_exclude.clone(),
            })
            .collect(),
    }
}

fn convert_module(dto: ModuleDto, index: usize) -> Result<ModuleConfig, ConfigError> {
    let ctx = format!("modules[{index}]");
    let path = ModulePath::new(&dto.path).map_err(|e| ConfigError::Validation {
        context: format!("{ctx}.path"),
        source: e,
    })?;

    let depends_on = dto
        .depends_on
        .iter()
        .enumerate()
        .map(|(j, d)| {
            ModulePath::new(d.path())
                .map(Dependency::new)
                .map_err(|e| ConfigError::Validation {
                    context: format!("{ctx}.depends-on[{j}]"),
                    source: e,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ModuleConfig {
        path,
        depends_on,
        strict: dto.strict,
        interface: dto.interface,
        external_exclude: dto.external_exclude,
    })
}

fn validate(config: &ProjectConfig) -> Result<(), ConfigError> {
    // Unique module paths
    let mut seen = BTreeSet::new();
    for module in &config.modules {
        if !seen.insert(&module.path) {
            return Err(ConfigError::DuplicateModule {
                path: module.path.clone(),
            });
        }
    }

    // Every depends_on entry references a declared module
    for module in &config.modules {
        for dep in &module.depends_on {
            if !seen.contains(&dep.path) {
                return Err(ConfigError::UnknownDependency {
                    module: module.path.clone(),
                    dependency: dep.path.clone(),
                });
            }
        }
    }

    // Globs compile
    for pattern in config.exclude.iter().chain(&config.cache_dependencies) {
        glob::Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlob {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
    }

    // Declared paths compile as regexes when regex matching is on
    if config.use_regex_matching {
        for module in &config.modules {
            regex::Regex::new(module.path.as_str()).map_err(|e| ConfigError::InvalidRegex {
                pattern: module.path.as_str().to_string(),
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<ProjectConfig, ConfigError> {
        ProjectConfig::parse(toml_str)
    }

    #[test]
    fn load_empty_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.source_roots, vec![std::path::PathBuf::from("src")]);
        assert_eq!(config.cache_dependencies, vec!["**/*.rs".to_string()]);
        assert!(config.ignore_test_imports);
        assert!(config.modules.is_empty());
    }

    #[test]
    fn load_full_config() {
        let config = parse(
            r#"
forbid-circular-dependencies = true

[external]
allow = ["serde"]

[[modules]]
path = "app"
depends-on = ["domain"]

[[modules]]
path = "domain"
strict = true
interface = ["Entity"]
"#,
        )
        .unwrap();

        assert_eq!(config.modules.len(), 2);
        assert!(config.forbid_circular_dependencies);
        let app = config
            .module(&ModulePath::new("app").unwrap())
            .expect("app declared");
        assert!(app.declares_dependency_on(&ModulePath::new("domain").unwrap()));
        let domain = config.module(&ModulePath::new("domain").unwrap()).unwrap();
        assert!(domain.strict);
        assert!(domain.interface_contains("Entity"));
        assert!(!domain.interface_contains("Internal"));
    }

    #[test]
    fn rejects_duplicate_module() {
        let result = parse(
            r#"
[[modules]]
path = "app"

[[modules]]
path = "app"
"#,
        );
        assert!(matches!(result, Err(ConfigError::DuplicateModule { .. })));
    }

    #[test]
    fn rejects_unknown_dependency() {
        let result = parse(
            r#"
[[modules]]
path = "app"
depends-on = ["ghost"]
"#,
        );
        assert!(matches!(result, Err(ConfigError::UnknownDependency { .. })));
    }

    #[test]
    fn rejects_invalid_module_path() {
        let result = parse(
            r#"
[[modules]]
path = "app::"
"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn rejects_invalid_glob() {
        let result = parse(r#"exclude = ["[unclosed"]"#);
        assert!(matches!(result, Err(ConfigError::InvalidGlob { .. })));
    }

    #[test]
    fn rejects_invalid_regex_when_enabled() {
        let result = parse(
            r#"
use-regex-matching = true

[[modules]]
path = "app::(unclosed"
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidRegex { .. })));
    }

    #[test]
    fn regex_paths_fine_when_disabled() {
        // Without regex matching the same path is just an odd literal.
        let result = parse(
            r#"
[[modules]]
path = "app::(unclosed"
"#,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn toml_round_trip_preserves_modules() {
        let config = parse(
            r#"
[[modules]]
path = "app"
depends-on = ["domain"]

[[modules]]
path = "domain"
strict = true
interface = ["Entity"]
"#,
        )
        .unwrap();

        let text = config.to_toml_string().unwrap();
        let back = ProjectConfig::parse(&text).unwrap();
        assert_eq!(back.modules.len(), 2);
        assert!(back
            .module(&ModulePath::new("domain").unwrap())
            .unwrap()
            .strict);
    }
}

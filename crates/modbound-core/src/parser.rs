//! Source parsing into import facts.
//!
//! Parsing is pure and file-local: one file in, an ordered list of
//! [`ImportFact`]s out. A syntax error is reported as a per-file
//! [`ParseDiagnostic`] and never aborts a run. The [`ImportParser`] trait
//! keeps the engine independent of the concrete parser.

use std::path::Path;

use serde::{Deserialize, Serialize};
use syn::spanned::Spanned;
use syn::visit::Visit;

use crate::types::ParseDiagnostic;

/// One import extracted from a source file, as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFact {
    /// Full use path as written, e.g. `crate::app::util::Helper`.
    pub target: String,
    /// The imported symbol: the leaf name, or `*` for glob imports.
    pub symbol: String,
    /// Line number of the import (1-indexed).
    pub line: usize,
    /// Whether the import is guarded by `#[cfg(test)]`.
    pub test_only: bool,
}

/// A pluggable producer of import facts.
///
/// Any implementation honoring the [`ImportFact`] contract can replace the
/// default [`SynParser`] without touching graph or check logic.
pub trait ImportParser: Send + Sync {
    /// Parses one file's content into import facts.
    ///
    /// # Errors
    ///
    /// Returns a diagnostic when the file cannot be parsed; the file then
    /// contributes zero facts.
    fn parse(&self, path: &Path, content: &str) -> Result<Vec<ImportFact>, ParseDiagnostic>;
}

/// The default parser, backed by a `syn` AST visit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SynParser;

impl SynParser {
    /// Creates a new syn-backed parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ImportParser for SynParser {
    fn parse(&self, path: &Path, content: &str) -> Result<Vec<ImportFact>, ParseDiagnostic> {
        let ast = syn::parse_file(content).map_err(|e| ParseDiagnostic {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut collector = UseCollector {
            facts: Vec::new(),
            test_depth: 0,
        };
        collector.visit_file(&ast);
        Ok(collector.facts)
    }
}

struct UseCollector {
    facts: Vec<ImportFact>,
    test_depth: usize,
}

impl<'ast> Visit<'ast> for UseCollector {
    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        let test_mod = node.attrs.iter().any(cfg_mentions_test);
        if test_mod {
            self.test_depth += 1;
        }
        syn::visit::visit_item_mod(self, node);
        if test_mod {
            self.test_depth -= 1;
        }
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        let test_only = self.test_depth > 0 || node.attrs.iter().any(cfg_mentions_test);

        for resolved in expand_use_tree(&node.tree, "") {
            self.facts.push(ImportFact {
                target: resolved.path,
                symbol: resolved.symbol,
                line: resolved.span.start().line,
                test_only,
            });
        }
    }
}

struct ResolvedUse {
    path: String,
    symbol: String,
    span: proc_macro2::Span,
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}::{segment}")
    }
}

/// Recursively expands a [`syn::UseTree`] into flat leaf paths.
///
/// `use std::collections::{HashMap, BTreeMap};` expands to two facts with
/// targets `std::collections::HashMap` and `std::collections::BTreeMap`.
/// A `self` leaf (`use a::{self}`) and a glob (`use a::*`) both target the
/// enclosing module.
fn expand_use_tree(tree: &syn::UseTree, prefix: &str) -> Vec<ResolvedUse> {
    match tree {
        syn::UseTree::Path(p) => expand_use_tree(&p.tree, &join(prefix, &p.ident.to_string())),
        syn::UseTree::Name(n) => leaf(prefix, &n.ident.to_string(), n.ident.span()),
        syn::UseTree::Rename(r) => leaf(prefix, &r.ident.to_string(), r.ident.span()),
        syn::UseTree::Glob(g) => {
            if prefix.is_empty() {
                vec![]
            } else {
                vec![ResolvedUse {
                    path: prefix.to_string(),
                    symbol: "*".to_string(),
                    span: g.span(),
                }]
            }
        }
        syn::UseTree::Group(g) => g
            .items
            .iter()
            .flat_map(|item| expand_use_tree(item, prefix))
            .collect(),
    }
}

fn leaf(prefix: &str, ident: &str, span: proc_macro2::Span) -> Vec<ResolvedUse> {
    if ident == "self" {
        // `use a::b::{self}` imports module b itself.
        if prefix.is_empty() {
            return vec![];
        }
        let symbol = prefix.rsplit("::").next().unwrap_or(prefix).to_string();
        return vec![ResolvedUse {
            path: prefix.to_string(),
            symbol,
            span,
        }];
    }
    vec![ResolvedUse {
        path: join(prefix, ident),
        symbol: ident.to_string(),
        span,
    }]
}

/// Whether a `#[cfg(...)]` attribute predicate mentions `test`.
///
/// Handles `cfg(test)`, `cfg(any(test, ...))` and similar nesting.
/// `cfg(not(...))` subtrees are skipped: their contents do not make an
/// item test-only.
fn cfg_mentions_test(attr: &syn::Attribute) -> bool {
    if !attr.path().is_ident("cfg") {
        return false;
    }
    let mut found = false;
    let _ = attr.parse_nested_meta(|meta| walk_cfg_predicate(&meta, &mut found));
    found
}

fn walk_cfg_predicate(
    meta: &syn::meta::ParseNestedMeta<'_>,
    found: &mut bool,
) -> syn::Result<()> {
    if meta.path.is_ident("test") {
        *found = true;
    }
    if meta.input.peek(syn::token::Paren) {
        if meta.path.is_ident("not") {
            let mut ignored = false;
            meta.parse_nested_meta(|inner| walk_cfg_predicate(&inner, &mut ignored))?;
        } else {
            meta.parse_nested_meta(|inner| walk_cfg_predicate(&inner, found))?;
        }
    } else if meta.input.peek(syn::Token![=]) {
        let _value: syn::Expr = meta.value()?.parse()?;
    }
    Ok(())
}

//! Cross-module linking.
//!
//! Resolution runs on the closed graph, before renaming: every import
//! local is tied to the binding that finally provides it, following
//! re-export chains and `export *` into bundled modules. Erasure runs
//! after renaming and rewrites each module's AST so it can be
//! concatenated: module syntax is removed, bundled namespace imports
//! become getter objects, and imports of external modules are collected
//! into a prelude at the top of the bundle.

use super::graph::{Edge, ModuleGraph, ModuleId};
use super::imports::ImportEntry;
use super::rename::Naming;
use super::scope::{ScopeTree, VariableId};
use crate::error::BundleError;
use hoist_parser::{
    Ast, DefaultExport, ExportDecl, ExportSpecifier, Expr, ExprKind, Function, ImportDecl, ImportSpecifier,
    ObjectMember, Pattern, Property, PropertyKey, Span, Stmt, StmtKind, VarDecl, VarDeclarator, VarKind,
};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use tracing::debug;

/// What an import (or export) finally refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImportTarget {
    /// A module-level binding of a bundled module.
    Binding { module: ModuleId, variable: VariableId },
    /// The namespace object of a bundled module.
    Namespace(ModuleId),
    /// A name imported from a module left external (`*` for a namespace).
    External { specifier: String, imported: String },
}

/// Result of resolving every import in the graph.
#[derive(Debug, Default)]
pub struct Linkage {
    imports: Vec<Vec<(VariableId, ImportTarget)>>,
    namespaces: HashMap<ModuleId, Vec<(String, ImportTarget)>>,
    entry_exports: Vec<(String, ImportTarget)>,
    entry_star_externals: Vec<String>,
}

impl Linkage {
    /// Resolve every import of every module. With `export_entry`, also the
    /// export set of the entry module.
    pub fn resolve(graph: &ModuleGraph, export_entry: bool) -> Result<Self, BundleError> {
        let mut linkage = Self {
            imports: vec![Vec::new(); graph.len()],
            ..Self::default()
        };
        let mut errors = Vec::new();

        for record in graph.modules() {
            let tree = &record.scope;
            for entry in tree.imports.iter() {
                let Some(variable) = tree.lookup_local(ScopeTree::ROOT, &entry.local) else {
                    continue;
                };
                match resolve_import(graph, record.id, entry) {
                    Ok(target) => linkage.imports[record.id].push((variable, target)),
                    Err(err) => errors.push(err),
                }
            }
        }

        let namespace_modules: Vec<ModuleId> = linkage
            .imports
            .iter()
            .flatten()
            .filter_map(|(_, target)| match target {
                ImportTarget::Namespace(module) => Some(*module),
                _ => None,
            })
            .collect();
        for module in namespace_modules {
            if linkage.namespaces.contains_key(&module) {
                continue;
            }
            match export_set(graph, module) {
                Ok(exports) => {
                    linkage.namespaces.insert(module, exports);
                }
                Err(err) => errors.push(err),
            }
        }

        if export_entry {
            match export_set(graph, graph.entry()) {
                Ok(exports) => linkage.entry_exports = exports,
                Err(err) => errors.push(err),
            }
            linkage.entry_star_externals = star_externals(graph, graph.entry());
        }

        if let Some(err) = BundleError::from_many(errors) {
            return Err(err);
        }
        debug!(
            imports = linkage.imports.iter().map(Vec::len).sum::<usize>(),
            namespaces = linkage.namespaces.len(),
            "linked imports"
        );
        Ok(linkage)
    }

    /// Import locals of `module` and their targets.
    #[must_use]
    pub fn imports(&self, module: ModuleId) -> &[(VariableId, ImportTarget)] {
        self.imports.get(module).map_or(&[], Vec::as_slice)
    }

    /// Exports reachable through the namespace object of `module`.
    #[must_use]
    pub fn namespace(&self, module: ModuleId) -> &[(String, ImportTarget)] {
        self.namespaces.get(&module).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn entry_exports(&self) -> &[(String, ImportTarget)] {
        &self.entry_exports
    }

    /// External specifiers the entry re-exports wholesale.
    #[must_use]
    pub fn entry_star_externals(&self) -> &[String] {
        &self.entry_star_externals
    }

    /// Every `(specifier, imported)` pair some linked name refers to.
    pub fn external_refs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.imports
            .iter()
            .flatten()
            .map(|(_, target)| target)
            .chain(self.namespaces.values().flatten().map(|(_, target)| target))
            .chain(self.entry_exports.iter().map(|(_, target)| target))
            .filter_map(|target| match target {
                ImportTarget::External { specifier, imported } => Some((specifier.as_str(), imported.as_str())),
                _ => None,
            })
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Follow one import entry of `module`.
fn resolve_entry(
    graph: &ModuleGraph,
    module: ModuleId,
    entry: &ImportEntry,
    visited: &mut HashSet<(ModuleId, String)>,
) -> Option<ImportTarget> {
    match graph.module(module).edge(&entry.specifier)? {
        Edge::External => Some(ImportTarget::External {
            specifier: entry.specifier.clone(),
            imported: entry.imported.clone(),
        }),
        Edge::Module(target) if entry.is_namespace => Some(ImportTarget::Namespace(target)),
        Edge::Module(target) => resolve_export(graph, target, &entry.imported, visited),
    }
}

/// Find the binding behind export `name` of `module`.
///
/// Own exports win over named re-exports, which win over `export *`.
/// `default` is never provided through `export *`. A name reached twice
/// on one path is a cycle and resolves to nothing.
pub fn resolve_export(
    graph: &ModuleGraph,
    module: ModuleId,
    name: &str,
    visited: &mut HashSet<(ModuleId, String)>,
) -> Option<ImportTarget> {
    if !visited.insert((module, name.to_string())) {
        return None;
    }
    let record = graph.module(module);
    let tree = &record.scope;

    if let Some(info) = tree.exports.by_export_name(name) {
        if let Some(entry) = tree.imports.get(&info.local_name) {
            let bundled_namespace = entry.is_namespace && matches!(record.edge(&entry.specifier), Some(Edge::Module(_)));
            if !bundled_namespace {
                return resolve_entry(graph, module, entry, visited);
            }
        }
        let variable = tree.lookup_local(ScopeTree::ROOT, &info.local_name)?;
        return Some(ImportTarget::Binding { module, variable });
    }

    if let Some((specifier, source)) = tree.exports.reexport(name) {
        return match record.edge(specifier)? {
            Edge::External => Some(ImportTarget::External {
                specifier: specifier.to_string(),
                imported: source.to_string(),
            }),
            Edge::Module(target) => resolve_export(graph, target, source, visited),
        };
    }

    if name == "default" {
        return None;
    }
    for external in tree.exports.external().iter().filter(|e| e.is_export_all) {
        if let Some(Edge::Module(target)) = record.edge(&external.specifier) {
            if let Some(found) = resolve_export(graph, target, name, visited) {
                return Some(found);
            }
        }
    }
    None
}

/// Resolve an import the way a consumer of `module` would see it.
pub fn resolve_import(graph: &ModuleGraph, module: ModuleId, entry: &ImportEntry) -> Result<ImportTarget, BundleError> {
    resolve_entry(graph, module, entry, &mut HashSet::default()).ok_or_else(|| BundleError::MissingExport {
        path: graph.module(module).path.clone(),
        specifier: entry.specifier.clone(),
        name: entry.imported.clone(),
    })
}

/// Every export name of `module` (own, re-exported, and through `export *`
/// of bundled modules), resolved. Order: own exports, named re-exports,
/// then star exports by first appearance.
fn export_set(graph: &ModuleGraph, module: ModuleId) -> Result<Vec<(String, ImportTarget)>, BundleError> {
    let mut names = Vec::new();
    let mut seen = HashSet::default();
    let mut visited = HashSet::default();
    collect_export_names(graph, module, true, &mut names, &mut seen, &mut visited);

    let mut exports = Vec::with_capacity(names.len());
    for name in names {
        match resolve_export(graph, module, &name, &mut HashSet::default()) {
            Some(target) => exports.push((name, target)),
            None => {
                return Err(BundleError::MissingExport {
                    path: graph.module(module).path.clone(),
                    specifier: graph.module(module).path.clone(),
                    name,
                })
            }
        }
    }
    Ok(exports)
}

fn collect_export_names(
    graph: &ModuleGraph,
    module: ModuleId,
    with_default: bool,
    names: &mut Vec<String>,
    seen: &mut HashSet<String>,
    visited: &mut HashSet<ModuleId>,
) {
    if !visited.insert(module) {
        return;
    }
    let record = graph.module(module);
    let exports = &record.scope.exports;
    let own = exports.iter().map(|info| info.export_name.as_str());
    let reexported = exports
        .external()
        .iter()
        .flat_map(|external| external.names.iter().map(|(_, exported)| exported.as_str()));
    for name in own.chain(reexported) {
        if (with_default || name != "default") && seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    }
    for external in exports.external().iter().filter(|e| e.is_export_all) {
        if let Some(Edge::Module(target)) = record.edge(&external.specifier) {
            collect_export_names(graph, target, false, names, seen, visited);
        }
    }
}

/// External specifiers re-exported with `export *` by `module` or, through
/// `export *`, by the bundled modules it re-exports.
fn star_externals(graph: &ModuleGraph, module: ModuleId) -> Vec<String> {
    let mut out = Vec::new();
    let mut visited = HashSet::default();
    let mut stack = vec![module];
    while let Some(module) = stack.pop() {
        if !visited.insert(module) {
            continue;
        }
        let record = graph.module(module);
        let stars: Vec<&str> = record
            .scope
            .exports
            .external()
            .iter()
            .filter(|e| e.is_export_all)
            .map(|e| e.specifier.as_str())
            .collect();
        for specifier in stars.iter().rev() {
            match record.edge(specifier) {
                Some(Edge::External) if !out.iter().any(|s| s == specifier) => out.push((*specifier).to_string()),
                Some(Edge::Module(target)) => stack.push(target),
                _ => {}
            }
        }
    }
    out
}

// =============================================================================
// Erasure
// =============================================================================

/// Statements placed around the concatenated modules.
#[derive(Debug, Default)]
pub struct Wrapper {
    /// External imports, one declaration per specifier.
    pub prelude: Ast,
    /// The entry's exports.
    pub epilogue: Ast,
}

/// Strip module syntax from every module in `order` and build the bundle's
/// prelude and epilogue. Runs after renaming.
pub fn erase(
    graph: &mut ModuleGraph,
    linkage: &Linkage,
    naming: &Naming,
    order: &[ModuleId],
    export_entry: bool,
) -> Wrapper {
    let mut externals = ExternalImports::default();
    for &module in order {
        let record = &graph.modules()[module];
        for stmt in &record.ast.stmts {
            if let StmtKind::Import(import) = &stmt.kind {
                if record.edge(&import.source) == Some(Edge::External) {
                    externals.touch(&import.source);
                }
            }
        }
        for (_, target) in linkage.imports(module) {
            externals.add(target, naming);
        }
    }
    for (_, target) in linkage.namespace_targets().chain(linkage.entry_exports.iter()) {
        externals.add(target, naming);
    }

    for &module in order {
        let record = &mut graph.modules_mut()[module];
        let namespaces = namespace_decls(&mut record.ast, &record.edges, linkage, naming);
        let stmts = std::mem::take(&mut record.ast.stmts);
        let mut out = namespaces;
        out.reserve(stmts.len());
        for stmt in stmts {
            if let Some(stmt) = strip(stmt) {
                out.push(stmt);
            }
        }
        record.ast.stmts = out;
    }

    let mut epilogue = Ast::default();
    if export_entry {
        let specifiers: Vec<ExportSpecifier> = linkage
            .entry_exports
            .iter()
            .filter_map(|(exported, target)| {
                let name = naming.target(target)?;
                Some(ExportSpecifier {
                    local: epilogue.alloc_ident(name, Span::synthetic()),
                    exported: exported.clone(),
                    span: Span::synthetic(),
                })
            })
            .collect();
        if !specifiers.is_empty() {
            epilogue.stmts.push(synthetic(StmtKind::Export(ExportDecl::Named {
                specifiers,
                source: None,
                span: Span::synthetic(),
            })));
        }
        for specifier in &linkage.entry_star_externals {
            epilogue.stmts.push(synthetic(StmtKind::Export(ExportDecl::All {
                alias: None,
                source: specifier.clone(),
                span: Span::synthetic(),
            })));
        }
    }

    Wrapper {
        prelude: externals.into_ast(),
        epilogue,
    }
}

impl Linkage {
    fn namespace_targets(&self) -> impl Iterator<Item = &(String, ImportTarget)> {
        self.namespaces.values().flatten()
    }
}

fn synthetic(kind: StmtKind) -> Stmt {
    Stmt::new(kind, Span::synthetic())
}

/// Remove module syntax from one top-level statement.
fn strip(stmt: Stmt) -> Option<Stmt> {
    let span = stmt.span;
    match stmt.kind {
        StmtKind::Import(_) => None,
        StmtKind::Export(ExportDecl::Decl(inner)) => Some(*inner),
        StmtKind::Export(ExportDecl::Named { .. } | ExportDecl::All { .. }) => None,
        StmtKind::Export(ExportDecl::Default { value, local, .. }) => match value {
            DefaultExport::Function(func) => Some(Stmt::new(StmtKind::Function(func), span)),
            DefaultExport::Class(class) => Some(Stmt::new(StmtKind::Class(class), span)),
            DefaultExport::Expr(expr) => {
                let local = local?;
                Some(Stmt::new(
                    StmtKind::Var(VarDecl {
                        kind: VarKind::Var,
                        decls: vec![VarDeclarator {
                            target: Pattern::Ident(local),
                            init: Some(expr),
                            span,
                        }],
                    }),
                    span,
                ))
            }
        },
        kind => Some(Stmt::new(kind, span)),
    }
}

/// `var ns = { __proto__: null, get x() { return x; } };` for every
/// namespace import of a bundled module.
fn namespace_decls(
    ast: &mut Ast,
    edges: &[(String, Edge)],
    linkage: &Linkage,
    naming: &Naming,
) -> Vec<Stmt> {
    let mut locals = Vec::new();
    for stmt in &ast.stmts {
        let StmtKind::Import(import) = &stmt.kind else {
            continue;
        };
        let Some(Edge::Module(target)) = edges.iter().find(|(s, _)| *s == import.source).map(|&(_, edge)| edge)
        else {
            continue;
        };
        for spec in &import.specifiers {
            if let ImportSpecifier::Namespace { local } = spec {
                locals.push((*local, target));
            }
        }
    }

    let mut decls = Vec::with_capacity(locals.len());
    for (local, target) in locals {
        let mut members = vec![ObjectMember::Property(Property {
            key: PropertyKey::Ident("__proto__".to_string()),
            value: Expr::new(ExprKind::Null, Span::synthetic()),
            kind: VarKind::Init,
            shorthand: false,
            span: Span::synthetic(),
        })];
        for (exported, export_target) in linkage.namespace(target) {
            let Some(name) = naming.target(export_target) else {
                continue;
            };
            let ident = ast.alloc_ident(name, Span::synthetic());
            let key = if hoist_parser::is_identifier_name(exported) {
                PropertyKey::Ident(exported.clone())
            } else {
                PropertyKey::Str(quote(exported))
            };
            let getter = Function {
                id: None,
                params: Vec::new(),
                body: vec![synthetic(StmtKind::Return(Some(Expr::new(
                    ExprKind::Ident(ident),
                    Span::synthetic(),
                ))))],
                is_async: false,
                is_generator: false,
                span: Span::synthetic(),
            };
            members.push(ObjectMember::Property(Property {
                key,
                value: Expr::new(ExprKind::Function(Box::new(getter)), Span::synthetic()),
                kind: VarKind::Get,
                shorthand: false,
                span: Span::synthetic(),
            }));
        }
        decls.push(synthetic(StmtKind::Var(VarDecl {
            kind: VarKind::Var,
            decls: vec![VarDeclarator {
                target: Pattern::Ident(local),
                init: Some(Expr::new(ExprKind::Object(members), Span::synthetic())),
                span: Span::synthetic(),
            }],
        })));
    }
    decls
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

/// External imports, grouped by specifier in first-seen order.
#[derive(Debug, Default)]
struct ExternalImports {
    specifiers: Vec<String>,
    /// Per specifier: `(imported, local)` pairs in first-seen order.
    names: HashMap<String, Vec<(String, String)>>,
}

impl ExternalImports {
    fn touch(&mut self, specifier: &str) {
        if !self.names.contains_key(specifier) {
            self.specifiers.push(specifier.to_string());
            self.names.insert(specifier.to_string(), Vec::new());
        }
    }

    fn add(&mut self, target: &ImportTarget, naming: &Naming) {
        let ImportTarget::External { specifier, imported } = target else {
            return;
        };
        let Some(local) = naming.external(specifier, imported) else {
            return;
        };
        self.touch(specifier);
        let names = self.names.entry(specifier.clone()).or_default();
        if !names.iter().any(|(i, _)| i == imported) {
            names.push((imported.clone(), local.to_string()));
        }
    }

    /// One declaration per specifier; namespace imports get their own
    /// declaration since they cannot share a clause with named imports.
    fn into_ast(self) -> Ast {
        let mut ast = Ast::default();
        for specifier in self.specifiers {
            let names = self.names.get(&specifier).map(Vec::as_slice).unwrap_or_default();
            let mut clause = Vec::new();
            let mut namespaces = Vec::new();
            for (imported, local) in names {
                let local = ast.alloc_ident(local.as_str(), Span::synthetic());
                match imported.as_str() {
                    "*" => namespaces.push(ImportSpecifier::Namespace { local }),
                    "default" => clause.insert(0, ImportSpecifier::Default { local }),
                    _ => clause.push(ImportSpecifier::Named {
                        imported: imported.clone(),
                        local,
                    }),
                }
            }
            let bare = clause.is_empty() && namespaces.is_empty();
            let decls = namespaces
                .into_iter()
                .map(|spec| vec![spec])
                .chain((!clause.is_empty() || bare).then_some(clause));
            for specifiers in decls {
                ast.stmts.push(synthetic(StmtKind::Import(ImportDecl {
                    specifiers,
                    source: specifier.clone(),
                    span: Span::synthetic(),
                })));
            }
        }
        ast
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::graph::ResolveOptions;
    use crate::bundler::provider::{MemoryProvider, Providers};
    use crate::bundler::scope::UnresolvedNames;

    fn graph(files: &[(&str, &str)], entry: &str) -> ModuleGraph {
        let mut memory = MemoryProvider::new();
        for (path, source) in files {
            memory.insert(*path, *source);
        }
        let mut providers = Providers::new();
        providers.push(memory);
        ModuleGraph::build(&providers, &ResolveOptions::default(), &UnresolvedNames::new(), entry).unwrap()
    }

    fn binding_name(graph: &ModuleGraph, target: &ImportTarget) -> String {
        match target {
            ImportTarget::Binding { module, variable } => {
                let record = graph.module(*module);
                format!("{}#{}", record.path, record.scope.variable(*variable).name)
            }
            other => format!("{other:?}"),
        }
    }

    #[test]
    fn test_default_import_links_to_declaration() {
        let graph = graph(
            &[
                ("/a.js", "const helper = 1; export default helper;"),
                ("/b.js", "import helper from './a'; helper;"),
            ],
            "/b.js",
        );
        let linkage = Linkage::resolve(&graph, true).unwrap();
        let b = graph.id_of("/b.js").unwrap();
        let [(_, target)] = linkage.imports(b) else {
            panic!("expected one import");
        };
        assert_eq!(binding_name(&graph, target), "/a.js#helper");
    }

    #[test]
    fn test_reexport_chain_and_star() {
        let graph = graph(
            &[
                ("/main.js", "import { x, y } from './mid'; x + y;"),
                ("/mid.js", "export { x } from './leaf'; export * from './other';"),
                ("/leaf.js", "export const x = 1;"),
                ("/other.js", "export let y = 2; export default 3;"),
            ],
            "/main.js",
        );
        let linkage = Linkage::resolve(&graph, false).unwrap();
        let main = graph.id_of("/main.js").unwrap();
        let names: Vec<String> = linkage
            .imports(main)
            .iter()
            .map(|(_, target)| binding_name(&graph, target))
            .collect();
        assert_eq!(names, vec!["/leaf.js#x", "/other.js#y"]);
    }

    #[test]
    fn test_missing_export() {
        let graph = graph(
            &[("/main.js", "import { nope } from './a';"), ("/a.js", "export const a = 1;")],
            "/main.js",
        );
        let err = Linkage::resolve(&graph, false).unwrap_err();
        assert_eq!(err.code(), crate::bundler::codes::BUNDLE_MISSING_EXPORT);
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_default_not_reexported_by_star() {
        let graph = graph(
            &[
                ("/main.js", "import d from './mid';"),
                ("/mid.js", "export * from './a';"),
                ("/a.js", "export default 1;"),
            ],
            "/main.js",
        );
        assert!(Linkage::resolve(&graph, false).is_err());
    }

    #[test]
    fn test_star_cycle_terminates() {
        let graph = graph(
            &[
                ("/main.js", "import { z } from './a';"),
                ("/a.js", "export * from './b';"),
                ("/b.js", "export * from './a'; export const z = 1;"),
            ],
            "/main.js",
        );
        let linkage = Linkage::resolve(&graph, false).unwrap();
        let main = graph.id_of("/main.js").unwrap();
        assert_eq!(binding_name(&graph, &linkage.imports(main)[0].1), "/b.js#z");
    }

    #[test]
    fn test_external_and_namespace_targets() {
        let graph = graph(
            &[
                ("/main.js", "import React from 'react'; import * as ns from './a'; export { ns };"),
                ("/a.js", "export const a = 1; export { useState } from 'react';"),
            ],
            "/main.js",
        );
        let linkage = Linkage::resolve(&graph, true).unwrap();
        let main = graph.id_of("/main.js").unwrap();
        let a = graph.id_of("/a.js").unwrap();
        let targets: Vec<&ImportTarget> = linkage.imports(main).iter().map(|(_, t)| t).collect();
        assert_eq!(
            targets[0],
            &ImportTarget::External {
                specifier: "react".to_string(),
                imported: "default".to_string()
            }
        );
        assert_eq!(targets[1], &ImportTarget::Namespace(a));

        let namespace: Vec<&str> = linkage.namespace(a).iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(namespace, vec!["a", "useState"]);

        let refs: HashSet<(&str, &str)> = linkage.external_refs().collect();
        assert!(refs.contains(&("react", "default")));
        assert!(refs.contains(&("react", "useState")));

        // The entry re-exports its namespace binding, not the namespace itself.
        let [(name, target)] = linkage.entry_exports() else {
            panic!("expected one entry export");
        };
        assert_eq!(name, "ns");
        assert_eq!(binding_name(&graph, target), "/main.js#ns");
    }

    #[test]
    fn test_entry_star_externals() {
        let graph = graph(
            &[
                ("/main.js", "export * from './a'; export * from 'lodash';"),
                ("/a.js", "export * from 'react';"),
            ],
            "/main.js",
        );
        let linkage = Linkage::resolve(&graph, true).unwrap();
        let mut stars = linkage.entry_star_externals().to_vec();
        stars.sort();
        assert_eq!(stars, vec!["lodash".to_string(), "react".to_string()]);
    }

    #[test]
    fn test_strip_default_expression() {
        let mut ast = hoist_parser::parse("export default 1 + 2;").unwrap();
        let local = ast.alloc_ident("_default", Span::synthetic());
        if let StmtKind::Export(ExportDecl::Default { local: slot, .. }) = &mut ast.stmts[0].kind {
            *slot = Some(local);
        }
        let stmt = strip(ast.stmts.remove(0)).unwrap();
        ast.stmts.push(stmt);
        let out = hoist_parser::Codegen::new(&ast, hoist_parser::CodegenOptions::default()).generate();
        assert_eq!(out, "var _default = 1 + 2;\n");
    }
}

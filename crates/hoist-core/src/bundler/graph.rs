//! Module dependency graph.
//!
//! Discovery runs on the rayon pool: each task loads, parses and analyzes
//! one module, resolves its specifiers and spawns tasks for modules it is
//! the first to see. Admission (path to id) is the only shared step and
//! happens under one lock, so a module reached twice at once (diamonds,
//! cycles) is parsed exactly once.

use super::analyze::analyze;
use super::provider::{is_bare, join_specifier, Providers};
use super::scope::{ScopeTree, UnresolvedNames};
use crate::error::BundleError;
use hoist_parser::{Ast, LineIndex, ParseError, Parser, ParserOptions};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, trace};

/// Unique identifier for a module in the graph.
pub type ModuleId = usize;

/// Where a specifier leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Module(ModuleId),
    /// Left as an import in the output.
    External,
}

/// A parsed and analyzed module.
#[derive(Debug)]
pub struct ModuleRecord {
    pub id: ModuleId,
    /// Resolved path (or in-memory token).
    pub path: String,
    pub ast: Ast,
    pub scope: ScopeTree,
    /// Specifier edges in source order.
    pub edges: Vec<(String, Edge)>,
}

impl ModuleRecord {
    #[must_use]
    pub fn edge(&self, specifier: &str) -> Option<Edge> {
        self.edges
            .iter()
            .find(|(s, _)| s == specifier)
            .map(|&(_, edge)| edge)
    }
}

/// How modules are parsed and how specifiers that no provider owns are
/// treated.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Specifiers always left external.
    pub external: Vec<String>,
    /// Treat relative imports that leave `root` as external.
    pub library: bool,
    pub root: PathBuf,
    /// Accept JSX elements in module sources.
    pub jsx: bool,
}

/// The closed module graph.
#[derive(Debug)]
pub struct ModuleGraph {
    modules: Vec<ModuleRecord>,
    by_path: HashMap<String, ModuleId>,
    entry: ModuleId,
}

impl ModuleGraph {
    /// Discover every module reachable from `entry`.
    pub fn build(
        providers: &Providers,
        options: &ResolveOptions,
        unresolved: &UnresolvedNames,
        entry: &str,
    ) -> Result<Self, BundleError> {
        let Some((provider, entry_path)) = providers.match_path("", entry) else {
            return Err(BundleError::ModuleResolutionFailed {
                path: entry.to_string(),
                specifier: entry.to_string(),
            });
        };

        let builder = GraphBuilder {
            providers,
            options,
            unresolved,
            admission: Mutex::new(Admission::default()),
            slots: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            failed: AtomicBool::new(false),
        };
        let (entry_id, _) = builder.admit(&entry_path);
        rayon::scope(|scope| {
            builder.load(
                scope,
                Pending {
                    id: entry_id,
                    path: entry_path.clone(),
                    provider,
                    importer: String::new(),
                },
            );
        });

        let GraphBuilder {
            admission,
            slots,
            errors,
            ..
        } = builder;
        let mut errors = errors.into_inner().unwrap_or_else(PoisonError::into_inner);
        if !errors.is_empty() {
            errors.sort_by_key(|(id, _)| *id);
            let (_, err) = errors.swap_remove(0);
            return Err(err);
        }

        let admission = admission.into_inner().unwrap_or_else(PoisonError::into_inner);
        let mut modules = Vec::with_capacity(admission.next);
        for (id, slot) in slots
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .enumerate()
        {
            match slot {
                Some(record) => modules.push(record),
                None => {
                    return Err(BundleError::ModuleResolutionFailed {
                        path: entry_path.clone(),
                        specifier: format!("module #{id}"),
                    })
                }
            }
        }
        debug!(modules = modules.len(), entry = %entry_path, "module graph closed");
        Ok(Self {
            modules,
            by_path: admission.map,
            entry: entry_id,
        })
    }

    #[must_use]
    pub fn entry(&self) -> ModuleId {
        self.entry
    }

    #[must_use]
    pub fn module(&self, id: ModuleId) -> &ModuleRecord {
        &self.modules[id]
    }

    #[must_use]
    pub fn modules(&self) -> &[ModuleRecord] {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut [ModuleRecord] {
        &mut self.modules
    }

    #[must_use]
    pub fn id_of(&self, path: &str) -> Option<ModuleId> {
        self.by_path.get(path).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Dependencies before dependents, starting from the entry. Edges are
    /// followed in source order; a cycle is cut at its back edge.
    #[must_use]
    pub fn post_order(&self) -> Vec<ModuleId> {
        let mut order = Vec::with_capacity(self.modules.len());
        let mut visited = HashSet::default();
        let mut stack = vec![(self.entry, 0usize)];
        visited.insert(self.entry);
        while let Some((id, next)) = stack.pop() {
            let edges = &self.modules[id].edges;
            let child = edges[next..].iter().enumerate().find_map(|(offset, (_, edge))| match edge {
                Edge::Module(child) if !visited.contains(child) => Some((next + offset, *child)),
                _ => None,
            });
            match child {
                Some((index, child)) => {
                    stack.push((id, index + 1));
                    visited.insert(child);
                    stack.push((child, 0));
                }
                None => order.push(id),
            }
        }
        order
    }
}

// =============================================================================
// Discovery
// =============================================================================

#[derive(Debug, Default)]
struct Admission {
    map: HashMap<String, ModuleId>,
    next: ModuleId,
}

struct Pending {
    id: ModuleId,
    path: String,
    provider: usize,
    importer: String,
}

struct GraphBuilder<'a> {
    providers: &'a Providers,
    options: &'a ResolveOptions,
    unresolved: &'a UnresolvedNames,
    admission: Mutex<Admission>,
    slots: Mutex<Vec<Option<ModuleRecord>>>,
    errors: Mutex<Vec<(ModuleId, BundleError)>>,
    failed: AtomicBool,
}

impl GraphBuilder<'_> {
    /// Reserve an id for `path`, or return the one it already has.
    fn admit(&self, path: &str) -> (ModuleId, bool) {
        let mut admission = self.admission.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(&id) = admission.map.get(path) {
            return (id, false);
        }
        let id = admission.next;
        admission.next += 1;
        admission.map.insert(path.to_string(), id);
        (id, true)
    }

    fn load<'s>(&'s self, scope: &rayon::Scope<'s>, pending: Pending) {
        if self.failed.load(Ordering::Relaxed) {
            return;
        }
        let id = pending.id;
        match self.build_module(pending) {
            Ok((record, discovered)) => {
                let importer = record.path.clone();
                {
                    let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
                    if slots.len() <= id {
                        slots.resize_with(id + 1, || None);
                    }
                    slots[id] = Some(record);
                }
                for (child, path, provider) in discovered {
                    let importer = importer.clone();
                    scope.spawn(move |scope| {
                        self.load(
                            scope,
                            Pending {
                                id: child,
                                path,
                                provider,
                                importer,
                            },
                        );
                    });
                }
            }
            Err(err) => {
                self.failed.store(true, Ordering::Relaxed);
                self.errors
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((id, err));
            }
        }
    }

    /// Load, parse and analyze one module, and admit its dependencies.
    /// Returns the record and the newly admitted modules to load.
    #[allow(clippy::type_complexity)]
    fn build_module(&self, pending: Pending) -> Result<(ModuleRecord, Vec<(ModuleId, String, usize)>), BundleError> {
        let Pending {
            id,
            path,
            provider,
            importer,
        } = pending;
        trace!(module = id, path = %path, "loading module");
        let source = self.providers.load(provider, &importer, &path)?;
        let mut ast = Parser::new(&source, ParserOptions::module().with_jsx(self.options.jsx))
            .parse()
            .map_err(|err| parse_error(&path, &source, &err))?;
        let scope = analyze(&mut ast, &path, self.unresolved)?;

        let mut specifiers: Vec<&str> = scope.imports.specifiers().iter().map(String::as_str).collect();
        for external in scope.exports.external() {
            if !specifiers.contains(&external.specifier.as_str()) {
                specifiers.push(&external.specifier);
            }
        }

        let mut edges = Vec::with_capacity(specifiers.len());
        let mut discovered = Vec::new();
        for specifier in specifiers {
            let edge = match self.resolve(&path, specifier)? {
                Some((provider, resolved)) => {
                    let (child, is_new) = self.admit(&resolved);
                    if is_new {
                        discovered.push((child, resolved, provider));
                    }
                    Edge::Module(child)
                }
                None => Edge::External,
            };
            trace!(module = id, specifier, ?edge, "resolved specifier");
            edges.push((specifier.to_string(), edge));
        }

        Ok((
            ModuleRecord {
                id,
                path,
                ast,
                scope,
                edges,
            },
            discovered,
        ))
    }

    /// `None` marks an external module.
    fn resolve(&self, from: &str, specifier: &str) -> Result<Option<(usize, String)>, BundleError> {
        if self.options.external.iter().any(|e| e == specifier) || is_bare(specifier) {
            return Ok(None);
        }
        // Library mode keeps anything outside the root as an import, even
        // when a provider could load it.
        if self.options.library && !join_specifier(from, specifier).starts_with(&self.options.root) {
            return Ok(None);
        }
        if let Some(found) = self.providers.match_path(from, specifier) {
            return Ok(Some(found));
        }
        Err(BundleError::ModuleResolutionFailed {
            path: from.to_string(),
            specifier: specifier.to_string(),
        })
    }
}

fn parse_error(path: &str, source: &str, err: &ParseError) -> BundleError {
    let (line, column) = LineIndex::new(source).line_col_utf16(source, err.span.start);
    BundleError::Parse {
        path: path.to_string(),
        message: err.message.clone(),
        line: line + 1,
        column: column + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::provider::MemoryProvider;

    fn build(files: &[(&str, &str)], options: &ResolveOptions) -> Result<ModuleGraph, BundleError> {
        let mut provider = MemoryProvider::new();
        for (path, source) in files {
            provider.insert(*path, *source);
        }
        let mut providers = Providers::new();
        providers.push(provider);
        ModuleGraph::build(&providers, options, &UnresolvedNames::new(), files[0].0)
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = build(
            &[
                ("/src/a.js", "import { b } from './b';\nexport const a = 1;"),
                ("/src/b.js", "import { a } from './a';\nexport const b = 2;"),
            ],
            &ResolveOptions::default(),
        )
        .unwrap();
        assert_eq!(graph.len(), 2);
        let a = graph.id_of("/src/a.js").unwrap();
        let b = graph.id_of("/src/b.js").unwrap();
        assert_ne!(a, b);
        assert_eq!(graph.module(a).edge("./b"), Some(Edge::Module(b)));
        assert_eq!(graph.module(b).edge("./a"), Some(Edge::Module(a)));
        assert_eq!(graph.post_order(), vec![b, a]);
    }

    #[test]
    fn test_diamond_admits_once() {
        let graph = build(
            &[
                ("/main.js", "import './left';\nimport './right';"),
                ("/left.js", "import './shared';"),
                ("/right.js", "import './shared.js';"),
                ("/shared.js", "export const s = 1;"),
            ],
            &ResolveOptions::default(),
        )
        .unwrap();
        assert_eq!(graph.len(), 4);
        let order: Vec<&str> = graph.post_order().into_iter().map(|id| graph.module(id).path.as_str()).collect();
        assert_eq!(order, vec!["/shared.js", "/left.js", "/right.js", "/main.js"]);
    }

    #[test]
    fn test_bare_and_explicit_externals() {
        let options = ResolveOptions {
            external: vec!["./vendor".to_string()],
            ..ResolveOptions::default()
        };
        let graph = build(&[("/main.js", "import React from 'react';\nimport v from './vendor';")], &options).unwrap();
        let main = graph.module(graph.entry());
        assert_eq!(main.edge("react"), Some(Edge::External));
        assert_eq!(main.edge("./vendor"), Some(Edge::External));
    }

    #[test]
    fn test_unresolvable_import_fails() {
        let err = build(&[("/main.js", "import x from './missing';")], &ResolveOptions::default()).unwrap_err();
        assert!(matches!(err, BundleError::ModuleResolutionFailed { ref specifier, .. } if specifier == "./missing"));
    }

    #[test]
    fn test_library_mode_outside_root_is_external() {
        let options = ResolveOptions {
            library: true,
            root: PathBuf::from("/project"),
            ..ResolveOptions::default()
        };
        let graph = build(&[("/project/main.js", "import x from '../shared/x';")], &options).unwrap();
        assert_eq!(graph.module(graph.entry()).edge("../shared/x"), Some(Edge::External));
    }

    #[test]
    fn test_library_mode_keeps_loadable_module_outside_root() {
        let options = ResolveOptions {
            library: true,
            root: PathBuf::from("/project"),
            ..ResolveOptions::default()
        };
        let graph = build(
            &[
                ("/project/main.js", "import { y } from '../shared/y';\nimport { z } from './z';\ny + z;"),
                ("/shared/y.js", "export const y = 2;"),
                ("/project/z.js", "export const z = 3;"),
            ],
            &options,
        )
        .unwrap();
        assert_eq!(graph.len(), 2);
        assert!(graph.id_of("/shared/y.js").is_none());
        let main = graph.module(graph.entry());
        assert_eq!(main.edge("../shared/y"), Some(Edge::External));
        assert!(matches!(main.edge("./z"), Some(Edge::Module(_))));
    }

    #[test]
    fn test_parse_error_location() {
        let err = build(&[("/main.js", "let a = 1;\nlet b = ;")], &ResolveOptions::default()).unwrap_err();
        assert!(matches!(err, BundleError::Parse { line: 2, .. }));
    }
}

//! Two-phase renaming.
//!
//! Phase 1 (minify only) renames the bindings of nested scopes, module by
//! module on the rayon pool. Scopes are visited bottom-up and each scope's
//! generator starts from the merged generators of its children, so a name
//! handed out in a descendant is never reused by an ancestor.
//!
//! Phase 2 names every module-level binding from one namespace shared by
//! the whole bundle. Bindings tied together by imports are grouped with a
//! union-find and share a single name. A group's name must not be declared
//! in any scope that sits between one of its occurrences and the module
//! scope, or that declaration would capture the occurrence.

use super::graph::{ModuleGraph, ModuleId, ModuleRecord};
use super::link::{ImportTarget, Linkage};
use super::names::{is_reserved, MinifyNameGenerator, ReadableNameGenerator, UniqueNameGenerator};
use super::scope::{ScopeTree, VariableId};
use crate::error::BundleError;
use hoist_parser::is_identifier_name;
use rayon::prelude::*;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use std::cmp::Reverse;
use tracing::{debug, trace, warn};

/// Final names assigned by phase 2.
#[derive(Debug, Default)]
pub struct Naming {
    bindings: HashMap<(ModuleId, VariableId), String>,
    external: HashMap<(String, String), String>,
}

impl Naming {
    /// Final name of a module-level binding.
    #[must_use]
    pub fn binding(&self, module: ModuleId, variable: VariableId) -> Option<&str> {
        self.bindings.get(&(module, variable)).map(String::as_str)
    }

    /// Local name given to `imported` of the external module `specifier`.
    #[must_use]
    pub fn external(&self, specifier: &str, imported: &str) -> Option<&str> {
        self.external
            .get(&(specifier.to_string(), imported.to_string()))
            .map(String::as_str)
    }

    /// Name a linked reference prints as. Namespace objects have none.
    #[must_use]
    pub fn target(&self, target: &ImportTarget) -> Option<&str> {
        match target {
            ImportTarget::Binding { module, variable } => self.binding(*module, *variable),
            ImportTarget::External { specifier, imported } => self.external(specifier, imported),
            ImportTarget::Namespace(_) => None,
        }
    }
}

/// Rename every binding in the graph. `globals` are the names left
/// unresolved anywhere in the bundle; no binding ever takes one.
pub fn rename(
    graph: &mut ModuleGraph,
    linkage: &Linkage,
    globals: &HashSet<String>,
    minify: bool,
) -> Result<Naming, BundleError> {
    if minify {
        graph
            .modules_mut()
            .par_iter_mut()
            .try_for_each(|record| minify_nested_scopes(record, globals))?;
    }
    rename_roots(graph, linkage, globals, minify)
}

// =============================================================================
// Phase 1: nested scopes
// =============================================================================

fn minify_nested_scopes(record: &mut ModuleRecord, globals: &HashSet<String>) -> Result<(), BundleError> {
    let tree = &mut record.scope;
    let free = tree.free_names();
    let mut generators: Vec<Option<MinifyNameGenerator>> = vec![None; tree.scope_count()];
    let mut renamed = 0usize;

    for scope in tree.post_order() {
        if scope == ScopeTree::ROOT {
            continue;
        }
        let mut generator = MinifyNameGenerator::new();
        for &child in &tree.scope(scope).children {
            if let Some(child) = generators[child as usize].take() {
                generator.merge(&child);
            }
        }
        generator.restart();

        if tree.scope(scope).is_dynamic() {
            for (name, _) in tree.sorted_bindings(scope) {
                generator.reserve(name);
            }
        } else {
            let mut bindings: Vec<(String, usize)> = tree
                .sorted_bindings(scope)
                .into_iter()
                .map(|(name, id)| (name.to_string(), tree.variable(id).identifiers.len()))
                .collect();
            bindings.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

            let free = &free[scope as usize];
            let taken = |name: &str| globals.contains(name) || free.contains(name);
            let mut changes = Vec::with_capacity(bindings.len());
            for (name, _) in bindings {
                let new = generator.next_name(&name, &taken)?;
                changes.push((name, new));
            }
            renamed += changes.len();
            if !tree.batch_rename(&mut record.ast, scope, &changes) {
                warn!(path = %record.path, scope, "nested rename rejected");
            }
        }
        generators[scope as usize] = Some(generator);
    }

    trace!(path = %record.path, renamed, "minified nested scopes");
    Ok(())
}

// =============================================================================
// Phase 2: module scopes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Node {
    Binding { module: ModuleId, variable: VariableId },
    External { specifier: String, imported: String },
}

/// Disjoint sets over node indices.
#[derive(Debug, Default)]
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn push(&mut self) -> usize {
        self.parent.push(self.parent.len());
        self.parent.len() - 1
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parent[a.max(b)] = a.min(b);
        }
    }
}

/// Linked bindings that share one final name.
struct Group {
    members: Vec<usize>,
    /// Position of the earliest member's module in dependency order.
    position: usize,
    occurrences: usize,
    base: String,
    dynamic: bool,
}

#[derive(Default)]
struct Nodes {
    nodes: Vec<Node>,
    index: HashMap<Node, usize>,
    sets: UnionFind,
}

impl Nodes {
    fn intern(&mut self, node: Node) -> usize {
        if let Some(&id) = self.index.get(&node) {
            return id;
        }
        let id = self.sets.push();
        self.index.insert(node.clone(), id);
        self.nodes.push(node);
        id
    }

    fn external(&mut self, specifier: &str, imported: &str) -> usize {
        self.intern(Node::External {
            specifier: specifier.to_string(),
            imported: imported.to_string(),
        })
    }
}

fn rename_roots(
    graph: &mut ModuleGraph,
    linkage: &Linkage,
    globals: &HashSet<String>,
    minify: bool,
) -> Result<Naming, BundleError> {
    let order = graph.post_order();
    let mut position = vec![usize::MAX; graph.len()];
    for (index, &module) in order.iter().enumerate() {
        position[module] = index;
    }

    let mut nodes = Nodes::default();
    for &module in &order {
        for (_, variable) in graph.module(module).scope.sorted_bindings(ScopeTree::ROOT) {
            nodes.intern(Node::Binding { module, variable });
        }
    }
    for &module in &order {
        for (local, target) in linkage.imports(module) {
            let local = nodes.intern(Node::Binding {
                module,
                variable: *local,
            });
            let other = match target {
                ImportTarget::Binding { module, variable } => nodes.intern(Node::Binding {
                    module: *module,
                    variable: *variable,
                }),
                ImportTarget::External { specifier, imported } => nodes.external(specifier, imported),
                ImportTarget::Namespace(_) => continue,
            };
            nodes.sets.union(local, other);
        }
    }
    for (specifier, imported) in linkage.external_refs() {
        nodes.external(specifier, imported);
    }

    let groups = build_groups(graph, &mut nodes, &position);
    debug!(nodes = nodes.nodes.len(), groups = groups.len(), "grouped module bindings");

    let mut generator: Box<dyn UniqueNameGenerator> = if minify {
        Box::new(MinifyNameGenerator::with_reserved(globals.iter().map(String::as_str)))
    } else {
        Box::new(ReadableNameGenerator::with_reserved(globals.iter().map(String::as_str)))
    };

    let mut naming = Naming::default();
    let mut plans: Vec<Vec<(VariableId, usize)>> = vec![Vec::new(); graph.len()];
    for (group_id, group) in groups.iter().enumerate() {
        let mut captured = HashSet::default();
        for &member in &group.members {
            if let Node::Binding { module, variable } = nodes.nodes[member] {
                captured.extend(graph.module(module).scope.capture_set(variable));
            }
        }
        let taken = |name: &str| captured.contains(name);

        let keeps_original = minify
            && group.dynamic
            && !generator.is_used(&group.base)
            && !is_reserved(&group.base)
            && !taken(&group.base);
        let name = if keeps_original {
            generator.reserve(&group.base);
            group.base.clone()
        } else {
            generator.next_name(&group.base, &taken)?
        };

        for &member in &group.members {
            match &nodes.nodes[member] {
                Node::Binding { module, variable } => {
                    naming.bindings.insert((*module, *variable), name.clone());
                    plans[*module].push((*variable, group_id));
                }
                Node::External { specifier, imported } => {
                    naming
                        .external
                        .insert((specifier.clone(), imported.clone()), name.clone());
                }
            }
        }
    }

    graph.modules_mut().par_iter_mut().for_each(|record| {
        apply_plan(record, &plans[record.id], &naming);
    });
    Ok(naming)
}

fn build_groups(graph: &ModuleGraph, nodes: &mut Nodes, position: &[usize]) -> Vec<Group> {
    let mut by_root: HashMap<usize, usize> = HashMap::default();
    let mut groups: Vec<Group> = Vec::new();
    for member in 0..nodes.nodes.len() {
        let root = nodes.sets.find(member);
        let index = *by_root.entry(root).or_insert_with(|| {
            groups.push(Group {
                members: Vec::new(),
                position: usize::MAX,
                occurrences: 0,
                base: String::new(),
                dynamic: false,
            });
            groups.len() - 1
        });
        groups[index].members.push(member);
    }

    for group in &mut groups {
        let mut declared = None;
        let mut import_local = None;
        let mut external = None;
        for &member in &group.members {
            match &nodes.nodes[member] {
                Node::Binding { module, variable } => {
                    let tree = &graph.module(*module).scope;
                    let binding = tree.variable(*variable);
                    group.position = group.position.min(position[*module]);
                    group.occurrences += binding.identifiers.len();
                    group.dynamic |= tree.scope(ScopeTree::ROOT).is_dynamic();
                    if tree.imports.get(&binding.name).is_some() {
                        import_local.get_or_insert_with(|| binding.name.clone());
                    } else {
                        declared.get_or_insert_with(|| binding.name.clone());
                    }
                }
                Node::External { specifier, imported } => {
                    external.get_or_insert_with(|| external_base(specifier, imported));
                }
            }
        }
        group.base = declared.or(import_local).or(external).unwrap_or_else(|| "_".to_string());
    }

    groups.sort_by(|a, b| {
        (a.position, Reverse(a.occurrences), &a.base).cmp(&(b.position, Reverse(b.occurrences), &b.base))
    });
    groups
}

/// Readable base for an external import nobody declared a local for.
fn external_base(specifier: &str, imported: &str) -> String {
    if is_identifier_name(imported) && imported != "default" {
        return imported.to_string();
    }
    let stem = specifier.rsplit('/').find(|part| !part.is_empty() && *part != "." && *part != "..");
    let mut base: String = stem
        .unwrap_or(specifier)
        .trim_end_matches(".js")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
        base.insert(0, '_');
    }
    base
}

/// Merge same-group bindings of one module, then rename the module scope
/// in one batch.
fn apply_plan(record: &mut ModuleRecord, plan: &[(VariableId, usize)], naming: &Naming) {
    let tree = &mut record.scope;
    let mut first_of_group: HashMap<usize, String> = HashMap::default();
    let mut changes = Vec::with_capacity(plan.len());
    for &(variable, group) in plan {
        let current = tree.variable(variable).name.clone();
        match first_of_group.get(&group) {
            Some(into) => {
                if !tree.redirect(&mut record.ast, ScopeTree::ROOT, &current, into) {
                    warn!(path = %record.path, name = %current, "could not merge linked bindings");
                }
            }
            None => {
                first_of_group.insert(group, current.clone());
                if let Some(name) = naming.binding(record.id, variable) {
                    changes.push((current, name.to_string()));
                }
            }
        }
    }
    if !tree.batch_rename(&mut record.ast, ScopeTree::ROOT, &changes) {
        warn!(path = %record.path, "module scope rename rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::graph::ResolveOptions;
    use crate::bundler::provider::{MemoryProvider, Providers};
    use crate::bundler::scope::UnresolvedNames;
    use hoist_parser::{Codegen, CodegenOptions};

    struct Renamed {
        graph: ModuleGraph,
        naming: Naming,
    }

    fn run(files: &[(&str, &str)], entry: &str, minify: bool) -> Renamed {
        let mut memory = MemoryProvider::new();
        for (path, source) in files {
            memory.insert(*path, *source);
        }
        let mut providers = Providers::new();
        providers.push(memory);
        let unresolved = UnresolvedNames::new();
        let mut graph = ModuleGraph::build(&providers, &ResolveOptions::default(), &unresolved, entry).unwrap();
        let linkage = Linkage::resolve(&graph, true).unwrap();
        let naming = rename(&mut graph, &linkage, &unresolved.snapshot(), minify).unwrap();
        Renamed { graph, naming }
    }

    fn print(graph: &ModuleGraph, path: &str) -> String {
        let record = graph.module(graph.id_of(path).unwrap());
        Codegen::new(&record.ast, CodegenOptions::default()).generate()
    }

    fn root_name(graph: &ModuleGraph, path: &str, original: &str) -> String {
        let tree = &graph.module(graph.id_of(path).unwrap()).scope;
        let (name, _) = tree
            .sorted_bindings(ScopeTree::ROOT)
            .into_iter()
            .find(|(_, id)| tree.variable(*id).original_name() == original)
            .unwrap();
        name.to_string()
    }

    #[test]
    fn test_import_unifies_with_export() {
        let out = run(
            &[
                ("/a.js", "const helper = () => 1; export default helper;"),
                ("/b.js", "import helper from './a'; helper(); helper();"),
            ],
            "/b.js",
            true,
        );
        let defined = root_name(&out.graph, "/a.js", "helper");
        let used = root_name(&out.graph, "/b.js", "helper");
        assert_eq!(defined, used);

        let b = out.graph.module(out.graph.id_of("/b.js").unwrap());
        let names: HashSet<&str> = b.ast.idents.iter().map(|ident| ident.name.as_str()).collect();
        assert!(names.contains(defined.as_str()));
        assert!(!names.contains("helper"));
    }

    #[test]
    fn test_unrelated_helpers_do_not_collide() {
        let out = run(
            &[
                ("/main.js", "import './a'; import './b';"),
                ("/a.js", "function helper() {} helper();"),
                ("/b.js", "function helper() {} helper();"),
            ],
            "/main.js",
            false,
        );
        let a = root_name(&out.graph, "/a.js", "helper");
        let b = root_name(&out.graph, "/b.js", "helper");
        assert_ne!(a, b);
        assert_eq!(a, "helper");
        assert_eq!(b, "helper_1");
    }

    #[test]
    fn test_globals_are_never_generated() {
        let out = run(
            &[
                ("/main.js", "import './a'; console.log(a);"),
                ("/a.js", "var a = 1, console = 2;"),
            ],
            "/main.js",
            true,
        );
        let a = root_name(&out.graph, "/a.js", "a");
        let console = root_name(&out.graph, "/a.js", "console");
        for name in [&a, &console] {
            assert_ne!(name, "a");
            assert_ne!(name, "console");
        }
    }

    #[test]
    fn test_no_capture_by_inner_binding() {
        let out = run(
            &[(
                "/main.js",
                "var value = 1; function read(a) { return value + a; } read(2);",
            )],
            "/main.js",
            true,
        );
        // Whatever `value` becomes, the parameter must not shadow it.
        let code = print(&out.graph, "/main.js");
        let value = root_name(&out.graph, "/main.js", "value");
        let param_line = code.lines().find(|line| line.starts_with("function")).unwrap();
        assert!(!param_line.contains(&format!("({value})")), "{code}");
    }

    #[test]
    fn test_minify_shortens_nested_bindings() {
        let out = run(
            &[("/main.js", "function f(first, second) { let third = first + second; return third; } f(1, 2);")],
            "/main.js",
            true,
        );
        let code = print(&out.graph, "/main.js");
        assert!(!code.contains("first"), "{code}");
        assert!(!code.contains("third"), "{code}");
    }

    #[test]
    fn test_eval_keeps_names() {
        let out = run(
            &[("/main.js", "var keep = 1; function f(local) { return eval('local + keep'); } f(keep);")],
            "/main.js",
            true,
        );
        let code = print(&out.graph, "/main.js");
        assert!(code.contains("function f(local)"), "{code}");
        assert_eq!(root_name(&out.graph, "/main.js", "keep"), "keep");
    }

    #[test]
    fn test_external_imports_share_one_name() {
        let out = run(
            &[
                ("/main.js", "import React from 'react'; import './a'; React;"),
                ("/a.js", "import R from 'react'; R;"),
            ],
            "/main.js",
            false,
        );
        let main = root_name(&out.graph, "/main.js", "React");
        let a = root_name(&out.graph, "/a.js", "R");
        assert_eq!(main, a);
        assert_eq!(out.naming.external("react", "default"), Some(main.as_str()));
    }

    #[test]
    fn test_duplicate_imports_in_one_module_merge() {
        let out = run(
            &[
                ("/main.js", "import { x as a, x as b } from './x'; a + b;"),
                ("/x.js", "export const x = 1;"),
            ],
            "/main.js",
            false,
        );
        let code = print(&out.graph, "/main.js");
        assert!(code.ends_with("x + x;\n"), "{code}");
    }

    #[test]
    fn test_external_base() {
        assert_eq!(external_base("react-dom/client", "default"), "client");
        assert_eq!(external_base("lodash", "map"), "map");
        assert_eq!(external_base("@scope/pkg", "*"), "pkg");
        assert_eq!(external_base("./9lives.js", "default"), "_9lives");
    }
}

//! Lexical scope tree for one module.
//!
//! Scopes and bindings live in flat arenas addressed by index; a scope
//! knows its parent and owns its children through an id list. Bindings
//! hold the identifier occurrences that denote them as `IdentId` handles
//! into the module's `Ast`, so renaming a binding rewrites every
//! occurrence at once without touching the tree.
//!
//! Identifier uses are collected per scope while the module is walked and
//! resolved afterwards (`resolve_all`), because a use may precede its
//! declaration.

use super::exports::ExportTable;
use super::imports::ImportTable;
use hoist_parser::{Ast, IdentId, VarKind};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use std::sync::{Mutex, PoisonError};

/// Index of a scope in its `ScopeTree`.
pub type ScopeId = u32;

/// Index of a binding in its `ScopeTree`.
pub type VariableId = u32;

/// Scope tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Module,
    Global,
    Function,
    Block,
    Switch,
    Catch,
    With,
    Class,
    For,
    /// Holds the name of a named function expression.
    FunctionExpressionName,
    VariableDeclarator,
    TemporalDeadZone,
}

impl ScopeKind {
    /// Whether `var` declarations stop here.
    #[must_use]
    pub fn is_var_target(self) -> bool {
        matches!(self, Self::Function | Self::Module | Self::Global)
    }
}

/// A declared binding and its occurrences.
#[derive(Debug, Clone)]
pub struct Variable {
    pub kind: VarKind,
    /// Current name.
    pub name: String,
    /// Name before the first rename.
    pub external_name: Option<String>,
    /// Declaring scope.
    pub scope: ScopeId,
    /// Every occurrence, declaration first.
    pub identifiers: Vec<IdentId>,
}

impl Variable {
    /// Name as written in the source.
    #[must_use]
    pub fn original_name(&self) -> &str {
        self.external_name.as_deref().unwrap_or(&self.name)
    }
}

/// One lexical scope.
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    variables: HashMap<String, VariableId>,
    unresolved: Vec<IdentId>,
    dynamic: bool,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            variables: HashMap::default(),
            unresolved: Vec::new(),
            dynamic: false,
        }
    }

    /// Bound name to binding id.
    #[must_use]
    pub fn variables(&self) -> &HashMap<String, VariableId> {
        &self.variables
    }

    /// References not bound (yet).
    #[must_use]
    pub fn unresolved(&self) -> &[IdentId] {
        &self.unresolved
    }

    /// Contains (or encloses) `eval` or `with`; names cannot be changed.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

/// A scope-local failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("'{name}' has already been declared")]
    DuplicateBinding {
        name: String,
        /// First occurrence of the existing binding.
        existing: IdentId,
    },
}

/// Scope tree of one module, rooted at its module scope.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    variables: Vec<Variable>,
    /// Scope each occurrence appears in (not the declaring scope).
    ident_scope: HashMap<IdentId, ScopeId>,
    simple_catch_params: HashSet<VariableId>,
    pub imports: ImportTable,
    pub exports: ExportTable,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// Root module scope id.
    pub const ROOT: ScopeId = 0;

    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Module, None)],
            variables: Vec::new(),
            ident_scope: HashMap::default(),
            simple_catch_params: HashSet::default(),
            imports: ImportTable::new(),
            exports: ExportTable::new(),
        }
    }

    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id as usize]
    }

    #[must_use]
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id as usize]
    }

    #[must_use]
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Open a child scope.
    pub fn push_scope(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = self.scopes.len() as ScopeId;
        self.scopes.push(Scope::new(kind, Some(parent)));
        self.scopes[parent as usize].children.push(id);
        id
    }

    fn var_target(&self, mut scope: ScopeId) -> ScopeId {
        loop {
            let current = &self.scopes[scope as usize];
            match current.parent {
                Some(parent) if !current.kind.is_var_target() => scope = parent,
                _ => return scope,
            }
        }
    }

    /// Declare `name` at `ident`, seen in scope `current`.
    ///
    /// `var` hoists to the nearest function or module scope and merges
    /// with an existing `var` or function binding of the same name. It may
    /// not pass a lexical binding of that name on the way, except a plain
    /// `catch (name)` parameter: the declarator then writes the parameter
    /// while the name also hoists, so the parameter is folded into the
    /// hoisted binding and both always print alike. Any other
    /// redeclaration fails.
    pub fn create_binding(
        &mut self,
        current: ScopeId,
        ident: IdentId,
        name: &str,
        kind: VarKind,
    ) -> Result<VariableId, ScopeError> {
        let target = if kind == VarKind::Var {
            self.var_target(current)
        } else {
            current
        };
        self.ident_scope.insert(ident, current);

        let mut catch_params = Vec::new();
        let mut scope = current;
        while scope != target {
            let inner = &self.scopes[scope as usize];
            if let Some(&existing) = inner.variables.get(name) {
                if !self.simple_catch_params.contains(&existing) {
                    return Err(ScopeError::DuplicateBinding {
                        name: name.to_string(),
                        existing: self.variables[existing as usize].identifiers[0],
                    });
                }
                catch_params.push((scope, existing));
            }
            match inner.parent {
                Some(parent) => scope = parent,
                None => break,
            }
        }

        let id = self.bind(target, ident, name, kind)?;
        for (scope, param) in catch_params {
            self.scopes[scope as usize].variables.remove(name);
            let identifiers = std::mem::take(&mut self.variables[param as usize].identifiers);
            self.variables[id as usize].identifiers.extend(identifiers);
        }
        Ok(id)
    }

    fn bind(&mut self, target: ScopeId, ident: IdentId, name: &str, kind: VarKind) -> Result<VariableId, ScopeError> {
        if let Some(&existing) = self.scopes[target as usize].variables.get(name) {
            let variable = &mut self.variables[existing as usize];
            let mergeable = matches!(kind, VarKind::Var | VarKind::Init)
                && matches!(variable.kind, VarKind::Var | VarKind::Init);
            if !mergeable {
                return Err(ScopeError::DuplicateBinding {
                    name: name.to_string(),
                    existing: variable.identifiers[0],
                });
            }
            if kind == VarKind::Init {
                variable.kind = VarKind::Init;
            }
            variable.identifiers.push(ident);
            return Ok(existing);
        }

        let id = self.variables.len() as VariableId;
        self.variables.push(Variable {
            kind,
            name: name.to_string(),
            external_name: None,
            scope: target,
            identifiers: vec![ident],
        });
        self.scopes[target as usize].variables.insert(name.to_string(), id);
        Ok(id)
    }

    /// Mark `name`, bound in catch scope `scope`, as a plain identifier
    /// parameter that `var` declarations in the body may reuse.
    pub fn mark_simple_catch_param(&mut self, scope: ScopeId, name: &str) {
        if let Some(&id) = self.scopes[scope as usize].variables.get(name) {
            self.simple_catch_params.insert(id);
        }
    }

    /// Record a use of `ident` in scope `current`, bound later.
    pub fn add_unresolved(&mut self, current: ScopeId, ident: IdentId) {
        self.ident_scope.insert(ident, current);
        self.scopes[current as usize].unresolved.push(ident);
    }

    /// Bind every collected use to the nearest enclosing declaration.
    ///
    /// Uses with no declaration move to the module scope's backlog; their
    /// distinct names are returned (sorted).
    pub fn resolve_all(&mut self, ast: &Ast) -> Vec<String> {
        let mut leftover = Vec::new();
        let mut stack = vec![Self::ROOT];
        while let Some(scope) = stack.pop() {
            let pending = std::mem::take(&mut self.scopes[scope as usize].unresolved);
            for ident in pending {
                match self.lookup(scope, ast.name(ident)) {
                    Some(variable) => self.variables[variable as usize].identifiers.push(ident),
                    None => leftover.push(ident),
                }
            }
            stack.extend(self.scopes[scope as usize].children.iter().rev());
        }

        let mut names: Vec<String> = leftover.iter().map(|&id| ast.name(id).to_string()).collect();
        names.sort_unstable();
        names.dedup();
        self.scopes[Self::ROOT as usize].unresolved = leftover;
        names
    }

    /// Nearest binding of `name` visible from `scope`.
    #[must_use]
    pub fn lookup(&self, mut scope: ScopeId, name: &str) -> Option<VariableId> {
        loop {
            let current = &self.scopes[scope as usize];
            if let Some(&id) = current.variables.get(name) {
                return Some(id);
            }
            scope = current.parent?;
        }
    }

    /// Binding of `name` declared directly in `scope`.
    #[must_use]
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<VariableId> {
        self.scopes[scope as usize].variables.get(name).copied()
    }

    /// Module-level binding of `name`.
    #[must_use]
    pub fn root_binding(&self, name: &str) -> Option<&Variable> {
        self.lookup_local(Self::ROOT, name).map(|id| self.variable(id))
    }

    /// Rename one bound name of `scope`. Returns false, changing nothing,
    /// when `old` is not bound there or `new` already is.
    pub fn rename_binding(&mut self, ast: &mut Ast, scope: ScopeId, old: &str, new: &str) -> bool {
        self.batch_rename(ast, scope, &[(old.to_string(), new.to_string())])
    }

    /// Apply every `(old, new)` pair at once, or none of them.
    ///
    /// Each `old` must be bound in `scope` (and listed once), and the
    /// resulting name set must have no duplicates. Pairs apply
    /// simultaneously, so swaps and rotations are accepted. Renames at the
    /// module scope keep the import and export tables in step.
    pub fn batch_rename(&mut self, ast: &mut Ast, scope: ScopeId, changes: &[(String, String)]) -> bool {
        let bound = &self.scopes[scope as usize].variables;
        let mut olds = HashSet::default();
        for (old, _) in changes {
            if !bound.contains_key(old) || !olds.insert(old.as_str()) {
                return false;
            }
        }
        let mut finals = HashSet::default();
        for (_, new) in changes {
            if new.is_empty() || !finals.insert(new.as_str()) {
                return false;
            }
            if bound.contains_key(new) && !olds.contains(new.as_str()) {
                return false;
            }
        }

        let moved: Vec<(VariableId, &String, &String)> = changes
            .iter()
            .filter_map(|(old, new)| {
                let id = self.scopes[scope as usize].variables.remove(old)?;
                Some((id, old, new))
            })
            .collect();
        for &(id, old, new) in &moved {
            let variable = &mut self.variables[id as usize];
            if variable.external_name.is_none() {
                variable.external_name = Some(old.clone());
            }
            variable.name.clone_from(new);
            for &ident in &variable.identifiers {
                ast.set_name(ident, new);
            }
            self.scopes[scope as usize].variables.insert(new.clone(), id);
        }

        if scope == Self::ROOT {
            self.imports.rename_locals(changes);
            self.exports.rename_locals(changes);
        }
        true
    }

    /// Fold binding `from` into `into` (both in `scope`): every occurrence
    /// of `from` takes `into`'s name and joins its occurrence list.
    pub fn redirect(&mut self, ast: &mut Ast, scope: ScopeId, from: &str, into: &str) -> bool {
        if from == into {
            return true;
        }
        let variables = &self.scopes[scope as usize].variables;
        let (Some(&from_id), Some(&into_id)) = (variables.get(from), variables.get(into)) else {
            return false;
        };
        self.scopes[scope as usize].variables.remove(from);
        let identifiers = std::mem::take(&mut self.variables[from_id as usize].identifiers);
        let name = self.variables[into_id as usize].name.clone();
        for &ident in &identifiers {
            ast.set_name(ident, &name);
        }
        self.variables[into_id as usize].identifiers.extend(identifiers);
        if scope == Self::ROOT {
            self.imports.merge_local(from, into);
            self.exports.rename_locals(&[(from.to_string(), into.to_string())]);
        }
        true
    }

    /// Mark `scope` and all its ancestors dynamic.
    pub fn mark_dynamic(&mut self, scope: ScopeId) {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &mut self.scopes[id as usize];
            if scope.dynamic {
                break;
            }
            scope.dynamic = true;
            current = scope.parent;
        }
    }

    /// Names bound in scopes between any occurrence of `variable` and its
    /// declaring scope. Giving the binding one of these names would let
    /// an inner declaration capture that occurrence.
    #[must_use]
    pub fn capture_set(&self, variable: VariableId) -> HashSet<String> {
        let variable = self.variable(variable);
        let mut visited = HashSet::default();
        let mut names = HashSet::default();
        for ident in &variable.identifiers {
            let Some(&start) = self.ident_scope.get(ident) else {
                continue;
            };
            let mut scope = start;
            while scope != variable.scope && visited.insert(scope) {
                let current = &self.scopes[scope as usize];
                names.extend(current.variables.keys().cloned());
                match current.parent {
                    Some(parent) => scope = parent,
                    None => break,
                }
            }
        }
        names
    }

    /// For every scope, the names of outer bindings used inside it or its
    /// descendants. A binding of that scope must not take one of them.
    #[must_use]
    pub fn free_names(&self) -> Vec<HashSet<String>> {
        let mut free = vec![HashSet::default(); self.scopes.len()];
        for variable in &self.variables {
            let mut visited = HashSet::default();
            for ident in &variable.identifiers {
                let Some(&start) = self.ident_scope.get(ident) else {
                    continue;
                };
                let mut scope = start;
                while scope != variable.scope && visited.insert(scope) {
                    free[scope as usize].insert(variable.name.clone());
                    match self.scopes[scope as usize].parent {
                        Some(parent) => scope = parent,
                        None => break,
                    }
                }
            }
        }
        free
    }

    /// Scope ids in post-order (children before parents).
    #[must_use]
    pub fn post_order(&self) -> Vec<ScopeId> {
        let mut order = Vec::with_capacity(self.scopes.len());
        let mut stack = vec![(Self::ROOT, false)];
        while let Some((scope, expanded)) = stack.pop() {
            if expanded {
                order.push(scope);
                continue;
            }
            stack.push((scope, true));
            for &child in self.scopes[scope as usize].children.iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Bindings declared in `scope`, sorted by name.
    #[must_use]
    pub fn sorted_bindings(&self, scope: ScopeId) -> Vec<(&str, VariableId)> {
        let mut bindings: Vec<(&str, VariableId)> = self.scopes[scope as usize]
            .variables
            .iter()
            .map(|(name, &id)| (name.as_str(), id))
            .collect();
        bindings.sort_unstable_by(|a, b| a.0.cmp(b.0));
        bindings
    }
}

// =============================================================================
// Unresolved-name collector
// =============================================================================

/// Names left unresolved at any module root during one bundle run.
///
/// Shared between the workers that analyze modules; renaming never hands
/// out a collected name.
#[derive(Debug, Default)]
pub struct UnresolvedNames {
    names: Mutex<HashSet<String>>,
}

impl UnresolvedNames {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, names: impl IntoIterator<Item = String>) {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(names);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    #[must_use]
    pub fn snapshot(&self) -> HashSet<String> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::imports::ImportEntry;
    use hoist_parser::Span;

    fn ident(ast: &mut Ast, name: &str) -> IdentId {
        ast.alloc_ident(name, Span::new(0, 0))
    }

    #[test]
    fn test_var_hoists_past_blocks() {
        let mut ast = Ast::default();
        let mut tree = ScopeTree::new();
        let function = tree.push_scope(ScopeTree::ROOT, ScopeKind::Function);
        let block = tree.push_scope(function, ScopeKind::Block);
        let decl = ident(&mut ast, "x");
        let id = tree.create_binding(block, decl, "x", VarKind::Var).unwrap();
        assert_eq!(tree.variable(id).scope, function);
        assert!(tree.lookup_local(block, "x").is_none());
    }

    #[test]
    fn test_redeclaration() {
        let mut ast = Ast::default();
        let mut tree = ScopeTree::new();
        let first = ident(&mut ast, "a");
        let second = ident(&mut ast, "a");
        tree.create_binding(ScopeTree::ROOT, first, "a", VarKind::Let).unwrap();
        assert_eq!(
            tree.create_binding(ScopeTree::ROOT, second, "a", VarKind::Let),
            Err(ScopeError::DuplicateBinding {
                name: "a".to_string(),
                existing: first,
            })
        );

        let v1 = ident(&mut ast, "v");
        let v2 = ident(&mut ast, "v");
        let a = tree.create_binding(ScopeTree::ROOT, v1, "v", VarKind::Var).unwrap();
        let b = tree.create_binding(ScopeTree::ROOT, v2, "v", VarKind::Var).unwrap();
        assert_eq!(a, b);
        assert_eq!(tree.variable(a).identifiers, vec![v1, v2]);
    }

    #[test]
    fn test_var_conflicts_with_outer_let_in_target() {
        let mut ast = Ast::default();
        let mut tree = ScopeTree::new();
        let block = tree.push_scope(ScopeTree::ROOT, ScopeKind::Block);
        let outer = ident(&mut ast, "x");
        let inner = ident(&mut ast, "x");
        tree.create_binding(ScopeTree::ROOT, outer, "x", VarKind::Let).unwrap();
        assert!(tree.create_binding(block, inner, "x", VarKind::Var).is_err());
    }

    #[test]
    fn test_var_conflicts_with_let_in_intermediate_scope() {
        let mut ast = Ast::default();
        let mut tree = ScopeTree::new();
        let outer = tree.push_scope(ScopeTree::ROOT, ScopeKind::Block);
        let inner = tree.push_scope(outer, ScopeKind::Block);
        let lexical = ident(&mut ast, "x");
        let hoisted = ident(&mut ast, "x");
        tree.create_binding(outer, lexical, "x", VarKind::Let).unwrap();
        assert_eq!(
            tree.create_binding(inner, hoisted, "x", VarKind::Var),
            Err(ScopeError::DuplicateBinding {
                name: "x".to_string(),
                existing: lexical,
            })
        );
        assert!(tree.root_binding("x").is_none());
    }

    #[test]
    fn test_var_folds_simple_catch_param() {
        let mut ast = Ast::default();
        let mut tree = ScopeTree::new();
        let function = tree.push_scope(ScopeTree::ROOT, ScopeKind::Function);
        let catch = tree.push_scope(function, ScopeKind::Catch);
        let param = ident(&mut ast, "e");
        let declarator = ident(&mut ast, "e");
        tree.create_binding(catch, param, "e", VarKind::Let).unwrap();
        tree.mark_simple_catch_param(catch, "e");
        let hoisted = tree.create_binding(catch, declarator, "e", VarKind::Var).unwrap();
        assert_eq!(tree.variable(hoisted).scope, function);
        assert_eq!(tree.variable(hoisted).identifiers, vec![declarator, param]);
        assert!(tree.lookup_local(catch, "e").is_none());
    }

    #[test]
    fn test_resolve_nearest_and_globals() {
        let mut ast = Ast::default();
        let mut tree = ScopeTree::new();
        let function = tree.push_scope(ScopeTree::ROOT, ScopeKind::Function);
        let outer = ident(&mut ast, "x");
        let inner = ident(&mut ast, "x");
        let use_inner = ident(&mut ast, "x");
        let use_global = ident(&mut ast, "console");
        let outer_id = tree.create_binding(ScopeTree::ROOT, outer, "x", VarKind::Var).unwrap();
        let inner_id = tree.create_binding(function, inner, "x", VarKind::Var).unwrap();
        tree.add_unresolved(function, use_inner);
        tree.add_unresolved(function, use_global);

        let globals = tree.resolve_all(&ast);
        assert_eq!(globals, vec!["console".to_string()]);
        assert_eq!(tree.variable(inner_id).identifiers, vec![inner, use_inner]);
        assert_eq!(tree.variable(outer_id).identifiers, vec![outer]);
        assert_eq!(tree.scope(ScopeTree::ROOT).unresolved(), &[use_global]);
    }

    #[test]
    fn test_rename_unknown_name_is_noop() {
        let mut ast = Ast::default();
        let mut tree = ScopeTree::new();
        let a = ident(&mut ast, "a");
        tree.create_binding(ScopeTree::ROOT, a, "a", VarKind::Const).unwrap();
        assert!(!tree.rename_binding(&mut ast, ScopeTree::ROOT, "missing", "b"));
        assert_eq!(ast.name(a), "a");
    }

    #[test]
    fn test_batch_swap_and_conflict() {
        let mut ast = Ast::default();
        let mut tree = ScopeTree::new();
        let a = ident(&mut ast, "a");
        let b = ident(&mut ast, "b");
        let c = ident(&mut ast, "c");
        for (id, name) in [(a, "a"), (b, "b"), (c, "c")] {
            tree.create_binding(ScopeTree::ROOT, id, name, VarKind::Let).unwrap();
        }

        let swap = [("a".to_string(), "b".to_string()), ("b".to_string(), "a".to_string())];
        assert!(tree.batch_rename(&mut ast, ScopeTree::ROOT, &swap));
        assert_eq!((ast.name(a), ast.name(b)), ("b", "a"));

        // `c` stays bound, so renaming onto it fails and nothing changes.
        let clash = [("a".to_string(), "z".to_string()), ("b".to_string(), "c".to_string())];
        assert!(!tree.batch_rename(&mut ast, ScopeTree::ROOT, &clash));
        assert_eq!((ast.name(a), ast.name(b), ast.name(c)), ("b", "a", "c"));
    }

    #[test]
    fn test_redirect_merges_occurrences() {
        let mut ast = Ast::default();
        let mut tree = ScopeTree::new();
        let a = ident(&mut ast, "a");
        let b = ident(&mut ast, "b");
        let a_id = tree.create_binding(ScopeTree::ROOT, a, "a", VarKind::Const).unwrap();
        tree.create_binding(ScopeTree::ROOT, b, "b", VarKind::Const).unwrap();
        tree.imports.add(ImportEntry {
            local: "b".to_string(),
            is_namespace: false,
            imported: "b".to_string(),
            specifier: "./b".to_string(),
        });
        assert!(tree.redirect(&mut ast, ScopeTree::ROOT, "b", "a"));
        assert_eq!(ast.name(b), "a");
        assert_eq!(tree.variable(a_id).identifiers, vec![a, b]);
        assert!(tree.lookup_local(ScopeTree::ROOT, "b").is_none());
        assert!(tree.imports.get("b").is_none());
        assert_eq!(tree.imports.get("a").unwrap().specifier, "./b");
    }

    #[test]
    fn test_capture_set_and_dynamic() {
        let mut ast = Ast::default();
        let mut tree = ScopeTree::new();
        let function = tree.push_scope(ScopeTree::ROOT, ScopeKind::Function);
        let block = tree.push_scope(function, ScopeKind::Block);
        let decl = ident(&mut ast, "helper");
        let local = ident(&mut ast, "a");
        let inner = ident(&mut ast, "b");
        let usage = ident(&mut ast, "helper");
        let helper = tree.create_binding(ScopeTree::ROOT, decl, "helper", VarKind::Init).unwrap();
        tree.create_binding(function, local, "a", VarKind::Var).unwrap();
        tree.create_binding(block, inner, "b", VarKind::Let).unwrap();
        tree.add_unresolved(block, usage);
        tree.resolve_all(&ast);

        let captured = tree.capture_set(helper);
        assert!(captured.contains("a") && captured.contains("b"));
        assert!(!captured.contains("helper"));

        let free = tree.free_names();
        assert!(free[block as usize].contains("helper"));
        assert!(free[function as usize].contains("helper"));
        assert!(free[ScopeTree::ROOT as usize].is_empty());

        tree.mark_dynamic(block);
        assert!(tree.scope(function).is_dynamic());
        assert!(tree.scope(ScopeTree::ROOT).is_dynamic());
    }

    #[test]
    fn test_post_order() {
        let mut tree = ScopeTree::new();
        let f = tree.push_scope(ScopeTree::ROOT, ScopeKind::Function);
        let b = tree.push_scope(f, ScopeKind::Block);
        let g = tree.push_scope(ScopeTree::ROOT, ScopeKind::Function);
        assert_eq!(tree.post_order(), vec![b, f, g, ScopeTree::ROOT]);
    }

    #[test]
    fn test_unresolved_names_shared() {
        let names = UnresolvedNames::new();
        names.record(["console".to_string(), "window".to_string()]);
        assert!(names.contains("console"));
        assert_eq!(names.snapshot().len(), 2);
    }
}

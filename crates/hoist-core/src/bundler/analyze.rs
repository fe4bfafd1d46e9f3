//! Module analysis: AST to scope tree.
//!
//! One walk over the module declares bindings, opens scopes, records
//! identifier uses, and fills the import and export tables. Uses are
//! resolved once the walk is done. Errors are collected for the whole
//! module and reported together.

use super::exports::{DuplicateExport, ExportInfo};
use super::imports::ImportEntry;
use super::names::is_reserved;
use super::scope::{ScopeError, ScopeId, ScopeKind, ScopeTree, UnresolvedNames};
use crate::error::BundleError;
use hoist_parser::{
    is_identifier_name, ArrowBody, ArrowFunction, Ast, Class, ClassMember, DefaultExport, ExportDecl, Expr,
    ExprKind, ForHead, ForInit, Function, IdentId, ImportDecl, ImportSpecifier, LineIndex, ObjectMember, Pattern,
    PropertyKey, Span, Stmt, StmtKind, VarDecl, VarKind,
};
use tracing::debug;

/// Base name for the binding that holds an anonymous default export.
const DEFAULT_LOCAL: &str = "_default";

/// Build the scope tree of a parsed module.
///
/// Names left unresolved at the module root are added to `unresolved`.
/// Anonymous `export default` values get a fresh module-level binding,
/// stored in the export's `local` slot.
pub fn analyze(ast: &mut Ast, path: &str, unresolved: &UnresolvedNames) -> Result<ScopeTree, BundleError> {
    let mut stmts = std::mem::take(&mut ast.stmts);
    let mut analyzer = Analyzer {
        line_index: LineIndex::new(&ast.source),
        ast,
        path,
        tree: ScopeTree::new(),
        scope: ScopeTree::ROOT,
        errors: Vec::new(),
        defaults: Vec::new(),
    };

    for (index, stmt) in stmts.iter_mut().enumerate() {
        analyzer.visit_top_level(index, stmt);
    }

    let globals = analyzer.tree.resolve_all(analyzer.ast);
    analyzer.finish_defaults(&mut stmts, &globals);
    analyzer.check_export_locals();
    unresolved.record(globals);

    let Analyzer { tree, errors, ast, .. } = analyzer;
    ast.stmts = stmts;

    if let Some(err) = BundleError::from_many(errors) {
        return Err(err);
    }
    debug!(
        path,
        scopes = tree.scope_count(),
        imports = tree.imports.len(),
        "analyzed module"
    );
    Ok(tree)
}

#[derive(Debug, Clone, Copy)]
enum PatternMode {
    Declare(VarKind),
    Assign,
}

/// An `export default` waiting for its binding name.
struct PendingDefault {
    stmt: usize,
    ident: IdentId,
    kind: VarKind,
    /// `export default name;` may reuse `name` when it is a constant.
    alias: Option<IdentId>,
    span: Span,
}

struct Analyzer<'a> {
    ast: &'a mut Ast,
    path: &'a str,
    line_index: LineIndex,
    tree: ScopeTree,
    scope: ScopeId,
    errors: Vec<BundleError>,
    defaults: Vec<PendingDefault>,
}

impl Analyzer<'_> {
    // =========================================================================
    // Helpers
    // =========================================================================

    fn location(&self, span: Span) -> (u32, u32) {
        if span.is_synthetic() {
            return (1, 1);
        }
        let (line, column) = self.line_index.line_col_utf16(&self.ast.source, span.start);
        (line + 1, column + 1)
    }

    fn with_scope(&mut self, kind: ScopeKind, f: impl FnOnce(&mut Self)) {
        let parent = self.scope;
        self.scope = self.tree.push_scope(parent, kind);
        f(self);
        self.scope = parent;
    }

    fn declare(&mut self, ident: IdentId, kind: VarKind) {
        let name = self.ast.name(ident).to_string();
        if let Err(ScopeError::DuplicateBinding { name, .. }) =
            self.tree.create_binding(self.scope, ident, &name, kind)
        {
            let (line, column) = self.location(self.ast.ident(ident).span);
            self.errors.push(BundleError::DuplicateBinding {
                path: self.path.to_string(),
                name,
                line,
                column,
            });
        }
    }

    fn reference(&mut self, ident: IdentId) {
        self.tree.add_unresolved(self.scope, ident);
    }

    fn add_export(&mut self, info: ExportInfo, span: Span) {
        if let Err(DuplicateExport(name)) = self.tree.exports.add(info) {
            self.duplicate_export(name, span);
        }
    }

    fn duplicate_export(&mut self, name: String, span: Span) {
        let (line, column) = self.location(span);
        self.errors.push(BundleError::DuplicateExport {
            path: self.path.to_string(),
            name,
            line,
            column,
        });
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn visit_top_level(&mut self, index: usize, stmt: &mut Stmt) {
        let span = stmt.span;
        if let StmtKind::Export(ExportDecl::Default { value, local, .. }) = &mut stmt.kind {
            self.visit_default_export(index, value, local, span);
            return;
        }
        self.visit_stmt(stmt);
    }

    fn visit_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Var(decl) => self.visit_var_decl(decl),
            StmtKind::Function(func) => {
                if let Some(id) = func.id {
                    self.declare(id, VarKind::Init);
                }
                self.visit_function(func);
            }
            StmtKind::Class(class) => {
                if let Some(id) = class.id {
                    self.declare(id, VarKind::Let);
                }
                self.visit_class(class, false);
            }
            StmtKind::Block(stmts) => self.with_scope(ScopeKind::Block, |this| this.visit_stmts(stmts)),
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.visit_expr(test);
                self.visit_stmt(consequent);
                if let Some(alternate) = alternate {
                    self.visit_stmt(alternate);
                }
            }
            StmtKind::Switch { discriminant, cases } => {
                self.visit_expr(discriminant);
                self.with_scope(ScopeKind::Switch, |this| {
                    for case in cases {
                        if let Some(test) = &case.test {
                            this.visit_expr(test);
                        }
                        this.visit_stmts(&case.consequent);
                    }
                });
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => self.with_scope(ScopeKind::For, |this| {
                match init {
                    Some(ForInit::Var(decl)) => this.visit_var_decl(decl),
                    Some(ForInit::Expr(expr)) => this.visit_expr(expr),
                    None => {}
                }
                if let Some(test) = test {
                    this.visit_expr(test);
                }
                if let Some(update) = update {
                    this.visit_expr(update);
                }
                this.visit_stmt(body);
            }),
            StmtKind::ForIn { left, right, body } | StmtKind::ForOf { left, right, body, .. } => {
                self.with_scope(ScopeKind::For, |this| {
                    match left {
                        ForHead::Var(decl) => this.visit_var_decl(decl),
                        ForHead::Pattern(pattern) => this.visit_pattern(pattern, PatternMode::Assign),
                    }
                    this.visit_expr(right);
                    this.visit_stmt(body);
                });
            }
            StmtKind::While { test, body } | StmtKind::DoWhile { body, test } => {
                self.visit_expr(test);
                self.visit_stmt(body);
            }
            StmtKind::Return(arg) => {
                if let Some(arg) = arg {
                    self.visit_expr(arg);
                }
            }
            StmtKind::Throw(expr) | StmtKind::Expr(expr) => self.visit_expr(expr),
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.with_scope(ScopeKind::Block, |this| this.visit_stmts(block));
                if let Some(handler) = handler {
                    self.with_scope(ScopeKind::Catch, |this| {
                        if let Some(param) = &handler.param {
                            this.visit_pattern(param, PatternMode::Declare(VarKind::Let));
                            if let Pattern::Ident(id) = param {
                                let name = this.ast.name(*id).to_string();
                                this.tree.mark_simple_catch_param(this.scope, &name);
                            }
                        }
                        this.visit_stmts(&handler.body);
                    });
                }
                if let Some(finalizer) = finalizer {
                    self.with_scope(ScopeKind::Block, |this| this.visit_stmts(finalizer));
                }
            }
            StmtKind::Labeled { body, .. } => self.visit_stmt(body),
            StmtKind::With { object, body } => {
                self.visit_expr(object);
                self.with_scope(ScopeKind::With, |this| {
                    this.tree.mark_dynamic(this.scope);
                    this.visit_stmt(body);
                });
            }
            StmtKind::Import(import) => self.visit_import(import),
            StmtKind::Export(export) => self.visit_export(export),
            StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Empty | StmtKind::Debugger => {}
        }
    }

    fn visit_var_decl(&mut self, decl: &VarDecl) {
        for declarator in &decl.decls {
            if let Some(init) = &declarator.init {
                self.visit_expr(init);
            }
            self.visit_pattern(&declarator.target, PatternMode::Declare(decl.kind));
        }
    }

    // =========================================================================
    // Modules
    // =========================================================================

    fn visit_import(&mut self, import: &ImportDecl) {
        if import.specifiers.is_empty() {
            self.tree.imports.add_specifier(&import.source);
            return;
        }
        for spec in &import.specifiers {
            let local = spec.local();
            let (imported, is_namespace) = match spec {
                ImportSpecifier::Default { .. } => ("default".to_string(), false),
                ImportSpecifier::Namespace { .. } => ("*".to_string(), true),
                ImportSpecifier::Named { imported, .. } => (imported.clone(), false),
            };
            let scope = self.scope;
            self.scope = ScopeTree::ROOT;
            self.declare(local, VarKind::Const);
            self.scope = scope;
            self.tree.imports.add(ImportEntry {
                local: self.ast.name(local).to_string(),
                is_namespace,
                imported,
                specifier: import.source.clone(),
            });
        }
    }

    fn visit_export(&mut self, export: &ExportDecl) {
        match export {
            ExportDecl::Named {
                specifiers,
                source: None,
                ..
            } => {
                for spec in specifiers {
                    let local = self.ast.name(spec.local).to_string();
                    if !is_identifier_name(&local) || is_reserved(&local) {
                        let (line, column) = self.location(spec.span);
                        self.errors.push(BundleError::UnknownExportSpecifier {
                            path: self.path.to_string(),
                            name: local,
                            line,
                            column,
                        });
                        continue;
                    }
                    self.reference(spec.local);
                    self.add_export(
                        ExportInfo {
                            export_name: spec.exported.clone(),
                            local_name: local,
                            is_default_decl: false,
                        },
                        spec.span,
                    );
                }
            }
            ExportDecl::Named {
                specifiers,
                source: Some(source),
                ..
            } => {
                for spec in specifiers {
                    let local = self.ast.name(spec.local).to_string();
                    if let Err(DuplicateExport(name)) = self.tree.exports.add_reexport(source, &local, &spec.exported) {
                        self.duplicate_export(name, spec.span);
                    }
                }
            }
            ExportDecl::All {
                alias: Some(alias),
                span,
                ..
            } => {
                let (line, column) = self.location(*span);
                self.errors.push(BundleError::UnsupportedExportForm {
                    path: self.path.to_string(),
                    form: format!("export * as {alias}"),
                    line,
                    column,
                });
            }
            ExportDecl::All {
                alias: None, source, ..
            } => self.tree.exports.add_export_all(source),
            ExportDecl::Decl(stmt) => {
                self.visit_stmt(stmt);
                let mut declared = Vec::new();
                match &stmt.kind {
                    StmtKind::Var(decl) => {
                        for declarator in &decl.decls {
                            pattern_idents(&declarator.target, &mut declared);
                        }
                    }
                    StmtKind::Function(func) => match func.id {
                        Some(id) => declared.push(id),
                        None => self.missing_identifier("function", func.span),
                    },
                    StmtKind::Class(class) => match class.id {
                        Some(id) => declared.push(id),
                        None => self.missing_identifier("class", class.span),
                    },
                    _ => {
                        let (line, column) = self.location(stmt.span);
                        self.errors.push(BundleError::UnsupportedExportForm {
                            path: self.path.to_string(),
                            form: "export of a non-declaration statement".to_string(),
                            line,
                            column,
                        });
                    }
                }
                for id in declared {
                    let name = self.ast.name(id).to_string();
                    self.add_export(
                        ExportInfo {
                            export_name: name.clone(),
                            local_name: name,
                            is_default_decl: false,
                        },
                        self.ast.ident(id).span,
                    );
                }
            }
            // Only reachable for a default export nested below the top level,
            // which the parser rejects.
            ExportDecl::Default { span, .. } => {
                let (line, column) = self.location(*span);
                self.errors.push(BundleError::UnsupportedExportForm {
                    path: self.path.to_string(),
                    form: "nested export default".to_string(),
                    line,
                    column,
                });
            }
        }
    }

    fn missing_identifier(&mut self, what: &'static str, span: Span) {
        let (line, column) = self.location(span);
        self.errors.push(BundleError::MissingIdentifier {
            path: self.path.to_string(),
            what,
            line,
            column,
        });
    }

    fn visit_default_export(
        &mut self,
        index: usize,
        value: &mut DefaultExport,
        local: &mut Option<IdentId>,
        span: Span,
    ) {
        let named = match value {
            DefaultExport::Function(func) => func.id.map(|id| (id, VarKind::Init)),
            DefaultExport::Class(class) => class.id.map(|id| (id, VarKind::Let)),
            DefaultExport::Expr(_) => None,
        };
        if let Some((id, kind)) = named {
            self.declare(id, kind);
            *local = Some(id);
            let name = self.ast.name(id).to_string();
            self.add_export(
                ExportInfo {
                    export_name: "default".to_string(),
                    local_name: name,
                    is_default_decl: true,
                },
                span,
            );
        } else {
            let ident = self.ast.alloc_ident(DEFAULT_LOCAL, Span::synthetic());
            *local = Some(ident);
            let (kind, alias) = match value {
                DefaultExport::Function(func) => {
                    func.id = Some(ident);
                    (VarKind::Init, None)
                }
                DefaultExport::Class(class) => {
                    class.id = Some(ident);
                    (VarKind::Let, None)
                }
                DefaultExport::Expr(expr) => match expr.kind {
                    ExprKind::Ident(id) => (VarKind::Var, Some(id)),
                    _ => (VarKind::Var, None),
                },
            };
            self.defaults.push(PendingDefault {
                stmt: index,
                ident,
                kind,
                alias,
                span,
            });
        }

        match value {
            DefaultExport::Function(func) => self.visit_function(func),
            DefaultExport::Class(class) => self.visit_class(class, false),
            DefaultExport::Expr(expr) => self.visit_expr(expr),
        }
    }

    /// Name the bindings of anonymous default exports. Runs after
    /// resolution so the chosen name avoids every module-level binding and
    /// every free name of the module.
    fn finish_defaults(&mut self, stmts: &mut [Stmt], globals: &[String]) {
        for pending in std::mem::take(&mut self.defaults) {
            if let Some(alias) = pending.alias {
                let name = self.ast.name(alias).to_string();
                let is_constant = self
                    .tree
                    .root_binding(&name)
                    .is_some_and(|variable| variable.kind == VarKind::Const);
                if is_constant {
                    if let StmtKind::Export(ExportDecl::Default { local, .. }) = &mut stmts[pending.stmt].kind {
                        *local = None;
                    }
                    self.add_export(
                        ExportInfo {
                            export_name: "default".to_string(),
                            local_name: name,
                            is_default_decl: true,
                        },
                        pending.span,
                    );
                    continue;
                }
            }

            let mut name = DEFAULT_LOCAL.to_string();
            let mut counter = 0;
            while self.tree.lookup_local(ScopeTree::ROOT, &name).is_some() || globals.contains(&name) {
                counter += 1;
                name = format!("{DEFAULT_LOCAL}_{counter}");
            }
            let ident = &mut self.ast.idents[pending.ident as usize];
            ident.name.clone_from(&name);
            ident.original.clone_from(&name);

            self.declare(pending.ident, pending.kind);
            self.add_export(
                ExportInfo {
                    export_name: "default".to_string(),
                    local_name: name,
                    is_default_decl: true,
                },
                pending.span,
            );
        }
    }

    /// `export { name }` must name a module-level binding.
    fn check_export_locals(&mut self) {
        let missing: Vec<String> = self
            .tree
            .exports
            .iter()
            .filter(|info| self.tree.root_binding(&info.local_name).is_none())
            .map(|info| info.local_name.clone())
            .collect();
        for name in missing {
            self.errors.push(BundleError::UnknownExportSpecifier {
                path: self.path.to_string(),
                name,
                line: 1,
                column: 1,
            });
        }
    }

    // =========================================================================
    // Functions and Classes
    // =========================================================================

    /// Parameters and body share one function scope.
    fn visit_function(&mut self, func: &Function) {
        self.with_scope(ScopeKind::Function, |this| {
            for param in &func.params {
                this.visit_pattern(&param.pattern, PatternMode::Declare(VarKind::Var));
            }
            this.visit_stmts(&func.body);
        });
    }

    fn visit_function_expr(&mut self, func: &Function) {
        match func.id {
            Some(id) => self.with_scope(ScopeKind::FunctionExpressionName, |this| {
                this.declare(id, VarKind::Init);
                this.visit_function(func);
            }),
            None => self.visit_function(func),
        }
    }

    fn visit_arrow(&mut self, arrow: &ArrowFunction) {
        self.with_scope(ScopeKind::Function, |this| {
            for param in &arrow.params {
                this.visit_pattern(&param.pattern, PatternMode::Declare(VarKind::Var));
            }
            match &arrow.body {
                ArrowBody::Expr(expr) => this.visit_expr(expr),
                ArrowBody::Block(stmts) => this.visit_stmts(stmts),
            }
        });
    }

    /// Class body. An expression's own name is bound inside the class scope.
    fn visit_class(&mut self, class: &Class, is_expression: bool) {
        if let Some(super_class) = &class.super_class {
            self.visit_expr(super_class);
        }
        self.with_scope(ScopeKind::Class, |this| {
            if is_expression {
                if let Some(id) = class.id {
                    this.declare(id, VarKind::Let);
                }
            }
            for member in &class.members {
                match member {
                    ClassMember::Method { key, value, .. } => {
                        this.visit_property_key(key);
                        this.visit_function(value);
                    }
                    ClassMember::Field { key, value, .. } => {
                        this.visit_property_key(key);
                        if let Some(value) = value {
                            this.visit_expr(value);
                        }
                    }
                    ClassMember::StaticBlock(stmts) => {
                        this.with_scope(ScopeKind::Function, |this| this.visit_stmts(stmts));
                    }
                }
            }
        });
    }

    fn visit_property_key(&mut self, key: &PropertyKey) {
        if let PropertyKey::Computed(expr) = key {
            self.visit_expr(expr);
        }
    }

    // =========================================================================
    // Patterns and Expressions
    // =========================================================================

    fn visit_pattern(&mut self, pattern: &Pattern, mode: PatternMode) {
        match pattern {
            Pattern::Ident(id) => match mode {
                PatternMode::Declare(kind) => self.declare(*id, kind),
                PatternMode::Assign => self.reference(*id),
            },
            Pattern::Array { elements, rest, .. } => {
                for element in elements.iter().flatten() {
                    self.visit_pattern(element, mode);
                }
                if let Some(rest) = rest {
                    self.visit_pattern(rest, mode);
                }
            }
            Pattern::Object { props, rest, .. } => {
                for prop in props {
                    self.visit_property_key(&prop.key);
                    self.visit_pattern(&prop.value, mode);
                }
                if let Some(rest) = rest {
                    self.visit_pattern(rest, mode);
                }
            }
            Pattern::Assign { target, default } => {
                self.visit_expr(default);
                self.visit_pattern(target, mode);
            }
            Pattern::Expr(expr) => self.visit_expr(expr),
        }
    }

    fn visit_exprs(&mut self, exprs: &[Expr]) {
        for expr in exprs {
            self.visit_expr(expr);
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(id) => self.reference(*id),
            ExprKind::Template(template) => self.visit_exprs(&template.exprs),
            ExprKind::TaggedTemplate { tag, quasi } => {
                self.visit_expr(tag);
                self.visit_exprs(&quasi.exprs);
            }
            ExprKind::Array(items) => {
                for item in items.iter().flatten() {
                    self.visit_expr(item);
                }
            }
            ExprKind::Object(members) => {
                for member in members {
                    match member {
                        ObjectMember::Property(prop) => {
                            self.visit_property_key(&prop.key);
                            match &prop.value.kind {
                                ExprKind::Function(func)
                                    if matches!(prop.kind, VarKind::Method | VarKind::Get | VarKind::Set) =>
                                {
                                    self.visit_function(func);
                                }
                                _ => self.visit_expr(&prop.value),
                            }
                        }
                        ObjectMember::Spread(expr) => self.visit_expr(expr),
                    }
                }
            }
            ExprKind::Function(func) => self.visit_function_expr(func),
            ExprKind::Arrow(arrow) => self.visit_arrow(arrow),
            ExprKind::Class(class) => self.visit_class(class, true),
            ExprKind::Unary { arg, .. } | ExprKind::Update { arg, .. } => self.visit_expr(arg),
            ExprKind::Binary { left, right, .. } => {
                self.visit_expr(left);
                self.visit_expr(right);
            }
            ExprKind::Assign { target, value, .. } => {
                self.visit_pattern(target, PatternMode::Assign);
                self.visit_expr(value);
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.visit_expr(test);
                self.visit_expr(consequent);
                self.visit_expr(alternate);
            }
            ExprKind::Sequence(exprs) => self.visit_exprs(exprs),
            ExprKind::Member { object, .. } => self.visit_expr(object),
            ExprKind::Index { object, index, .. } => {
                self.visit_expr(object);
                self.visit_expr(index);
            }
            ExprKind::Call { callee, args, .. } => {
                if let ExprKind::Ident(id) = callee.kind {
                    match self.ast.name(id) {
                        "eval" => self.tree.mark_dynamic(self.scope),
                        "require" => {
                            if let [Expr {
                                kind: ExprKind::Str(raw),
                                ..
                            }] = args.as_slice()
                            {
                                self.tree.imports.add_require(unquote(raw));
                            }
                        }
                        _ => {}
                    }
                }
                self.visit_expr(callee);
                self.visit_exprs(args);
            }
            ExprKind::New { callee, args } => {
                self.visit_expr(callee);
                self.visit_exprs(args);
            }
            ExprKind::Spread(arg) | ExprKind::Await(arg) | ExprKind::Import(arg) => self.visit_expr(arg),
            ExprKind::Yield { arg, .. } => {
                if let Some(arg) = arg {
                    self.visit_expr(arg);
                }
            }
            ExprKind::Null
            | ExprKind::Bool(_)
            | ExprKind::Number(_)
            | ExprKind::BigInt(_)
            | ExprKind::Str(_)
            | ExprKind::Regex { .. }
            | ExprKind::This
            | ExprKind::Super
            | ExprKind::MetaProperty { .. } => {}
        }
    }
}

/// Binding identifiers of a declaration pattern, in source order.
fn pattern_idents(pattern: &Pattern, out: &mut Vec<IdentId>) {
    match pattern {
        Pattern::Ident(id) => out.push(*id),
        Pattern::Array { elements, rest, .. } => {
            for element in elements.iter().flatten() {
                pattern_idents(element, out);
            }
            if let Some(rest) = rest {
                pattern_idents(rest, out);
            }
        }
        Pattern::Object { props, rest, .. } => {
            for prop in props {
                pattern_idents(&prop.value, out);
            }
            if let Some(rest) = rest {
                pattern_idents(rest, out);
            }
        }
        Pattern::Assign { target, .. } => pattern_idents(target, out),
        Pattern::Expr(_) => {}
    }
}

/// Strip the quotes of a raw string literal.
fn unquote(raw: &str) -> &str {
    raw.get(1..raw.len().saturating_sub(1)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoist_parser::{parse, Codegen, CodegenOptions};

    fn analyzed(source: &str) -> (Ast, ScopeTree) {
        let mut ast = parse(source).unwrap();
        let tree = analyze(&mut ast, "/src/test.js", &UnresolvedNames::new()).unwrap();
        (ast, tree)
    }

    fn print(ast: &Ast) -> String {
        Codegen::new(ast, CodegenOptions::default()).generate()
    }

    #[test]
    fn test_var_in_block_shares_binding() {
        let (ast, tree) = analyzed("function f() { if (true) { var x = 1; } return x; }");
        let occurrences: Vec<IdentId> = (0..ast.idents.len() as IdentId)
            .filter(|&id| ast.name(id) == "x")
            .collect();
        assert_eq!(occurrences.len(), 2);
        let function = tree.scope(ScopeTree::ROOT).children[0];
        let x = tree.lookup_local(function, "x").unwrap();
        assert_eq!(tree.variable(x).identifiers, occurrences);
    }

    #[test]
    fn test_parameter_shadows_outer() {
        let (mut ast, mut tree) = analyzed("var x; function f(x) { return x; }");
        assert!(tree.rename_binding(&mut ast, ScopeTree::ROOT, "x", "outer"));
        assert_eq!(print(&ast), "var outer;\nfunction f(x) {\n  return x;\n}\n");
    }

    #[test]
    fn test_let_redeclaration_fails() {
        let mut ast = parse("let a;\nlet a;").unwrap();
        let err = analyze(&mut ast, "/src/a.js", &UnresolvedNames::new()).unwrap_err();
        assert!(matches!(
            err,
            BundleError::DuplicateBinding { ref name, line: 2, column: 5, .. } if name == "a"
        ));

        let (_, tree) = analyzed("var a; var a;");
        assert_eq!(tree.root_binding("a").unwrap().identifiers.len(), 2);
    }

    #[test]
    fn test_errors_reported_together() {
        let mut ast = parse("let a; let a; const b = 1; const b = 2;").unwrap();
        let err = analyze(&mut ast, "/src/a.js", &UnresolvedNames::new()).unwrap_err();
        assert!(matches!(err, BundleError::Multiple(ref errors) if errors.len() == 2));
    }

    #[test]
    fn test_destructuring_rename_targets_binding_only() {
        let (mut ast, mut tree) = analyzed("var { name } = obj;");
        assert!(tree.rename_binding(&mut ast, ScopeTree::ROOT, "name", "renamed"));
        assert_eq!(print(&ast), "var { name: renamed } = obj;\n");

        let (mut ast, mut tree) = analyzed("var { name: other } = obj;");
        assert!(!tree.rename_binding(&mut ast, ScopeTree::ROOT, "name", "renamed"));
        assert_eq!(print(&ast), "var { name: other } = obj;\n");
    }

    #[test]
    fn test_export_alias_follows_rename() {
        let (mut ast, mut tree) = analyzed("const name = 3;\nexport { name as foo };");
        assert!(tree.rename_binding(&mut ast, ScopeTree::ROOT, "name", "renamed"));
        assert_eq!(print(&ast), "const renamed = 3;\nexport { renamed as foo };\n");
        assert_eq!(tree.exports.by_export_name("foo").unwrap().local_name, "renamed");
    }

    #[test]
    fn test_import_table() {
        let (_, tree) = analyzed(
            "import React, { useState as state } from 'react';\nimport * as ns from './ns';\nimport './side.js';\nconst fs = require('fs');",
        );
        let react = tree.imports.get("React").unwrap();
        assert_eq!((react.imported.as_str(), react.specifier.as_str()), ("default", "react"));
        assert_eq!(tree.imports.get("state").unwrap().imported, "useState");
        assert!(tree.imports.get("ns").unwrap().is_namespace);
        assert_eq!(tree.imports.specifiers().len(), 3);
        assert_eq!(tree.imports.require_calls(), &["fs".to_string()]);
        assert_eq!(tree.root_binding("React").unwrap().kind, VarKind::Const);
    }

    #[test]
    fn test_export_forms() {
        let (_, tree) = analyzed(
            "export const a = 1, { b } = {};\nexport function f() {}\nexport class C {}\nexport { x as y } from './x';\nexport * from './all';",
        );
        for name in ["a", "b", "f", "C"] {
            assert_eq!(tree.exports.by_export_name(name).unwrap().local_name, name);
        }
        assert_eq!(tree.exports.reexport("y"), Some(("./x", "x")));
        assert!(tree.exports.external()[1].is_export_all);
    }

    #[test]
    fn test_anonymous_default_gets_binding() {
        let (ast, tree) = analyzed("const _default = 1;\nexport default function () {}");
        let info = tree.exports.by_export_name("default").unwrap();
        assert_eq!(info.local_name, "_default_1");
        assert!(info.is_default_decl);
        assert_eq!(tree.root_binding("_default_1").unwrap().kind, VarKind::Init);
        let StmtKind::Export(ExportDecl::Default { local: Some(local), .. }) = &ast.stmts[1].kind else {
            panic!("expected default export");
        };
        assert_eq!(ast.name(*local), "_default_1");
    }

    #[test]
    fn test_default_of_constant_is_alias() {
        let (ast, tree) = analyzed("const helper = 1;\nexport default helper;");
        assert_eq!(tree.exports.by_export_name("default").unwrap().local_name, "helper");
        assert!(tree.root_binding("_default").is_none());
        assert!(matches!(
            &ast.stmts[1].kind,
            StmtKind::Export(ExportDecl::Default { local: None, .. })
        ));

        let (_, tree) = analyzed("let counter = 1;\nexport default counter;");
        assert_eq!(tree.exports.by_export_name("default").unwrap().local_name, "_default");
    }

    #[test]
    fn test_export_errors() {
        let cases = [
            ("export class {}", crate::bundler::codes::BUNDLE_MISSING_IDENTIFIER),
            ("export * as ns from './x';", crate::bundler::codes::BUNDLE_UNSUPPORTED_EXPORT_FORM),
            ("const a = 1; export { a, a };", crate::bundler::codes::BUNDLE_DUPLICATE_EXPORT),
            ("export { missing };", crate::bundler::codes::BUNDLE_UNKNOWN_EXPORT_SPECIFIER),
        ];
        for (source, code) in cases {
            let mut ast = parse(source).unwrap();
            let err = analyze(&mut ast, "/src/a.js", &UnresolvedNames::new()).unwrap_err();
            assert_eq!(err.code(), code, "{source}");
        }
    }

    #[test]
    fn test_globals_collected_and_eval_marks_dynamic() {
        let unresolved = UnresolvedNames::new();
        let mut ast = parse("function f(a) { eval(a); console.log(a); }").unwrap();
        let tree = analyze(&mut ast, "/src/a.js", &unresolved).unwrap();
        assert!(unresolved.contains("console"));
        assert!(unresolved.contains("eval"));
        let function = tree.scope(ScopeTree::ROOT).children[0];
        assert!(tree.scope(function).is_dynamic());
    }

    #[test]
    fn test_var_reusing_catch_param_folds_bindings() {
        let (mut ast, mut tree) = analyzed("function f() { try { throw 0; } catch (e) { var e = 1; } return e; }");
        let occurrences: Vec<IdentId> = (0..ast.idents.len() as IdentId)
            .filter(|&id| ast.name(id) == "e")
            .collect();
        assert_eq!(occurrences.len(), 3);
        let function = tree.scope(ScopeTree::ROOT).children[0];
        let e = tree.lookup_local(function, "e").unwrap();
        let mut identifiers = tree.variable(e).identifiers.clone();
        identifiers.sort_unstable();
        assert_eq!(identifiers, occurrences);

        // Parameter, declarator and the later read all follow one rename.
        assert!(tree.rename_binding(&mut ast, function, "e", "z"));
        assert!(occurrences.iter().all(|&id| ast.name(id) == "z"));
    }

    #[test]
    fn test_var_crossing_lexical_binding_fails() {
        for source in [
            "{ let x; { var x; } }",
            "for (let i = 0; ; ) { var i; }",
            "try {} catch ({ e }) { var e; }",
            "try {} catch (e) { let x; { var x; } }",
        ] {
            let mut ast = parse(source).unwrap();
            let err = analyze(&mut ast, "/src/a.js", &UnresolvedNames::new()).unwrap_err();
            assert_eq!(err.code(), crate::bundler::codes::BUNDLE_DUPLICATE_BINDING, "{source}");
        }
    }

    #[test]
    fn test_catch_and_class_scopes() {
        let (_, tree) = analyzed("try {} catch (e) { var e2 = e; }\nconst K = class Named { m() { return Named; } };");
        assert!(tree.root_binding("e2").is_some());
        assert!(tree.root_binding("e").is_none());
        assert!(tree.root_binding("Named").is_none());
        assert!(tree.root_binding("K").is_some());
    }
}

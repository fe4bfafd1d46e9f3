//! JavaScript code generator.
//!
//! Converts an AST back to JavaScript source code. Identifier text is read
//! from the AST's identifier arena, so renames applied there show up in the
//! output without any extra bookkeeping here.

use crate::ast::*;
use crate::span::{LineIndex, Span};

/// Code generation options.
#[derive(Debug, Clone, Default)]
pub struct CodegenOptions {
    /// Minify output (no indentation or newlines).
    pub minify: bool,
    /// Record source mappings.
    pub source_map: bool,
}

/// A source map mapping. Lines and columns are 0-indexed; columns count
/// UTF-16 code units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMapping {
    pub gen_line: u32,
    pub gen_col: u32,
    pub orig_line: u32,
    pub orig_col: u32,
    /// Original name, set for identifiers printed under a different name.
    pub name: Option<String>,
}

// Precedence levels used to decide where parentheses are required.
const PREC_SEQUENCE: u8 = 1;
const PREC_ASSIGN: u8 = 2;
const PREC_CONDITIONAL: u8 = 3;
const PREC_UNARY: u8 = 16;
const PREC_POSTFIX: u8 = 17;
const PREC_CALL: u8 = 19;
const PREC_ATOM: u8 = 20;

/// The code generator.
pub struct Codegen<'a> {
    ast: &'a Ast,
    options: CodegenOptions,
    output: String,
    indent_level: usize,
    /// Last character written, for token separation.
    last: Option<char>,
    /// Generated position, tracked only when mapping.
    line: u32,
    col: u32,
    line_index: Option<LineIndex>,
    mappings: Vec<SourceMapping>,
}

impl<'a> Codegen<'a> {
    /// Create a new code generator.
    #[must_use]
    pub fn new(ast: &'a Ast, options: CodegenOptions) -> Self {
        let line_index = options.source_map.then(|| LineIndex::new(&ast.source));
        Self {
            ast,
            options,
            output: String::new(),
            indent_level: 0,
            last: None,
            line: 0,
            col: 0,
            line_index,
            mappings: Vec::new(),
        }
    }

    /// Generate JavaScript source code.
    #[must_use]
    pub fn generate(self) -> String {
        self.generate_with_source_map().0
    }

    /// Generate JavaScript source code with source mappings.
    #[must_use]
    pub fn generate_with_source_map(mut self) -> (String, Vec<SourceMapping>) {
        let ast = self.ast;
        for stmt in &ast.stmts {
            self.emit_stmt(stmt);
            if !self.options.minify {
                self.write("\n");
            }
        }
        (self.output, self.mappings)
    }

    // =========================================================================
    // Output Helpers
    // =========================================================================

    /// Append text verbatim.
    fn write(&mut self, s: &str) {
        if self.options.source_map {
            for ch in s.chars() {
                if ch == '\n' {
                    self.line += 1;
                    self.col = 0;
                } else {
                    self.col += ch.len_utf16() as u32;
                }
            }
        }
        self.output.push_str(s);
        if let Some(ch) = s.chars().last() {
            self.last = Some(ch);
        }
    }

    /// Insert a space if `next` would otherwise fuse with the previous token.
    fn separate(&mut self, next: &str) {
        let (Some(last), Some(first)) = (self.last, next.chars().next()) else {
            return;
        };
        let fuses = (is_ident_char(last) && is_ident_char(first))
            || (last == '+' && first == '+')
            || (last == '-' && first == '-')
            || (last == '/' && first == '/');
        if fuses {
            self.write(" ");
        }
    }

    fn emit(&mut self, s: &str) {
        self.separate(s);
        self.write(s);
    }

    fn emit_space(&mut self) {
        if !self.options.minify {
            self.write(" ");
        }
    }

    fn emit_newline(&mut self) {
        if !self.options.minify {
            self.write("\n");
            for _ in 0..self.indent_level {
                self.write("  ");
            }
        }
    }

    fn emit_semicolon(&mut self) {
        self.write(";");
    }

    fn emit_comma(&mut self) {
        self.write(",");
        self.emit_space();
    }

    fn add_mapping(&mut self, span: Span, name: Option<String>) {
        if span.is_synthetic() {
            return;
        }
        let Some(index) = &self.line_index else {
            return;
        };
        let (orig_line, orig_col) = index.line_col_utf16(&self.ast.source, span.start);
        self.mappings.push(SourceMapping {
            gen_line: self.line,
            gen_col: self.col,
            orig_line,
            orig_col,
            name,
        });
    }

    fn emit_ident(&mut self, id: IdentId) {
        let ast = self.ast;
        let ident = ast.ident(id);
        self.separate(&ident.name);
        let name = (ident.name != ident.original).then(|| ident.original.clone());
        self.add_mapping(ident.span, name);
        self.write(&ident.name);
    }

    fn emit_mapped(&mut self, s: &str, span: Span) {
        self.separate(s);
        self.add_mapping(span, None);
        self.write(s);
    }

    fn emit_quoted(&mut self, value: &str) {
        let mut quoted = String::with_capacity(value.len() + 2);
        quoted.push('\'');
        for ch in value.chars() {
            match ch {
                '\'' => quoted.push_str("\\'"),
                '\\' => quoted.push_str("\\\\"),
                '\n' => quoted.push_str("\\n"),
                '\r' => quoted.push_str("\\r"),
                '\u{2028}' => quoted.push_str("\\u2028"),
                '\u{2029}' => quoted.push_str("\\u2029"),
                _ => quoted.push(ch),
            }
        }
        quoted.push('\'');
        self.emit(&quoted);
    }

    /// Import/export clause name: bare when it is an identifier name.
    fn emit_module_name(&mut self, name: &str) {
        if is_identifier_name(name) {
            self.emit(name);
        } else {
            self.emit_quoted(name);
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn emit_block(&mut self, stmts: &[Stmt]) {
        self.emit("{");
        if stmts.is_empty() {
            self.write("}");
            return;
        }
        self.indent_level += 1;
        for stmt in stmts {
            self.emit_newline();
            self.emit_stmt(stmt);
        }
        self.indent_level -= 1;
        self.emit_newline();
        self.write("}");
    }

    /// Body of `if`, loops, `with` and labels.
    fn emit_body(&mut self, stmt: &Stmt) {
        self.emit_space();
        self.emit_stmt(stmt);
    }

    fn emit_stmt(&mut self, stmt: &Stmt) {
        self.add_mapping(stmt.span, None);
        match &stmt.kind {
            StmtKind::Var(decl) => {
                self.emit_var_decl(decl);
                self.emit_semicolon();
            }
            StmtKind::Function(func) => self.emit_function(func),
            StmtKind::Class(class) => self.emit_class(class),
            StmtKind::Block(stmts) => self.emit_block(stmts),
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.emit("if");
                self.emit_space();
                self.emit_paren_expr(test);
                self.emit_body(consequent);
                if let Some(alternate) = alternate {
                    if matches!(consequent.kind, StmtKind::Block(_)) {
                        self.emit_space();
                    } else {
                        self.emit_newline();
                    }
                    self.emit("else");
                    if matches!(alternate.kind, StmtKind::If { .. }) {
                        self.write(" ");
                        self.emit_stmt(alternate);
                    } else {
                        self.emit_body(alternate);
                    }
                }
            }
            StmtKind::Switch { discriminant, cases } => {
                self.emit("switch");
                self.emit_space();
                self.emit_paren_expr(discriminant);
                self.emit_space();
                self.emit("{");
                self.indent_level += 1;
                for case in cases {
                    self.emit_newline();
                    match &case.test {
                        Some(test) => {
                            self.emit("case");
                            self.emit_space();
                            self.emit_expr(test, PREC_SEQUENCE);
                        }
                        None => self.emit("default"),
                    }
                    self.write(":");
                    self.indent_level += 1;
                    for stmt in &case.consequent {
                        self.emit_newline();
                        self.emit_stmt(stmt);
                    }
                    self.indent_level -= 1;
                }
                self.indent_level -= 1;
                if !cases.is_empty() {
                    self.emit_newline();
                }
                self.write("}");
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                self.emit("for");
                self.emit_space();
                self.write("(");
                match init {
                    Some(ForInit::Var(decl)) => self.emit_var_decl(decl),
                    Some(ForInit::Expr(expr)) => self.emit_expr(expr, PREC_SEQUENCE),
                    None => {}
                }
                self.write(";");
                if let Some(test) = test {
                    self.emit_space();
                    self.emit_expr(test, PREC_SEQUENCE);
                }
                self.write(";");
                if let Some(update) = update {
                    self.emit_space();
                    self.emit_expr(update, PREC_SEQUENCE);
                }
                self.write(")");
                self.emit_body(body);
            }
            StmtKind::ForIn { left, right, body } => {
                self.emit("for");
                self.emit_space();
                self.write("(");
                self.emit_for_head(left);
                self.emit("in");
                self.emit_space();
                self.emit_expr(right, PREC_SEQUENCE);
                self.write(")");
                self.emit_body(body);
            }
            StmtKind::ForOf {
                left,
                right,
                body,
                is_await,
            } => {
                self.emit("for");
                if *is_await {
                    self.emit(" await");
                }
                self.emit_space();
                self.write("(");
                self.emit_for_head(left);
                self.emit("of");
                self.emit_space();
                self.emit_expr(right, PREC_ASSIGN);
                self.write(")");
                self.emit_body(body);
            }
            StmtKind::While { test, body } => {
                self.emit("while");
                self.emit_space();
                self.emit_paren_expr(test);
                self.emit_body(body);
            }
            StmtKind::DoWhile { body, test } => {
                self.emit("do");
                self.emit_body(body);
                self.emit_space();
                self.emit("while");
                self.emit_space();
                self.emit_paren_expr(test);
                self.emit_semicolon();
            }
            StmtKind::Break(label) | StmtKind::Continue(label) => {
                let keyword = if matches!(stmt.kind, StmtKind::Break(_)) { "break" } else { "continue" };
                self.emit(keyword);
                if let Some(label) = label {
                    self.write(" ");
                    self.emit(label);
                }
                self.emit_semicolon();
            }
            StmtKind::Return(arg) => {
                self.emit("return");
                if let Some(arg) = arg {
                    self.emit_space();
                    self.emit_expr(arg, PREC_SEQUENCE);
                }
                self.emit_semicolon();
            }
            StmtKind::Throw(arg) => {
                self.emit("throw");
                self.emit_space();
                self.emit_expr(arg, PREC_SEQUENCE);
                self.emit_semicolon();
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.emit("try");
                self.emit_space();
                self.emit_block(block);
                if let Some(handler) = handler {
                    self.emit_space();
                    self.emit("catch");
                    self.emit_space();
                    if let Some(param) = &handler.param {
                        self.write("(");
                        self.emit_pattern(param);
                        self.write(")");
                        self.emit_space();
                    }
                    self.emit_block(&handler.body);
                }
                if let Some(finalizer) = finalizer {
                    self.emit_space();
                    self.emit("finally");
                    self.emit_space();
                    self.emit_block(finalizer);
                }
            }
            StmtKind::Labeled { label, body } => {
                self.emit(label);
                self.write(":");
                self.emit_body(body);
            }
            StmtKind::Expr(expr) => {
                if starts_with_brace_or_keyword(expr) {
                    self.write("(");
                    self.emit_expr(expr, PREC_SEQUENCE);
                    self.write(")");
                } else {
                    self.emit_expr(expr, PREC_SEQUENCE);
                }
                self.emit_semicolon();
            }
            StmtKind::Empty => self.emit_semicolon(),
            StmtKind::Debugger => {
                self.emit("debugger");
                self.emit_semicolon();
            }
            StmtKind::With { object, body } => {
                self.emit("with");
                self.emit_space();
                self.emit_paren_expr(object);
                self.emit_body(body);
            }
            StmtKind::Import(import) => self.emit_import(import),
            StmtKind::Export(export) => self.emit_export(export),
        }
    }

    fn emit_paren_expr(&mut self, expr: &Expr) {
        self.write("(");
        self.emit_expr(expr, PREC_SEQUENCE);
        self.write(")");
    }

    fn emit_var_decl(&mut self, decl: &VarDecl) {
        self.emit(decl.kind.as_str());
        self.write(" ");
        for (i, declarator) in decl.decls.iter().enumerate() {
            if i > 0 {
                self.emit_comma();
            }
            self.emit_pattern(&declarator.target);
            if let Some(init) = &declarator.init {
                self.emit_space();
                self.write("=");
                self.emit_space();
                self.emit_expr(init, PREC_ASSIGN);
            }
        }
    }

    fn emit_for_head(&mut self, head: &ForHead) {
        match head {
            ForHead::Var(decl) => self.emit_var_decl(decl),
            ForHead::Pattern(pattern) => self.emit_pattern(pattern),
        }
        self.write(" ");
    }

    fn emit_import(&mut self, import: &ImportDecl) {
        self.emit("import");
        self.emit_space();
        let mut named = Vec::new();
        let mut wrote_clause = false;
        for spec in &import.specifiers {
            match spec {
                ImportSpecifier::Default { local } => {
                    self.emit_ident(*local);
                    wrote_clause = true;
                }
                ImportSpecifier::Namespace { local } => {
                    if wrote_clause {
                        self.emit_comma();
                    }
                    self.emit("*");
                    self.write(" ");
                    self.emit("as");
                    self.write(" ");
                    self.emit_ident(*local);
                    wrote_clause = true;
                }
                ImportSpecifier::Named { imported, local } => named.push((imported, *local)),
            }
        }
        if !named.is_empty() {
            if wrote_clause {
                self.emit_comma();
            }
            self.write("{");
            self.emit_space();
            for (i, (imported, local)) in named.into_iter().enumerate() {
                if i > 0 {
                    self.emit_comma();
                }
                if self.ast.name(local) == imported.as_str() {
                    self.emit_ident(local);
                } else {
                    self.emit_module_name(imported);
                    self.write(" ");
                    self.emit("as");
                    self.write(" ");
                    self.emit_ident(local);
                }
            }
            self.emit_space();
            self.write("}");
            wrote_clause = true;
        }
        if wrote_clause {
            self.write(" ");
            self.emit("from");
            self.emit_space();
        }
        self.emit_quoted(&import.source);
        self.emit_semicolon();
    }

    fn emit_export(&mut self, export: &ExportDecl) {
        self.emit("export");
        match export {
            ExportDecl::Named { specifiers, source, .. } => {
                self.emit_space();
                self.write("{");
                if !specifiers.is_empty() {
                    self.emit_space();
                }
                for (i, spec) in specifiers.iter().enumerate() {
                    if i > 0 {
                        self.emit_comma();
                    }
                    let ast = self.ast;
                    let local = ast.name(spec.local);
                    if local == spec.exported {
                        self.emit_module_name(local);
                    } else {
                        if source.is_some() {
                            self.emit_module_name(local);
                        } else {
                            self.emit_ident(spec.local);
                        }
                        self.write(" ");
                        self.emit("as");
                        self.write(" ");
                        self.emit_module_name(&spec.exported);
                    }
                }
                if !specifiers.is_empty() {
                    self.emit_space();
                }
                self.write("}");
                if let Some(source) = source {
                    self.emit_space();
                    self.emit("from");
                    self.emit_space();
                    self.emit_quoted(source);
                }
                self.emit_semicolon();
            }
            ExportDecl::Decl(stmt) => {
                self.write(" ");
                self.emit_stmt(stmt);
            }
            ExportDecl::Default { value, .. } => {
                self.write(" ");
                self.emit("default");
                self.write(" ");
                match value {
                    DefaultExport::Function(func) => self.emit_function(func),
                    DefaultExport::Class(class) => self.emit_class(class),
                    DefaultExport::Expr(expr) => {
                        if starts_with_brace_or_keyword(expr) {
                            self.write("(");
                            self.emit_expr(expr, PREC_SEQUENCE);
                            self.write(")");
                        } else {
                            self.emit_expr(expr, PREC_ASSIGN);
                        }
                        self.emit_semicolon();
                    }
                }
            }
            ExportDecl::All { alias, source, .. } => {
                self.emit_space();
                self.emit("*");
                if let Some(alias) = alias {
                    self.write(" ");
                    self.emit("as");
                    self.write(" ");
                    self.emit_module_name(alias);
                }
                self.write(" ");
                self.emit("from");
                self.emit_space();
                self.emit_quoted(source);
                self.emit_semicolon();
            }
        }
    }

    // =========================================================================
    // Functions and Classes
    // =========================================================================

    fn emit_function(&mut self, func: &Function) {
        if func.is_async {
            self.emit("async");
            self.write(" ");
        }
        self.emit("function");
        if func.is_generator {
            self.write("*");
        }
        if let Some(id) = func.id {
            if func.is_generator {
                self.emit_space();
            } else {
                self.write(" ");
            }
            self.emit_ident(id);
        } else {
            self.emit_space();
        }
        self.emit_params(&func.params);
        self.emit_space();
        self.emit_block(&func.body);
    }

    fn emit_params(&mut self, params: &[Param]) {
        self.write("(");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.emit_comma();
            }
            if param.rest {
                self.write("...");
            }
            self.emit_pattern(&param.pattern);
        }
        self.write(")");
    }

    fn emit_class(&mut self, class: &Class) {
        self.emit("class");
        if let Some(id) = class.id {
            self.write(" ");
            self.emit_ident(id);
        }
        if let Some(super_class) = &class.super_class {
            self.write(" ");
            self.emit("extends");
            self.write(" ");
            self.emit_expr(super_class, PREC_CALL);
        }
        self.emit_space();
        self.write("{");
        if class.members.is_empty() {
            self.write("}");
            return;
        }
        self.indent_level += 1;
        for member in &class.members {
            self.emit_newline();
            self.emit_class_member(member);
        }
        self.indent_level -= 1;
        self.emit_newline();
        self.write("}");
    }

    fn emit_class_member(&mut self, member: &ClassMember) {
        match member {
            ClassMember::Method {
                key,
                kind,
                is_static,
                value,
            } => {
                if *is_static {
                    self.emit("static");
                    self.write(" ");
                }
                self.emit_method(key, *kind, value);
            }
            ClassMember::Field { key, value, is_static } => {
                if *is_static {
                    self.emit("static");
                    self.write(" ");
                }
                self.emit_property_key(key);
                if let Some(value) = value {
                    self.emit_space();
                    self.write("=");
                    self.emit_space();
                    self.emit_expr(value, PREC_ASSIGN);
                }
                self.emit_semicolon();
            }
            ClassMember::StaticBlock(body) => {
                self.emit("static");
                self.emit_space();
                self.emit_block(body);
            }
        }
    }

    fn emit_method(&mut self, key: &PropertyKey, kind: VarKind, func: &Function) {
        match kind {
            VarKind::Get => {
                self.emit("get");
                self.write(" ");
            }
            VarKind::Set => {
                self.emit("set");
                self.write(" ");
            }
            _ => {
                if func.is_async {
                    self.emit("async");
                    self.write(" ");
                }
                if func.is_generator {
                    self.write("*");
                }
            }
        }
        self.emit_property_key(key);
        self.emit_params(&func.params);
        self.emit_space();
        self.emit_block(&func.body);
    }

    fn emit_property_key(&mut self, key: &PropertyKey) {
        match key {
            PropertyKey::Ident(name) | PropertyKey::Str(name) | PropertyKey::Number(name) => self.emit(name),
            PropertyKey::Private(name) => {
                self.separate("#");
                self.write("#");
                self.write(name);
            }
            PropertyKey::Computed(expr) => {
                self.write("[");
                self.emit_expr(expr, PREC_ASSIGN);
                self.write("]");
            }
        }
    }

    // =========================================================================
    // Patterns
    // =========================================================================

    fn emit_pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Ident(id) => self.emit_ident(*id),
            Pattern::Array { elements, rest, .. } => {
                self.write("[");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.emit_comma();
                    }
                    if let Some(element) = element {
                        self.emit_pattern(element);
                    }
                }
                if let Some(rest) = rest {
                    if !elements.is_empty() {
                        self.emit_comma();
                    }
                    self.write("...");
                    self.emit_pattern(rest);
                } else if matches!(elements.last(), Some(None)) {
                    self.write(",");
                }
                self.write("]");
            }
            Pattern::Object { props, rest, .. } => {
                self.write("{");
                if props.is_empty() && rest.is_none() {
                    self.write("}");
                    return;
                }
                self.emit_space();
                for (i, prop) in props.iter().enumerate() {
                    if i > 0 {
                        self.emit_comma();
                    }
                    self.emit_object_pattern_prop(prop);
                }
                if let Some(rest) = rest {
                    if !props.is_empty() {
                        self.emit_comma();
                    }
                    self.write("...");
                    self.emit_pattern(rest);
                }
                self.emit_space();
                self.write("}");
            }
            Pattern::Assign { target, default } => {
                self.emit_pattern(target);
                self.emit_space();
                self.write("=");
                self.emit_space();
                self.emit_expr(default, PREC_ASSIGN);
            }
            Pattern::Expr(expr) => self.emit_expr(expr, PREC_CALL),
        }
    }

    fn emit_object_pattern_prop(&mut self, prop: &ObjectPatternProp) {
        if prop.shorthand {
            // `{ a }` stays shorthand only while the binding keeps the key's name.
            let target = match &prop.value {
                Pattern::Assign { target, .. } => target.as_ref(),
                other => other,
            };
            if let (PropertyKey::Ident(key), Pattern::Ident(id)) = (&prop.key, target) {
                if self.ast.name(*id) == key {
                    self.emit_pattern(&prop.value);
                    return;
                }
            }
        }
        self.emit_property_key(&prop.key);
        self.write(":");
        self.emit_space();
        self.emit_pattern(&prop.value);
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn emit_expr(&mut self, expr: &Expr, min_prec: u8) {
        let needs_parens = precedence(expr) < min_prec;
        if needs_parens {
            self.write("(");
        }
        self.emit_expr_inner(expr);
        if needs_parens {
            self.write(")");
        }
    }

    fn emit_expr_inner(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Null => self.emit_mapped("null", expr.span),
            ExprKind::Bool(value) => self.emit_mapped(if *value { "true" } else { "false" }, expr.span),
            ExprKind::Number(raw) | ExprKind::Str(raw) => self.emit_mapped(raw, expr.span),
            ExprKind::BigInt(raw) => {
                self.emit_mapped(raw, expr.span);
                self.write("n");
            }
            ExprKind::Regex { pattern, flags } => {
                self.separate("/");
                self.add_mapping(expr.span, None);
                self.write("/");
                self.write(pattern);
                self.write("/");
                self.write(flags);
            }
            ExprKind::Template(template) => {
                self.add_mapping(expr.span, None);
                self.emit_template(template);
            }
            ExprKind::TaggedTemplate { tag, quasi } => {
                self.emit_expr(tag, PREC_CALL);
                self.emit_template(quasi);
            }
            ExprKind::Ident(id) => self.emit_ident(*id),
            ExprKind::This => self.emit_mapped("this", expr.span),
            ExprKind::Super => self.emit_mapped("super", expr.span),
            ExprKind::Array(elements) => {
                self.write("[");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.emit_comma();
                    }
                    if let Some(element) = element {
                        self.emit_expr(element, PREC_ASSIGN);
                    }
                }
                if matches!(elements.last(), Some(None)) {
                    self.write(",");
                }
                self.write("]");
            }
            ExprKind::Object(members) => self.emit_object(members),
            ExprKind::Function(func) => self.emit_function(func),
            ExprKind::Arrow(arrow) => self.emit_arrow(arrow),
            ExprKind::Class(class) => self.emit_class(class),
            ExprKind::Unary { op, arg } => {
                let text = match op {
                    UnaryOp::Minus => "-",
                    UnaryOp::Plus => "+",
                    UnaryOp::Not => "!",
                    UnaryOp::BitNot => "~",
                    UnaryOp::Typeof => "typeof",
                    UnaryOp::Void => "void",
                    UnaryOp::Delete => "delete",
                };
                self.emit(text);
                if text.len() > 1 {
                    self.emit_space();
                }
                self.emit_expr(arg, PREC_UNARY);
            }
            ExprKind::Update { op, prefix, arg } => {
                let text = match op {
                    UpdateOp::Increment => "++",
                    UpdateOp::Decrement => "--",
                };
                if *prefix {
                    self.emit(text);
                    self.emit_expr(arg, PREC_UNARY);
                } else {
                    self.emit_expr(arg, PREC_POSTFIX);
                    self.emit(text);
                }
            }
            ExprKind::Binary { op, left, right } => self.emit_binary(*op, left, right),
            ExprKind::Assign { op, target, value } => {
                self.emit_pattern(target);
                self.emit_space();
                self.emit(assign_op_str(*op));
                self.emit_space();
                self.emit_expr(value, PREC_ASSIGN);
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.emit_expr(test, PREC_CONDITIONAL + 1);
                self.emit_space();
                self.write("?");
                self.emit_space();
                self.emit_expr(consequent, PREC_ASSIGN);
                self.emit_space();
                self.write(":");
                self.emit_space();
                self.emit_expr(alternate, PREC_ASSIGN);
            }
            ExprKind::Sequence(exprs) => {
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        self.emit_comma();
                    }
                    self.emit_expr(e, PREC_ASSIGN);
                }
            }
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let bare_integer = matches!(&object.kind, ExprKind::Number(raw)
                    if raw.bytes().all(|b| b.is_ascii_digit() || b == b'_'));
                if bare_integer {
                    self.write("(");
                    self.emit_expr(object, PREC_SEQUENCE);
                    self.write(")");
                } else {
                    self.emit_expr(object, PREC_CALL);
                }
                self.write(if *optional { "?." } else { "." });
                self.write(property);
            }
            ExprKind::Index {
                object,
                index,
                optional,
            } => {
                self.emit_expr(object, PREC_CALL);
                if *optional {
                    self.write("?.");
                }
                self.write("[");
                self.emit_expr(index, PREC_SEQUENCE);
                self.write("]");
            }
            ExprKind::Call {
                callee,
                args,
                optional,
            } => {
                self.emit_expr(callee, PREC_CALL);
                if *optional {
                    self.write("?.");
                }
                self.emit_args(args);
            }
            ExprKind::New { callee, args } => {
                self.emit("new");
                self.write(" ");
                if contains_call(callee) {
                    self.write("(");
                    self.emit_expr(callee, PREC_SEQUENCE);
                    self.write(")");
                } else {
                    self.emit_expr(callee, PREC_CALL);
                }
                self.emit_args(args);
            }
            ExprKind::Spread(arg) => {
                self.write("...");
                self.emit_expr(arg, PREC_ASSIGN);
            }
            ExprKind::Yield { arg, delegate } => {
                self.emit("yield");
                if *delegate {
                    self.write("*");
                }
                if let Some(arg) = arg {
                    self.emit_space();
                    self.emit_expr(arg, PREC_ASSIGN);
                }
            }
            ExprKind::Await(arg) => {
                self.emit("await");
                self.emit_space();
                self.emit_expr(arg, PREC_UNARY);
            }
            ExprKind::Import(arg) => {
                self.emit_mapped("import", expr.span);
                self.write("(");
                self.emit_expr(arg, PREC_ASSIGN);
                self.write(")");
            }
            ExprKind::MetaProperty { meta, property } => {
                self.emit_mapped(meta, expr.span);
                self.write(".");
                self.write(property);
            }
        }
    }

    fn emit_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) {
        let prec = binary_precedence(op);
        let (mut left_min, mut right_min) = if op == BinaryOp::Pow {
            (PREC_POSTFIX, prec)
        } else {
            (prec, prec + 1)
        };
        // `??` cannot be mixed with `||` / `&&` without parentheses.
        if mixes_nullish(op, left) {
            left_min = PREC_ATOM + 1;
        }
        if mixes_nullish(op, right) {
            right_min = PREC_ATOM + 1;
        }
        self.emit_expr(left, left_min);
        let text = binary_op_str(op);
        if text.chars().all(char::is_alphabetic) {
            self.write(" ");
            self.emit(text);
            self.write(" ");
        } else {
            self.emit_space();
            self.emit(text);
            self.emit_space();
        }
        self.emit_expr(right, right_min);
    }

    fn emit_args(&mut self, args: &[Expr]) {
        self.write("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.emit_comma();
            }
            self.emit_expr(arg, PREC_ASSIGN);
        }
        self.write(")");
    }

    fn emit_template(&mut self, template: &Template) {
        self.separate("`");
        self.write("`");
        for (i, quasi) in template.quasis.iter().enumerate() {
            self.write(quasi);
            if let Some(expr) = template.exprs.get(i) {
                self.write("${");
                self.emit_expr(expr, PREC_SEQUENCE);
                self.write("}");
            }
        }
        self.write("`");
    }

    fn emit_object(&mut self, members: &[ObjectMember]) {
        self.write("{");
        if members.is_empty() {
            self.write("}");
            return;
        }
        self.emit_space();
        for (i, member) in members.iter().enumerate() {
            if i > 0 {
                self.emit_comma();
            }
            match member {
                ObjectMember::Spread(expr) => {
                    self.write("...");
                    self.emit_expr(expr, PREC_ASSIGN);
                }
                ObjectMember::Property(prop) => self.emit_property(prop),
            }
        }
        self.emit_space();
        self.write("}");
    }

    fn emit_property(&mut self, prop: &Property) {
        if matches!(prop.kind, VarKind::Method | VarKind::Get | VarKind::Set) {
            if let ExprKind::Function(func) = &prop.value.kind {
                self.emit_method(&prop.key, prop.kind, func);
                return;
            }
        }
        if prop.shorthand {
            if let PropertyKey::Ident(key) = &prop.key {
                match &prop.value.kind {
                    ExprKind::Ident(id) if self.ast.name(*id) == key => {
                        self.emit_ident(*id);
                        return;
                    }
                    ExprKind::Assign { target, .. }
                        if matches!(target.as_ref(), Pattern::Ident(id) if self.ast.name(*id) == key) =>
                    {
                        self.emit_expr(&prop.value, PREC_ASSIGN);
                        return;
                    }
                    _ => {}
                }
            }
        }
        self.emit_property_key(&prop.key);
        self.write(":");
        self.emit_space();
        self.emit_expr(&prop.value, PREC_ASSIGN);
    }

    fn emit_arrow(&mut self, arrow: &ArrowFunction) {
        if arrow.is_async {
            self.emit("async");
            self.emit_space();
        }
        self.emit_params(&arrow.params);
        self.emit_space();
        self.write("=>");
        self.emit_space();
        match &arrow.body {
            ArrowBody::Block(stmts) => self.emit_block(stmts),
            ArrowBody::Expr(expr) => {
                if starts_with_brace_or_keyword(expr) {
                    self.write("(");
                    self.emit_expr(expr, PREC_SEQUENCE);
                    self.write(")");
                } else {
                    self.emit_expr(expr, PREC_ASSIGN);
                }
            }
        }
    }
}

// =============================================================================
// Precedence
// =============================================================================

fn precedence(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Sequence(_) => PREC_SEQUENCE,
        ExprKind::Assign { .. } | ExprKind::Arrow(_) | ExprKind::Yield { .. } | ExprKind::Spread(_) => PREC_ASSIGN,
        ExprKind::Conditional { .. } => PREC_CONDITIONAL,
        ExprKind::Binary { op, .. } => binary_precedence(*op),
        ExprKind::Unary { .. } | ExprKind::Await(_) => PREC_UNARY,
        ExprKind::Update { prefix: true, .. } => PREC_UNARY,
        ExprKind::Update { prefix: false, .. } => PREC_POSTFIX,
        ExprKind::New { .. }
        | ExprKind::Call { .. }
        | ExprKind::Member { .. }
        | ExprKind::Index { .. }
        | ExprKind::TaggedTemplate { .. }
        | ExprKind::Import(_)
        | ExprKind::MetaProperty { .. } => PREC_CALL,
        _ => PREC_ATOM,
    }
}

fn binary_precedence(op: BinaryOp) -> u8 {
    let base = match op {
        BinaryOp::NullishCoalesce => 1,
        BinaryOp::Or => 2,
        BinaryOp::And => 3,
        BinaryOp::BitOr => 4,
        BinaryOp::BitXor => 5,
        BinaryOp::BitAnd => 6,
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 7,
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq | BinaryOp::In | BinaryOp::Instanceof => 8,
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 9,
        BinaryOp::Add | BinaryOp::Sub => 10,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 11,
        BinaryOp::Pow => 12,
    };
    base + PREC_CONDITIONAL
}

fn mixes_nullish(op: BinaryOp, child: &Expr) -> bool {
    let ExprKind::Binary { op: child_op, .. } = &child.kind else {
        return false;
    };
    let logical = |op: BinaryOp| matches!(op, BinaryOp::And | BinaryOp::Or);
    (op == BinaryOp::NullishCoalesce && logical(*child_op))
        || (logical(op) && *child_op == BinaryOp::NullishCoalesce)
}

/// Whether an expression statement would be misread as a declaration or
/// block: it starts with `function`, `class`, `async function` or `{`.
fn starts_with_brace_or_keyword(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Object(_) | ExprKind::Function(_) | ExprKind::Class(_) => true,
        ExprKind::Assign { target, .. } => match target.as_ref() {
            Pattern::Object { .. } => true,
            Pattern::Expr(inner) => starts_with_brace_or_keyword(inner),
            _ => false,
        },
        ExprKind::Call { callee: e, .. }
        | ExprKind::Member { object: e, .. }
        | ExprKind::Index { object: e, .. }
        | ExprKind::TaggedTemplate { tag: e, .. }
        | ExprKind::Conditional { test: e, .. }
        | ExprKind::Binary { left: e, .. }
        | ExprKind::Update { prefix: false, arg: e, .. } => starts_with_brace_or_keyword(e),
        ExprKind::Sequence(exprs) => exprs.first().is_some_and(starts_with_brace_or_keyword),
        _ => false,
    }
}

/// `new (a())()` must keep its parentheses or the call binds to `new`.
fn contains_call(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Call { .. } => true,
        ExprKind::Member { object, .. } | ExprKind::Index { object, .. } => contains_call(object),
        ExprKind::TaggedTemplate { tag, .. } => contains_call(tag),
        _ => false,
    }
}

fn binary_op_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "**",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::StrictEq => "===",
        BinaryOp::StrictNotEq => "!==",
        BinaryOp::Lt => "<",
        BinaryOp::LtEq => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::GtEq => ">=",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::BitAnd => "&",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::UShr => ">>>",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::NullishCoalesce => "??",
        BinaryOp::In => "in",
        BinaryOp::Instanceof => "instanceof",
    }
}

fn assign_op_str(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => "=",
        AssignOp::AddAssign => "+=",
        AssignOp::SubAssign => "-=",
        AssignOp::MulAssign => "*=",
        AssignOp::DivAssign => "/=",
        AssignOp::ModAssign => "%=",
        AssignOp::PowAssign => "**=",
        AssignOp::ShlAssign => "<<=",
        AssignOp::ShrAssign => ">>=",
        AssignOp::UShrAssign => ">>>=",
        AssignOp::BitOrAssign => "|=",
        AssignOp::BitXorAssign => "^=",
        AssignOp::BitAndAssign => "&=",
        AssignOp::AndAssign => "&&=",
        AssignOp::OrAssign => "||=",
        AssignOp::NullishAssign => "??=",
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$' || !ch.is_ascii()
}

/// Whether `name` can be written without quotes in an import/export clause.
#[must_use]
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$') && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, ParserOptions};

    fn print(source: &str) -> String {
        let ast = Parser::new(source, ParserOptions::module()).parse().unwrap();
        Codegen::new(&ast, CodegenOptions::default()).generate()
    }

    fn minify(source: &str) -> String {
        let ast = Parser::new(source, ParserOptions::module()).parse().unwrap();
        Codegen::new(
            &ast,
            CodegenOptions {
                minify: true,
                source_map: false,
            },
        )
        .generate()
    }

    #[test]
    fn test_readable_output() {
        assert_eq!(print("var name = 3;"), "var name = 3;\n");
        assert_eq!(print("import * as ns from \"main\";"), "import * as ns from 'main';\n");
        assert_eq!(print("import { a as b, c } from 'x';"), "import { a as b, c } from 'x';\n");
        assert_eq!(print("export { a as b };"), "export { a as b };\n");
    }

    #[test]
    fn test_function_layout() {
        assert_eq!(
            print("function f(a) { return a + 1; }"),
            "function f(a) {\n  return a + 1;\n}\n"
        );
    }

    #[test]
    fn test_minified_output() {
        assert_eq!(minify("const a = 1;\nlet b = a + +c;"), "const a=1;let b=a+ +c;");
        assert_eq!(minify("return typeof x"), "return typeof x;");
        assert_eq!(minify("x = a - -b"), "x=a- -b;");
    }

    #[test]
    fn test_parens_preserved() {
        assert_eq!(print("x = (a + b) * c;"), "x = (a + b) * c;\n");
        assert_eq!(print("x = a ?? (b || c);"), "x = a ?? (b || c);\n");
        assert_eq!(print("x = (-a) ** 2;"), "x = (-a) ** 2;\n");
        assert_eq!(print("(function () {})();"), "(function () {}());\n");
        assert_eq!(print("({ a } = b);"), "({ a } = b);\n");
        assert_eq!(print("f = () => ({});"), "f = () => ({});\n");
        assert_eq!(print("new (a())();"), "new (a())();\n");
        assert_eq!(print("x = (1).toString();"), "x = (1).toString();\n");
    }

    #[test]
    fn test_renamed_shorthand_expands() {
        let mut ast = Parser::new("var { name } = obj; x = { name };", ParserOptions::module())
            .parse()
            .unwrap();
        for id in 0..ast.idents.len() as IdentId {
            if ast.name(id) == "name" {
                ast.set_name(id, "renamed");
            }
        }
        let out = Codegen::new(&ast, CodegenOptions::default()).generate();
        assert_eq!(out, "var { name: renamed } = obj;\nx = { name: renamed };\n");
    }

    #[test]
    fn test_template_and_regex() {
        assert_eq!(print("x = `a${b}c`;"), "x = `a${b}c`;\n");
        assert_eq!(print("x = /ab+c/gi;"), "x = /ab+c/gi;\n");
    }

    #[test]
    fn test_source_mappings_use_utf16_columns() {
        let ast = Parser::new("const é = 1;\nfoo(é);", ParserOptions::module()).parse().unwrap();
        let (_, mappings) = Codegen::new(
            &ast,
            CodegenOptions {
                minify: false,
                source_map: true,
            },
        )
        .generate_with_source_map();
        // `é` inside the call: line 1, column 4 in both source and output.
        assert!(mappings
            .iter()
            .any(|m| m.gen_line == 1 && m.gen_col == 4 && m.orig_line == 1 && m.orig_col == 4));
        // `1` after `const é = `: UTF-16 column 10, not byte column 11.
        assert!(mappings.iter().any(|m| m.orig_line == 0 && m.orig_col == 10));
    }
}

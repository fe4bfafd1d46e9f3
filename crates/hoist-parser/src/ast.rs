//! AST node types for JavaScript.
//!
//! The tree is owned (`Box`/`Vec`), but identifier occurrences are not
//! stored inline: each one is an `IdentId` handle into `Ast::idents`.
//! Scope analysis keeps handles, and renaming a binding rewrites the
//! arena entries it owns without touching the tree.

use crate::span::Span;

/// Handle to an identifier occurrence in `Ast::idents`.
pub type IdentId = u32;

/// One identifier occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    /// Current text. Updated in place by renaming.
    pub name: String,
    /// Text as written in the source.
    pub original: String,
    pub span: Span,
}

/// The root AST for a parsed module.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    /// All statements in the program.
    pub stmts: Vec<Stmt>,
    /// Identifier arena.
    pub idents: Vec<Ident>,
    /// Source code (for error locations and source maps).
    pub source: String,
}

impl Ast {
    /// Create a new AST.
    #[must_use]
    pub fn new(stmts: Vec<Stmt>, idents: Vec<Ident>, source: String) -> Self {
        Self {
            stmts,
            idents,
            source,
        }
    }

    /// Allocate a new identifier occurrence.
    pub fn alloc_ident(&mut self, name: impl Into<String>, span: Span) -> IdentId {
        let name = name.into();
        let id = self.idents.len() as IdentId;
        self.idents.push(Ident {
            original: name.clone(),
            name,
            span,
        });
        id
    }

    #[must_use]
    pub fn ident(&self, id: IdentId) -> &Ident {
        &self.idents[id as usize]
    }

    /// Current text of an identifier occurrence.
    #[must_use]
    pub fn name(&self, id: IdentId) -> &str {
        &self.idents[id as usize].name
    }

    /// Rewrite the text of one occurrence.
    pub fn set_name(&mut self, id: IdentId, name: &str) {
        let ident = &mut self.idents[id as usize];
        if ident.name != name {
            ident.name = name.to_string();
        }
    }
}

// =============================================================================
// Expressions
// =============================================================================

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // === Literals ===
    Null,
    Bool(bool),
    /// Number literal, raw text.
    Number(String),
    /// BigInt literal, raw text without the `n` suffix.
    BigInt(String),
    /// String literal, raw text including quotes.
    Str(String),
    Regex {
        pattern: String,
        flags: String,
    },
    Template(Template),
    TaggedTemplate {
        tag: Box<Expr>,
        quasi: Template,
    },

    // === Identifiers ===
    Ident(IdentId),
    This,
    Super,

    // === Compound Expressions ===
    /// Array literal. `None` is a hole.
    Array(Vec<Option<Expr>>),
    Object(Vec<ObjectMember>),
    Function(Box<Function>),
    Arrow(Box<ArrowFunction>),
    Class(Box<Class>),

    // === Operations ===
    Unary {
        op: UnaryOp,
        arg: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        arg: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Pattern>,
        value: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Sequence(Vec<Expr>),

    // === Member Access ===
    /// `a.b` / `a?.b`. The property is a name, never a reference.
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    /// `a[b]` / `a?.[b]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },

    // === Calls ===
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    // === Special ===
    Spread(Box<Expr>),
    Yield {
        arg: Option<Box<Expr>>,
        delegate: bool,
    },
    Await(Box<Expr>),
    /// Dynamic import: `import(x)`
    Import(Box<Expr>),
    /// `new.target`, `import.meta`
    MetaProperty {
        meta: String,
        property: String,
    },
}

/// Template literal parts. Quasis are raw text; there is always one more
/// quasi than there are expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub quasis: Vec<String>,
    pub exprs: Vec<Expr>,
}

/// Object literal member.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectMember {
    Property(Property),
    Spread(Expr),
}

/// Object property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: PropertyKey,
    /// For methods and accessors, a function expression.
    pub value: Expr,
    /// `Init`, `Get`, `Set` or `Method`.
    pub kind: VarKind,
    /// `{ a }`, or `{ a = 1 }` in an assignment pattern.
    pub shorthand: bool,
    pub span: Span,
}

/// Property key.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Ident(String),
    /// Raw text including quotes.
    Str(String),
    /// Raw text.
    Number(String),
    /// `#name` (class members only).
    Private(String),
    Computed(Box<Expr>),
}

// =============================================================================
// Statements
// =============================================================================

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    #[must_use]
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Statement kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    // === Declarations ===
    Var(VarDecl),
    Function(Box<Function>),
    Class(Box<Class>),

    // === Control Flow ===
    Block(Vec<Stmt>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForIn {
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
    },
    ForOf {
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
        is_await: bool,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    Break(Option<String>),
    Continue(Option<String>),
    Return(Option<Expr>),
    Throw(Expr),
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
    },

    // === Other ===
    Expr(Expr),
    Empty,
    Debugger,
    With {
        object: Expr,
        body: Box<Stmt>,
    },

    // === Modules ===
    Import(ImportDecl),
    Export(ExportDecl),
}

/// `var` / `let` / `const` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    /// `Var`, `Let` or `Const`.
    pub kind: VarKind,
    pub decls: Vec<VarDeclarator>,
}

/// Variable declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub target: Pattern,
    pub init: Option<Expr>,
    pub span: Span,
}

/// Switch case.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub test: Option<Expr>,
    pub consequent: Vec<Stmt>,
    pub span: Span,
}

/// Catch clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Initializer of a C-style `for`.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Var(VarDecl),
    Expr(Expr),
}

/// Left side of `for-in` / `for-of`.
#[derive(Debug, Clone, PartialEq)]
pub enum ForHead {
    Var(VarDecl),
    Pattern(Pattern),
}

// =============================================================================
// Patterns
// =============================================================================

/// Binding or assignment target.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(IdentId),
    Array {
        elements: Vec<Option<Pattern>>,
        rest: Option<Box<Pattern>>,
        span: Span,
    },
    Object {
        props: Vec<ObjectPatternProp>,
        rest: Option<Box<Pattern>>,
        span: Span,
    },
    /// Target with a default value: `a = 1`
    Assign {
        target: Box<Pattern>,
        default: Box<Expr>,
    },
    /// Member expression target (assignment patterns only).
    Expr(Box<Expr>),
}

/// Property in an object pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatternProp {
    pub key: PropertyKey,
    pub value: Pattern,
    /// Written as `{ a }` / `{ a = 1 }`.
    pub shorthand: bool,
}

// =============================================================================
// Supporting Types
// =============================================================================

/// Binding kind, also used to tag object and class member kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Var,
    Let,
    Const,
    /// Function declarations; plain object properties.
    Init,
    /// Class constructors.
    Ctor,
    Method,
    Get,
    Set,
}

impl VarKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Var => "var",
            Self::Let => "let",
            Self::Const => "const",
            Self::Init => "init",
            Self::Ctor => "constructor",
            Self::Method => "method",
            Self::Get => "get",
            Self::Set => "set",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    BitOr,
    BitXor,
    BitAnd,
    Shl,
    Shr,
    UShr,
    And,
    Or,
    NullishCoalesce,
    In,
    Instanceof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    PowAssign,
    ShlAssign,
    ShrAssign,
    UShrAssign,
    BitOrAssign,
    BitXorAssign,
    BitAndAssign,
    AndAssign,
    OrAssign,
    NullishAssign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

// =============================================================================
// Functions and Classes
// =============================================================================

/// Function node (declarations, expressions, methods).
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub id: Option<IdentId>,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub is_generator: bool,
    pub span: Span,
}

/// Arrow function node.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunction {
    pub params: Vec<Param>,
    pub body: ArrowBody,
    pub is_async: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

/// Function parameter. Defaults are `Pattern::Assign`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub pattern: Pattern,
    pub rest: bool,
}

/// Class node.
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub id: Option<IdentId>,
    pub super_class: Option<Box<Expr>>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    /// Method, accessor or constructor. `kind` is `Method`, `Get`, `Set`
    /// or `Ctor`.
    Method {
        key: PropertyKey,
        kind: VarKind,
        is_static: bool,
        value: Function,
    },
    Field {
        key: PropertyKey,
        value: Option<Expr>,
        is_static: bool,
    },
    StaticBlock(Vec<Stmt>),
}

// =============================================================================
// Modules
// =============================================================================

/// Import declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    /// Module specifier, cooked.
    pub source: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    /// `import foo from "mod"`
    Default { local: IdentId },
    /// `import * as foo from "mod"`
    Namespace { local: IdentId },
    /// `import { foo, bar as baz } from "mod"`
    Named { imported: String, local: IdentId },
}

impl ImportSpecifier {
    #[must_use]
    pub fn local(&self) -> IdentId {
        match self {
            Self::Default { local } | Self::Namespace { local } | Self::Named { local, .. } => *local,
        }
    }
}

/// Export declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportDecl {
    /// `export { a, b as c }` or `export { a } from "mod"`
    Named {
        specifiers: Vec<ExportSpecifier>,
        source: Option<String>,
        span: Span,
    },
    /// `export const a = 1`, `export function f() {}`
    Decl(Box<Stmt>),
    /// `export default ...`
    Default {
        value: DefaultExport,
        /// Binding that holds the value once module syntax is erased.
        /// Filled in by scope analysis.
        local: Option<IdentId>,
        span: Span,
    },
    /// `export * from "mod"` / `export * as ns from "mod"`
    All {
        alias: Option<String>,
        source: String,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultExport {
    Expr(Expr),
    Function(Box<Function>),
    Class(Box<Class>),
}

/// Export specifier. Without a `from` clause `local` is a reference to a
/// binding; with one it only names an export of the source module.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
    pub local: IdentId,
    pub exported: String,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_arena_rename_keeps_original() {
        let mut ast = Ast::default();
        let id = ast.alloc_ident("name", Span::new(0, 4));
        ast.set_name(id, "renamed");
        assert_eq!(ast.name(id), "renamed");
        assert_eq!(ast.ident(id).original, "name");
    }
}

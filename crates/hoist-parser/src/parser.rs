//! JavaScript parser.
//!
//! Recursive descent for statements, precedence climbing for binary
//! expressions. Parenthesized expressions are parsed as a cover grammar
//! and reinterpreted as arrow parameters when `=>` follows.

use crate::ast::*;
use crate::lexer::Lexer;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Parser configuration options.
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    /// Parse as ECMAScript module (enables import/export).
    pub module: bool,
    /// Accept JSX elements and lower them to `React.createElement` calls.
    pub jsx: bool,
}

impl ParserOptions {
    /// Options for parsing an ES module.
    #[must_use]
    pub fn module() -> Self {
        Self {
            module: true,
            jsx: false,
        }
    }

    #[must_use]
    pub fn with_jsx(mut self, jsx: bool) -> Self {
        self.jsx = jsx;
        self
    }
}

/// Parse error.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.span.start, self.span.end)
    }
}

impl std::error::Error for ParseError {}

/// The parser.
pub struct Parser<'a> {
    pub(crate) lexer: Lexer<'a>,
    /// Current token.
    pub(crate) current: Token,
    /// End offset of the previously consumed token.
    pub(crate) prev_end: u32,
    options: ParserOptions,
    pub(crate) source: &'a str,
    /// Identifier arena being filled.
    idents: Vec<Ident>,
    /// When false, `in` is not parsed as a binary operator (for-in init).
    allow_in: bool,
}

impl<'a> Parser<'a> {
    /// Create a new parser.
    #[must_use]
    pub fn new(source: &'a str, options: ParserOptions) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            prev_end: 0,
            options,
            source,
            idents: Vec::new(),
            allow_in: true,
        }
    }

    /// Parse the entire source into an AST.
    pub fn parse(mut self) -> Result<Ast, ParseError> {
        let mut stmts = Vec::new();
        while !self.is_eof() {
            stmts.push(self.parse_stmt()?);
        }
        Ok(Ast::new(stmts, self.idents, self.source.to_string()))
    }

    // =========================================================================
    // Token Handling
    // =========================================================================

    pub(crate) fn peek(&self) -> &TokenKind {
        &self.current.kind
    }

    pub(crate) fn advance(&mut self) -> Token {
        self.prev_end = self.current.span.end;
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, next)
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    /// Current token is the identifier `word` (contextual keyword).
    fn is_word(&self, word: &str) -> bool {
        matches!(self.peek(), TokenKind::Identifier(name) if name == word)
    }

    pub(crate) fn is_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    pub(crate) fn start(&self) -> u32 {
        self.current.span.start
    }

    pub(crate) fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    fn unexpected(&self) -> ParseError {
        match self.peek() {
            TokenKind::Invalid(message) => ParseError::new(message.clone(), self.current.span),
            TokenKind::Eof => ParseError::new("Unexpected end of input", self.current.span),
            kind => ParseError::new(format!("Unexpected token {kind:?}"), self.current.span),
        }
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(
                format!("Expected {:?}, got {:?}", kind, self.peek()),
                self.current.span,
            ))
        }
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if self.is_word(word) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(format!("Expected '{word}'"), self.current.span))
        }
    }

    /// Consume a semicolon (with ASI support).
    fn expect_semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat(&TokenKind::Semicolon) {
            return Ok(());
        }
        if self.check(&TokenKind::RBrace) || self.is_eof() || self.current.newline_before {
            return Ok(());
        }
        Err(ParseError::new("Expected semicolon", self.current.span))
    }

    /// Whether the statement can end here without a semicolon.
    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof)
            || self.current.newline_before
    }

    pub(crate) fn alloc_ident(&mut self, name: String, span: Span) -> IdentId {
        let id = self.idents.len() as IdentId;
        self.idents.push(Ident {
            original: name.clone(),
            name,
            span,
        });
        id
    }

    fn raw(&self, span: Span) -> String {
        self.source
            .get(span.start as usize..span.end as usize)
            .unwrap_or_default()
            .to_string()
    }

    /// Identifier usable as a binding or reference.
    fn expect_identifier(&mut self) -> Result<IdentId, ParseError> {
        let name = match self.peek() {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Yield => "yield".to_string(),
            TokenKind::Await => "await".to_string(),
            TokenKind::Let => "let".to_string(),
            _ => return Err(self.unexpected()),
        };
        let token = self.advance();
        Ok(self.alloc_ident(name, token.span))
    }

    /// Identifier or keyword in property position (`a.default`).
    fn expect_name(&mut self) -> Result<String, ParseError> {
        let name = match self.peek() {
            TokenKind::Identifier(name) => name.clone(),
            kind => match kind.keyword_text() {
                Some(text) => text.to_string(),
                None => return Err(self.unexpected()),
            },
        };
        self.advance();
        Ok(name)
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            TokenKind::String(value) => {
                self.advance();
                Ok(value)
            }
            _ => Err(ParseError::new("Expected string literal", self.current.span)),
        }
    }

    /// Name in an import/export clause: identifier, keyword or string.
    fn module_export_name(&mut self) -> Result<(String, Span), ParseError> {
        let span = self.current.span;
        if let TokenKind::String(value) = self.peek().clone() {
            self.advance();
            return Ok((value, span));
        }
        Ok((self.expect_name()?, span))
    }

    // =========================================================================
    // Statement Parsing
    // =========================================================================

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();

        match self.peek() {
            TokenKind::Var | TokenKind::Const | TokenKind::Let => {
                let decl = self.parse_var_decl()?;
                self.expect_semicolon()?;
                Ok(Stmt::new(StmtKind::Var(decl), self.span_from(start)))
            }
            TokenKind::Function => {
                let func = self.parse_function(false, true)?;
                Ok(Stmt::new(StmtKind::Function(Box::new(func)), self.span_from(start)))
            }
            TokenKind::Identifier(name) if name == "async" && self.async_function_follows() => {
                self.advance();
                let func = self.parse_function(true, true)?;
                Ok(Stmt::new(StmtKind::Function(Box::new(func)), self.span_from(start)))
            }
            TokenKind::Class => {
                let class = self.parse_class(true)?;
                Ok(Stmt::new(StmtKind::Class(Box::new(class)), self.span_from(start)))
            }
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::While => {
                self.advance();
                let test = self.parse_paren_test()?;
                let body = Box::new(self.parse_stmt()?);
                Ok(Stmt::new(StmtKind::While { test, body }, self.span_from(start)))
            }
            TokenKind::Do => {
                self.advance();
                let body = Box::new(self.parse_stmt()?);
                self.expect(&TokenKind::While)?;
                let test = self.parse_paren_test()?;
                self.eat(&TokenKind::Semicolon);
                Ok(Stmt::new(StmtKind::DoWhile { body, test }, self.span_from(start)))
            }
            TokenKind::Break | TokenKind::Continue => {
                let is_break = matches!(self.peek(), TokenKind::Break);
                self.advance();
                let label = match self.peek() {
                    TokenKind::Identifier(name) if !self.current.newline_before => {
                        let name = name.clone();
                        self.advance();
                        Some(name)
                    }
                    _ => None,
                };
                self.expect_semicolon()?;
                let kind = if is_break { StmtKind::Break(label) } else { StmtKind::Continue(label) };
                Ok(Stmt::new(kind, self.span_from(start)))
            }
            TokenKind::Return => {
                self.advance();
                let arg = if self.at_statement_end() { None } else { Some(self.parse_expr()?) };
                self.expect_semicolon()?;
                Ok(Stmt::new(StmtKind::Return(arg), self.span_from(start)))
            }
            TokenKind::Throw => {
                self.advance();
                let arg = self.parse_expr()?;
                self.expect_semicolon()?;
                Ok(Stmt::new(StmtKind::Throw(arg), self.span_from(start)))
            }
            TokenKind::Try => self.parse_try_stmt(),
            TokenKind::With => {
                self.advance();
                let object = self.parse_paren_test()?;
                let body = Box::new(self.parse_stmt()?);
                Ok(Stmt::new(StmtKind::With { object, body }, self.span_from(start)))
            }
            TokenKind::Debugger => {
                self.advance();
                self.expect_semicolon()?;
                Ok(Stmt::new(StmtKind::Debugger, self.span_from(start)))
            }
            TokenKind::LBrace => {
                let body = self.parse_block()?;
                Ok(Stmt::new(StmtKind::Block(body), self.span_from(start)))
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::new(StmtKind::Empty, self.span_from(start)))
            }
            TokenKind::Import => {
                let next = self.lexer.peek();
                if matches!(next.kind, TokenKind::LParen | TokenKind::Dot) {
                    self.parse_expr_stmt()
                } else {
                    self.parse_import_decl()
                }
            }
            TokenKind::Export => self.parse_export_decl(),
            TokenKind::Identifier(_) if matches!(self.lexer.peek().kind, TokenKind::Colon) => {
                let label = self.expect_name()?;
                self.advance();
                let body = Box::new(self.parse_stmt()?);
                Ok(Stmt::new(StmtKind::Labeled { label, body }, self.span_from(start)))
            }
            _ => self.parse_expr_stmt(),
        }
    }

    fn async_function_follows(&self) -> bool {
        let next = self.lexer.peek();
        matches!(next.kind, TokenKind::Function) && !next.newline_before
    }

    fn parse_expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        let expr = self.parse_expr()?;
        self.expect_semicolon()?;
        Ok(Stmt::new(StmtKind::Expr(expr), self.span_from(start)))
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.is_eof() {
                return Err(self.unexpected());
            }
            stmts.push(self.parse_stmt()?);
        }
        self.advance();
        Ok(stmts)
    }

    fn parse_paren_test(&mut self) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let expr = self.with_in(true, Self::parse_expr)?;
        self.expect(&TokenKind::RParen)?;
        Ok(expr)
    }

    /// Run `f` with `allow_in` set, restoring the previous value.
    pub(crate) fn with_in<T>(
        &mut self,
        allow_in: bool,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = std::mem::replace(&mut self.allow_in, allow_in);
        let result = f(self);
        self.allow_in = saved;
        result
    }

    fn parse_var_decl(&mut self) -> Result<VarDecl, ParseError> {
        let kind = match self.advance().kind {
            TokenKind::Var => VarKind::Var,
            TokenKind::Let => VarKind::Let,
            _ => VarKind::Const,
        };
        let mut decls = Vec::new();
        loop {
            let start = self.start();
            let target = self.parse_binding_pattern()?;
            let init = if self.eat(&TokenKind::Eq) {
                Some(self.parse_assign_expr()?)
            } else {
                None
            };
            decls.push(VarDeclarator {
                target,
                init,
                span: self.span_from(start),
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(VarDecl { kind, decls })
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        self.advance();
        let test = self.parse_paren_test()?;
        let consequent = Box::new(self.parse_stmt()?);
        let alternate = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::new(
            StmtKind::If {
                test,
                consequent,
                alternate,
            },
            self.span_from(start),
        ))
    }

    fn parse_switch_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        self.advance();
        let discriminant = self.parse_paren_test()?;
        self.expect(&TokenKind::LBrace)?;
        let mut cases = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            let case_start = self.start();
            let test = if self.eat(&TokenKind::Default) {
                None
            } else {
                self.expect(&TokenKind::Case)?;
                Some(self.parse_expr()?)
            };
            self.expect(&TokenKind::Colon)?;
            let mut consequent = Vec::new();
            while !matches!(
                self.peek(),
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                consequent.push(self.parse_stmt()?);
            }
            if self.is_eof() {
                return Err(self.unexpected());
            }
            cases.push(SwitchCase {
                test,
                consequent,
                span: self.span_from(case_start),
            });
        }
        Ok(Stmt::new(
            StmtKind::Switch { discriminant, cases },
            self.span_from(start),
        ))
    }

    fn parse_for_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        self.advance();
        let is_await = self.eat(&TokenKind::Await);
        self.expect(&TokenKind::LParen)?;

        let init = match self.peek() {
            TokenKind::Semicolon => None,
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let decl = self.with_in(false, Self::parse_var_decl)?;
                if decl.decls.len() == 1 && (self.check(&TokenKind::In) || self.is_word("of")) {
                    return self.finish_for_in_of(start, ForHead::Var(decl), is_await);
                }
                Some(ForInit::Var(decl))
            }
            _ => {
                let expr = self.with_in(false, Self::parse_expr)?;
                if self.check(&TokenKind::In) || self.is_word("of") {
                    let pattern = self.expr_to_pattern(expr)?;
                    return self.finish_for_in_of(start, ForHead::Pattern(pattern), is_await);
                }
                Some(ForInit::Expr(expr))
            }
        };

        self.expect(&TokenKind::Semicolon)?;
        let test = if self.check(&TokenKind::Semicolon) { None } else { Some(self.parse_expr()?) };
        self.expect(&TokenKind::Semicolon)?;
        let update = if self.check(&TokenKind::RParen) { None } else { Some(self.parse_expr()?) };
        self.expect(&TokenKind::RParen)?;
        let body = Box::new(self.parse_stmt()?);

        Ok(Stmt::new(
            StmtKind::For {
                init,
                test,
                update,
                body,
            },
            self.span_from(start),
        ))
    }

    fn finish_for_in_of(&mut self, start: u32, left: ForHead, is_await: bool) -> Result<Stmt, ParseError> {
        let is_in = self.eat(&TokenKind::In);
        if !is_in {
            self.expect_word("of")?;
        }
        let right = if is_in { self.parse_expr()? } else { self.parse_assign_expr()? };
        self.expect(&TokenKind::RParen)?;
        let body = Box::new(self.parse_stmt()?);
        let kind = if is_in {
            StmtKind::ForIn { left, right, body }
        } else {
            StmtKind::ForOf {
                left,
                right,
                body,
                is_await,
            }
        };
        Ok(Stmt::new(kind, self.span_from(start)))
    }

    fn parse_try_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        self.advance();
        let block = self.parse_block()?;

        let handler = if self.check(&TokenKind::Catch) {
            let catch_start = self.start();
            self.advance();
            let param = if self.eat(&TokenKind::LParen) {
                let param = self.parse_binding_pattern()?;
                self.expect(&TokenKind::RParen)?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause {
                param,
                body,
                span: self.span_from(catch_start),
            })
        } else {
            None
        };

        let finalizer = if self.eat(&TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(ParseError::new("Missing catch or finally after try", self.current.span));
        }

        Ok(Stmt::new(
            StmtKind::Try {
                block,
                handler,
                finalizer,
            },
            self.span_from(start),
        ))
    }

    // =========================================================================
    // Patterns
    // =========================================================================

    fn parse_binding_pattern(&mut self) -> Result<Pattern, ParseError> {
        match self.peek() {
            TokenKind::LBracket => self.parse_array_pattern(),
            TokenKind::LBrace => self.parse_object_pattern(),
            _ => Ok(Pattern::Ident(self.expect_identifier()?)),
        }
    }

    /// Pattern with an optional `= default`.
    fn parse_binding_element(&mut self) -> Result<Pattern, ParseError> {
        let target = self.parse_binding_pattern()?;
        if self.eat(&TokenKind::Eq) {
            let default = self.with_in(true, Self::parse_assign_expr)?;
            return Ok(Pattern::Assign {
                target: Box::new(target),
                default: Box::new(default),
            });
        }
        Ok(target)
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern, ParseError> {
        let start = self.start();
        self.expect(&TokenKind::LBracket)?;
        let mut elements = Vec::new();
        let mut rest = None;
        loop {
            match self.peek() {
                TokenKind::RBracket => break,
                TokenKind::Comma => {
                    self.advance();
                    elements.push(None);
                }
                TokenKind::Spread => {
                    self.advance();
                    rest = Some(Box::new(self.parse_binding_pattern()?));
                    break;
                }
                _ => {
                    elements.push(Some(self.parse_binding_element()?));
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(Pattern::Array {
            elements,
            rest,
            span: self.span_from(start),
        })
    }

    fn parse_object_pattern(&mut self) -> Result<Pattern, ParseError> {
        let start = self.start();
        self.expect(&TokenKind::LBrace)?;
        let mut props = Vec::new();
        let mut rest = None;
        while !self.check(&TokenKind::RBrace) {
            if self.eat(&TokenKind::Spread) {
                rest = Some(Box::new(self.parse_binding_pattern()?));
                break;
            }
            let key_span = self.current.span;
            let key = self.parse_property_key()?;
            if self.eat(&TokenKind::Colon) {
                let value = self.parse_binding_element()?;
                props.push(ObjectPatternProp {
                    key,
                    value,
                    shorthand: false,
                });
            } else {
                let PropertyKey::Ident(name) = &key else {
                    return Err(ParseError::new("Invalid shorthand property in pattern", key_span));
                };
                let id = self.alloc_ident(name.clone(), key_span);
                let mut value = Pattern::Ident(id);
                if self.eat(&TokenKind::Eq) {
                    let default = self.with_in(true, Self::parse_assign_expr)?;
                    value = Pattern::Assign {
                        target: Box::new(value),
                        default: Box::new(default),
                    };
                }
                props.push(ObjectPatternProp {
                    key,
                    value,
                    shorthand: true,
                });
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Pattern::Object {
            props,
            rest,
            span: self.span_from(start),
        })
    }

    fn parse_property_key(&mut self) -> Result<PropertyKey, ParseError> {
        let span = self.current.span;
        match self.peek().clone() {
            TokenKind::String(_) => {
                self.advance();
                Ok(PropertyKey::Str(self.raw(span)))
            }
            TokenKind::Number(raw) | TokenKind::BigInt(raw) => {
                self.advance();
                Ok(PropertyKey::Number(raw))
            }
            TokenKind::PrivateName(name) => {
                self.advance();
                Ok(PropertyKey::Private(name))
            }
            TokenKind::LBracket => {
                self.advance();
                let expr = self.with_in(true, Self::parse_assign_expr)?;
                self.expect(&TokenKind::RBracket)?;
                Ok(PropertyKey::Computed(Box::new(expr)))
            }
            _ => Ok(PropertyKey::Ident(self.expect_name()?)),
        }
    }

    // =========================================================================
    // Functions and Classes
    // =========================================================================

    /// Parse `function [*] [name] (params) { body }`. The `async` prefix,
    /// if any, has already been consumed.
    fn parse_function(&mut self, is_async: bool, is_declaration: bool) -> Result<Function, ParseError> {
        let start = self.start();
        self.expect(&TokenKind::Function)?;
        let is_generator = self.eat(&TokenKind::Star);
        // Only `export default function () {}` may omit the name of a
        // declaration; the caller passes `is_declaration = false` there.
        let id = if self.check(&TokenKind::LParen) && !is_declaration {
            None
        } else {
            Some(self.expect_identifier()?)
        };
        let params = self.parse_params()?;
        let body = self.parse_function_body()?;
        Ok(Function {
            id,
            params,
            body,
            is_async,
            is_generator,
            span: self.span_from(start),
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let rest = self.eat(&TokenKind::Spread);
            let pattern = self.parse_binding_element()?;
            params.push(Param { pattern, rest });
            if rest || !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_function_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.with_in(true, Self::parse_block)
    }

    /// Method tail: `(params) { body }`.
    fn parse_method(&mut self, is_async: bool, is_generator: bool) -> Result<Function, ParseError> {
        let start = self.start();
        let params = self.parse_params()?;
        let body = self.parse_function_body()?;
        Ok(Function {
            id: None,
            params,
            body,
            is_async,
            is_generator,
            span: self.span_from(start),
        })
    }

    fn parse_class(&mut self, is_declaration: bool) -> Result<Class, ParseError> {
        let start = self.start();
        self.expect(&TokenKind::Class)?;
        let id = match self.peek() {
            TokenKind::Identifier(_) | TokenKind::Yield | TokenKind::Await => Some(self.expect_identifier()?),
            _ if is_declaration && !self.check(&TokenKind::LBrace) && !self.check(&TokenKind::Extends) => {
                return Err(self.unexpected());
            }
            _ => None,
        };
        let super_class = if self.eat(&TokenKind::Extends) {
            Some(Box::new(self.parse_lhs_expr()?))
        } else {
            None
        };

        self.expect(&TokenKind::LBrace)?;
        let mut members = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            if self.is_eof() {
                return Err(self.unexpected());
            }
            members.push(self.parse_class_member()?);
        }

        Ok(Class {
            id,
            super_class,
            members,
            span: self.span_from(start),
        })
    }

    /// Whether the token after a modifier word begins a member name, i.e.
    /// the word really is a modifier and not itself the member name.
    fn modifier_applies(&self) -> bool {
        let next = self.lexer.peek();
        !next.newline_before
            && !matches!(
                next.kind,
                TokenKind::LParen
                    | TokenKind::Eq
                    | TokenKind::Semicolon
                    | TokenKind::RBrace
                    | TokenKind::Comma
                    | TokenKind::Colon
                    | TokenKind::Eof
            )
    }

    fn parse_class_member(&mut self) -> Result<ClassMember, ParseError> {
        let mut is_static = false;
        if self.is_word("static") && self.modifier_applies() {
            self.advance();
            is_static = true;
            if self.check(&TokenKind::LBrace) {
                let body = self.parse_block()?;
                return Ok(ClassMember::StaticBlock(body));
            }
        }

        let mut is_async = false;
        if self.is_word("async") && self.modifier_applies() {
            self.advance();
            is_async = true;
        }
        let is_generator = self.eat(&TokenKind::Star);

        let mut kind = VarKind::Method;
        if !is_async && !is_generator && (self.is_word("get") || self.is_word("set")) && self.modifier_applies() {
            kind = if self.is_word("get") { VarKind::Get } else { VarKind::Set };
            self.advance();
        }

        let key = self.parse_property_key()?;

        if self.check(&TokenKind::LParen) {
            let is_ctor = !is_static
                && kind == VarKind::Method
                && matches!(&key, PropertyKey::Ident(name) if name == "constructor");
            if is_ctor {
                kind = VarKind::Ctor;
            }
            let value = self.parse_method(is_async, is_generator)?;
            return Ok(ClassMember::Method {
                key,
                kind,
                is_static,
                value,
            });
        }

        let value = if self.eat(&TokenKind::Eq) {
            Some(self.with_in(true, Self::parse_assign_expr)?)
        } else {
            None
        };
        self.expect_semicolon()?;
        Ok(ClassMember::Field { key, value, is_static })
    }

    // =========================================================================
    // Modules
    // =========================================================================

    fn parse_import_decl(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        if !self.options.module {
            return Err(ParseError::new("import declarations are only valid in modules", self.current.span));
        }
        self.advance();

        let mut specifiers = Vec::new();
        if let TokenKind::String(source) = self.peek().clone() {
            self.advance();
            self.expect_semicolon()?;
            return Ok(Stmt::new(
                StmtKind::Import(ImportDecl {
                    specifiers,
                    source,
                    span: self.span_from(start),
                }),
                self.span_from(start),
            ));
        }

        if !matches!(self.peek(), TokenKind::LBrace | TokenKind::Star) {
            let local = self.expect_identifier()?;
            specifiers.push(ImportSpecifier::Default { local });
            self.eat(&TokenKind::Comma);
        }

        if self.eat(&TokenKind::Star) {
            self.expect_word("as")?;
            let local = self.expect_identifier()?;
            specifiers.push(ImportSpecifier::Namespace { local });
        } else if self.eat(&TokenKind::LBrace) {
            while !self.check(&TokenKind::RBrace) {
                let (imported, span) = self.module_export_name()?;
                let local = if self.is_word("as") {
                    self.advance();
                    self.expect_identifier()?
                } else {
                    self.alloc_ident(imported.clone(), span)
                };
                specifiers.push(ImportSpecifier::Named { imported, local });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RBrace)?;
        }

        self.expect_word("from")?;
        let source = self.expect_string()?;
        self.expect_semicolon()?;
        let span = self.span_from(start);
        Ok(Stmt::new(
            StmtKind::Import(ImportDecl {
                specifiers,
                source,
                span,
            }),
            span,
        ))
    }

    fn parse_export_decl(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        if !self.options.module {
            return Err(ParseError::new("export declarations are only valid in modules", self.current.span));
        }
        self.advance();

        let decl = match self.peek() {
            TokenKind::Star => {
                self.advance();
                let alias = if self.is_word("as") {
                    self.advance();
                    Some(self.module_export_name()?.0)
                } else {
                    None
                };
                self.expect_word("from")?;
                let source = self.expect_string()?;
                self.expect_semicolon()?;
                ExportDecl::All {
                    alias,
                    source,
                    span: self.span_from(start),
                }
            }
            TokenKind::LBrace => {
                self.advance();
                let mut specifiers = Vec::new();
                while !self.check(&TokenKind::RBrace) {
                    let spec_start = self.start();
                    let (local_name, local_span) = self.module_export_name()?;
                    let local = self.alloc_ident(local_name.clone(), local_span);
                    let exported = if self.is_word("as") {
                        self.advance();
                        self.module_export_name()?.0
                    } else {
                        local_name
                    };
                    specifiers.push(ExportSpecifier {
                        local,
                        exported,
                        span: self.span_from(spec_start),
                    });
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBrace)?;
                let source = if self.is_word("from") {
                    self.advance();
                    Some(self.expect_string()?)
                } else {
                    None
                };
                self.expect_semicolon()?;
                ExportDecl::Named {
                    specifiers,
                    source,
                    span: self.span_from(start),
                }
            }
            TokenKind::Default => {
                self.advance();
                let value = match self.peek() {
                    TokenKind::Function => DefaultExport::Function(Box::new(self.parse_function(false, false)?)),
                    TokenKind::Identifier(name) if name == "async" && self.async_function_follows() => {
                        self.advance();
                        DefaultExport::Function(Box::new(self.parse_function(true, false)?))
                    }
                    TokenKind::Class => DefaultExport::Class(Box::new(self.parse_class(false)?)),
                    _ => {
                        let expr = self.parse_assign_expr()?;
                        self.expect_semicolon()?;
                        DefaultExport::Expr(expr)
                    }
                };
                ExportDecl::Default {
                    value,
                    local: None,
                    span: self.span_from(start),
                }
            }
            TokenKind::Var | TokenKind::Let | TokenKind::Const | TokenKind::Function | TokenKind::Class => {
                ExportDecl::Decl(Box::new(self.parse_stmt()?))
            }
            TokenKind::Identifier(name) if name == "async" => ExportDecl::Decl(Box::new(self.parse_stmt()?)),
            _ => return Err(self.unexpected()),
        };

        Ok(Stmt::new(StmtKind::Export(decl), self.span_from(start)))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let first = self.parse_assign_expr()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.eat(&TokenKind::Comma) {
            exprs.push(self.parse_assign_expr()?);
        }
        Ok(Expr::new(ExprKind::Sequence(exprs), self.span_from(start)))
    }

    pub(crate) fn parse_assign_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();

        if self.check(&TokenKind::Yield) {
            return self.parse_yield_expr();
        }

        // `x => ...` and `async x => ...`
        if let TokenKind::Identifier(name) = self.peek().clone() {
            let next = self.lexer.peek();
            if matches!(next.kind, TokenKind::Arrow) {
                let param = self.expect_identifier()?;
                self.advance();
                let params = vec![Param {
                    pattern: Pattern::Ident(param),
                    rest: false,
                }];
                return self.parse_arrow_body(params, false, start);
            }
            if name == "async" && matches!(next.kind, TokenKind::Identifier(_)) && !next.newline_before {
                let mut lookahead = self.lexer.clone();
                lookahead.next_token();
                if matches!(lookahead.next_token().kind, TokenKind::Arrow) {
                    self.advance();
                    let param = self.expect_identifier()?;
                    self.expect(&TokenKind::Arrow)?;
                    let params = vec![Param {
                        pattern: Pattern::Ident(param),
                        rest: false,
                    }];
                    return self.parse_arrow_body(params, true, start);
                }
            }
        }

        let left = self.parse_conditional_expr()?;

        if let Some(op) = self.assign_op() {
            if matches!(left.kind, ExprKind::Arrow(_)) {
                return Err(ParseError::new("Invalid assignment target", left.span));
            }
            self.advance();
            let target = if op == AssignOp::Assign {
                self.expr_to_pattern(left)?
            } else {
                self.simple_target(left)?
            };
            let value = self.parse_assign_expr()?;
            return Ok(Expr::new(
                ExprKind::Assign {
                    op,
                    target: Box::new(target),
                    value: Box::new(value),
                },
                self.span_from(start),
            ));
        }

        Ok(left)
    }

    fn parse_yield_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.advance();
        let delegate = !self.current.newline_before && self.eat(&TokenKind::Star);
        let has_arg = delegate
            || !(self.current.newline_before
                || matches!(
                    self.peek(),
                    TokenKind::RParen
                        | TokenKind::RBracket
                        | TokenKind::RBrace
                        | TokenKind::Comma
                        | TokenKind::Semicolon
                        | TokenKind::Colon
                        | TokenKind::Eof
                ));
        let arg = if has_arg { Some(Box::new(self.parse_assign_expr()?)) } else { None };
        Ok(Expr::new(ExprKind::Yield { arg, delegate }, self.span_from(start)))
    }

    fn assign_op(&self) -> Option<AssignOp> {
        let op = match self.peek() {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::AddAssign,
            TokenKind::MinusEq => AssignOp::SubAssign,
            TokenKind::StarEq => AssignOp::MulAssign,
            TokenKind::SlashEq => AssignOp::DivAssign,
            TokenKind::PercentEq => AssignOp::ModAssign,
            TokenKind::StarStarEq => AssignOp::PowAssign,
            TokenKind::LtLtEq => AssignOp::ShlAssign,
            TokenKind::GtGtEq => AssignOp::ShrAssign,
            TokenKind::GtGtGtEq => AssignOp::UShrAssign,
            TokenKind::PipeEq => AssignOp::BitOrAssign,
            TokenKind::CaretEq => AssignOp::BitXorAssign,
            TokenKind::AmpEq => AssignOp::BitAndAssign,
            TokenKind::AmpAmpEq => AssignOp::AndAssign,
            TokenKind::PipePipeEq => AssignOp::OrAssign,
            TokenKind::QuestionQuestionEq => AssignOp::NullishAssign,
            _ => return None,
        };
        Some(op)
    }

    fn parse_conditional_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let test = self.parse_binary_expr(1)?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.with_in(true, Self::parse_assign_expr)?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_assign_expr()?;
        Ok(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            self.span_from(start),
        ))
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut left = self.parse_unary_expr()?;

        loop {
            if !self.allow_in && self.check(&TokenKind::In) {
                break;
            }
            let Some(prec) = self.peek().binary_precedence() else {
                break;
            };
            if prec < min_prec {
                break;
            }
            let op = self.binary_op();
            self.advance();
            let next_min = if op == BinaryOp::Pow { prec } else { prec + 1 };
            let right = self.parse_binary_expr(next_min)?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                self.span_from(start),
            );
        }

        Ok(left)
    }

    fn binary_op(&self) -> BinaryOp {
        match self.peek() {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::StarStar => BinaryOp::Pow,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::BangEq => BinaryOp::NotEq,
            TokenKind::EqEqEq => BinaryOp::StrictEq,
            TokenKind::BangEqEq => BinaryOp::StrictNotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::LtEq => BinaryOp::LtEq,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::GtEq => BinaryOp::GtEq,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::Amp => BinaryOp::BitAnd,
            TokenKind::LtLt => BinaryOp::Shl,
            TokenKind::GtGt => BinaryOp::Shr,
            TokenKind::GtGtGt => BinaryOp::UShr,
            TokenKind::AmpAmp => BinaryOp::And,
            TokenKind::PipePipe => BinaryOp::Or,
            TokenKind::QuestionQuestion => BinaryOp::NullishCoalesce,
            TokenKind::In => BinaryOp::In,
            _ => BinaryOp::Instanceof,
        }
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let op = match self.peek() {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let arg = self.parse_unary_expr()?;
            return Ok(Expr::new(
                ExprKind::Unary { op, arg: Box::new(arg) },
                self.span_from(start),
            ));
        }

        match self.peek() {
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if self.check(&TokenKind::PlusPlus) {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.advance();
                let arg = self.parse_unary_expr()?;
                Ok(Expr::new(
                    ExprKind::Update {
                        op,
                        prefix: true,
                        arg: Box::new(arg),
                    },
                    self.span_from(start),
                ))
            }
            TokenKind::Await => {
                self.advance();
                let arg = self.parse_unary_expr()?;
                Ok(Expr::new(ExprKind::Await(Box::new(arg)), self.span_from(start)))
            }
            _ => self.parse_postfix_expr(),
        }
    }

    fn parse_postfix_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let expr = self.parse_lhs_expr()?;
        if self.current.newline_before {
            return Ok(expr);
        }
        let op = match self.peek() {
            TokenKind::PlusPlus => UpdateOp::Increment,
            TokenKind::MinusMinus => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        self.advance();
        Ok(Expr::new(
            ExprKind::Update {
                op,
                prefix: false,
                arg: Box::new(expr),
            },
            self.span_from(start),
        ))
    }

    /// Member access, calls, and `new`.
    fn parse_lhs_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new_expr()?
        } else {
            self.parse_primary_expr()?
        };

        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.member_name()?;
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property,
                            optional: false,
                        },
                        self.span_from(start),
                    );
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    expr = match self.peek() {
                        TokenKind::LParen => {
                            let args = self.parse_arguments()?;
                            Expr::new(
                                ExprKind::Call {
                                    callee: Box::new(expr),
                                    args,
                                    optional: true,
                                },
                                self.span_from(start),
                            )
                        }
                        TokenKind::LBracket => {
                            self.advance();
                            let index = self.with_in(true, Self::parse_expr)?;
                            self.expect(&TokenKind::RBracket)?;
                            Expr::new(
                                ExprKind::Index {
                                    object: Box::new(expr),
                                    index: Box::new(index),
                                    optional: true,
                                },
                                self.span_from(start),
                            )
                        }
                        _ => {
                            let property = self.member_name()?;
                            Expr::new(
                                ExprKind::Member {
                                    object: Box::new(expr),
                                    property,
                                    optional: true,
                                },
                                self.span_from(start),
                            )
                        }
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.with_in(true, Self::parse_expr)?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expr::new(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                            optional: false,
                        },
                        self.span_from(start),
                    );
                }
                TokenKind::LParen => {
                    let args = self.parse_arguments()?;
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                            optional: false,
                        },
                        self.span_from(start),
                    );
                }
                TokenKind::TemplateNoSub(_) | TokenKind::TemplateHead(_) => {
                    let quasi = self.parse_template()?;
                    expr = Expr::new(
                        ExprKind::TaggedTemplate {
                            tag: Box::new(expr),
                            quasi,
                        },
                        self.span_from(start),
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn member_name(&mut self) -> Result<String, ParseError> {
        if let TokenKind::PrivateName(name) = self.peek().clone() {
            self.advance();
            return Ok(format!("#{name}"));
        }
        self.expect_name()
    }

    fn parse_new_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.expect(&TokenKind::New)?;

        if self.eat(&TokenKind::Dot) {
            let property = self.expect_name()?;
            return Ok(Expr::new(
                ExprKind::MetaProperty {
                    meta: "new".to_string(),
                    property,
                },
                self.span_from(start),
            ));
        }

        let mut callee = if self.check(&TokenKind::New) {
            self.parse_new_expr()?
        } else {
            self.parse_primary_expr()?
        };
        let callee_start = callee.span.start;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.member_name()?;
                    callee = Expr::new(
                        ExprKind::Member {
                            object: Box::new(callee),
                            property,
                            optional: false,
                        },
                        self.span_from(callee_start),
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.with_in(true, Self::parse_expr)?;
                    self.expect(&TokenKind::RBracket)?;
                    callee = Expr::new(
                        ExprKind::Index {
                            object: Box::new(callee),
                            index: Box::new(index),
                            optional: false,
                        },
                        self.span_from(callee_start),
                    );
                }
                _ => break,
            }
        }

        let args = if self.check(&TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expr::new(
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            self.span_from(start),
        ))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        self.with_in(true, |p| {
            while !p.check(&TokenKind::RParen) {
                args.push(p.parse_spread_or_assign()?);
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            Ok(())
        })?;
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_spread_or_assign(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        if self.eat(&TokenKind::Spread) {
            let arg = self.parse_assign_expr()?;
            return Ok(Expr::new(ExprKind::Spread(Box::new(arg)), self.span_from(start)));
        }
        self.parse_assign_expr()
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let span = self.current.span;

        match self.peek().clone() {
            TokenKind::Identifier(name) => {
                if name == "async" {
                    if self.async_function_follows() {
                        self.advance();
                        let func = self.parse_function(true, false)?;
                        return Ok(Expr::new(ExprKind::Function(Box::new(func)), self.span_from(start)));
                    }
                    let next = self.lexer.peek();
                    if matches!(next.kind, TokenKind::LParen) && !next.newline_before {
                        self.advance();
                        return self.parse_paren_or_arrow(true, start, span);
                    }
                }
                let id = self.expect_identifier()?;
                Ok(Expr::new(ExprKind::Ident(id), span))
            }
            TokenKind::Yield | TokenKind::Await | TokenKind::Let => {
                let id = self.expect_identifier()?;
                Ok(Expr::new(ExprKind::Ident(id), span))
            }
            TokenKind::Number(raw) => {
                self.advance();
                Ok(Expr::new(ExprKind::Number(raw), span))
            }
            TokenKind::BigInt(raw) => {
                self.advance();
                Ok(Expr::new(ExprKind::BigInt(raw), span))
            }
            TokenKind::String(_) => {
                self.advance();
                Ok(Expr::new(ExprKind::Str(self.raw(span)), span))
            }
            TokenKind::Regex { pattern, flags } => {
                self.advance();
                Ok(Expr::new(ExprKind::Regex { pattern, flags }, span))
            }
            TokenKind::TemplateNoSub(_) | TokenKind::TemplateHead(_) => {
                let template = self.parse_template()?;
                Ok(Expr::new(ExprKind::Template(template), self.span_from(start)))
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::new(ExprKind::This, span))
            }
            TokenKind::Super => {
                self.advance();
                Ok(Expr::new(ExprKind::Super, span))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::new(ExprKind::Null, span))
            }
            TokenKind::True | TokenKind::False => {
                let value = self.check(&TokenKind::True);
                self.advance();
                Ok(Expr::new(ExprKind::Bool(value), span))
            }
            TokenKind::LParen => self.parse_paren_or_arrow(false, start, span),
            TokenKind::Lt if self.options.jsx => self.parse_jsx_element(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::Function => {
                let func = self.parse_function(false, false)?;
                Ok(Expr::new(ExprKind::Function(Box::new(func)), self.span_from(start)))
            }
            TokenKind::Class => {
                let class = self.parse_class(false)?;
                Ok(Expr::new(ExprKind::Class(Box::new(class)), self.span_from(start)))
            }
            TokenKind::Import => {
                self.advance();
                if self.eat(&TokenKind::Dot) {
                    let property = self.expect_name()?;
                    return Ok(Expr::new(
                        ExprKind::MetaProperty {
                            meta: "import".to_string(),
                            property,
                        },
                        self.span_from(start),
                    ));
                }
                self.expect(&TokenKind::LParen)?;
                let arg = self.with_in(true, Self::parse_assign_expr)?;
                self.expect(&TokenKind::RParen)?;
                Ok(Expr::new(ExprKind::Import(Box::new(arg)), self.span_from(start)))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.expect(&TokenKind::LBracket)?;
        let mut elements = Vec::new();
        self.with_in(true, |p| {
            loop {
                match p.peek() {
                    TokenKind::RBracket => break,
                    TokenKind::Comma => {
                        p.advance();
                        elements.push(None);
                    }
                    _ => {
                        elements.push(Some(p.parse_spread_or_assign()?));
                        if !p.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
            }
            Ok(())
        })?;
        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::new(ExprKind::Array(elements), self.span_from(start)))
    }

    fn parse_object_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.expect(&TokenKind::LBrace)?;
        let mut members = Vec::new();
        self.with_in(true, |p| {
            while !p.check(&TokenKind::RBrace) {
                members.push(p.parse_object_member()?);
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            Ok(())
        })?;
        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::new(ExprKind::Object(members), self.span_from(start)))
    }

    fn parse_object_member(&mut self) -> Result<ObjectMember, ParseError> {
        let start = self.start();
        if self.eat(&TokenKind::Spread) {
            return Ok(ObjectMember::Spread(self.parse_assign_expr()?));
        }

        let mut is_async = false;
        if self.is_word("async") && self.modifier_applies() {
            self.advance();
            is_async = true;
        }
        let is_generator = self.eat(&TokenKind::Star);
        let mut kind = VarKind::Init;
        if !is_async && !is_generator && (self.is_word("get") || self.is_word("set")) && self.modifier_applies() {
            kind = if self.is_word("get") { VarKind::Get } else { VarKind::Set };
            self.advance();
        }

        let key_span = self.current.span;
        let key = self.parse_property_key()?;

        if self.check(&TokenKind::LParen) {
            let func_start = self.start();
            let func = self.parse_method(is_async, is_generator)?;
            let value = Expr::new(ExprKind::Function(Box::new(func)), self.span_from(func_start));
            return Ok(ObjectMember::Property(Property {
                key,
                value,
                kind: if kind == VarKind::Init { VarKind::Method } else { kind },
                shorthand: false,
                span: self.span_from(start),
            }));
        }
        if kind != VarKind::Init || is_async || is_generator {
            return Err(self.unexpected());
        }

        if self.eat(&TokenKind::Colon) {
            let value = self.parse_assign_expr()?;
            return Ok(ObjectMember::Property(Property {
                key,
                value,
                kind,
                shorthand: false,
                span: self.span_from(start),
            }));
        }

        let PropertyKey::Ident(name) = &key else {
            return Err(self.unexpected());
        };
        let id = self.alloc_ident(name.clone(), key_span);
        let mut value = Expr::new(ExprKind::Ident(id), key_span);
        // `{ a = 1 }` is only valid once reinterpreted as a pattern.
        if self.eat(&TokenKind::Eq) {
            let default = self.parse_assign_expr()?;
            value = Expr::new(
                ExprKind::Assign {
                    op: AssignOp::Assign,
                    target: Box::new(Pattern::Ident(id)),
                    value: Box::new(default),
                },
                self.span_from(start),
            );
        }
        Ok(ObjectMember::Property(Property {
            key,
            value,
            kind,
            shorthand: true,
            span: self.span_from(start),
        }))
    }

    fn parse_template(&mut self) -> Result<Template, ParseError> {
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();

        match self.peek().clone() {
            TokenKind::TemplateNoSub(raw) => {
                self.advance();
                quasis.push(raw);
                return Ok(Template { quasis, exprs });
            }
            TokenKind::TemplateHead(raw) => {
                self.advance();
                quasis.push(raw);
            }
            _ => return Err(ParseError::new("Expected template literal", self.current.span)),
        }

        loop {
            exprs.push(self.with_in(true, Self::parse_expr)?);
            if !self.check(&TokenKind::RBrace) {
                return Err(ParseError::new("Expected } in template literal", self.current.span));
            }
            self.current = self.lexer.scan_template_continuation();
            match self.peek().clone() {
                TokenKind::TemplateMiddle(raw) => {
                    self.advance();
                    quasis.push(raw);
                }
                TokenKind::TemplateTail(raw) => {
                    self.advance();
                    quasis.push(raw);
                    break;
                }
                _ => return Err(self.unexpected()),
            }
        }

        Ok(Template { quasis, exprs })
    }

    /// Parse `( ... )` as either a parenthesized expression or the
    /// parameter list of an arrow function.
    fn parse_paren_or_arrow(&mut self, is_async: bool, start: u32, async_span: Span) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LParen)?;

        let mut exprs = Vec::new();
        let mut rest = None;
        self.with_in(true, |p| {
            while !p.check(&TokenKind::RParen) {
                if p.eat(&TokenKind::Spread) {
                    rest = Some(p.parse_binding_pattern()?);
                    break;
                }
                exprs.push(p.parse_assign_expr()?);
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            Ok(())
        })?;
        self.expect(&TokenKind::RParen)?;

        if self.check(&TokenKind::Arrow) && !self.current.newline_before {
            self.advance();
            let mut params = Vec::new();
            for expr in exprs {
                params.push(Param {
                    pattern: self.expr_to_pattern(expr)?,
                    rest: false,
                });
            }
            if let Some(pattern) = rest {
                params.push(Param { pattern, rest: true });
            }
            return self.parse_arrow_body(params, is_async, start);
        }

        if rest.is_some() {
            return Err(ParseError::new("Rest element outside arrow parameters", self.span_from(start)));
        }

        if is_async {
            let callee_id = self.alloc_ident("async".to_string(), async_span);
            let callee = Expr::new(ExprKind::Ident(callee_id), async_span);
            return Ok(Expr::new(
                ExprKind::Call {
                    callee: Box::new(callee),
                    args: exprs,
                    optional: false,
                },
                self.span_from(start),
            ));
        }

        match exprs.len() {
            0 => Err(ParseError::new("Expected =>", self.current.span)),
            1 => Ok(exprs.remove(0)),
            _ => Ok(Expr::new(ExprKind::Sequence(exprs), self.span_from(start))),
        }
    }

    fn parse_arrow_body(&mut self, params: Vec<Param>, is_async: bool, start: u32) -> Result<Expr, ParseError> {
        let body = if self.check(&TokenKind::LBrace) {
            ArrowBody::Block(self.parse_function_body()?)
        } else {
            ArrowBody::Expr(Box::new(self.parse_assign_expr()?))
        };
        let span = self.span_from(start);
        Ok(Expr::new(
            ExprKind::Arrow(Box::new(ArrowFunction {
                params,
                body,
                is_async,
                span,
            })),
            span,
        ))
    }

    // =========================================================================
    // Cover grammar
    // =========================================================================

    /// Reinterpret an expression as an assignment / parameter pattern.
    fn expr_to_pattern(&self, expr: Expr) -> Result<Pattern, ParseError> {
        let span = expr.span;
        match expr.kind {
            ExprKind::Ident(id) => Ok(Pattern::Ident(id)),
            ExprKind::Member { optional: false, .. } | ExprKind::Index { optional: false, .. } => {
                Ok(Pattern::Expr(Box::new(expr)))
            }
            ExprKind::Assign {
                op: AssignOp::Assign,
                target,
                value,
            } => Ok(Pattern::Assign {
                target,
                default: value,
            }),
            ExprKind::Array(elements) => {
                let mut patterns = Vec::new();
                let mut rest = None;
                let count = elements.len();
                for (i, element) in elements.into_iter().enumerate() {
                    match element {
                        None => patterns.push(None),
                        Some(Expr {
                            kind: ExprKind::Spread(inner),
                            ..
                        }) if i + 1 == count => {
                            rest = Some(Box::new(self.expr_to_pattern(*inner)?));
                        }
                        Some(e) => patterns.push(Some(self.expr_to_pattern(e)?)),
                    }
                }
                Ok(Pattern::Array {
                    elements: patterns,
                    rest,
                    span,
                })
            }
            ExprKind::Object(members) => {
                let mut props = Vec::new();
                let mut rest = None;
                let count = members.len();
                for (i, member) in members.into_iter().enumerate() {
                    match member {
                        ObjectMember::Spread(inner) if i + 1 == count => {
                            rest = Some(Box::new(self.expr_to_pattern(inner)?));
                        }
                        ObjectMember::Spread(inner) => {
                            return Err(ParseError::new("Rest element must be last", inner.span));
                        }
                        ObjectMember::Property(prop) => {
                            if prop.kind != VarKind::Init {
                                return Err(ParseError::new("Invalid destructuring target", prop.span));
                            }
                            props.push(ObjectPatternProp {
                                key: prop.key,
                                value: self.expr_to_pattern(prop.value)?,
                                shorthand: prop.shorthand,
                            });
                        }
                    }
                }
                Ok(Pattern::Object { props, rest, span })
            }
            _ => Err(ParseError::new("Invalid assignment target", span)),
        }
    }

    /// Target of a compound assignment or update: identifier or member.
    fn simple_target(&self, expr: Expr) -> Result<Pattern, ParseError> {
        match expr.kind {
            ExprKind::Ident(id) => Ok(Pattern::Ident(id)),
            ExprKind::Member { .. } | ExprKind::Index { .. } => Ok(Pattern::Expr(Box::new(expr))),
            _ => Err(ParseError::new("Invalid assignment target", expr.span)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Ast, ParseError> {
        Parser::new(source, ParserOptions::module()).parse()
    }

    #[test]
    fn test_variable_declaration() {
        let ast = parse("const x = 1;").unwrap();
        assert_eq!(ast.stmts.len(), 1);
        let StmtKind::Var(decl) = &ast.stmts[0].kind else {
            panic!("expected var declaration");
        };
        assert_eq!(decl.kind, VarKind::Const);
        assert_eq!(ast.name(0), "x");
    }

    #[test]
    fn test_function_declaration() {
        let ast = parse("function add(a, b) { return a + b; }").unwrap();
        assert!(matches!(ast.stmts[0].kind, StmtKind::Function(_)));
        let names: Vec<&str> = ast.idents.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["add", "a", "b", "a", "b"]);
    }

    #[test]
    fn test_binary_precedence() {
        let ast = parse("x = 1 + 2 * 3;").unwrap();
        let StmtKind::Expr(expr) = &ast.stmts[0].kind else {
            panic!("expected expression");
        };
        let ExprKind::Assign { value, .. } = &expr.kind else {
            panic!("expected assignment");
        };
        let ExprKind::Binary { op, right, .. } = &value.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_arrow_functions() {
        let ast = parse("const f = (a, { b }, ...c) => a; const g = x => x; const h = async () => {};").unwrap();
        assert_eq!(ast.stmts.len(), 3);
        let StmtKind::Var(decl) = &ast.stmts[0].kind else {
            panic!("expected var declaration");
        };
        let Some(Expr {
            kind: ExprKind::Arrow(arrow),
            ..
        }) = &decl.decls[0].init
        else {
            panic!("expected arrow");
        };
        assert_eq!(arrow.params.len(), 3);
        assert!(arrow.params[2].rest);
    }

    #[test]
    fn test_destructuring_assignment() {
        let ast = parse("[a, b] = [b, a]; ({ x, y: z = 1 } = obj);").unwrap();
        assert_eq!(ast.stmts.len(), 2);
    }

    #[test]
    fn test_class_declaration() {
        let ast = parse("class A extends B { constructor() { super(); } static get x() { return 1; } #p = 2; }").unwrap();
        let StmtKind::Class(class) = &ast.stmts[0].kind else {
            panic!("expected class");
        };
        assert_eq!(class.members.len(), 3);
        assert!(matches!(class.members[0], ClassMember::Method { kind: VarKind::Ctor, .. }));
    }

    #[test]
    fn test_imports_and_exports() {
        let ast = parse(
            "import React, { a as b, c } from 'react';\n\
             import * as ns from './ns';\n\
             export { b as d };\n\
             export * from './all';\n\
             export default function () {}\n",
        )
        .unwrap();
        assert_eq!(ast.stmts.len(), 5);
        let StmtKind::Import(import) = &ast.stmts[0].kind else {
            panic!("expected import");
        };
        assert_eq!(import.source, "react");
        assert_eq!(import.specifiers.len(), 3);
    }

    #[test]
    fn test_asi_and_regex() {
        let ast = parse("let a = 1\nlet b = a / 2\nconst r = /x+/g\nreturn\n").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(ast.stmts.len(), 4);
    }

    #[test]
    fn test_template_literal() {
        let ast = parse("const s = `a${x}b${y}c`;").unwrap();
        let StmtKind::Var(decl) = &ast.stmts[0].kind else {
            panic!("expected var declaration");
        };
        let Some(Expr {
            kind: ExprKind::Template(template),
            ..
        }) = &decl.decls[0].init
        else {
            panic!("expected template");
        };
        assert_eq!(template.quasis, vec!["a", "b", "c"]);
        assert_eq!(template.exprs.len(), 2);
    }

    #[test]
    fn test_for_of_and_in() {
        let ast = parse("for (const [k, v] of entries) {} for (key in obj) {} for (let i = 0; i < n; i++) {}").unwrap();
        assert!(matches!(ast.stmts[0].kind, StmtKind::ForOf { .. }));
        assert!(matches!(ast.stmts[1].kind, StmtKind::ForIn { .. }));
        assert!(matches!(ast.stmts[2].kind, StmtKind::For { .. }));
    }

    #[test]
    fn test_syntax_error() {
        let err = parse("let = ;").unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_import_rejected_in_script() {
        assert!(Parser::new("import a from 'a';", ParserOptions::default()).parse().is_err());
    }
}

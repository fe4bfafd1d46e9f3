//! hoist-parser: JavaScript parser and code generator.
//!
//! The AST keeps every identifier occurrence in a side arena
//! (`Ast::idents`) addressed by `IdentId`. Scope analysis records handles
//! instead of borrowing into the tree, and renaming rewrites arena entries.
//! The code generator reads names from the arena, so a renamed AST prints
//! renamed code.
//!
//! # Example
//!
//! ```
//! use hoist_parser::{Codegen, CodegenOptions, Parser, ParserOptions};
//!
//! let ast = Parser::new("const x = 1 + 2;", ParserOptions::module()).parse().unwrap();
//! let out = Codegen::new(&ast, CodegenOptions::default()).generate();
//! assert_eq!(out, "const x = 1 + 2;\n");
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::cast_possible_truncation,
    clippy::wildcard_imports,
    clippy::match_same_arms,
    clippy::unused_self,
    clippy::must_use_candidate
)]

mod ast;
mod codegen;
mod jsx;
mod lexer;
mod parser;
mod span;
mod token;

pub use ast::*;
pub use codegen::{is_identifier_name, Codegen, CodegenOptions, SourceMapping};
pub use lexer::Lexer;
pub use parser::{ParseError, Parser, ParserOptions};
pub use span::{LineIndex, Span};
pub use token::{keyword_from_str, Token, TokenKind};

/// Parse an ES module.
pub fn parse(source: &str) -> Result<Ast, ParseError> {
    Parser::new(source, ParserOptions::module()).parse()
}

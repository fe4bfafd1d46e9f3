//! JSX parsing.
//!
//! Elements are lowered as they are parsed, to the classic runtime form
//! `React.createElement(type, props, ...children)`, so scope analysis and
//! code generation only ever see ordinary calls. `React` is emitted as a
//! plain reference and binds to whatever `React` is in scope.
//!
//! Tag names, attribute strings and text follow JSX rules rather than
//! JavaScript ones, so they are scanned straight from the source bytes.
//! The lexer is rewound past each piece to pick up ordinary tokens again.

use crate::ast::*;
use crate::codegen::is_identifier_name;
use crate::parser::{ParseError, Parser};
use crate::span::Span;
use crate::token::TokenKind;

/// Callee of a lowered element.
const CREATE_ELEMENT: [&str; 2] = ["React", "createElement"];
/// Type passed for `<>...</>`.
const FRAGMENT: [&str; 2] = ["React", "Fragment"];

/// Tag name as written.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TagName {
    /// `div`, `my-element`, `Button`
    Ident(String),
    /// `Foo.Bar`
    Member(Vec<String>),
    /// `svg:rect`
    Namespaced(String, String),
}

impl TagName {
    fn text(&self) -> String {
        match self {
            Self::Ident(name) => name.clone(),
            Self::Member(parts) => parts.join("."),
            Self::Namespaced(namespace, name) => format!("{namespace}:{name}"),
        }
    }
}

/// Host elements are passed by name; components by reference.
fn is_intrinsic(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase()) || name.contains('-')
}

fn is_jsx_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'$' | b'-') || byte >= 0x80
}

impl Parser<'_> {
    /// Parse an element or fragment. The current token is its `<`.
    pub(crate) fn parse_jsx_element(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.jsx_rewind(start + 1, false);

        if self.at_byte(b'>') {
            let (children, close) = self.parse_jsx_children(self.current.span.start + 1)?;
            self.parse_jsx_closing(close, None)?;
            let tag = self.jsx_path(&FRAGMENT, Span::new(start, start + 1));
            return Ok(self.create_element(tag, Vec::new(), children, start));
        }

        let (name, name_span) = self.parse_jsx_tag_name()?;
        let props = self.parse_jsx_attributes()?;
        let children = if self.at_byte(b'/') {
            self.jsx_rewind(self.current.span.start + 1, false);
            if !self.at_byte(b'>') {
                return Err(ParseError::new("Expected '>' after '/' in JSX element", self.current.span));
            }
            self.finish_jsx_token(self.current.span.start + 1);
            Vec::new()
        } else if self.at_byte(b'>') {
            let (children, close) = self.parse_jsx_children(self.current.span.start + 1)?;
            self.parse_jsx_closing(close, Some(&name))?;
            children
        } else {
            return Err(ParseError::new("Expected '>' or '/>' in JSX element", self.current.span));
        };

        let tag = self.jsx_tag(&name, name_span);
        Ok(self.create_element(tag, props, children, start))
    }

    // =========================================================================
    // Scanning
    // =========================================================================

    /// Restart the lexer at `pos` and load the token found there.
    fn jsx_rewind(&mut self, pos: u32, allow_regex: bool) {
        self.lexer.rewind(pos as usize, allow_regex);
        self.current = self.lexer.next_token();
    }

    /// Mark everything before `end` consumed and continue in tag context.
    fn finish_jsx_token(&mut self, end: u32) {
        self.prev_end = end;
        self.jsx_rewind(end, false);
    }

    /// The current token starts with `byte`.
    fn at_byte(&self, byte: u8) -> bool {
        self.source.as_bytes().get(self.current.span.start as usize) == Some(&byte)
    }

    /// Identifier that may contain `-` after its first character.
    fn jsx_identifier(&mut self) -> Result<(String, Span), ParseError> {
        let source = self.source;
        let bytes = source.as_bytes();
        let start = self.current.span.start as usize;
        let starts_name = bytes
            .get(start)
            .is_some_and(|&b| is_jsx_name_byte(b) && b != b'-' && !b.is_ascii_digit());
        if !starts_name {
            return Err(ParseError::new(
                format!("Expected JSX identifier, got {:?}", self.peek()),
                self.current.span,
            ));
        }
        let end = (start..bytes.len()).find(|&i| !is_jsx_name_byte(bytes[i])).unwrap_or(bytes.len());
        self.finish_jsx_token(end as u32);
        Ok((source[start..end].to_string(), Span::new(start as u32, end as u32)))
    }

    fn parse_jsx_tag_name(&mut self) -> Result<(TagName, Span), ParseError> {
        let (first, span) = self.jsx_identifier()?;
        if self.at_byte(b':') {
            self.jsx_rewind(self.current.span.start + 1, false);
            let (name, name_span) = self.jsx_identifier()?;
            return Ok((TagName::Namespaced(first, name), Span::new(span.start, name_span.end)));
        }
        if !self.at_byte(b'.') {
            return Ok((TagName::Ident(first), span));
        }
        let mut parts = vec![first];
        let mut end = span.end;
        while self.at_byte(b'.') {
            self.jsx_rewind(self.current.span.start + 1, false);
            let (part, part_span) = self.jsx_identifier()?;
            parts.push(part);
            end = part_span.end;
        }
        Ok((TagName::Member(parts), Span::new(span.start, end)))
    }

    /// Attributes up to the `>` or `/>` that ends the opening tag.
    fn parse_jsx_attributes(&mut self) -> Result<Vec<ObjectMember>, ParseError> {
        let mut members = Vec::new();
        while !self.at_byte(b'/') && !self.at_byte(b'>') {
            if self.is_eof() {
                return Err(ParseError::new("Unterminated JSX tag", self.current.span));
            }
            let start = self.start();
            if self.check(&TokenKind::LBrace) {
                self.advance();
                self.expect(&TokenKind::Spread)?;
                let argument = self.with_in(true, Self::parse_assign_expr)?;
                self.expect_jsx_brace()?;
                members.push(ObjectMember::Spread(argument));
                continue;
            }

            let (mut name, name_span) = self.jsx_identifier()?;
            if self.at_byte(b':') {
                self.jsx_rewind(self.current.span.start + 1, false);
                let (local, _) = self.jsx_identifier()?;
                name = format!("{name}:{local}");
            }
            let value = if self.at_byte(b'=') {
                self.jsx_rewind(self.current.span.start + 1, false);
                self.parse_jsx_attribute_value()?
            } else {
                Expr::new(ExprKind::Bool(true), name_span)
            };
            let key = if is_identifier_name(&name) {
                PropertyKey::Ident(name)
            } else {
                PropertyKey::Str(js_string(&name))
            };
            members.push(ObjectMember::Property(Property {
                key,
                value,
                kind: VarKind::Init,
                shorthand: false,
                span: self.span_from(start),
            }));
        }
        Ok(members)
    }

    /// `"text"`, `{expression}` or a nested element.
    fn parse_jsx_attribute_value(&mut self) -> Result<Expr, ParseError> {
        let source = self.source;
        let span = self.current.span;
        match source.as_bytes().get(span.start as usize) {
            Some(&quote @ (b'"' | b'\'')) => {
                let body = span.start as usize + 1;
                let Some(len) = source[body..].find(char::from(quote)) else {
                    return Err(ParseError::new("Unterminated JSX string", span));
                };
                let end = body + len;
                let value = decode_entities(&source[body..end]);
                let expr = Expr::new(ExprKind::Str(js_string(&value)), Span::new(span.start, end as u32 + 1));
                self.finish_jsx_token(end as u32 + 1);
                Ok(expr)
            }
            Some(b'{') => {
                self.advance();
                let value = self.with_in(true, Self::parse_assign_expr)?;
                self.expect_jsx_brace()?;
                Ok(value)
            }
            Some(b'<') if self.check(&TokenKind::Lt) => self.parse_jsx_element(),
            _ => Err(ParseError::new("Expected JSX attribute value", span)),
        }
    }

    /// Close an embedded expression and continue after its `}`.
    fn expect_jsx_brace(&mut self) -> Result<(), ParseError> {
        if !self.check(&TokenKind::RBrace) {
            return Err(ParseError::new(
                format!("Expected '}}' in JSX, got {:?}", self.peek()),
                self.current.span,
            ));
        }
        self.finish_jsx_token(self.current.span.end);
        Ok(())
    }

    /// Children from `pos` (just past the opening tag) to the closing tag.
    /// Also returns the offset of the closing tag's `<`.
    fn parse_jsx_children(&mut self, start: u32) -> Result<(Vec<Expr>, u32), ParseError> {
        let source = self.source;
        let bytes = source.as_bytes();
        let mut children = Vec::new();
        let mut pos = start as usize;
        loop {
            let Some(offset) = bytes[pos..].iter().position(|&b| b == b'<' || b == b'{') else {
                return Err(ParseError::new(
                    "Unterminated JSX contents",
                    Span::new(start, bytes.len() as u32),
                ));
            };
            let end = pos + offset;
            if let Some(text) = jsx_text(&source[pos..end]) {
                children.push(Expr::new(ExprKind::Str(js_string(&text)), Span::new(pos as u32, end as u32)));
            }

            if bytes[end] == b'{' {
                self.jsx_rewind(end as u32 + 1, true);
                // `{}` and `{/* comment */}` add nothing.
                if !self.check(&TokenKind::RBrace) {
                    let child_start = self.start();
                    let child = if self.eat(&TokenKind::Spread) {
                        let argument = self.with_in(true, Self::parse_assign_expr)?;
                        Expr::new(ExprKind::Spread(Box::new(argument)), self.span_from(child_start))
                    } else {
                        self.with_in(true, Self::parse_assign_expr)?
                    };
                    if !self.check(&TokenKind::RBrace) {
                        return Err(ParseError::new(
                            format!("Expected '}}' in JSX, got {:?}", self.peek()),
                            self.current.span,
                        ));
                    }
                    children.push(child);
                }
                pos = self.current.span.end as usize;
                continue;
            }

            self.jsx_rewind(end as u32 + 1, false);
            if self.at_byte(b'/') {
                return Ok((children, end as u32));
            }
            self.jsx_rewind(end as u32, false);
            children.push(self.parse_jsx_element()?);
            pos = self.prev_end as usize;
        }
    }

    /// `</name>`, or `</>` when `open` is `None`. `lt` is the offset of `<`.
    fn parse_jsx_closing(&mut self, lt: u32, open: Option<&TagName>) -> Result<(), ParseError> {
        self.jsx_rewind(lt + 1, false);
        self.jsx_rewind(self.current.span.start + 1, false);
        if let Some(open) = open {
            let span = self.current.span;
            let (close, _) = self.parse_jsx_tag_name()?;
            if close != *open {
                return Err(ParseError::new(
                    format!("Expected corresponding JSX closing tag for <{}>", open.text()),
                    span,
                ));
            }
        }
        if !self.at_byte(b'>') {
            return Err(ParseError::new("Expected '>' in JSX closing tag", self.current.span));
        }
        self.finish_jsx_token(self.current.span.start + 1);
        Ok(())
    }

    // =========================================================================
    // Lowering
    // =========================================================================

    fn jsx_tag(&mut self, name: &TagName, span: Span) -> Expr {
        match name {
            TagName::Ident(name) if !is_intrinsic(name) => self.jsx_path(&[name.as_str()], span),
            TagName::Member(parts) => {
                let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
                self.jsx_path(&parts, span)
            }
            other => Expr::new(ExprKind::Str(js_string(&other.text())), span),
        }
    }

    /// `a.b.c`, with `a` a reference.
    fn jsx_path(&mut self, parts: &[&str], span: Span) -> Expr {
        let Some((first, rest)) = parts.split_first() else {
            return Expr::new(ExprKind::Null, span);
        };
        let root = if *first == "this" {
            Expr::new(ExprKind::This, span)
        } else {
            Expr::new(ExprKind::Ident(self.alloc_ident((*first).to_string(), span)), span)
        };
        rest.iter().fold(root, |object, property| {
            Expr::new(
                ExprKind::Member {
                    object: Box::new(object),
                    property: (*property).to_string(),
                    optional: false,
                },
                span,
            )
        })
    }

    /// `React.createElement(tag, props, ...children)`. Props are `null`
    /// when there are children but no attributes, and left out when
    /// there are neither.
    fn create_element(&mut self, tag: Expr, props: Vec<ObjectMember>, children: Vec<Expr>, start: u32) -> Expr {
        let span = self.span_from(start);
        let mut args = Vec::with_capacity(children.len() + 2);
        args.push(tag);
        if !props.is_empty() {
            args.push(Expr::new(ExprKind::Object(props), span));
        } else if !children.is_empty() {
            args.push(Expr::new(ExprKind::Null, span));
        }
        args.extend(children);
        let callee = self.jsx_path(&CREATE_ELEMENT, Span::new(start, start + 1));
        Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
                optional: false,
            },
            span,
        )
    }
}

/// Text child as React sees it: lines are trimmed, blank lines dropped
/// and the rest joined by single spaces. Text on one line is kept as is.
fn jsx_text(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let lines: Vec<&str> = raw.split('\n').collect();
    let last = lines.len() - 1;
    let is_space = |c: char| c == ' ' || c == '\t' || c == '\r';
    let mut pieces = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let mut line = *line;
        if index > 0 {
            line = line.trim_start_matches(is_space);
        }
        if index < last {
            line = line.trim_end_matches(is_space);
        }
        if !line.is_empty() {
            pieces.push(line);
        }
    }
    if pieces.is_empty() {
        return None;
    }
    Some(decode_entities(&pieces.join(" ")))
}

/// Replace `&name;`, `&#123;` and `&#x7b;` references. Unknown ones stay.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| entity(&rest[1..semi]).map(|ch| (ch, semi)));
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| name.strip_prefix('#').map(str::parse::<u32>))?
                .ok()?;
            char::from_u32(code)
        }
    }
}

/// Double-quoted JavaScript string literal holding `value`.
fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{Codegen, CodegenOptions};
    use crate::parser::ParserOptions;

    fn parse(source: &str) -> Result<Ast, ParseError> {
        Parser::new(source, ParserOptions::module().with_jsx(true)).parse()
    }

    fn print(source: &str) -> String {
        let ast = parse(source).unwrap();
        Codegen::new(&ast, CodegenOptions::default()).generate()
    }

    #[test]
    fn test_empty_and_self_closing() {
        assert_eq!(print("const result = <a></a>;"), "const result = React.createElement(\"a\");\n");
        assert_eq!(print("const result = <a />;"), "const result = React.createElement(\"a\");\n");
    }

    #[test]
    fn test_attributes() {
        assert_eq!(
            print("const result = <a name=\"hello\" />;"),
            "const result = React.createElement(\"a\", { name: \"hello\" });\n"
        );
        assert_eq!(
            print("const result = <a name={1 + 1} {...props} disabled />;"),
            "const result = React.createElement(\"a\", { name: 1 + 1, ...props, disabled: true });\n"
        );
        assert_eq!(
            print("x = <input aria-label=\"a\\b\" xlink:href='#a' />;"),
            "x = React.createElement(\"input\", { \"aria-label\": \"a\\\\b\", \"xlink:href\": \"#a\" });\n"
        );
    }

    #[test]
    fn test_children() {
        assert_eq!(
            print("const result = <a>aaa</a>;"),
            "const result = React.createElement(\"a\", null, \"aaa\");\n"
        );
        assert_eq!(
            print("const result = <a><b /></a>;"),
            "const result = React.createElement(\"a\", null, React.createElement(\"b\"));\n"
        );
        assert_eq!(
            print("x = <ul>{items.map(i => <li key={i}>{i}</li>)}{/* none */}</ul>;"),
            "x = React.createElement(\"ul\", null, items.map((i) => React.createElement(\"li\", { key: i }, i)));\n"
        );
    }

    #[test]
    fn test_text_whitespace() {
        assert_eq!(
            print("x = <p>\n  Hello,\n  {name}!  \n</p>;"),
            "x = React.createElement(\"p\", null, \"Hello,\", name, \"!\");\n"
        );
        assert_eq!(print("x = <p> a &amp; b </p>;"), "x = React.createElement(\"p\", null, \" a & b \");\n");
        assert_eq!(print("x = <p>\"q\" &#65;&#x42; a/b >= c</p>;"), "x = React.createElement(\"p\", null, \"\\\"q\\\" AB a/b >= c\");\n");
    }

    #[test]
    fn test_components_and_fragments() {
        assert_eq!(
            print("x = <Foo.Bar value={<Baz />} />;"),
            "x = React.createElement(Foo.Bar, { value: React.createElement(Baz) });\n"
        );
        assert_eq!(
            print("x = <><Item />text</>;"),
            "x = React.createElement(React.Fragment, null, React.createElement(Item), \"text\");\n"
        );
    }

    #[test]
    fn test_component_names_are_references() {
        let ast = parse("const el = <Button label=\"a\" />;").unwrap();
        let names: Vec<&str> = ast.idents.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["el", "Button", "React"]);
    }

    #[test]
    fn test_comparison_still_parses() {
        assert_eq!(print("x = a < b && c > d;"), "x = a < b && c > d;\n");
        assert_eq!(print("x = <a /> / 2;"), "x = React.createElement(\"a\") / 2;\n");
    }

    #[test]
    fn test_errors() {
        assert!(parse("x = <a></b>;").is_err());
        assert!(parse("x = <a>text").is_err());
        assert!(parse("x = <></a>;").is_err());
        assert!(parse("x = <a b=c />;").is_err());
        assert!(Parser::new("x = <a />;", ParserOptions::module()).parse().is_err());
    }
}

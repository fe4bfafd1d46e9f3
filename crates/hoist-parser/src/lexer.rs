//! Lexer (tokenizer) for JavaScript.
//!
//! The lexer is called on demand by the parser, which enables
//! context-sensitive tokenization (regex vs division, template
//! continuations after `}`).

use crate::span::Span;
use crate::token::{keyword_from_str, Token, TokenKind};

/// The lexer state.
#[derive(Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    /// Current byte position.
    pos: usize,
    /// Start position of the current token.
    token_start: usize,
    /// Whether the previous token allows a regex to follow.
    allow_regex: bool,
    /// Whether a line terminator was skipped before the current token.
    newline_before: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            token_start: 0,
            allow_regex: true,
            newline_before: false,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Token {
        self.newline_before = false;
        self.skip_whitespace_and_comments();
        self.token_start = self.pos;

        if self.is_eof() {
            return self.make_token(TokenKind::Eof);
        }

        let ch = self.current();
        let kind = match ch {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' | 0x80..=0xff => self.scan_identifier(),
            b'\\' => self.scan_identifier(),
            b'0'..=b'9' => self.scan_number(),
            b'"' | b'\'' => self.scan_string(ch),
            b'`' => {
                self.advance();
                self.scan_template_part(true)
            }
            b'#' => {
                self.advance();
                let start = self.pos;
                self.skip_identifier_chars();
                TokenKind::PrivateName(self.slice(start, self.pos).to_string())
            }

            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            b';' => self.single(TokenKind::Semicolon),
            b',' => self.single(TokenKind::Comma),
            b':' => self.single(TokenKind::Colon),
            b'~' => self.single(TokenKind::Tilde),

            b'.' => self.scan_dot(),
            b'?' => self.scan_question(),
            b'+' => self.scan_repeatable(b'+', TokenKind::Plus, TokenKind::PlusPlus, TokenKind::PlusEq),
            b'-' => self.scan_repeatable(b'-', TokenKind::Minus, TokenKind::MinusMinus, TokenKind::MinusEq),
            b'*' => self.scan_star(),
            b'/' => self.scan_slash(),
            b'%' => {
                self.advance();
                self.scan_with_eq(TokenKind::Percent, TokenKind::PercentEq)
            }
            b'^' => {
                self.advance();
                self.scan_with_eq(TokenKind::Caret, TokenKind::CaretEq)
            }
            b'=' => self.scan_equals(),
            b'!' => self.scan_bang(),
            b'<' => self.scan_less_than(),
            b'>' => self.scan_greater_than(),
            b'&' => self.scan_logical(b'&', TokenKind::Amp, TokenKind::AmpEq, TokenKind::AmpAmp, TokenKind::AmpAmpEq),
            b'|' => self.scan_logical(b'|', TokenKind::Pipe, TokenKind::PipeEq, TokenKind::PipePipe, TokenKind::PipePipeEq),

            _ => {
                self.advance();
                TokenKind::Invalid(format!("unexpected character '{}'", ch as char))
            }
        };

        self.allow_regex = kind.allows_regex_after();
        self.make_token(kind)
    }

    /// Peek at the next token without consuming it.
    #[must_use]
    pub fn peek(&self) -> Token {
        self.clone().next_token()
    }

    /// Scan a template middle or tail. Called by the parser when the
    /// current token is the `}` that closes a substitution.
    pub fn scan_template_continuation(&mut self) -> Token {
        self.token_start = self.pos;
        let kind = self.scan_template_part(false);
        self.allow_regex = kind.allows_regex_after();
        self.make_token(kind)
    }

    /// Resume scanning at byte offset `pos`. JSX parsing switches between
    /// tag, text and expression scanning this way.
    pub fn rewind(&mut self, pos: usize, allow_regex: bool) {
        self.pos = pos.min(self.bytes.len());
        self.allow_regex = allow_regex;
    }

    // === Helper methods ===

    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn current(&self) -> u8 {
        self.bytes.get(self.pos).copied().unwrap_or(0)
    }

    fn peek_char(&self) -> u8 {
        self.bytes.get(self.pos + 1).copied().unwrap_or(0)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn advance_n(&mut self, n: usize) {
        self.pos += n;
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            Span::new(self.token_start as u32, self.pos as u32),
            self.newline_before,
        )
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        let end = end.min(self.source.len());
        self.source.get(start..end).unwrap_or("")
    }

    // === Whitespace and comments ===

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.current() {
                b' ' | b'\t' | 0x0b | 0x0c => self.advance(),
                b'\n' | b'\r' => {
                    self.newline_before = true;
                    self.advance();
                }
                b'/' if self.peek_char() == b'/' => self.skip_line_comment(),
                b'/' if self.peek_char() == b'*' => self.skip_block_comment(),
                // Hashbang on the first line.
                b'#' if self.pos == 0 && self.peek_char() == b'!' => self.skip_line_comment(),
                _ => break,
            }
        }
    }

    fn skip_line_comment(&mut self) {
        self.advance_n(2);
        while !self.is_eof() && self.current() != b'\n' {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) {
        self.advance_n(2);
        while !self.is_eof() {
            if self.current() == b'*' && self.peek_char() == b'/' {
                self.advance_n(2);
                return;
            }
            if self.current() == b'\n' {
                self.newline_before = true;
            }
            self.advance();
        }
    }

    // === Token scanning ===

    fn skip_identifier_chars(&mut self) {
        while !self.is_eof() {
            match self.current() {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$' | 0x80..=0xff => self.advance(),
                // \uXXXX escapes are kept verbatim in the identifier text.
                b'\\' => self.advance_n(2),
                _ => break,
            }
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        self.skip_identifier_chars();
        let ident = self.slice(start, self.pos);
        keyword_from_str(ident).unwrap_or_else(|| TokenKind::Identifier(ident.to_string()))
    }

    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;

        if self.current() == b'0' && matches!(self.peek_char(), b'x' | b'X' | b'b' | b'B' | b'o' | b'O') {
            self.advance_n(2);
            while self.current().is_ascii_hexdigit() || self.current() == b'_' {
                self.advance();
            }
        } else {
            self.skip_digits();
            if self.current() == b'.' {
                self.advance();
                self.skip_digits();
            }
            if matches!(self.current(), b'e' | b'E') {
                self.advance();
                if matches!(self.current(), b'+' | b'-') {
                    self.advance();
                }
                self.skip_digits();
            }
        }

        if self.current() == b'n' {
            let raw = self.slice(start, self.pos).to_string();
            self.advance();
            return TokenKind::BigInt(raw);
        }

        TokenKind::Number(self.slice(start, self.pos).to_string())
    }

    fn skip_digits(&mut self) {
        while self.current().is_ascii_digit() || self.current() == b'_' {
            self.advance();
        }
    }

    fn scan_string(&mut self, quote: u8) -> TokenKind {
        self.advance();
        let mut value = String::new();
        let mut run_start = self.pos;

        while !self.is_eof() && self.current() != quote {
            match self.current() {
                b'\\' => {
                    value.push_str(self.slice(run_start, self.pos));
                    self.advance();
                    self.scan_escape_sequence(&mut value);
                    run_start = self.pos;
                }
                b'\n' => return TokenKind::Invalid("unterminated string literal".to_string()),
                _ => self.advance(),
            }
        }

        if self.is_eof() {
            return TokenKind::Invalid("unterminated string literal".to_string());
        }
        value.push_str(self.slice(run_start, self.pos));
        self.advance();
        TokenKind::String(value)
    }

    fn scan_escape_sequence(&mut self, out: &mut String) {
        let ch = self.current();
        self.advance();

        match ch {
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'b' => out.push('\u{8}'),
            b'f' => out.push('\u{c}'),
            b'v' => out.push('\u{b}'),
            b'0' => out.push('\0'),
            b'x' => out.push(self.scan_hex_escape(2)),
            b'u' => {
                if self.current() == b'{' {
                    self.advance();
                    let mut value = 0u32;
                    while let Some(digit) = (self.current() as char).to_digit(16) {
                        value = value.saturating_mul(16).saturating_add(digit);
                        self.advance();
                    }
                    if self.current() == b'}' {
                        self.advance();
                    }
                    out.push(char::from_u32(value).unwrap_or('\u{FFFD}'));
                } else {
                    out.push(self.scan_hex_escape(4));
                }
            }
            // Line continuation.
            b'\r' => {
                if self.current() == b'\n' {
                    self.advance();
                }
            }
            b'\n' => {}
            _ if ch >= 0x80 => {
                // Escaped multi-byte character: copy the whole code point.
                let start = self.pos - 1;
                while self.current() & 0xc0 == 0x80 {
                    self.advance();
                }
                out.push_str(self.slice(start, self.pos));
            }
            _ => out.push(ch as char),
        }
    }

    fn scan_hex_escape(&mut self, len: usize) -> char {
        let mut value = 0u32;
        for _ in 0..len {
            if let Some(digit) = (self.current() as char).to_digit(16) {
                value = value * 16 + digit;
                self.advance();
            } else {
                break;
            }
        }
        char::from_u32(value).unwrap_or('\u{FFFD}')
    }

    /// Scan template characters up to `${` or the closing backtick. The
    /// text is kept raw, exactly as written.
    fn scan_template_part(&mut self, is_head: bool) -> TokenKind {
        let start = self.pos;
        while !self.is_eof() {
            match self.current() {
                b'`' => {
                    let raw = self.slice(start, self.pos).to_string();
                    self.advance();
                    return if is_head {
                        TokenKind::TemplateNoSub(raw)
                    } else {
                        TokenKind::TemplateTail(raw)
                    };
                }
                b'$' if self.peek_char() == b'{' => {
                    let raw = self.slice(start, self.pos).to_string();
                    self.advance_n(2);
                    return if is_head {
                        TokenKind::TemplateHead(raw)
                    } else {
                        TokenKind::TemplateMiddle(raw)
                    };
                }
                b'\\' => self.advance_n(2),
                _ => self.advance(),
            }
        }
        TokenKind::Invalid("unterminated template literal".to_string())
    }

    fn scan_regex(&mut self) -> TokenKind {
        self.advance();
        let pattern_start = self.pos;

        let mut in_class = false;
        while !self.is_eof() {
            match self.current() {
                b'/' if !in_class => break,
                b'[' => {
                    in_class = true;
                    self.advance();
                }
                b']' => {
                    in_class = false;
                    self.advance();
                }
                b'\\' => self.advance_n(2),
                b'\n' | b'\r' => break,
                _ => self.advance(),
            }
        }

        if self.current() != b'/' {
            return TokenKind::Invalid("unterminated regular expression".to_string());
        }
        let pattern = self.slice(pattern_start, self.pos).to_string();
        self.advance();

        let flags_start = self.pos;
        while self.current().is_ascii_alphabetic() {
            self.advance();
        }
        let flags = self.slice(flags_start, self.pos).to_string();

        TokenKind::Regex { pattern, flags }
    }

    // === Multi-character operators ===

    fn scan_dot(&mut self) -> TokenKind {
        if self.peek_char().is_ascii_digit() {
            return self.scan_number();
        }
        self.advance();
        if self.current() == b'.' && self.peek_char() == b'.' {
            self.advance_n(2);
            TokenKind::Spread
        } else {
            TokenKind::Dot
        }
    }

    fn scan_question(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'?' => {
                self.advance();
                self.scan_with_eq(TokenKind::QuestionQuestion, TokenKind::QuestionQuestionEq)
            }
            b'.' if !self.peek_char().is_ascii_digit() => {
                self.advance();
                TokenKind::QuestionDot
            }
            _ => TokenKind::Question,
        }
    }

    /// `op`, `op op`, `op=` (for `+` and `-`).
    fn scan_repeatable(&mut self, ch: u8, single: TokenKind, double: TokenKind, eq: TokenKind) -> TokenKind {
        self.advance();
        if self.current() == ch {
            self.advance();
            double
        } else if self.current() == b'=' {
            self.advance();
            eq
        } else {
            single
        }
    }

    /// `op` or `op=`, with the operator itself already consumed.
    fn scan_with_eq(&mut self, plain: TokenKind, eq: TokenKind) -> TokenKind {
        if self.current() == b'=' {
            self.advance();
            eq
        } else {
            plain
        }
    }

    fn scan_logical(
        &mut self,
        ch: u8,
        single: TokenKind,
        single_eq: TokenKind,
        double: TokenKind,
        double_eq: TokenKind,
    ) -> TokenKind {
        self.advance();
        match self.current() {
            c if c == ch => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    double_eq
                } else {
                    double
                }
            }
            b'=' => {
                self.advance();
                single_eq
            }
            _ => single,
        }
    }

    fn scan_star(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'*' => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    TokenKind::StarStarEq
                } else {
                    TokenKind::StarStar
                }
            }
            b'=' => {
                self.advance();
                TokenKind::StarEq
            }
            _ => TokenKind::Star,
        }
    }

    fn scan_slash(&mut self) -> TokenKind {
        if self.allow_regex {
            return self.scan_regex();
        }
        self.advance();
        if self.current() == b'=' {
            self.advance();
            TokenKind::SlashEq
        } else {
            TokenKind::Slash
        }
    }

    fn scan_equals(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'=' => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    TokenKind::EqEqEq
                } else {
                    TokenKind::EqEq
                }
            }
            b'>' => {
                self.advance();
                TokenKind::Arrow
            }
            _ => TokenKind::Eq,
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        self.advance();
        if self.current() == b'=' {
            self.advance();
            if self.current() == b'=' {
                self.advance();
                TokenKind::BangEqEq
            } else {
                TokenKind::BangEq
            }
        } else {
            TokenKind::Bang
        }
    }

    fn scan_less_than(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'<' => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    TokenKind::LtLtEq
                } else {
                    TokenKind::LtLt
                }
            }
            b'=' => {
                self.advance();
                TokenKind::LtEq
            }
            _ => TokenKind::Lt,
        }
    }

    fn scan_greater_than(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'>' => {
                self.advance();
                match self.current() {
                    b'>' => {
                        self.advance();
                        if self.current() == b'=' {
                            self.advance();
                            TokenKind::GtGtGtEq
                        } else {
                            TokenKind::GtGtGt
                        }
                    }
                    b'=' => {
                        self.advance();
                        TokenKind::GtGtEq
                    }
                    _ => TokenKind::GtGt,
                }
            }
            b'=' => {
                self.advance();
                TokenKind::GtEq
            }
            _ => TokenKind::Gt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            if matches!(token.kind, TokenKind::Eof) {
                break;
            }
            tokens.push(token.kind);
        }
        tokens
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(
            tokenize("foo bar _baz $qux from"),
            vec![
                TokenKind::Identifier("foo".into()),
                TokenKind::Identifier("bar".into()),
                TokenKind::Identifier("_baz".into()),
                TokenKind::Identifier("$qux".into()),
                TokenKind::Identifier("from".into()),
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            tokenize("const let var function"),
            vec![TokenKind::Const, TokenKind::Let, TokenKind::Var, TokenKind::Function]
        );
    }

    #[test]
    fn test_numbers_keep_raw_text() {
        assert_eq!(
            tokenize("42 3.14 0xff .5 10n"),
            vec![
                TokenKind::Number("42".into()),
                TokenKind::Number("3.14".into()),
                TokenKind::Number("0xff".into()),
                TokenKind::Number(".5".into()),
                TokenKind::BigInt("10".into()),
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            tokenize(r#""hello" 'wo\'rld' "é""#),
            vec![
                TokenKind::String("hello".into()),
                TokenKind::String("wo'rld".into()),
                TokenKind::String("é".into()),
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokenize("+ - * % ** ++ -- ?? ?. &&= >>>="),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Percent,
                TokenKind::StarStar,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::QuestionQuestion,
                TokenKind::QuestionDot,
                TokenKind::AmpAmpEq,
                TokenKind::GtGtGtEq,
            ]
        );
    }

    #[test]
    fn test_division_after_identifier() {
        assert_eq!(
            tokenize("a / b"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Slash,
                TokenKind::Identifier("b".into()),
            ]
        );
    }

    #[test]
    fn test_regex_after_assignment() {
        assert_eq!(
            tokenize("x = /ab+c/gi"),
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Eq,
                TokenKind::Regex {
                    pattern: "ab+c".into(),
                    flags: "gi".into()
                },
            ]
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        let mut lexer = Lexer::new("a // line comment\nb /* block */ c");
        assert!(!lexer.next_token().newline_before);
        assert!(lexer.next_token().newline_before);
        let c = lexer.next_token();
        assert_eq!(c.kind, TokenKind::Identifier("c".into()));
        assert!(!c.newline_before);
    }

    #[test]
    fn test_template_literal_no_sub() {
        assert_eq!(
            tokenize("`hello\\n world`"),
            vec![TokenKind::TemplateNoSub("hello\\n world".into())]
        );
    }

    #[test]
    fn test_template_continuation() {
        let mut lexer = Lexer::new("`a${x}b`");
        assert_eq!(lexer.next_token().kind, TokenKind::TemplateHead("a".into()));
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier("x".into()));
        assert_eq!(lexer.next_token().kind, TokenKind::RBrace);
        assert_eq!(
            lexer.scan_template_continuation().kind,
            TokenKind::TemplateTail("b".into())
        );
    }
}

//! Scanner - turns Sindarin source text into a token stream.
//!
//! Hand-written single-pass scanner. Newlines are significant (statement
//! terminators) and are emitted as tokens; consecutive newlines collapse to
//! one. Lexical errors are collected as `ParseError` diagnostics and the
//! scan continues, so the parser always receives an `Eof`-terminated stream.

use rustc_hash::FxHashMap;
use sn_common::{Diagnostic, DiagnosticSink, ErrorKind};
use tracing::trace;

use crate::token::{Token, TokenKind};

pub struct Lexer<'src> {
    file: String,
    source: &'src str,
    pos: usize,
    line: u32,
    keywords: FxHashMap<&'static str, TokenKind>,
    diagnostics: DiagnosticSink,
}

impl<'src> Lexer<'src> {
    pub fn new(file: impl Into<String>, source: &'src str) -> Self {
        let mut keywords = FxHashMap::default();
        for (text, kind) in [
            ("fn", TokenKind::Fn),
            ("return", TokenKind::Return),
            ("if", TokenKind::If),
            ("else", TokenKind::Else),
            ("while", TokenKind::While),
            ("for", TokenKind::For),
            ("in", TokenKind::In),
            ("break", TokenKind::Break),
            ("continue", TokenKind::Continue),
            ("import", TokenKind::Import),
            ("shared", TokenKind::Shared),
            ("private", TokenKind::Private),
            ("as", TokenKind::As),
            ("val", TokenKind::Val),
            ("ref", TokenKind::Ref),
            ("true", TokenKind::True),
            ("false", TokenKind::False),
            ("int", TokenKind::KwInt),
            ("double", TokenKind::KwDouble),
            ("char", TokenKind::KwChar),
            ("str", TokenKind::KwStr),
            ("bool", TokenKind::KwBool),
            ("void", TokenKind::KwVoid),
        ] {
            keywords.insert(text, kind);
        }
        Self {
            file: file.into(),
            source,
            pos: 0,
            line: 1,
            keywords,
            diagnostics: DiagnosticSink::new(),
        }
    }

    /// Scan the whole buffer. The returned stream always ends with `Eof`.
    pub fn tokenize(mut self) -> (Vec<Token<'src>>, Vec<Diagnostic>) {
        let mut tokens: Vec<Token<'src>> = Vec::new();
        loop {
            let token = match self.next_token() {
                Some(token) => token,
                None => continue,
            };
            // Collapse newline runs; a leading newline carries no information.
            if token.kind == TokenKind::Newline
                && tokens.last().is_none_or(|t| t.kind == TokenKind::Newline)
            {
                continue;
            }
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        trace!(file = %self.file, count = tokens.len(), "scanned token stream");
        (tokens, self.diagnostics.into_vec())
    }

    /// Scan one token. Returns `None` when the scanner consumed trivia
    /// (whitespace, comments, an erroneous character) and should be re-polled.
    fn next_token(&mut self) -> Option<Token<'src>> {
        let Some(c) = self.peek() else {
            return Some(self.make(TokenKind::Eof, self.pos, self.pos));
        };
        let start = self.pos;
        match c {
            b' ' | b'\t' | b'\r' => {
                self.pos += 1;
                None
            }
            b'\n' => {
                self.pos += 1;
                let token = self.make(TokenKind::Newline, start, start + 1);
                self.line += 1;
                Some(token)
            }
            b'/' if self.peek_at(1) == Some(b'/') => {
                while let Some(c) = self.peek() {
                    if c == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
                None
            }
            b'/' if self.peek_at(1) == Some(b'*') => {
                self.skip_block_comment();
                None
            }
            b'0'..=b'9' => Some(self.scan_number(start)),
            b'"' => self.scan_string(start),
            b'$' if self.peek_at(1) == Some(b'"') => self.scan_interpolated(start),
            b'\'' => self.scan_char(start),
            c if c == b'_' || c.is_ascii_alphabetic() => Some(self.scan_identifier(start)),
            _ => self.scan_operator(start),
        }
    }

    fn scan_identifier(&mut self, start: usize) -> Token<'src> {
        while let Some(c) = self.peek() {
            if c == b'_' || c.is_ascii_alphanumeric() {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = &self.source[start..self.pos];
        let kind = self
            .keywords
            .get(text)
            .copied()
            .unwrap_or(TokenKind::Identifier);
        self.make(kind, start, self.pos)
    }

    fn scan_number(&mut self, start: usize) -> Token<'src> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        // A '.' starts a fraction only when a digit follows; `1..3` keeps the
        // int and leaves the range operator in place.
        let mut kind = TokenKind::IntLiteral;
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            kind = TokenKind::DoubleLiteral;
        }
        self.make(kind, start, self.pos)
    }

    /// Plain string literal. The lexeme is the raw body between the quotes;
    /// escape sequences pass through unprocessed (they share C's syntax).
    fn scan_string(&mut self, start: usize) -> Option<Token<'src>> {
        self.pos += 1;
        let body_start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                b'"' => {
                    let token = self.make(TokenKind::StrLiteral, body_start, self.pos);
                    self.pos += 1;
                    return Some(token);
                }
                b'\\' => self.pos += 2,
                b'\n' => break,
                _ => self.pos += 1,
            }
        }
        self.error_at(start, "unterminated string literal");
        None
    }

    /// Interpolated string literal `$"..."`. The lexeme is the raw body; the
    /// parser splits it into literal and `{expression}` parts. Quotes inside
    /// brace-enclosed expressions do not terminate the literal.
    fn scan_interpolated(&mut self, start: usize) -> Option<Token<'src>> {
        self.pos += 2;
        let body_start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                b'{' => {
                    depth += 1;
                    self.pos += 1;
                }
                b'}' => {
                    depth = depth.saturating_sub(1);
                    self.pos += 1;
                }
                b'"' if depth == 0 => {
                    let token = self.make(TokenKind::InterpolatedLiteral, body_start, self.pos);
                    self.pos += 1;
                    return Some(token);
                }
                b'"' => {
                    // Nested string inside an interpolation expression.
                    self.pos += 1;
                    while let Some(c) = self.peek() {
                        self.pos += 1;
                        if c == b'\\' {
                            self.pos += 1;
                        } else if c == b'"' {
                            break;
                        }
                    }
                }
                b'\\' => self.pos += 2,
                b'\n' => break,
                _ => self.pos += 1,
            }
        }
        self.error_at(start, "unterminated interpolated string");
        None
    }

    fn scan_char(&mut self, start: usize) -> Option<Token<'src>> {
        self.pos += 1;
        let body_start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                b'\'' => {
                    let token = self.make(TokenKind::CharLiteral, body_start, self.pos);
                    self.pos += 1;
                    if token.lexeme.is_empty() {
                        self.error_at(start, "empty char literal");
                        return None;
                    }
                    return Some(token);
                }
                b'\\' => self.pos += 2,
                b'\n' => break,
                _ => self.pos += 1,
            }
        }
        self.error_at(start, "unterminated char literal");
        None
    }

    fn scan_operator(&mut self, start: usize) -> Option<Token<'src>> {
        let two = |a: u8, b: u8, this: &Self| {
            this.peek() == Some(a) && this.peek_at(1) == Some(b)
        };
        let three = self.peek() == Some(b'.')
            && self.peek_at(1) == Some(b'.')
            && self.peek_at(2) == Some(b'.');
        let (kind, len) = if three {
            (TokenKind::Ellipsis, 3)
        } else if two(b'=', b'=', self) {
            (TokenKind::EqualsEquals, 2)
        } else if two(b'!', b'=', self) {
            (TokenKind::BangEquals, 2)
        } else if two(b'<', b'=', self) {
            (TokenKind::LessEquals, 2)
        } else if two(b'>', b'=', self) {
            (TokenKind::GreaterEquals, 2)
        } else if two(b'&', b'&', self) {
            (TokenKind::AmpAmp, 2)
        } else if two(b'|', b'|', self) {
            (TokenKind::PipePipe, 2)
        } else if two(b'+', b'+', self) {
            (TokenKind::PlusPlus, 2)
        } else if two(b'-', b'-', self) {
            (TokenKind::MinusMinus, 2)
        } else if two(b'=', b'>', self) {
            (TokenKind::FatArrow, 2)
        } else if two(b'.', b'.', self) {
            (TokenKind::DotDot, 2)
        } else {
            let kind = match self.peek().unwrap_or(0) {
                b'+' => TokenKind::Plus,
                b'-' => TokenKind::Minus,
                b'*' => TokenKind::Star,
                b'/' => TokenKind::Slash,
                b'%' => TokenKind::Percent,
                b'=' => TokenKind::Equals,
                b'<' => TokenKind::Less,
                b'>' => TokenKind::Greater,
                b'!' => TokenKind::Bang,
                b'(' => TokenKind::LeftParen,
                b')' => TokenKind::RightParen,
                b'{' => TokenKind::LeftBrace,
                b'}' => TokenKind::RightBrace,
                b'[' => TokenKind::LeftBracket,
                b']' => TokenKind::RightBracket,
                b',' => TokenKind::Comma,
                b':' => TokenKind::Colon,
                b';' => TokenKind::Semicolon,
                b'.' => TokenKind::Dot,
                other => {
                    self.pos += 1;
                    self.error_at(
                        start,
                        format!("unexpected character '{}'", other as char),
                    );
                    return None;
                }
            };
            (kind, 1)
        };
        self.pos += len;
        Some(self.make(kind, start, self.pos))
    }

    fn skip_block_comment(&mut self) {
        let start = self.pos;
        self.pos += 2;
        while self.pos < self.source.len() {
            if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/') {
                self.pos += 2;
                return;
            }
            if self.peek() == Some(b'\n') {
                self.line += 1;
            }
            self.pos += 1;
        }
        self.error_at(start, "unterminated block comment");
    }

    fn make(&self, kind: TokenKind, start: usize, end: usize) -> Token<'src> {
        Token::new(kind, &self.source[start..end], self.line)
    }

    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.as_bytes().get(self.pos + offset).copied()
    }

    fn error_at(&mut self, _start: usize, message: impl Into<String>) {
        self.diagnostics
            .error(ErrorKind::ParseError, self.file.clone(), self.line, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, diagnostics) = Lexer::new("test.sn", source).tokenize();
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_arithmetic_expression() {
        assert_eq!(
            kinds("2 + 3 * 4"),
            [
                TokenKind::IntLiteral,
                TokenKind::Plus,
                TokenKind::IntLiteral,
                TokenKind::Star,
                TokenKind::IntLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn range_does_not_eat_into_double() {
        assert_eq!(
            kinds("1..3"),
            [
                TokenKind::IntLiteral,
                TokenKind::DotDot,
                TokenKind::IntLiteral,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("1.5"),
            [TokenKind::DoubleLiteral, TokenKind::Eof]
        );
    }

    #[test]
    fn keywords_and_qualifiers() {
        assert_eq!(
            kinds("x: int as ref = 1"),
            [
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::KwInt,
                TokenKind::As,
                TokenKind::Ref,
                TokenKind::Equals,
                TokenKind::IntLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn interpolated_literal_keeps_raw_body() {
        let (tokens, diagnostics) = Lexer::new("test.sn", "$\"a={1 + 1}\"").tokenize();
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::InterpolatedLiteral);
        assert_eq!(tokens[0].lexeme, "a={1 + 1}");
    }

    #[test]
    fn newline_runs_collapse() {
        assert_eq!(
            kinds("a\n\n\nb"),
            [
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_trivia() {
        assert_eq!(
            kinds("a // trailing\nb /* block\nspanning */ c"),
            [
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_reports_parse_error() {
        let (_, diagnostics) = Lexer::new("test.sn", "\"abc").tokenize();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, ErrorKind::ParseError);
    }

    #[test]
    fn line_numbers_advance() {
        let (tokens, _) = Lexer::new("test.sn", "a\nb\nc").tokenize();
        let lines: Vec<u32> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Identifier)
            .map(|t| t.line)
            .collect();
        assert_eq!(lines, [1, 2, 3]);
    }
}

//! Recursive-descent parser for Sindarin.
//!
//! Consumes the scanner's token stream and builds a `Module` through the
//! arena constructors. Parse errors are collected as `ParseError`
//! diagnostics; recovery synchronizes at statement boundaries so one bad
//! statement does not swallow the rest of the file.

mod expressions;
mod statements;

use sn_ast::Module;
use sn_common::{Diagnostic, DiagnosticSink, ErrorKind};
use sn_lexer::{Lexer, Token, TokenKind};
use tracing::debug;

/// Parse one source file. Lexical and syntactic diagnostics come back
/// together, in source order.
pub fn parse(file: &str, source: &str) -> (Module, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = Lexer::new(file, source).tokenize();
    let mut parser = ParserState::new(file, tokens);
    let module = parser.parse_module();
    diagnostics.extend(parser.diagnostics.into_vec());
    debug!(
        file,
        statements = module.stmts.len(),
        errors = diagnostics.len(),
        "parsed module"
    );
    (module, diagnostics)
}

pub struct ParserState<'src> {
    pub(crate) file: String,
    pub(crate) tokens: Vec<Token<'src>>,
    pub(crate) pos: usize,
    pub(crate) module: Module,
    pub(crate) diagnostics: DiagnosticSink,
}

impl<'src> ParserState<'src> {
    pub fn new(file: impl Into<String>, mut tokens: Vec<Token<'src>>) -> Self {
        let file = file.into();
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, "", 1));
        }
        Self {
            module: Module::new(file.clone()),
            file,
            tokens,
            pos: 0,
            diagnostics: DiagnosticSink::new(),
        }
    }

    pub fn parse_module(&mut self) -> Module {
        self.skip_terminators();
        while !self.at_end() {
            let before = self.pos;
            if let Some(stmt) = self.parse_statement() {
                self.module.stmts.push(stmt);
            } else {
                self.synchronize();
            }
            // A stray closing brace stops recovery without consuming;
            // force progress so the loop always terminates.
            if self.pos == before {
                self.advance();
            }
            self.skip_terminators();
        }
        std::mem::replace(&mut self.module, Module::new(self.file.clone()))
    }

    // ------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------

    pub(crate) fn peek(&self) -> Token<'src> {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    pub(crate) fn peek_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    pub(crate) fn at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    pub(crate) fn advance(&mut self) -> Token<'src> {
        let token = self.peek();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn matches(&mut self, kind: TokenKind) -> Option<Token<'src>> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, context: &str) -> Option<Token<'src>> {
        if self.check(kind) {
            return Some(self.advance());
        }
        let found = self.peek();
        self.error(
            found.line,
            format!("expected {} {context}, found {}", kind, found.kind),
        );
        None
    }

    /// Consume newline/semicolon runs between statements.
    pub(crate) fn skip_terminators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// Simple statements must end at a newline, `;`, `}`, or end of file.
    pub(crate) fn expect_terminator(&mut self) {
        match self.peek_kind() {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.skip_terminators();
            }
            TokenKind::RightBrace | TokenKind::Eof => {}
            other => {
                let line = self.peek().line;
                self.error(line, format!("expected end of statement, found {other}"));
                self.synchronize();
            }
        }
    }

    /// Panic-mode recovery: skip to the next statement boundary.
    pub(crate) fn synchronize(&mut self) {
        while !self.at_end() {
            match self.peek_kind() {
                TokenKind::Newline | TokenKind::Semicolon => {
                    self.skip_terminators();
                    return;
                }
                TokenKind::RightBrace => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    pub(crate) fn error(&mut self, line: u32, message: impl Into<String>) {
        self.diagnostics
            .error(ErrorKind::ParseError, self.file.clone(), line, message);
    }
}

//! Scanner for the Sindarin compiler.
//!
//! Produces a newline-aware token stream the parser consumes. Lexical
//! errors surface as `ParseError` diagnostics; the stream is always
//! `Eof`-terminated so downstream passes need no special error handling.

pub mod scanner;
pub mod token;

pub use scanner::Lexer;
pub use token::{Token, TokenKind};

//! Parser error types and shared limits

use crate::parser::lexer::Token;
use thiserror::Error;

// Limits guarding against pathological input.
pub const MAX_INPUT_SIZE: usize = 10_000_000;
pub const MAX_TOKENS: usize = 100_000;
pub const MAX_PARSE_DEPTH: usize = 200;

/// Error from the lexer: bad or unterminated input.
#[derive(Debug, Clone, Error)]
#[error("line {line}: {message}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    /// True when more input could complete the construct (open quote,
    /// unfinished here-doc, unbalanced `$(`).
    pub incomplete: bool,
}

impl LexError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            incomplete: false,
        }
    }

    pub fn incomplete(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            incomplete: true,
        }
    }
}

/// Error from the parser, carrying the offending token's position.
#[derive(Debug, Clone, Error)]
#[error("syntax error at {line}:{column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub token: Option<Token>,
    /// True when the statement could be completed by more input; the
    /// multi-line handler keeps reading in that case.
    pub incomplete: bool,
    /// True when the failure came from the lexer (exit 1 rather than 2 in
    /// non-interactive shells).
    pub lexical: bool,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            token: None,
            incomplete: false,
            lexical: false,
        }
    }

    pub fn at_token(message: impl Into<String>, token: &Token) -> Self {
        Self {
            message: message.into(),
            line: token.line,
            column: token.column,
            token: Some(token.clone()),
            incomplete: false,
            lexical: false,
        }
    }

    pub fn mark_incomplete(mut self) -> Self {
        self.incomplete = true;
        self
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self {
            message: err.message,
            line: err.line,
            column: err.column,
            token: None,
            incomplete: err.incomplete,
            lexical: true,
        }
    }
}

//! Parser module
//!
//! Lexer, word/parameter/arithmetic/conditional sub-parsers, the recursive
//! descent command parser, and alias expansion over the token stream.

pub mod alias;
pub mod arith;
pub mod compound;
pub mod cond;
pub mod lexer;
pub mod param;
pub mod parser;
pub mod types;
pub mod word;

pub use alias::expand_aliases;
pub use arith::parse_arith;
pub use cond::parse_cond_expr;
pub use lexer::{tokenize, Lexer, Token, TokenKind};
pub use parser::{parse, Parser};
pub use types::{LexError, ParseError};

use indexmap::IndexMap;

/// Parse with alias expansion applied to the token stream first.
pub fn parse_with_aliases(
    input: &str,
    aliases: &IndexMap<String, String>,
) -> Result<crate::ast::Script, ParseError> {
    let tokens = lexer::tokenize(input)?;
    let tokens = expand_aliases(tokens, aliases);
    Parser::new().parse_tokens(input, tokens)
}

//! Conditional expression parsing for `[[ … ]]`
//!
//! The lexer hands over the raw interior text; this module tokenizes it with
//! its own rules (no redirections, `<`/`>` are comparisons, parentheses
//! group) and builds a `CondExpr` by recursive descent with `||` lowest,
//! then `&&`, then `!` and primaries.

use crate::ast::types::{CondBinaryOp, CondExpr, CondUnaryOp};
use crate::parser::types::ParseError;
use crate::parser::word::parse_word;

#[derive(Debug, Clone, PartialEq)]
enum CondTok {
    Word(String),
    AndAnd,
    OrOr,
    Bang,
    LParen,
    RParen,
}

/// Parse the interior of `[[ … ]]`.
pub fn parse_cond_expr(text: &str) -> Result<CondExpr, ParseError> {
    let tokens = tokenize_cond(text)?;
    if tokens.is_empty() {
        return Err(ParseError::new("empty conditional expression", 1, 1));
    }
    let mut parser = CondParser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(ParseError::new(
            format!("unexpected token near {:?}", parser.tokens[parser.pos]),
            1,
            1,
        ));
    }
    Ok(expr)
}

/// Whitespace-separated, quote-aware tokens. A token is classified by its
/// whole text, so `(a|b)` inside a regex stays one word.
fn tokenize_cond(text: &str) -> Result<Vec<CondTok>, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        let mut in_single = false;
        let mut in_double = false;
        while i < chars.len() {
            let c = chars[i];
            if in_single {
                if c == '\'' {
                    in_single = false;
                }
                i += 1;
                continue;
            }
            if in_double {
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == '"' {
                    in_double = false;
                }
                i += 1;
                continue;
            }
            match c {
                '\'' => in_single = true,
                '"' => in_double = true,
                '\\' => {
                    i += 2;
                    continue;
                }
                c if c.is_whitespace() => break,
                _ => {}
            }
            i += 1;
        }
        if in_single || in_double {
            return Err(ParseError::new("unterminated quote in conditional", 1, 1));
        }

        let raw: String = chars[start..i].iter().collect();
        tokens.push(match raw.as_str() {
            "&&" => CondTok::AndAnd,
            "||" => CondTok::OrOr,
            "!" => CondTok::Bang,
            "(" => CondTok::LParen,
            ")" => CondTok::RParen,
            _ => CondTok::Word(raw),
        });
    }

    Ok(tokens)
}

struct CondParser {
    tokens: Vec<CondTok>,
    pos: usize,
}

impl CondParser {
    fn current(&self) -> Option<&CondTok> {
        self.tokens.get(self.pos)
    }

    fn peek(&self, offset: usize) -> Option<&CondTok> {
        self.tokens.get(self.pos + offset)
    }

    fn or_expr(&mut self) -> Result<CondExpr, ParseError> {
        let mut lhs = self.and_expr()?;
        while self.current() == Some(&CondTok::OrOr) {
            self.pos += 1;
            let rhs = self.and_expr()?;
            lhs = CondExpr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<CondExpr, ParseError> {
        let mut lhs = self.not_expr()?;
        while self.current() == Some(&CondTok::AndAnd) {
            self.pos += 1;
            let rhs = self.not_expr()?;
            lhs = CondExpr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<CondExpr, ParseError> {
        if self.current() == Some(&CondTok::Bang) {
            self.pos += 1;
            let operand = self.not_expr()?;
            return Ok(CondExpr::Not(Box::new(operand)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<CondExpr, ParseError> {
        match self.current().cloned() {
            Some(CondTok::LParen) => {
                self.pos += 1;
                let inner = self.or_expr()?;
                if self.current() != Some(&CondTok::RParen) {
                    return Err(ParseError::new("expected `)' in conditional", 1, 1));
                }
                self.pos += 1;
                Ok(CondExpr::Group(Box::new(inner)))
            }
            Some(CondTok::Word(first)) => {
                // Unary operator with operand.
                if let Some(op) = CondUnaryOp::from_flag(&first) {
                    if let Some(CondTok::Word(operand)) = self.peek(1).cloned() {
                        self.pos += 2;
                        return Ok(CondExpr::Unary {
                            op,
                            operand: parse_word(&operand)?,
                        });
                    }
                }

                // Binary operator between two words.
                if let Some(CondTok::Word(op_text)) = self.peek(1).cloned() {
                    if let Some(op) = CondBinaryOp::from_token(&op_text) {
                        if let Some(CondTok::Word(rhs)) = self.peek(2).cloned() {
                            self.pos += 3;
                            return Ok(CondExpr::Binary {
                                op,
                                lhs: parse_word(&first)?,
                                rhs: parse_word(&rhs)?,
                            });
                        }
                        return Err(ParseError::new(
                            format!("missing operand after `{}'", op_text),
                            1,
                            1,
                        ));
                    }
                }

                self.pos += 1;
                Ok(CondExpr::Bare(parse_word(&first)?))
            }
            other => Err(ParseError::new(
                format!("unexpected token {:?} in conditional", other),
                1,
                1,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unary_file_test() {
        let e = parse_cond_expr("-f /etc/passwd").unwrap();
        assert!(matches!(e, CondExpr::Unary { op: CondUnaryOp::RegularFile, .. }));
    }

    #[test]
    fn binary_pattern_match() {
        let e = parse_cond_expr("$x == a*").unwrap();
        assert!(matches!(e, CondExpr::Binary { op: CondBinaryOp::Eq, .. }));
    }

    #[test]
    fn regex_match() {
        let e = parse_cond_expr("$x =~ ^(a|b)+$").unwrap();
        assert!(matches!(e, CondExpr::Binary { op: CondBinaryOp::Match, .. }));
    }

    #[test]
    fn logical_combination() {
        let e = parse_cond_expr("-f a && -r a || -d b").unwrap();
        assert!(matches!(e, CondExpr::Or(_, _)));
    }

    #[test]
    fn negation_and_grouping() {
        let e = parse_cond_expr("! ( -e x )").unwrap();
        match e {
            CondExpr::Not(inner) => assert!(matches!(*inner, CondExpr::Group(_))),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bare_word() {
        let e = parse_cond_expr("$x").unwrap();
        assert!(matches!(e, CondExpr::Bare(_)));
    }

    #[test]
    fn numeric_comparison() {
        let e = parse_cond_expr("$a -lt 10").unwrap();
        assert!(matches!(e, CondExpr::Binary { op: CondBinaryOp::NumLt, .. }));
    }

    #[test]
    fn file_comparison() {
        let e = parse_cond_expr("a -nt b").unwrap();
        assert!(matches!(e, CondExpr::Binary { op: CondBinaryOp::NewerThan, .. }));
    }

    #[test]
    fn missing_operand_is_error() {
        assert!(parse_cond_expr("$x ==").is_err());
        assert!(parse_cond_expr("").is_err());
    }
}

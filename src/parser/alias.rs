//! Alias expansion
//!
//! A token-to-tokens rewrite at command-head position: the head WORD of a
//! command is replaced by the pre-tokenized alias body before parsing. The
//! lexer stays pure and tokenization is never re-entered on partial text.
//! A per-command visited set terminates recursive aliases.

use crate::parser::lexer::{self, Token, TokenKind};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Rewrite the token stream, substituting aliases at command positions.
pub fn expand_aliases(tokens: Vec<Token>, aliases: &IndexMap<String, String>) -> Vec<Token> {
    if aliases.is_empty() {
        return tokens;
    }

    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut queue: std::collections::VecDeque<Token> = tokens.into();
    let mut at_command_start = true;
    // When an alias value ends in a blank, the first token *after* the
    // replacement is also checked; identified by its distance from the
    // back of the queue, which splices in front cannot change.
    let mut check_at_len: Option<usize> = None;
    let mut visited: HashSet<String> = HashSet::new();

    while let Some(tok) = {
        let len_before = queue.len();
        let tok = queue.pop_front();
        if check_at_len == Some(len_before) {
            check_at_len = Some(usize::MAX); // consumed below
        }
        tok
    } {
        let extra_check = check_at_len == Some(usize::MAX);
        if extra_check {
            check_at_len = None;
        }

        let eligible = (at_command_start || extra_check)
            && tok.kind == TokenKind::Word
            && !tok.quoted
            && !visited.contains(&tok.text);

        if eligible {
            if let Some(value) = aliases.get(&tok.text) {
                if let Ok(mut replacement) = lexer::tokenize(value) {
                    // Drop the trailing EOF of the replacement stream.
                    replacement.pop();
                    visited.insert(tok.text.clone());
                    if value.ends_with(' ') || value.ends_with('\t') {
                        check_at_len = Some(queue.len());
                    }
                    for sub in replacement.into_iter().rev() {
                        queue.push_front(sub);
                    }
                    continue;
                }
            }
        }

        at_command_start = matches!(
            tok.kind,
            TokenKind::Newline
                | TokenKind::Semi
                | TokenKind::Amp
                | TokenKind::Pipe
                | TokenKind::AndAnd
                | TokenKind::OrOr
                | TokenKind::DSemi
                | TokenKind::SemiAmp
                | TokenKind::DSemiAmp
                | TokenKind::LParen
                | TokenKind::LBrace
                | TokenKind::Bang
                | TokenKind::If
                | TokenKind::Then
                | TokenKind::Else
                | TokenKind::Elif
                | TokenKind::While
                | TokenKind::Until
                | TokenKind::Do
                | TokenKind::Time
        );
        if at_command_start {
            visited.clear();
        }
        out.push(tok);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn texts(tokens: &[Token]) -> Vec<String> {
        tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.text.clone())
            .collect()
    }

    #[test]
    fn expands_command_head() {
        let toks = lexer::tokenize("ll /tmp").unwrap();
        let out = expand_aliases(toks, &aliases(&[("ll", "ls -l")]));
        assert_eq!(texts(&out), vec!["ls", "-l", "/tmp"]);
    }

    #[test]
    fn does_not_expand_arguments() {
        let toks = lexer::tokenize("echo ll").unwrap();
        let out = expand_aliases(toks, &aliases(&[("ll", "ls -l")]));
        assert_eq!(texts(&out), vec!["echo", "ll"]);
    }

    #[test]
    fn self_referential_alias_terminates() {
        let toks = lexer::tokenize("ls").unwrap();
        let out = expand_aliases(toks, &aliases(&[("ls", "ls --color")]));
        assert_eq!(texts(&out), vec!["ls", "--color"]);
    }

    #[test]
    fn mutually_recursive_aliases_terminate() {
        let toks = lexer::tokenize("a").unwrap();
        let out = expand_aliases(toks, &aliases(&[("a", "b"), ("b", "a x")]));
        assert_eq!(texts(&out), vec!["a", "x"]);
    }

    #[test]
    fn trailing_blank_checks_next_word() {
        let toks = lexer::tokenize("run ll").unwrap();
        let out = expand_aliases(toks, &aliases(&[("run", "env "), ("ll", "ls -l")]));
        assert_eq!(texts(&out), vec!["env", "ls", "-l"]);
    }

    #[test]
    fn expands_after_separators() {
        let toks = lexer::tokenize("x; ll").unwrap();
        let out = expand_aliases(toks, &aliases(&[("ll", "ls -l")]));
        assert_eq!(texts(&out), vec!["x", ";", "ls", "-l"]);
    }

    #[test]
    fn quoted_word_is_not_expanded() {
        let toks = lexer::tokenize("'ll'").unwrap();
        let out = expand_aliases(toks, &aliases(&[("ll", "ls -l")]));
        assert_eq!(texts(&out), vec!["'ll'"]);
    }
}

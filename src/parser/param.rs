//! Parameter expansion parsing
//!
//! Parses the interior of `${…}` into a `ParamExpansion`: parameter name,
//! optional subscript, and the modifier operator with its word/pattern
//! payloads. The payloads are themselves parsed as words so they can carry
//! quoting and nested expansions.

use crate::ast::types::*;
use crate::parser::arith;
use crate::parser::word::parse_word;

/// Parse the text between `${` and `}`.
pub fn parse_param_expansion(body: &str) -> Result<ParamExpansion, String> {
    if body.is_empty() {
        return Err("empty expansion".into());
    }

    // ${#…}: length, unless the body is exactly a special parameter.
    if let Some(rest) = body.strip_prefix('#') {
        if rest.is_empty() {
            return Ok(ParamExpansion::plain("#"));
        }
        let (name, index, remainder) = parse_name_and_index(rest)?;
        if !remainder.is_empty() {
            return Err(format!("unexpected `{}' after length operand", remainder));
        }
        return Ok(ParamExpansion {
            name,
            index,
            op: Some(ParamOp::Length),
        });
    }

    // ${!…}: indirection, name listing, or array keys.
    if let Some(rest) = body.strip_prefix('!') {
        if rest.is_empty() {
            return Ok(ParamExpansion::plain("!"));
        }
        // ${!prefix*} / ${!prefix@}
        if let Some(prefix) = rest.strip_suffix('*') {
            if is_name(prefix) {
                return Ok(ParamExpansion {
                    name: prefix.to_string(),
                    index: None,
                    op: Some(ParamOp::Names { star: true }),
                });
            }
        }
        if let Some(prefix) = rest.strip_suffix('@') {
            if is_name(prefix) {
                return Ok(ParamExpansion {
                    name: prefix.to_string(),
                    index: None,
                    op: Some(ParamOp::Names { star: false }),
                });
            }
        }
        let (name, index, remainder) = parse_name_and_index(rest)?;
        if !remainder.is_empty() {
            return Err(format!("bad substitution after `!{}'", name));
        }
        // ${!arr[@]} / ${!arr[*]}: keys of the array.
        if let Some(ParamIndex::All) = index {
            return Ok(ParamExpansion {
                name,
                index: None,
                op: Some(ParamOp::Keys { star: false }),
            });
        }
        if let Some(ParamIndex::Star) = index {
            return Ok(ParamExpansion {
                name,
                index: None,
                op: Some(ParamOp::Keys { star: true }),
            });
        }
        return Ok(ParamExpansion {
            name,
            index,
            op: Some(ParamOp::Indirect),
        });
    }

    let (name, index, rest) = parse_name_and_index(body)?;
    if rest.is_empty() {
        return Ok(ParamExpansion { name, index, op: None });
    }

    let op = parse_operator(&rest)?;
    Ok(ParamExpansion {
        name,
        index,
        op: Some(op),
    })
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Leading parameter name (identifier, positional digits, or one special
/// character) plus an optional `[…]` subscript. Returns what follows.
fn parse_name_and_index(body: &str) -> Result<(String, Option<ParamIndex>, String), String> {
    let chars: Vec<char> = body.chars().collect();
    let first = chars[0];

    let name_end = if first.is_ascii_alphabetic() || first == '_' {
        let mut i = 1;
        while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
            i += 1;
        }
        i
    } else if first.is_ascii_digit() {
        let mut i = 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        i
    } else if matches!(first, '?' | '$' | '!' | '#' | '@' | '*' | '-') {
        1
    } else {
        return Err(format!("bad substitution: `{}'", body));
    };

    let name: String = chars[..name_end].iter().collect();

    // Optional subscript, only for identifiers.
    if chars.get(name_end) == Some(&'[') && (first.is_ascii_alphabetic() || first == '_') {
        let mut depth = 0usize;
        let mut i = name_end;
        while i < chars.len() {
            match chars[i] {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        if depth != 0 {
            return Err(format!("missing `]' in `{}'", body));
        }
        let subscript: String = chars[name_end + 1..i].iter().collect();
        let index = match subscript.as_str() {
            "@" => ParamIndex::All,
            "*" => ParamIndex::Star,
            _ => ParamIndex::Expr(subscript),
        };
        let rest: String = chars[i + 1..].iter().collect();
        return Ok((name, Some(index), rest));
    }

    let rest: String = chars[name_end..].iter().collect();
    Ok((name, None, rest))
}

fn parse_operator(rest: &str) -> Result<ParamOp, String> {
    let chars: Vec<char> = rest.chars().collect();
    match chars[0] {
        ':' => match chars.get(1) {
            Some('-') => word_op(&rest[2..], true, OpKind::Default),
            Some('=') => word_op(&rest[2..], true, OpKind::AssignDefault),
            Some('?') => word_op(&rest[2..], true, OpKind::ErrorIfUnset),
            Some('+') => word_op(&rest[2..], true, OpKind::Alternative),
            _ => parse_substring(&rest[1..]),
        },
        '-' => word_op(&rest[1..], false, OpKind::Default),
        '=' => word_op(&rest[1..], false, OpKind::AssignDefault),
        '?' => word_op(&rest[1..], false, OpKind::ErrorIfUnset),
        '+' => word_op(&rest[1..], false, OpKind::Alternative),
        '#' => {
            let (pattern, greedy) = if chars.get(1) == Some(&'#') {
                (&rest[2..], true)
            } else {
                (&rest[1..], false)
            };
            Ok(ParamOp::RemovePrefix {
                pattern: parse_word(pattern).map_err(|e| e.message)?,
                greedy,
            })
        }
        '%' => {
            let (pattern, greedy) = if chars.get(1) == Some(&'%') {
                (&rest[2..], true)
            } else {
                (&rest[1..], false)
            };
            Ok(ParamOp::RemoveSuffix {
                pattern: parse_word(pattern).map_err(|e| e.message)?,
                greedy,
            })
        }
        '/' => parse_replacement(&rest[1..]),
        '^' => {
            let (pattern, all) = if chars.get(1) == Some(&'^') {
                (&rest[2..], true)
            } else {
                (&rest[1..], false)
            };
            Ok(ParamOp::CaseMod {
                upper: true,
                all,
                pattern: optional_pattern(pattern)?,
            })
        }
        ',' => {
            let (pattern, all) = if chars.get(1) == Some(&',') {
                (&rest[2..], true)
            } else {
                (&rest[1..], false)
            };
            Ok(ParamOp::CaseMod {
                upper: false,
                all,
                pattern: optional_pattern(pattern)?,
            })
        }
        _ => Err(format!("bad substitution: `{}'", rest)),
    }
}

enum OpKind {
    Default,
    AssignDefault,
    ErrorIfUnset,
    Alternative,
}

fn word_op(text: &str, check_null: bool, kind: OpKind) -> Result<ParamOp, String> {
    let word = parse_word(text).map_err(|e| e.message)?;
    Ok(match kind {
        OpKind::Default => ParamOp::Default { word, check_null },
        OpKind::AssignDefault => ParamOp::AssignDefault { word, check_null },
        OpKind::ErrorIfUnset => ParamOp::ErrorIfUnset {
            word: if text.is_empty() { None } else { Some(word) },
            check_null,
        },
        OpKind::Alternative => ParamOp::Alternative { word, check_null },
    })
}

/// `offset` or `offset:length`, both arithmetic.
fn parse_substring(text: &str) -> Result<ParamOp, String> {
    let (offset_text, length_text) = split_top_level_colon(text);
    let offset = arith::parse_arith(offset_text).map_err(|e| e.to_string())?;
    let length = match length_text {
        Some(t) => Some(arith::parse_arith(t).map_err(|e| e.to_string())?),
        None => None,
    };
    Ok(ParamOp::Substring { offset, length })
}

/// Split `offset:length` on the first `:` outside parentheses, so ternary
/// expressions in the offset survive.
fn split_top_level_colon(text: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    let mut pending_question = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '?' => pending_question += 1,
            ':' if depth == 0 => {
                if pending_question > 0 {
                    pending_question -= 1;
                } else {
                    return (&text[..i], Some(&text[i + 1..]));
                }
            }
            _ => {}
        }
    }
    (text, None)
}

/// `pat/replacement` with optional leading `/` (replace all) or `#`/`%`
/// anchor; the first unescaped `/` outside quotes separates the two.
fn parse_replacement(rest: &str) -> Result<ParamOp, String> {
    let mut all = false;
    let mut anchor = None;
    let mut body = rest;
    match body.chars().next() {
        Some('/') => {
            all = true;
            body = &body[1..];
        }
        Some('#') => {
            anchor = Some(ReplaceAnchor::Prefix);
            body = &body[1..];
        }
        Some('%') => {
            anchor = Some(ReplaceAnchor::Suffix);
            body = &body[1..];
        }
        _ => {}
    }

    let chars: Vec<char> = body.chars().collect();
    let mut in_single = false;
    let mut in_double = false;
    let mut split = None;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' if !in_single => {
                i += 2;
                continue;
            }
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '/' if !in_single && !in_double => {
                split = Some(i);
                break;
            }
            _ => {}
        }
        i += 1;
    }

    let (pattern_text, replacement_text) = match split {
        Some(i) => {
            let pattern: String = chars[..i].iter().collect();
            let replacement: String = chars[i + 1..].iter().collect();
            (pattern, Some(replacement))
        }
        None => (body.to_string(), None),
    };

    let pattern = parse_word(&pattern_text).map_err(|e| e.message)?;
    let replacement = match replacement_text {
        Some(t) => Some(parse_word(&t).map_err(|e| e.message)?),
        None => None,
    };
    Ok(ParamOp::Replace {
        pattern,
        replacement,
        all,
        anchor,
    })
}

fn optional_pattern(text: &str) -> Result<Option<Word>, String> {
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parse_word(text).map_err(|e| e.message)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name() {
        let p = parse_param_expansion("HOME").unwrap();
        assert_eq!(p.name, "HOME");
        assert!(p.op.is_none());
    }

    #[test]
    fn length() {
        let p = parse_param_expansion("#var").unwrap();
        assert_eq!(p.name, "var");
        assert_eq!(p.op, Some(ParamOp::Length));
    }

    #[test]
    fn hash_alone_is_argc() {
        let p = parse_param_expansion("#").unwrap();
        assert_eq!(p.name, "#");
        assert!(p.op.is_none());
    }

    #[test]
    fn default_variants() {
        let p = parse_param_expansion("x:-fallback").unwrap();
        assert!(matches!(p.op, Some(ParamOp::Default { check_null: true, .. })));

        let p = parse_param_expansion("x-fallback").unwrap();
        assert!(matches!(p.op, Some(ParamOp::Default { check_null: false, .. })));
    }

    #[test]
    fn assign_error_alternative() {
        assert!(matches!(
            parse_param_expansion("x:=d").unwrap().op,
            Some(ParamOp::AssignDefault { check_null: true, .. })
        ));
        assert!(matches!(
            parse_param_expansion("x:?msg").unwrap().op,
            Some(ParamOp::ErrorIfUnset { check_null: true, .. })
        ));
        assert!(matches!(
            parse_param_expansion("x:+alt").unwrap().op,
            Some(ParamOp::Alternative { check_null: true, .. })
        ));
    }

    #[test]
    fn substring_forms() {
        assert!(matches!(
            parse_param_expansion("x:2").unwrap().op,
            Some(ParamOp::Substring { length: None, .. })
        ));
        assert!(matches!(
            parse_param_expansion("x:2:3").unwrap().op,
            Some(ParamOp::Substring { length: Some(_), .. })
        ));
    }

    #[test]
    fn pattern_removal() {
        assert!(matches!(
            parse_param_expansion("x#pat").unwrap().op,
            Some(ParamOp::RemovePrefix { greedy: false, .. })
        ));
        assert!(matches!(
            parse_param_expansion("x##pat").unwrap().op,
            Some(ParamOp::RemovePrefix { greedy: true, .. })
        ));
        assert!(matches!(
            parse_param_expansion("x%%pat").unwrap().op,
            Some(ParamOp::RemoveSuffix { greedy: true, .. })
        ));
    }

    #[test]
    fn replacement_forms() {
        assert!(matches!(
            parse_param_expansion("x/a/b").unwrap().op,
            Some(ParamOp::Replace { all: false, anchor: None, .. })
        ));
        assert!(matches!(
            parse_param_expansion("x//a/b").unwrap().op,
            Some(ParamOp::Replace { all: true, .. })
        ));
        assert!(matches!(
            parse_param_expansion("x/#a/b").unwrap().op,
            Some(ParamOp::Replace { anchor: Some(ReplaceAnchor::Prefix), .. })
        ));
        assert!(matches!(
            parse_param_expansion("x/%a/b").unwrap().op,
            Some(ParamOp::Replace { anchor: Some(ReplaceAnchor::Suffix), .. })
        ));
        // No replacement: deletes matches.
        assert!(matches!(
            parse_param_expansion("x/a").unwrap().op,
            Some(ParamOp::Replace { replacement: None, .. })
        ));
    }

    #[test]
    fn case_modification() {
        assert!(matches!(
            parse_param_expansion("x^").unwrap().op,
            Some(ParamOp::CaseMod { upper: true, all: false, pattern: None })
        ));
        assert!(matches!(
            parse_param_expansion("x,,").unwrap().op,
            Some(ParamOp::CaseMod { upper: false, all: true, pattern: None })
        ));
    }

    #[test]
    fn array_subscripts() {
        let p = parse_param_expansion("arr[@]").unwrap();
        assert_eq!(p.index, Some(ParamIndex::All));

        let p = parse_param_expansion("arr[n+1]").unwrap();
        assert_eq!(p.index, Some(ParamIndex::Expr("n+1".into())));
    }

    #[test]
    fn indirection_and_names() {
        assert!(matches!(
            parse_param_expansion("!ref").unwrap().op,
            Some(ParamOp::Indirect)
        ));
        assert!(matches!(
            parse_param_expansion("!pre*").unwrap().op,
            Some(ParamOp::Names { star: true })
        ));
        assert!(matches!(
            parse_param_expansion("!arr[@]").unwrap().op,
            Some(ParamOp::Keys { star: false })
        ));
    }

    #[test]
    fn array_length() {
        let p = parse_param_expansion("#arr[@]").unwrap();
        assert_eq!(p.index, Some(ParamIndex::All));
        assert_eq!(p.op, Some(ParamOp::Length));
    }

    #[test]
    fn bad_substitution() {
        assert!(parse_param_expansion("x~y").is_err());
        assert!(parse_param_expansion("").is_err());
    }
}

//! Parameter expansion semantics
//!
//! Resolves a parsed `${…}` against the shell state and applies the
//! modifier: defaults, assignment, error-if-unset, alternatives, pattern
//! removal and replacement, case modification, substrings, lengths, name
//! and key listings, and indirection. Array-valued expansions return
//! multiple elements; the expander decides field structure.

use crate::ast::types::*;
use crate::exec::error::ExecError;
use crate::expand::pattern;
use crate::expand::{arith, Expander};
use crate::parser::arith::parse_arith;
use crate::state::Value;

/// The resolved value of a parameter before field assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Unset,
    Single(String),
    Multi(Vec<String>),
}

impl ParamValue {
    fn is_null(&self) -> bool {
        match self {
            ParamValue::Unset => true,
            ParamValue::Single(s) => s.is_empty(),
            ParamValue::Multi(v) => v.is_empty(),
        }
    }

    fn into_single(self) -> String {
        match self {
            ParamValue::Unset => String::new(),
            ParamValue::Single(s) => s,
            ParamValue::Multi(v) => v.join(" "),
        }
    }
}

pub fn resolve_param(
    ex: &mut Expander,
    param: &ParamExpansion,
    in_quotes: bool,
) -> Result<ParamValue, ExecError> {
    // Operators that inspect rather than produce the value.
    match &param.op {
        Some(ParamOp::Length) => return resolve_length(ex, param),
        Some(ParamOp::Names { .. }) => {
            let names = ex.state.vars.names_with_prefix(&param.name);
            return Ok(ParamValue::Multi(names));
        }
        Some(ParamOp::Keys { .. }) => {
            let keys = match ex.state.vars.get(&param.name).and_then(|v| v.value.as_ref()) {
                Some(value) => value.keys(),
                None => Vec::new(),
            };
            return Ok(ParamValue::Multi(keys));
        }
        Some(ParamOp::Indirect) => {
            let target = base_value(ex, param)?.into_single();
            if target.is_empty() {
                return Ok(ParamValue::Unset);
            }
            let inner = ParamExpansion::plain(target);
            return resolve_param(ex, &inner, in_quotes);
        }
        _ => {}
    }

    let base = base_value(ex, param)?;

    let value = match &param.op {
        None => nounset_check(ex, param, base)?,
        Some(ParamOp::Default { word, check_null }) => {
            if base.is_null_for(*check_null) {
                ParamValue::Single(ex.expand_single(word)?)
            } else {
                base
            }
        }
        Some(ParamOp::AssignDefault { word, check_null }) => {
            if base.is_null_for(*check_null) {
                let value = ex.expand_single(word)?;
                ex.state
                    .vars
                    .set_scalar(&param.name, value.clone())
                    .map_err(|e| ExecError::Expansion(e.to_string()))?;
                ParamValue::Single(value)
            } else {
                base
            }
        }
        Some(ParamOp::ErrorIfUnset { word, check_null }) => {
            if base.is_null_for(*check_null) {
                let message = match word {
                    Some(w) => ex.expand_single(w)?,
                    None => "parameter null or not set".to_string(),
                };
                return Err(ExecError::Expansion(format!(
                    "{}: {}",
                    param.name, message
                )));
            }
            base
        }
        Some(ParamOp::Alternative { word, check_null }) => {
            if base.is_null_for(*check_null) {
                ParamValue::Unset
            } else {
                ParamValue::Single(ex.expand_single(word)?)
            }
        }
        Some(ParamOp::RemovePrefix { pattern: pat, greedy }) => {
            let pat = ex.expand_pattern_word(pat)?;
            let nocase = ex.state.shopts.nocasematch;
            map_value(nounset_check(ex, param, base)?, |s| {
                pattern::remove_prefix(&s, &pat, *greedy, nocase)
            })
        }
        Some(ParamOp::RemoveSuffix { pattern: pat, greedy }) => {
            let pat = ex.expand_pattern_word(pat)?;
            let nocase = ex.state.shopts.nocasematch;
            map_value(nounset_check(ex, param, base)?, |s| {
                pattern::remove_suffix(&s, &pat, *greedy, nocase)
            })
        }
        Some(ParamOp::Replace {
            pattern: pat,
            replacement,
            all,
            anchor,
        }) => {
            let pat = ex.expand_pattern_word(pat)?;
            let rep = match replacement {
                Some(word) => ex.expand_single(word)?,
                None => String::new(),
            };
            let nocase = ex.state.shopts.nocasematch;
            map_value(nounset_check(ex, param, base)?, |s| match anchor {
                Some(ReplaceAnchor::Prefix) => {
                    pattern::replace_anchored(&s, &pat, &rep, true, nocase)
                }
                Some(ReplaceAnchor::Suffix) => {
                    pattern::replace_anchored(&s, &pat, &rep, false, nocase)
                }
                None => pattern::replace_pattern(&s, &pat, &rep, *all, nocase),
            })
        }
        Some(ParamOp::CaseMod {
            upper,
            all,
            pattern: pat,
        }) => {
            let pat = match pat {
                Some(word) => Some(ex.expand_pattern_word(word)?),
                None => None,
            };
            let nocase = ex.state.shopts.nocasematch;
            map_value(nounset_check(ex, param, base)?, |s| {
                case_modify(&s, *upper, *all, pat.as_deref(), nocase)
            })
        }
        Some(ParamOp::Substring { offset, length }) => {
            let off = arith::eval_arith(ex, offset)?;
            let len = match length {
                Some(expr) => Some(arith::eval_arith(ex, expr)?),
                None => None,
            };
            substring(nounset_check(ex, param, base)?, off, len)?
        }
        // Handled above.
        Some(ParamOp::Length)
        | Some(ParamOp::Names { .. })
        | Some(ParamOp::Keys { .. })
        | Some(ParamOp::Indirect) => unreachable!(),
    };

    Ok(value)
}

impl ParamValue {
    fn is_null_for(&self, check_null: bool) -> bool {
        match self {
            ParamValue::Unset => true,
            _ if check_null => self.is_null(),
            _ => false,
        }
    }
}

/// The raw value of name+index, before any modifier.
fn base_value(ex: &mut Expander, param: &ParamExpansion) -> Result<ParamValue, ExecError> {
    let name = param.name.as_str();

    // Positional lists.
    if name == "@" || name == "*" {
        return Ok(ParamValue::Multi(ex.state.positional.clone()));
    }

    if let Some(index) = &param.index {
        let Some(value) = ex
            .state
            .vars
            .get(name)
            .and_then(|v| v.value.as_ref())
            .cloned()
        else {
            return Ok(ParamValue::Unset);
        };
        return match index {
            ParamIndex::All | ParamIndex::Star => Ok(ParamValue::Multi(value.elements())),
            ParamIndex::Expr(text) => element_by_subscript(ex, &value, text),
        };
    }

    if let Some(special) = ex.state.special_param(name) {
        // `$!` before any background job counts as unset.
        if name == "!" && ex.state.last_bg_pid.is_none() {
            return Ok(ParamValue::Unset);
        }
        if let Ok(n) = name.parse::<usize>() {
            if n >= 1 && n > ex.state.positional.len() {
                return Ok(ParamValue::Unset);
            }
        }
        return Ok(ParamValue::Single(special));
    }

    match ex.state.vars.get(name).and_then(|v| v.value.clone()) {
        Some(value) => Ok(ParamValue::Single(value.as_scalar())),
        None => Ok(ParamValue::Unset),
    }
}

fn element_by_subscript(
    ex: &mut Expander,
    value: &Value,
    subscript: &str,
) -> Result<ParamValue, ExecError> {
    match value {
        Value::Assoc(_) => {
            // Keys are strings; expand any $-forms in the subscript text.
            let key = expand_subscript_text(ex, subscript)?;
            Ok(match value.get_key(&key) {
                Some(v) => ParamValue::Single(v),
                None => ParamValue::Unset,
            })
        }
        _ => {
            let expr = parse_arith(subscript)
                .map_err(|e| ExecError::Expansion(format!("bad array subscript: {}", e)))?;
            let index = arith::eval_arith(ex, &expr)?;
            Ok(match value.get_index(index) {
                Some(v) => ParamValue::Single(v),
                None => ParamValue::Unset,
            })
        }
    }
}

/// Expand a raw subscript string (may contain `$key`) to its text.
pub fn expand_subscript_text(ex: &mut Expander, text: &str) -> Result<String, ExecError> {
    if !text.contains('$') && !text.contains('`') {
        return Ok(text.to_string());
    }
    let word = crate::parser::word::parse_word(text)
        .map_err(|e| ExecError::Expansion(e.message))?;
    ex.expand_single(&word)
}

fn resolve_length(ex: &mut Expander, param: &ParamExpansion) -> Result<ParamValue, ExecError> {
    let count = match &param.index {
        Some(ParamIndex::All | ParamIndex::Star) => {
            match ex.state.vars.get(&param.name).and_then(|v| v.value.as_ref()) {
                Some(value) => value.len(),
                None => 0,
            }
        }
        _ => {
            let base = base_value(ex, param)?;
            match base {
                ParamValue::Multi(v) => v.len(),
                ParamValue::Single(s) => s.chars().count(),
                ParamValue::Unset => 0,
            }
        }
    };
    Ok(ParamValue::Single(count.to_string()))
}

fn nounset_check(
    ex: &Expander,
    param: &ParamExpansion,
    base: ParamValue,
) -> Result<ParamValue, ExecError> {
    if ex.state.options.nounset && base == ParamValue::Unset && !ex.state.param_is_set(&param.name)
    {
        return Err(ExecError::Expansion(format!(
            "{}: unbound variable",
            param.name
        )));
    }
    Ok(base)
}

fn map_value(value: ParamValue, f: impl Fn(String) -> String) -> ParamValue {
    match value {
        ParamValue::Unset => ParamValue::Single(f(String::new())),
        ParamValue::Single(s) => ParamValue::Single(f(s)),
        ParamValue::Multi(v) => ParamValue::Multi(v.into_iter().map(f).collect()),
    }
}

fn substring(value: ParamValue, offset: i64, length: Option<i64>) -> Result<ParamValue, ExecError> {
    match value {
        ParamValue::Multi(items) => {
            let len = items.len() as i64;
            let start = clamp_offset(offset, len);
            let slice: Vec<String> = match length {
                None => items.into_iter().skip(start).collect(),
                Some(n) if n < 0 => {
                    return Err(ExecError::Expansion(format!(
                        "{}: substring expression < 0",
                        n
                    )))
                }
                Some(n) => items.into_iter().skip(start).take(n as usize).collect(),
            };
            Ok(ParamValue::Multi(slice))
        }
        other => {
            let text = other.into_single();
            let chars: Vec<char> = text.chars().collect();
            let len = chars.len() as i64;
            let start = clamp_offset(offset, len);
            let result: String = match length {
                None => chars[start.min(chars.len())..].iter().collect(),
                Some(n) if n < 0 => {
                    // Negative length: an end offset from the end.
                    let end = len + n;
                    if end < start as i64 {
                        return Err(ExecError::Expansion(format!(
                            "{}: substring expression < 0",
                            n
                        )));
                    }
                    chars[start.min(chars.len())..(end as usize).min(chars.len())]
                        .iter()
                        .collect()
                }
                Some(n) => chars
                    .iter()
                    .skip(start)
                    .take(n as usize)
                    .collect(),
            };
            Ok(ParamValue::Single(result))
        }
    }
}

/// Negative offsets count back from the end; out-of-range clamps.
fn clamp_offset(offset: i64, len: i64) -> usize {
    if offset < 0 {
        (len + offset).max(0) as usize
    } else {
        offset.min(len) as usize
    }
}

/// `^` / `^^` / `,` / `,,` with an optional per-character pattern
/// (default `?`).
fn case_modify(text: &str, upper: bool, all: bool, pat: Option<&str>, nocase: bool) -> String {
    let pat = pat.filter(|p| !p.is_empty()).unwrap_or("?");
    let mut out = String::with_capacity(text.len());
    let mut done_first = false;
    for c in text.chars() {
        let applies = (!done_first || all) && pattern::pattern_match(pat, &c.to_string(), nocase);
        done_first = true;
        if applies {
            if upper {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::param::parse_param_expansion;
    use crate::state::ShellState;

    fn resolve(state: &mut ShellState, body: &str) -> Result<ParamValue, ExecError> {
        let param = parse_param_expansion(body).unwrap();
        let mut ex = Expander::new(state);
        resolve_param(&mut ex, &param, false)
    }

    fn single(state: &mut ShellState, body: &str) -> String {
        match resolve(state, body).unwrap() {
            ParamValue::Single(s) => s,
            ParamValue::Unset => String::new(),
            ParamValue::Multi(v) => panic!("expected single, got {:?}", v),
        }
    }

    #[test]
    fn defaults() {
        let mut state = ShellState::new();
        assert_eq!(single(&mut state, "missing:-fallback"), "fallback");
        state.vars.set_scalar("x", "").unwrap();
        assert_eq!(single(&mut state, "x:-fallback"), "fallback");
        assert_eq!(single(&mut state, "x-fallback"), "");
        state.vars.set_scalar("x", "val").unwrap();
        assert_eq!(single(&mut state, "x:-fallback"), "val");
    }

    #[test]
    fn assign_default_mutates() {
        let mut state = ShellState::new();
        assert_eq!(single(&mut state, "newvar:=assigned"), "assigned");
        assert_eq!(state.vars.get_string("newvar").as_deref(), Some("assigned"));
    }

    #[test]
    fn error_if_unset() {
        let mut state = ShellState::new();
        let err = resolve(&mut state, "nope:?custom message").unwrap_err();
        match err {
            ExecError::Expansion(msg) => {
                assert!(msg.contains("nope"));
                assert!(msg.contains("custom message"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn alternative() {
        let mut state = ShellState::new();
        assert_eq!(single(&mut state, "missing:+alt"), "");
        state.vars.set_scalar("x", "set").unwrap();
        assert_eq!(single(&mut state, "x:+alt"), "alt");
    }

    #[test]
    fn length_of_string_and_array() {
        let mut state = ShellState::new();
        state.vars.set_scalar("s", "hello").unwrap();
        assert_eq!(single(&mut state, "#s"), "5");
        state
            .vars
            .set("arr", Value::Indexed(vec![Some("a".into()), Some("b".into())]))
            .unwrap();
        assert_eq!(single(&mut state, "#arr[@]"), "2");
    }

    #[test]
    fn pattern_removal() {
        let mut state = ShellState::new();
        state.vars.set_scalar("path", "/usr/local/bin").unwrap();
        assert_eq!(single(&mut state, "path#*/"), "usr/local/bin");
        assert_eq!(single(&mut state, "path##*/"), "bin");
        state.vars.set_scalar("f", "name.tar.gz").unwrap();
        assert_eq!(single(&mut state, "f%.*"), "name.tar");
        assert_eq!(single(&mut state, "f%%.*"), "name");
    }

    #[test]
    fn replacement() {
        let mut state = ShellState::new();
        state.vars.set_scalar("s", "banana").unwrap();
        assert_eq!(single(&mut state, "s/a/o"), "bonana");
        assert_eq!(single(&mut state, "s//a/o"), "bonono");
        assert_eq!(single(&mut state, "s/na"), "bana");
    }

    #[test]
    fn case_modification() {
        let mut state = ShellState::new();
        state.vars.set_scalar("s", "hello world").unwrap();
        assert_eq!(single(&mut state, "s^"), "Hello world");
        assert_eq!(single(&mut state, "s^^"), "HELLO WORLD");
        state.vars.set_scalar("u", "HELLO").unwrap();
        assert_eq!(single(&mut state, "u,"), "hELLO");
        assert_eq!(single(&mut state, "u,,"), "hello");
        // With a pattern: only matching characters change.
        assert_eq!(single(&mut state, "s^^[lo]"), "heLLO wOrLd");
    }

    #[test]
    fn substrings() {
        let mut state = ShellState::new();
        state.vars.set_scalar("s", "abcdefg").unwrap();
        assert_eq!(single(&mut state, "s:2"), "cdefg");
        assert_eq!(single(&mut state, "s:2:3"), "cde");
        assert_eq!(single(&mut state, "s: -3"), "efg");
        assert_eq!(single(&mut state, "s:1:-2"), "bcde");
    }

    #[test]
    fn array_elements() {
        let mut state = ShellState::new();
        state
            .vars
            .set(
                "arr",
                Value::Indexed(vec![Some("zero".into()), Some("one".into())]),
            )
            .unwrap();
        assert_eq!(single(&mut state, "arr[1]"), "one");
        assert_eq!(single(&mut state, "arr"), "zero");
        assert_eq!(
            resolve(&mut state, "arr[@]").unwrap(),
            ParamValue::Multi(vec!["zero".into(), "one".into()])
        );
        assert_eq!(
            resolve(&mut state, "!arr[@]").unwrap(),
            ParamValue::Multi(vec!["0".into(), "1".into()])
        );
    }

    #[test]
    fn names_matching_prefix() {
        let mut state = ShellState::new();
        state.vars.set_scalar("PRE_A", "1").unwrap();
        state.vars.set_scalar("PRE_B", "2").unwrap();
        assert_eq!(
            resolve(&mut state, "!PRE_@").unwrap(),
            ParamValue::Multi(vec!["PRE_A".into(), "PRE_B".into()])
        );
    }

    #[test]
    fn indirection() {
        let mut state = ShellState::new();
        state.vars.set_scalar("target", "value").unwrap();
        state.vars.set_scalar("ref", "target").unwrap();
        assert_eq!(single(&mut state, "!ref"), "value");
    }

    #[test]
    fn nounset_errors() {
        let mut state = ShellState::new();
        state.options.nounset = true;
        assert!(resolve(&mut state, "missing").is_err());
        // Modifier forms are exempt.
        assert_eq!(single(&mut state, "missing:-ok"), "ok");
    }
}

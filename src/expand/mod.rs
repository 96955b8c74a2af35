//! Word expansion
//!
//! The ordered stage pipeline: brace expansion, tilde expansion, parameter
//! and variable expansion, command and arithmetic substitution, word
//! splitting, pathname expansion, quote removal. Characters carry their
//! quoting through the stages so splitting only touches unquoted expansion
//! output and globbing never sees quoted metacharacters.

pub mod arith;
pub mod brace;
pub mod glob;
pub mod param;
pub mod pattern;
pub mod split;
pub mod tilde;

use crate::ast::types::*;
use crate::exec::error::ExecError;
use crate::exec::process_sub::ProcSubHandle;
use crate::state::ShellState;
use glob::GlobOptions;
use param::ParamValue;

/// One character of an in-flight field.
#[derive(Debug, Clone, Copy)]
struct MChar {
    c: char,
    /// Quoted characters escape globbing and never split.
    quoted: bool,
    /// Unquoted expansion output: subject to IFS splitting.
    splittable: bool,
}

/// A field being assembled.
#[derive(Debug, Clone, Default)]
struct FieldBuf {
    chars: Vec<MChar>,
    /// A quoted-but-empty contribution ("" or "$unset") keeps the field
    /// alive through splitting and empty-removal.
    forced: bool,
}

impl FieldBuf {
    fn push_text(&mut self, text: &str, quoted: bool, splittable: bool) {
        for c in text.chars() {
            self.chars.push(MChar {
                c,
                quoted,
                splittable: splittable && !quoted,
            });
        }
    }

    fn has_content(&self) -> bool {
        self.forced || !self.chars.is_empty()
    }

    fn text(&self) -> String {
        self.chars.iter().map(|m| m.c).collect()
    }

    /// Glob-pattern form: quoted characters backslash-escaped.
    fn pattern(&self) -> String {
        let mut out = String::with_capacity(self.chars.len());
        for m in &self.chars {
            if m.quoted && matches!(m.c, '*' | '?' | '[' | ']' | '\\') {
                out.push('\\');
            }
            out.push(m.c);
        }
        out
    }
}

/// Expansion engine for one command's words. Collects process-substitution
/// children so the executor can reap them after the command finishes.
pub struct Expander<'a> {
    pub state: &'a mut ShellState,
    pub procsubs: Vec<ProcSubHandle>,
}

impl<'a> Expander<'a> {
    pub fn new(state: &'a mut ShellState) -> Self {
        Self {
            state,
            procsubs: Vec::new(),
        }
    }

    /// Full pipeline over an argv: brace, tilde, parameter/command/
    /// arithmetic, splitting, globbing, quote removal.
    pub fn expand_words(&mut self, words: &[Word]) -> Result<Vec<String>, ExecError> {
        let mut out = Vec::new();
        for word in words {
            out.extend(self.expand_word_fields(word)?);
        }
        Ok(out)
    }

    pub fn expand_word_fields(&mut self, word: &Word) -> Result<Vec<String>, ExecError> {
        let mut results = Vec::new();
        for braced in brace::expand_braces(word) {
            let mut fields = vec![FieldBuf::default()];
            self.expand_pieces_into(&braced.pieces, false, &mut fields)?;

            // Word splitting.
            let ifs = self.state.ifs();
            let mut split_fields = Vec::new();
            for field in fields {
                split_fields.extend(split_marked(field, &ifs));
            }

            // Pathname expansion, then quote removal.
            for field in split_fields {
                if !field.has_content() {
                    continue;
                }
                results.extend(self.finish_field(field));
            }
        }
        Ok(results)
    }

    fn finish_field(&self, field: FieldBuf) -> Vec<String> {
        if !self.state.options.noglob {
            let pattern = field.pattern();
            if pattern::has_glob_chars(&pattern) {
                let matches = glob::expand_pathname(
                    &pattern,
                    &GlobOptions {
                        dotglob: self.state.shopts.dotglob,
                        nocase: false,
                    },
                );
                if !matches.is_empty() {
                    return matches;
                }
                if self.state.shopts.nullglob {
                    return Vec::new();
                }
            }
        }
        vec![field.text()]
    }

    /// Expansion without splitting or globbing, for assignment values and
    /// similar single-string contexts. Multiple fields join with spaces.
    pub fn expand_single(&mut self, word: &Word) -> Result<String, ExecError> {
        let mut fields = vec![FieldBuf::default()];
        self.expand_pieces_into(&word.pieces, false, &mut fields)?;
        Ok(fields
            .iter()
            .filter(|f| f.has_content() || fields.len() == 1)
            .map(|f| f.text())
            .collect::<Vec<_>>()
            .join(" "))
    }

    /// Assignment values additionally expand `~` after `=` and `:`.
    pub fn expand_assignment_value(&mut self, word: &Word) -> Result<String, ExecError> {
        let value = self.expand_single(word)?;
        if value.contains('~') {
            Ok(tilde::expand_assignment_tildes(self.state, &value))
        } else {
            Ok(value)
        }
    }

    /// Redirection targets: no splitting, no globbing, and an expansion
    /// that produces several fields is an error.
    pub fn expand_redirect_target(&mut self, word: &Word) -> Result<String, ExecError> {
        let mut fields = vec![FieldBuf::default()];
        self.expand_pieces_into(&word.pieces, false, &mut fields)?;
        let present: Vec<&FieldBuf> = fields.iter().filter(|f| f.has_content()).collect();
        if present.len() > 1 {
            return Err(ExecError::Expansion("ambiguous redirect".to_string()));
        }
        Ok(present
            .first()
            .map(|f| f.text())
            .unwrap_or_else(|| fields[0].text()))
    }

    /// Pattern contexts (`case`, `[[ == ]]`, parameter modifiers): quoted
    /// spans arrive backslash-escaped so they match literally.
    pub fn expand_pattern_word(&mut self, word: &Word) -> Result<String, ExecError> {
        let mut fields = vec![FieldBuf::default()];
        self.expand_pieces_into(&word.pieces, false, &mut fields)?;
        Ok(fields
            .iter()
            .map(|f| f.pattern())
            .collect::<Vec<_>>()
            .join(" "))
    }

    // =========================================================================
    // PIECE EXPANSION
    // =========================================================================

    fn expand_pieces_into(
        &mut self,
        pieces: &[WordPiece],
        in_quotes: bool,
        fields: &mut Vec<FieldBuf>,
    ) -> Result<(), ExecError> {
        for piece in pieces {
            match piece {
                WordPiece::Literal(text) => {
                    fields.last_mut().unwrap().push_text(text, in_quotes, false);
                }
                WordPiece::SingleQuoted(text) => {
                    let field = fields.last_mut().unwrap();
                    if text.is_empty() {
                        field.forced = true;
                    }
                    field.push_text(text, true, false);
                }
                WordPiece::Escaped(text) => {
                    fields.last_mut().unwrap().push_text(text, true, false);
                }
                WordPiece::DoubleQuoted(inner) => {
                    let before_len = fields.len();
                    let before_chars = fields.last().unwrap().chars.len();
                    self.expand_pieces_into(inner, true, fields)?;
                    // "" and "$unset" keep their (empty) field, but "$@"
                    // with no parameters disappears entirely.
                    let at_like = inner.iter().any(|p| {
                        matches!(p, WordPiece::Param(pp)
                            if pp.name == "@" || pp.name == "*"
                                || matches!(pp.index, Some(ParamIndex::All | ParamIndex::Star)))
                    });
                    if !at_like
                        && fields.len() == before_len
                        && fields.last().unwrap().chars.len() == before_chars
                    {
                        fields.last_mut().unwrap().forced = true;
                    }
                }
                WordPiece::Param(param) => {
                    let value = param::resolve_param(self, param, in_quotes)?;
                    self.push_param_value(value, param, in_quotes, fields)?;
                }
                WordPiece::CommandSub { script, .. } => {
                    let output = crate::exec::command_sub::capture(self.state, script)?;
                    let trimmed = output.trim_end_matches('\n');
                    fields
                        .last_mut()
                        .unwrap()
                        .push_text(trimmed, in_quotes, true);
                }
                WordPiece::ArithSub(expr) => {
                    let value = arith::eval_arith(self, expr)?;
                    fields
                        .last_mut()
                        .unwrap()
                        .push_text(&value.to_string(), in_quotes, true);
                }
                WordPiece::ProcessSub { script, direction } => {
                    let handle =
                        crate::exec::process_sub::setup(self.state, script, *direction)?;
                    // The /dev/fd path itself is never split or globbed.
                    fields
                        .last_mut()
                        .unwrap()
                        .push_text(&handle.path.clone(), true, false);
                    self.procsubs.push(handle);
                }
                WordPiece::Tilde { user } => {
                    match tilde::tilde_home(self.state, user.as_deref()) {
                        Some(home) => {
                            // The result is not split or globbed.
                            fields.last_mut().unwrap().push_text(&home, true, false);
                        }
                        None => {
                            let mut literal = String::from("~");
                            if let Some(user) = user {
                                literal.push_str(user);
                            }
                            fields
                                .last_mut()
                                .unwrap()
                                .push_text(&literal, in_quotes, false);
                        }
                    }
                }
                WordPiece::Brace(brace) => {
                    // Inside quotes (or after the brace stage) braces are
                    // literal text.
                    let mut literal = String::from("{");
                    let rendered: Vec<String> = brace
                        .items
                        .iter()
                        .map(|item| match item {
                            BraceItem::Word(w) => {
                                crate::ast::printer::word_text(w)
                            }
                            BraceItem::NumericRange { start, end, .. } => {
                                format!("{}..{}", start, end)
                            }
                            BraceItem::CharRange { start, end, .. } => {
                                format!("{}..{}", start, end)
                            }
                        })
                        .collect();
                    literal.push_str(&rendered.join(","));
                    literal.push('}');
                    fields
                        .last_mut()
                        .unwrap()
                        .push_text(&literal, in_quotes, false);
                }
            }
        }
        Ok(())
    }

    fn push_param_value(
        &mut self,
        value: ParamValue,
        param: &ParamExpansion,
        in_quotes: bool,
        fields: &mut Vec<FieldBuf>,
    ) -> Result<(), ExecError> {
        let star = param.name == "*"
            || matches!(param.index, Some(ParamIndex::Star))
            || matches!(param.op, Some(ParamOp::Keys { star: true }))
            || matches!(param.op, Some(ParamOp::Names { star: true }));

        match value {
            ParamValue::Unset => {}
            ParamValue::Single(text) => {
                let field = fields.last_mut().unwrap();
                if in_quotes && text.is_empty() {
                    field.forced = true;
                }
                field.push_text(&text, in_quotes, true);
            }
            ParamValue::Multi(elements) => {
                if in_quotes && star {
                    // "$*": one field joined by the first IFS character.
                    let sep = self.state.ifs().chars().next().map(|c| c.to_string());
                    let joined = elements.join(sep.as_deref().unwrap_or(""));
                    let field = fields.last_mut().unwrap();
                    if joined.is_empty() {
                        field.forced = true;
                    }
                    field.push_text(&joined, true, false);
                } else {
                    // "$@" and array[@]: one field per element. Unquoted,
                    // each element still undergoes splitting and globbing.
                    for (i, element) in elements.iter().enumerate() {
                        if i > 0 {
                            fields.push(FieldBuf::default());
                        }
                        let field = fields.last_mut().unwrap();
                        if in_quotes {
                            if element.is_empty() {
                                field.forced = true;
                            }
                            field.push_text(element, true, false);
                        } else {
                            field.push_text(element, false, true);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// IFS splitting over marked characters: boundaries only at splittable
/// characters. Whitespace runs coalesce; each non-whitespace separator
/// closes exactly one field; a trailing separator creates no empty field.
fn split_marked(field: FieldBuf, ifs: &str) -> Vec<FieldBuf> {
    if ifs.is_empty() {
        return vec![field];
    }
    let is_ws = |c: char| " \t\n".contains(c) && ifs.contains(c);
    let is_sep = |c: char| !" \t\n".contains(c) && ifs.contains(c);

    let mut out = Vec::new();
    let mut current = FieldBuf::default();
    let chars = field.chars;
    // The forced flag belongs to the first produced field.
    let mut forced_pending = field.forced;
    let mut i = 0;

    while i < chars.len() {
        let mc = chars[i];
        if mc.splittable && ifs.contains(mc.c) {
            let mut saw_sep = false;
            if is_ws(mc.c) {
                while i < chars.len() && chars[i].splittable && is_ws(chars[i].c) {
                    i += 1;
                }
                if i < chars.len() && chars[i].splittable && is_sep(chars[i].c) {
                    saw_sep = true;
                    i += 1;
                    while i < chars.len() && chars[i].splittable && is_ws(chars[i].c) {
                        i += 1;
                    }
                }
            } else {
                saw_sep = true;
                i += 1;
                while i < chars.len() && chars[i].splittable && is_ws(chars[i].c) {
                    i += 1;
                }
            }

            let mut finished = std::mem::take(&mut current);
            finished.forced |= forced_pending;
            forced_pending = false;
            // Whitespace-only boundaries never create empty fields; a
            // non-whitespace separator always closes one.
            if finished.has_content() || saw_sep {
                out.push(finished);
            }
            continue;
        }
        current.chars.push(MChar {
            splittable: false,
            ..mc
        });
        i += 1;
    }

    current.forced |= forced_pending;
    if current.has_content() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::word::parse_word;

    fn expand(state: &mut ShellState, text: &str) -> Vec<String> {
        let word = parse_word(text).unwrap();
        Expander::new(state).expand_word_fields(&word).unwrap()
    }

    fn fresh_state() -> ShellState {
        let mut state = ShellState::new();
        state.vars.set_scalar("IFS", " \t\n").unwrap();
        state
    }

    #[test]
    fn literal_word_is_one_field() {
        let mut state = fresh_state();
        assert_eq!(expand(&mut state, "hello"), vec!["hello"]);
    }

    #[test]
    fn unquoted_expansion_splits() {
        let mut state = fresh_state();
        state.vars.set_scalar("x", "a b  c").unwrap();
        assert_eq!(expand(&mut state, "$x"), vec!["a", "b", "c"]);
    }

    #[test]
    fn quoted_expansion_does_not_split() {
        let mut state = fresh_state();
        state.vars.set_scalar("x", "a b").unwrap();
        assert_eq!(expand(&mut state, "\"$x\""), vec!["a b"]);
    }

    #[test]
    fn literal_text_never_splits() {
        let mut state = fresh_state();
        state.vars.set_scalar("IFS", ",").unwrap();
        assert_eq!(expand(&mut state, "a,b"), vec!["a,b"]);
        state.vars.set_scalar("x", "1,2").unwrap();
        assert_eq!(expand(&mut state, "$x"), vec!["1", "2"]);
    }

    #[test]
    fn unset_variable_vanishes() {
        let mut state = fresh_state();
        assert!(expand(&mut state, "$missing").is_empty());
        // But survives inside quotes as an empty field.
        assert_eq!(expand(&mut state, "\"$missing\""), vec![""]);
    }

    #[test]
    fn empty_quotes_make_empty_field() {
        let mut state = fresh_state();
        assert_eq!(expand(&mut state, "\"\""), vec![""]);
        assert_eq!(expand(&mut state, "''"), vec![""]);
    }

    #[test]
    fn at_expands_to_one_field_per_param() {
        let mut state = fresh_state();
        state.positional = vec!["one".into(), "two words".into(), "".into()];
        assert_eq!(
            expand(&mut state, "\"$@\""),
            vec!["one", "two words", ""]
        );
        // Unquoted $@ splits each element.
        assert_eq!(expand(&mut state, "$@"), vec!["one", "two", "words"]);
    }

    #[test]
    fn star_joins_with_first_ifs_char() {
        let mut state = fresh_state();
        state.positional = vec!["a".into(), "b".into()];
        state.vars.set_scalar("IFS", ":-").unwrap();
        assert_eq!(expand(&mut state, "\"$*\""), vec!["a:b"]);
    }

    #[test]
    fn prefix_suffix_around_at() {
        let mut state = fresh_state();
        state.positional = vec!["a".into(), "b".into()];
        assert_eq!(expand(&mut state, "x\"$@\"y"), vec!["xa", "by"]);
    }

    #[test]
    fn arith_expansion_in_field() {
        let mut state = fresh_state();
        state.vars.set_scalar("x", "5").unwrap();
        assert_eq!(expand(&mut state, "$((x<<2))"), vec!["20"]);
    }

    #[test]
    fn quoted_var_field_length_matches_value() {
        let mut state = fresh_state();
        state.vars.set_scalar("v", "a b  c").unwrap();
        let fields = expand(&mut state, "\"$v\"");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].chars().count(), 6);
    }

    #[test]
    fn single_expansion_does_not_split() {
        let mut state = fresh_state();
        state.vars.set_scalar("x", "a b").unwrap();
        let word = parse_word("$x").unwrap();
        let value = Expander::new(&mut state).expand_single(&word).unwrap();
        assert_eq!(value, "a b");
    }

    #[test]
    fn redirect_target_rejects_multiple_fields() {
        let mut state = fresh_state();
        state.positional = vec!["a".into(), "b".into()];
        let word = parse_word("\"$@\"").unwrap();
        let err = Expander::new(&mut state)
            .expand_redirect_target(&word)
            .unwrap_err();
        assert!(matches!(err, ExecError::Expansion(_)));
    }

    #[test]
    fn pattern_word_escapes_quoted_metachars() {
        let mut state = fresh_state();
        let word = parse_word("a\"*\"b").unwrap();
        let pattern = Expander::new(&mut state).expand_pattern_word(&word).unwrap();
        assert_eq!(pattern, "a\\*b");
    }

    #[test]
    fn noglob_disables_pathname_expansion() {
        let mut state = fresh_state();
        state.options.noglob = true;
        assert_eq!(expand(&mut state, "/definitely-missing-*"), vec!["/definitely-missing-*"]);
    }

    #[test]
    fn unmatched_glob_stays_literal_unless_nullglob() {
        let mut state = fresh_state();
        assert_eq!(
            expand(&mut state, "/nonexistent-dir-zz/*"),
            vec!["/nonexistent-dir-zz/*"]
        );
        state.shopts.nullglob = true;
        assert!(expand(&mut state, "/nonexistent-dir-zz/*").is_empty());
    }
}

//! Word parsing
//!
//! Turns the raw text of a WORD token into an `ast::Word`: an ordered list
//! of pieces, each tagged with its quoting, so the expander can apply the
//! correct rules per piece. Also decodes ANSI-C `$'…'` strings and detects
//! brace expansion and leading tildes.

use crate::ast::types::*;
use crate::parser::param::parse_param_expansion;
use crate::parser::types::ParseError;
use crate::parser::{arith, parse};

/// How the surrounding context changes word parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordContext {
    /// Normal command word: quotes, expansions, braces, tilde.
    Normal,
    /// Inside a here-doc body or double quotes: only `$…`, backticks and a
    /// restricted set of backslash escapes are special.
    DoubleQuotedBody,
}

/// Parse one word's raw text.
pub fn parse_word(text: &str) -> Result<Word, ParseError> {
    let mut parser = WordParser::new(text);
    parser.parse(WordContext::Normal)
}

/// Parse a here-doc body: double-quote rules, no quote removal.
pub fn parse_heredoc_body(text: &str) -> Result<Word, ParseError> {
    let mut parser = WordParser::new(text);
    parser.parse(WordContext::DoubleQuotedBody)
}

struct WordParser {
    chars: Vec<char>,
    pos: usize,
}

impl WordParser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, 1, self.pos + 1)
    }

    fn parse(&mut self, context: WordContext) -> Result<Word, ParseError> {
        let mut pieces = Vec::new();
        let mut literal = String::new();

        // A leading tilde is its own piece so the expander can resolve it.
        if context == WordContext::Normal && self.current() == Some('~') {
            if let Some(piece) = self.try_tilde() {
                pieces.push(piece);
            }
        }

        while let Some(c) = self.current() {
            match c {
                '\'' if context == WordContext::Normal => {
                    flush(&mut pieces, &mut literal);
                    pieces.push(self.single_quoted()?);
                }
                '"' if context == WordContext::Normal => {
                    flush(&mut pieces, &mut literal);
                    pieces.push(self.double_quoted()?);
                }
                '\\' => {
                    self.pos += 1;
                    match self.current() {
                        Some(next) => {
                            self.pos += 1;
                            if context == WordContext::DoubleQuotedBody {
                                // In heredoc bodies only \$ \` \\ are escapes.
                                if matches!(next, '$' | '`' | '\\') {
                                    flush(&mut pieces, &mut literal);
                                    pieces.push(WordPiece::Escaped(next.to_string()));
                                } else {
                                    literal.push('\\');
                                    literal.push(next);
                                }
                            } else {
                                flush(&mut pieces, &mut literal);
                                pieces.push(WordPiece::Escaped(next.to_string()));
                            }
                        }
                        None => literal.push('\\'),
                    }
                }
                '`' => {
                    flush(&mut pieces, &mut literal);
                    pieces.push(self.backquoted()?);
                }
                '$' => {
                    flush(&mut pieces, &mut literal);
                    match self.dollar(context)? {
                        Some(piece) => pieces.push(piece),
                        None => literal.push('$'),
                    }
                }
                '<' | '>'
                    if context == WordContext::Normal && self.peek(1) == Some('(') =>
                {
                    flush(&mut pieces, &mut literal);
                    pieces.push(self.process_substitution()?);
                }
                '{' if context == WordContext::Normal => {
                    if let Some(brace) = self.try_brace_expansion()? {
                        flush(&mut pieces, &mut literal);
                        pieces.push(brace);
                    } else {
                        literal.push('{');
                        self.pos += 1;
                    }
                }
                _ => {
                    literal.push(c);
                    self.pos += 1;
                }
            }
        }

        flush(&mut pieces, &mut literal);
        Ok(Word { pieces })
    }

    /// `~` or `~user` at the start of a word, up to the first `/`.
    fn try_tilde(&mut self) -> Option<WordPiece> {
        let mut end = self.pos + 1;
        while let Some(&c) = self.chars.get(end) {
            if c == '/' {
                break;
            }
            // Quotes or expansions after ~ defeat tilde expansion.
            if !c.is_ascii_alphanumeric() && c != '_' && c != '-' && c != '.' {
                return None;
            }
            end += 1;
        }
        let user: String = self.chars[self.pos + 1..end].iter().collect();
        self.pos = end;
        Some(WordPiece::Tilde {
            user: if user.is_empty() { None } else { Some(user) },
        })
    }

    fn single_quoted(&mut self) -> Result<WordPiece, ParseError> {
        self.pos += 1; // opening quote
        let start = self.pos;
        while let Some(c) = self.current() {
            if c == '\'' {
                let value: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                return Ok(WordPiece::SingleQuoted(value));
            }
            self.pos += 1;
        }
        Err(self.error("unterminated single quote"))
    }

    fn double_quoted(&mut self) -> Result<WordPiece, ParseError> {
        self.pos += 1; // opening quote
        let mut pieces = Vec::new();
        let mut literal = String::new();

        while let Some(c) = self.current() {
            match c {
                '"' => {
                    self.pos += 1;
                    flush(&mut pieces, &mut literal);
                    return Ok(WordPiece::DoubleQuoted(pieces));
                }
                '\\' => {
                    self.pos += 1;
                    match self.current() {
                        // Only these are escapes inside double quotes.
                        Some(next @ ('"' | '$' | '`' | '\\')) => {
                            self.pos += 1;
                            flush(&mut pieces, &mut literal);
                            pieces.push(WordPiece::Escaped(next.to_string()));
                        }
                        Some(next) => {
                            self.pos += 1;
                            literal.push('\\');
                            literal.push(next);
                        }
                        None => literal.push('\\'),
                    }
                }
                '`' => {
                    flush(&mut pieces, &mut literal);
                    pieces.push(self.backquoted()?);
                }
                '$' => {
                    flush(&mut pieces, &mut literal);
                    match self.dollar(WordContext::DoubleQuotedBody)? {
                        Some(piece) => pieces.push(piece),
                        None => literal.push('$'),
                    }
                }
                _ => {
                    literal.push(c);
                    self.pos += 1;
                }
            }
        }
        Err(self.error("unterminated double quote"))
    }

    fn backquoted(&mut self) -> Result<WordPiece, ParseError> {
        self.pos += 1; // opening backtick
        let mut body = String::new();
        while let Some(c) = self.current() {
            if c == '`' {
                self.pos += 1;
                let script = parse(&body)?;
                return Ok(WordPiece::CommandSub {
                    script: Box::new(script),
                    backquoted: true,
                });
            }
            if c == '\\' {
                // Inside backticks, \` \$ \\ lose the backslash.
                match self.peek(1) {
                    Some(next @ ('`' | '$' | '\\')) => {
                        body.push(next);
                        self.pos += 2;
                        continue;
                    }
                    _ => {}
                }
            }
            body.push(c);
            self.pos += 1;
        }
        Err(self.error("unterminated backquote"))
    }

    /// Everything starting with `$`. Returns `None` when the `$` is literal.
    fn dollar(&mut self, context: WordContext) -> Result<Option<WordPiece>, ParseError> {
        match self.peek(1) {
            Some('\'') if context == WordContext::Normal => {
                self.pos += 1;
                Ok(Some(self.ansi_c_quoted()?))
            }
            Some('"') if context == WordContext::Normal => {
                // Locale string: treated as a plain double-quoted string.
                self.pos += 1;
                Ok(Some(self.double_quoted()?))
            }
            Some('(') => {
                if self.peek(2) == Some('(') && self.arith_parens_close_together() {
                    Ok(Some(self.arith_expansion()?))
                } else {
                    Ok(Some(self.command_substitution()?))
                }
            }
            Some('{') => {
                let body = self.balanced_braces_interior()?;
                let param = parse_param_expansion(&body).map_err(|e| {
                    ParseError::new(format!("bad substitution: ${{{}}}: {}", body, e), 1, 1)
                })?;
                Ok(Some(WordPiece::Param(param)))
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.pos += 1;
                let start = self.pos;
                while let Some(c) = self.current() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                let name: String = self.chars[start..self.pos].iter().collect();
                Ok(Some(WordPiece::Param(ParamExpansion::plain(name))))
            }
            Some(c) if c.is_ascii_digit() => {
                self.pos += 2;
                Ok(Some(WordPiece::Param(ParamExpansion::plain(c.to_string()))))
            }
            Some(c @ ('?' | '$' | '!' | '#' | '@' | '*' | '-')) => {
                self.pos += 2;
                Ok(Some(WordPiece::Param(ParamExpansion::plain(c.to_string()))))
            }
            _ => {
                self.pos += 1;
                Ok(None)
            }
        }
    }

    /// Is `$((` arithmetic (both closers adjacent) rather than a command
    /// substitution holding a subshell?
    fn arith_parens_close_together(&self) -> bool {
        let mut depth = 2usize;
        let mut i = self.pos + 3;
        let mut in_single = false;
        let mut in_double = false;
        while let Some(&c) = self.chars.get(i) {
            if in_single {
                if c == '\'' {
                    in_single = false;
                }
            } else if in_double {
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == '"' {
                    in_double = false;
                }
            } else {
                match c {
                    '\'' => in_single = true,
                    '"' => in_double = true,
                    '\\' => {
                        i += 2;
                        continue;
                    }
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 1 {
                            return self.chars.get(i + 1) == Some(&')');
                        }
                    }
                    _ => {}
                }
            }
            i += 1;
        }
        false
    }

    fn arith_expansion(&mut self) -> Result<WordPiece, ParseError> {
        // Skip `$((`.
        self.pos += 3;
        let start = self.pos;
        let mut depth = 2usize;
        while let Some(c) = self.current() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let body: String = self.chars[start..self.pos - 1].iter().collect();
                        self.pos += 1;
                        let expr = arith::parse_arith(&body)
                            .map_err(|e| self.error(format!("arithmetic: {}", e)))?;
                        return Ok(WordPiece::ArithSub(expr));
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(self.error("unterminated arithmetic expansion"))
    }

    fn command_substitution(&mut self) -> Result<WordPiece, ParseError> {
        // Skip `$(`.
        self.pos += 2;
        let body = self.balanced_parens_interior()?;
        let script = parse(&body)?;
        Ok(WordPiece::CommandSub {
            script: Box::new(script),
            backquoted: false,
        })
    }

    fn process_substitution(&mut self) -> Result<WordPiece, ParseError> {
        let direction = if self.current() == Some('<') {
            ProcessSubDirection::In
        } else {
            ProcessSubDirection::Out
        };
        // Skip `<(` / `>(`.
        self.pos += 2;
        let body = self.balanced_parens_interior()?;
        let script = parse(&body)?;
        Ok(WordPiece::ProcessSub {
            script: Box::new(script),
            direction,
        })
    }

    /// Interior up to the matching `)`; `pos` is just past the opener.
    fn balanced_parens_interior(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let mut depth = 1usize;
        let mut in_single = false;
        let mut in_double = false;
        while let Some(c) = self.current() {
            if in_single {
                if c == '\'' {
                    in_single = false;
                }
                self.pos += 1;
                continue;
            }
            if in_double {
                if c == '\\' {
                    self.pos += 2;
                    continue;
                }
                if c == '"' {
                    in_double = false;
                }
                self.pos += 1;
                continue;
            }
            match c {
                '\'' => in_single = true,
                '"' => in_double = true,
                '\\' => {
                    self.pos += 2;
                    continue;
                }
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let body: String = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        return Ok(body);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(self.error("unterminated command substitution"))
    }

    /// Interior of `${…}`; `pos` is at the `$`.
    fn balanced_braces_interior(&mut self) -> Result<String, ParseError> {
        self.pos += 2; // skip `${`
        let start = self.pos;
        let mut depth = 1usize;
        let mut in_single = false;
        let mut in_double = false;
        while let Some(c) = self.current() {
            if in_single {
                if c == '\'' {
                    in_single = false;
                }
                self.pos += 1;
                continue;
            }
            if in_double {
                if c == '\\' {
                    self.pos += 2;
                    continue;
                }
                if c == '"' {
                    in_double = false;
                }
                self.pos += 1;
                continue;
            }
            match c {
                '\'' => in_single = true,
                '"' => in_double = true,
                '\\' => {
                    self.pos += 2;
                    continue;
                }
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let body: String = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        return Ok(body);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(self.error("unterminated parameter expansion"))
    }

    /// `$'…'` with the standard escape set decoded.
    fn ansi_c_quoted(&mut self) -> Result<WordPiece, ParseError> {
        self.pos += 1; // opening quote
        let mut value = String::new();
        while let Some(c) = self.current() {
            if c == '\'' {
                self.pos += 1;
                return Ok(WordPiece::SingleQuoted(value));
            }
            if c == '\\' {
                self.pos += 1;
                let decoded = match self.current() {
                    Some('n') => Some('\n'),
                    Some('t') => Some('\t'),
                    Some('r') => Some('\r'),
                    Some('a') => Some('\x07'),
                    Some('b') => Some('\x08'),
                    Some('e') | Some('E') => Some('\x1b'),
                    Some('f') => Some('\x0c'),
                    Some('v') => Some('\x0b'),
                    Some('\\') => Some('\\'),
                    Some('\'') => Some('\''),
                    Some('"') => Some('"'),
                    Some('x') => {
                        self.pos += 1;
                        let n = self.hex_digits(2);
                        value.push(char::from_u32(n).unwrap_or('\u{fffd}'));
                        continue;
                    }
                    Some('u') => {
                        self.pos += 1;
                        let n = self.hex_digits(4);
                        value.push(char::from_u32(n).unwrap_or('\u{fffd}'));
                        continue;
                    }
                    Some('U') => {
                        self.pos += 1;
                        let n = self.hex_digits(8);
                        value.push(char::from_u32(n).unwrap_or('\u{fffd}'));
                        continue;
                    }
                    Some('0'..='7') => {
                        let n = self.octal_digits(3);
                        value.push(char::from_u32(n).unwrap_or('\u{fffd}'));
                        continue;
                    }
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                        self.pos += 1;
                        continue;
                    }
                    None => {
                        value.push('\\');
                        continue;
                    }
                };
                if let Some(d) = decoded {
                    value.push(d);
                    self.pos += 1;
                }
                continue;
            }
            value.push(c);
            self.pos += 1;
        }
        Err(self.error("unterminated $'…' quote"))
    }

    fn hex_digits(&mut self, max: usize) -> u32 {
        let mut n = 0u32;
        let mut taken = 0;
        while taken < max {
            match self.current().and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    n = n * 16 + d;
                    self.pos += 1;
                    taken += 1;
                }
                None => break,
            }
        }
        n
    }

    fn octal_digits(&mut self, max: usize) -> u32 {
        let mut n = 0u32;
        let mut taken = 0;
        while taken < max {
            match self.current().and_then(|c| c.to_digit(8)) {
                Some(d) => {
                    n = n * 8 + d;
                    self.pos += 1;
                    taken += 1;
                }
                None => break,
            }
        }
        n
    }

    // =========================================================================
    // BRACE EXPANSION
    // =========================================================================

    /// Attempt to read `{…}` as brace expansion; leaves `pos` unchanged and
    /// returns `None` when the braces are literal.
    fn try_brace_expansion(&mut self) -> Result<Option<WordPiece>, ParseError> {
        let Some(end) = self.matching_brace(self.pos) else {
            return Ok(None);
        };
        let interior: String = self.chars[self.pos + 1..end].iter().collect();

        if let Some(item) = parse_brace_range(&interior) {
            self.pos = end + 1;
            return Ok(Some(WordPiece::Brace(BraceExpr { items: vec![item] })));
        }

        let Some(parts) = split_brace_alternatives(&interior) else {
            return Ok(None);
        };
        let mut items = Vec::with_capacity(parts.len());
        for part in parts {
            let word = parse_word(&part)?;
            items.push(BraceItem::Word(word));
        }
        self.pos = end + 1;
        Ok(Some(WordPiece::Brace(BraceExpr { items })))
    }

    /// Index of the `}` matching the `{` at `open`, quote- and nest-aware.
    fn matching_brace(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = open;
        let mut in_single = false;
        let mut in_double = false;
        while let Some(&c) = self.chars.get(i) {
            if in_single {
                if c == '\'' {
                    in_single = false;
                }
                i += 1;
                continue;
            }
            if in_double {
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
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        None
    }
}

fn flush(pieces: &mut Vec<WordPiece>, literal: &mut String) {
    if !literal.is_empty() {
        pieces.push(WordPiece::Literal(std::mem::take(literal)));
    }
}

/// `{1..5}`, `{a..e}`, `{1..10..2}`, `{01..10}`.
fn parse_brace_range(interior: &str) -> Option<BraceItem> {
    let parts: Vec<&str> = interior.split("..").collect();
    if parts.len() != 2 && parts.len() != 3 {
        return None;
    }
    let step = if parts.len() == 3 {
        parts[2].parse::<i64>().ok().filter(|s| *s != 0)?
    } else {
        1
    };

    if let (Ok(start), Ok(end)) = (parts[0].parse::<i64>(), parts[1].parse::<i64>()) {
        let pad = |s: &str| {
            let stripped = s.strip_prefix('-').unwrap_or(s);
            stripped.len() > 1 && stripped.starts_with('0')
        };
        let width = if pad(parts[0]) || pad(parts[1]) {
            parts[0]
                .trim_start_matches('-')
                .len()
                .max(parts[1].trim_start_matches('-').len())
        } else {
            0
        };
        return Some(BraceItem::NumericRange {
            start,
            end,
            step,
            width,
        });
    }

    let mut a = parts[0].chars();
    let mut b = parts[1].chars();
    match (a.next(), a.next(), b.next(), b.next()) {
        (Some(start), None, Some(end), None)
            if start.is_ascii_alphabetic() && end.is_ascii_alphabetic() =>
        {
            Some(BraceItem::CharRange { start, end, step })
        }
        _ => None,
    }
}

/// Split `a,b,c` on top-level commas. `None` when there is no unquoted
/// top-level comma (literal braces).
fn split_brace_alternatives(interior: &str) -> Option<Vec<String>> {
    let chars: Vec<char> = interior.chars().collect();
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_single = false;
    let mut in_double = false;
    let mut found_comma = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_single {
            current.push(c);
            if c == '\'' {
                in_single = false;
            }
            i += 1;
            continue;
        }
        if in_double {
            current.push(c);
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
                current.push(c);
                if let Some(&next) = chars.get(i + 1) {
                    current.push(next);
                }
                i += 2;
                continue;
            }
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                found_comma = true;
                parts.push(std::mem::take(&mut current));
                i += 1;
                continue;
            }
            _ => {}
        }
        current.push(c);
        i += 1;
    }
    parts.push(current);

    if found_comma {
        Some(parts)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_literal() {
        let w = parse_word("hello").unwrap();
        assert_eq!(w.pieces, vec![WordPiece::Literal("hello".into())]);
    }

    #[test]
    fn composite_quoting() {
        // "a"$b'c' is one word of three semantically distinct pieces.
        let w = parse_word("\"a\"$b'c'").unwrap();
        assert_eq!(w.pieces.len(), 3);
        assert!(matches!(&w.pieces[0], WordPiece::DoubleQuoted(inner)
            if inner == &vec![WordPiece::Literal("a".into())]));
        assert!(matches!(&w.pieces[1], WordPiece::Param(p) if p.name == "b"));
        assert!(matches!(&w.pieces[2], WordPiece::SingleQuoted(s) if s == "c"));
    }

    #[test]
    fn dollar_inside_double_quotes() {
        let w = parse_word("\"x $y z\"").unwrap();
        match &w.pieces[0] {
            WordPiece::DoubleQuoted(inner) => {
                assert_eq!(inner.len(), 3);
                assert!(matches!(&inner[1], WordPiece::Param(p) if p.name == "y"));
            }
            other => panic!("expected double-quoted piece, got {:?}", other),
        }
    }

    #[test]
    fn special_parameters() {
        for name in ["?", "$", "!", "#", "@", "*", "-", "0", "3"] {
            let w = parse_word(&format!("${}", name)).unwrap();
            assert!(
                matches!(&w.pieces[0], WordPiece::Param(p) if p.name == name),
                "failed for ${}",
                name
            );
        }
    }

    #[test]
    fn command_substitution() {
        let w = parse_word("$(echo hi)").unwrap();
        assert!(matches!(&w.pieces[0], WordPiece::CommandSub { backquoted: false, .. }));
    }

    #[test]
    fn backtick_substitution() {
        let w = parse_word("`echo hi`").unwrap();
        assert!(matches!(&w.pieces[0], WordPiece::CommandSub { backquoted: true, .. }));
    }

    #[test]
    fn arithmetic_expansion() {
        let w = parse_word("$((1+2))").unwrap();
        assert!(matches!(&w.pieces[0], WordPiece::ArithSub(_)));
    }

    #[test]
    fn arith_with_nested_parens() {
        let w = parse_word("$(( (1+2)*3 ))").unwrap();
        assert!(matches!(&w.pieces[0], WordPiece::ArithSub(_)));
    }

    #[test]
    fn dollar_dparen_subshell_is_command_sub() {
        let w = parse_word("$( (echo a) )").unwrap();
        assert!(matches!(&w.pieces[0], WordPiece::CommandSub { .. }));
    }

    #[test]
    fn process_substitution_direction() {
        let w = parse_word("<(echo hi)").unwrap();
        assert!(matches!(
            &w.pieces[0],
            WordPiece::ProcessSub { direction: ProcessSubDirection::In, .. }
        ));
        let w = parse_word(">(wc)").unwrap();
        assert!(matches!(
            &w.pieces[0],
            WordPiece::ProcessSub { direction: ProcessSubDirection::Out, .. }
        ));
    }

    #[test]
    fn ansi_c_escapes() {
        let w = parse_word("$'a\\tb\\n'").unwrap();
        assert!(matches!(&w.pieces[0], WordPiece::SingleQuoted(s) if s == "a\tb\n"));

        let w = parse_word("$'\\x41\\102'").unwrap();
        assert!(matches!(&w.pieces[0], WordPiece::SingleQuoted(s) if s == "AB"));

        let w = parse_word("$'\\u0041'").unwrap();
        assert!(matches!(&w.pieces[0], WordPiece::SingleQuoted(s) if s == "A"));
    }

    #[test]
    fn tilde_pieces() {
        let w = parse_word("~/bin").unwrap();
        assert!(matches!(&w.pieces[0], WordPiece::Tilde { user: None }));
        assert!(matches!(&w.pieces[1], WordPiece::Literal(s) if s == "/bin"));

        let w = parse_word("~alice/x").unwrap();
        assert!(matches!(&w.pieces[0], WordPiece::Tilde { user: Some(u) } if u == "alice"));
    }

    #[test]
    fn tilde_not_mid_word() {
        let w = parse_word("a~b").unwrap();
        assert_eq!(w.pieces, vec![WordPiece::Literal("a~b".into())]);
    }

    #[test]
    fn brace_alternation() {
        let w = parse_word("a{b,c}d").unwrap();
        assert_eq!(w.pieces.len(), 3);
        match &w.pieces[1] {
            WordPiece::Brace(b) => assert_eq!(b.items.len(), 2),
            other => panic!("expected brace piece, got {:?}", other),
        }
    }

    #[test]
    fn brace_numeric_range() {
        let w = parse_word("{1..5}").unwrap();
        match &w.pieces[0] {
            WordPiece::Brace(b) => assert_eq!(
                b.items[0],
                BraceItem::NumericRange { start: 1, end: 5, step: 1, width: 0 }
            ),
            other => panic!("expected brace piece, got {:?}", other),
        }
    }

    #[test]
    fn brace_padded_range() {
        let w = parse_word("{01..03}").unwrap();
        match &w.pieces[0] {
            WordPiece::Brace(b) => assert_eq!(
                b.items[0],
                BraceItem::NumericRange { start: 1, end: 3, step: 1, width: 2 }
            ),
            other => panic!("expected brace piece, got {:?}", other),
        }
    }

    #[test]
    fn unmatched_brace_is_literal() {
        let w = parse_word("{abc").unwrap();
        assert_eq!(w.pieces, vec![WordPiece::Literal("{abc".into())]);
    }

    #[test]
    fn brace_without_comma_is_literal() {
        let w = parse_word("{abc}").unwrap();
        assert_eq!(w.pieces, vec![WordPiece::Literal("{abc}".into())]);
    }

    #[test]
    fn heredoc_body_rules() {
        let w = parse_heredoc_body("line $x \"quote\" 'single'\n").unwrap();
        // Quotes stay literal in heredoc bodies; only $x is special.
        let has_param = w
            .pieces
            .iter()
            .any(|p| matches!(p, WordPiece::Param(p) if p.name == "x"));
        assert!(has_param);
        let text: String = w
            .pieces
            .iter()
            .filter_map(|p| match p {
                WordPiece::Literal(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        assert!(text.contains("\"quote\""));
        assert!(text.contains("'single'"));
    }

    #[test]
    fn escaped_dollar() {
        let w = parse_word("\\$x").unwrap();
        assert!(matches!(&w.pieces[0], WordPiece::Escaped(s) if s == "$"));
        assert!(matches!(&w.pieces[1], WordPiece::Literal(s) if s == "x"));
    }
}

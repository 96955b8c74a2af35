//! Lexer
//!
//! Turns input text into a stream of tokens ending with EOF. Handles
//! operator recognition (greedy, context-sensitive), quoting, positional
//! keyword tagging, fd-prefixed redirections, and here-document bodies.
//!
//! Three constructs are captured as raw interior text and handed to the
//! dedicated sub-parsers later: `(( … ))`, `[[ … ]]`, and here-doc bodies.

use crate::parser::types::LexError;
use lazy_static::lazy_static;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,
    Newline,

    // Separators
    Semi,   // ;
    Amp,    // &
    DSemi,  // ;;
    SemiAmp,  // ;&
    DSemiAmp, // ;;&

    // Logical / pipe
    Pipe,   // |
    AndAnd, // &&
    OrOr,   // ||
    Bang,   // !

    // Redirections
    Less,      // <
    Great,     // >
    DLess,     // <<
    DGreat,    // >>
    DLessDash, // <<-
    TLess,     // <<<
    LessAnd,   // <&
    GreatAnd,  // >&
    LessGreat, // <>
    Clobber,   // >|
    AndGreat,  // &>
    AndDGreat, // &>>

    // Grouping
    LParen,
    RParen,
    LBrace,
    RBrace,
    DLBracket, // [[
    DRBracket, // ]]
    DLParen,   // ((
    DRParen,   // ))

    // Reserved words (tagged positionally)
    If,
    Then,
    Else,
    Elif,
    Fi,
    While,
    Until,
    Do,
    Done,
    For,
    Case,
    Esac,
    In,
    Function,
    Select,
    Time,

    // Words
    Word,
    Number,         // digits directly before a redirection operator
    AssignmentWord, // NAME=… / NAME[idx]=… / NAME+=…

    // Collected here-document body
    HeredocBody,
}

impl TokenKind {
    pub fn is_word_like(self) -> bool {
        matches!(self, Self::Word | Self::Number | Self::AssignmentWord) || self.is_keyword()
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::If
                | Self::Then
                | Self::Else
                | Self::Elif
                | Self::Fi
                | Self::While
                | Self::Until
                | Self::Do
                | Self::Done
                | Self::For
                | Self::Case
                | Self::Esac
                | Self::In
                | Self::Function
                | Self::Select
                | Self::Time
        )
    }

    pub fn is_redirect(self) -> bool {
        matches!(
            self,
            Self::Less
                | Self::Great
                | Self::DLess
                | Self::DGreat
                | Self::DLessDash
                | Self::TLess
                | Self::LessAnd
                | Self::GreatAnd
                | Self::LessGreat
                | Self::Clobber
                | Self::AndGreat
                | Self::AndDGreat
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
    /// Any part of the word was quoted.
    pub quoted: bool,
    /// The word was one single-quoted string.
    pub single_quoted: bool,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, span: (usize, usize, usize, usize)) -> Self {
        let (start, end, line, column) = span;
        Self {
            kind,
            text: text.into(),
            start,
            end,
            line,
            column,
            quoted: false,
            single_quoted: false,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingHeredoc {
    delimiter: String,
    strip_tabs: bool,
    quoted: bool,
}

lazy_static! {
    static ref RESERVED_WORDS: HashMap<&'static str, TokenKind> = {
        let mut m = HashMap::new();
        m.insert("if", TokenKind::If);
        m.insert("then", TokenKind::Then);
        m.insert("else", TokenKind::Else);
        m.insert("elif", TokenKind::Elif);
        m.insert("fi", TokenKind::Fi);
        m.insert("while", TokenKind::While);
        m.insert("until", TokenKind::Until);
        m.insert("do", TokenKind::Do);
        m.insert("done", TokenKind::Done);
        m.insert("for", TokenKind::For);
        m.insert("case", TokenKind::Case);
        m.insert("esac", TokenKind::Esac);
        m.insert("function", TokenKind::Function);
        m.insert("select", TokenKind::Select);
        m.insert("time", TokenKind::Time);
        m
    };
}

/// Three-character operators, longest match first. `<<-` is recognized
/// separately so the heredoc delimiter gets registered.
const THREE_CHAR_OPS: &[(&str, TokenKind)] = &[
    (";;&", TokenKind::DSemiAmp),
    ("<<<", TokenKind::TLess),
    ("&>>", TokenKind::AndDGreat),
];

const TWO_CHAR_OPS: &[(&str, TokenKind)] = &[
    ("&&", TokenKind::AndAnd),
    ("||", TokenKind::OrOr),
    (";;", TokenKind::DSemi),
    (";&", TokenKind::SemiAmp),
    ("<<", TokenKind::DLess),
    (">>", TokenKind::DGreat),
    ("<&", TokenKind::LessAnd),
    (">&", TokenKind::GreatAnd),
    ("<>", TokenKind::LessGreat),
    (">|", TokenKind::Clobber),
    ("&>", TokenKind::AndGreat),
];

fn is_word_boundary(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | ';' | '&' | '|' | '(' | ')' | '<' | '>')
}

/// Valid variable name: letter or underscore, then alphanumerics.
pub fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Does raw word text have the shape of an assignment (`NAME=`, `NAME+=`,
/// `NAME[idx]=`)? Returns the index of the `=` if so.
pub fn assignment_eq_index(s: &str) -> Option<usize> {
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    // Name
    match chars.first() {
        Some(c) if c.is_ascii_alphabetic() || *c == '_' => i += 1,
        _ => return None,
    }
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    // Optional balanced subscript
    if chars.get(i) == Some(&'[') {
        let mut depth = 0;
        while i < chars.len() {
            match chars[i] {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        i += 1;
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        if depth != 0 {
            return None;
        }
    }
    if chars.get(i) == Some(&'+') && chars.get(i + 1) == Some(&'=') {
        return Some(i + 1);
    }
    if chars.get(i) == Some(&'=') {
        return Some(i);
    }
    None
}

pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    pending_heredocs: Vec<PendingHeredoc>,
    /// Next word begins a command (keyword tagging applies).
    at_command_start: bool,
    last_kind: Option<TokenKind>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            pending_heredocs: Vec::new(),
            at_command_start: true,
            last_kind: None,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        while self.pos < self.input.len() {
            if !self.pending_heredocs.is_empty()
                && self.tokens.last().map(|t| t.kind) == Some(TokenKind::Newline)
            {
                self.read_heredoc_bodies()?;
                continue;
            }

            self.skip_blank();
            if self.current() == Some('#') {
                while let Some(c) = self.current() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
                continue;
            }
            if self.pos >= self.input.len() {
                break;
            }

            let token = self.next_token()?;
            self.update_command_start(&token);
            self.tokens.push(token);
        }

        if !self.pending_heredocs.is_empty() {
            // Trailing `cmd <<EOF` with no newline yet.
            if self.tokens.last().map(|t| t.kind) == Some(TokenKind::Newline) {
                self.read_heredoc_bodies()?;
            } else {
                return Err(LexError::incomplete(
                    format!(
                        "here-document delimited by `{}' not terminated",
                        self.pending_heredocs[0].delimiter
                    ),
                    self.line,
                    self.column,
                ));
            }
        }

        self.tokens.push(Token::new(
            TokenKind::Eof,
            "",
            (self.pos, self.pos, self.line, self.column),
        ));
        Ok(self.tokens)
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.current();
        if let Some(c) = c {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        c
    }

    fn skip_blank(&mut self) {
        while matches!(self.current(), Some(' ' | '\t')) {
            self.bump();
        }
    }

    fn update_command_start(&mut self, token: &Token) {
        self.last_kind = Some(token.kind);
        self.at_command_start = matches!(
            token.kind,
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
    }

    fn span_from(&self, start: usize, line: usize, column: usize) -> (usize, usize, usize, usize) {
        (start, self.pos, line, column)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let (start, line, column) = (self.pos, self.line, self.column);
        let c0 = self.current().unwrap();
        let c1 = self.peek(1);
        let c2 = self.peek(2);

        if c0 == '\n' {
            self.bump();
            return Ok(Token::new(
                TokenKind::Newline,
                "\n",
                self.span_from(start, line, column),
            ));
        }

        // `[[ … ]]` captured raw; operators inside are not shell operators.
        if c0 == '[' && c1 == Some('[') && self.at_command_start {
            let boundary_after = self.peek(2).map_or(true, is_word_boundary);
            if boundary_after {
                return self.read_cond_tokens(start, line, column);
            }
        }

        // `(( … ))` arithmetic command, captured raw. Also after `for`,
        // where it opens the C-style header.
        if c0 == '(' && c1 == Some('(') && (self.at_command_start || self.last_kind == Some(TokenKind::For))
        {
            if let Some(interior_end) = self.scan_arith_command(self.pos + 2) {
                return self.read_arith_tokens(interior_end, start, line, column);
            }
            // Falls through: nested subshell `((…) …)`.
        }

        // Heredoc operators register the delimiter before the operator token
        // is emitted.
        if c0 == '<' && c1 == Some('<') && c2 == Some('-') {
            self.bump();
            self.bump();
            self.bump();
            self.register_heredoc(true)?;
            return Ok(Token::new(
                TokenKind::DLessDash,
                "<<-",
                self.span_from(start, line, column),
            ));
        }
        if c0 == '<' && c1 == Some('<') && c2 != Some('<') {
            self.bump();
            self.bump();
            self.register_heredoc(false)?;
            return Ok(Token::new(
                TokenKind::DLess,
                "<<",
                self.span_from(start, line, column),
            ));
        }

        // Process substitution begins a word.
        if (c0 == '<' || c0 == '>') && c1 == Some('(') {
            return self.read_word(start, line, column);
        }

        for (text, kind) in THREE_CHAR_OPS {
            let mut it = text.chars();
            if c0 == it.next().unwrap() && c1 == it.next() && c2 == it.next() {
                self.bump();
                self.bump();
                self.bump();
                return Ok(Token::new(*kind, *text, self.span_from(start, line, column)));
            }
        }

        for (text, kind) in TWO_CHAR_OPS {
            let mut it = text.chars();
            if c0 == it.next().unwrap() && c1 == it.next() {
                self.bump();
                self.bump();
                return Ok(Token::new(*kind, *text, self.span_from(start, line, column)));
            }
        }

        match c0 {
            '|' | '&' | ';' | '(' | ')' | '<' | '>' => {
                self.bump();
                let kind = match c0 {
                    '|' => TokenKind::Pipe,
                    '&' => TokenKind::Amp,
                    ';' => TokenKind::Semi,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '<' => TokenKind::Less,
                    _ => TokenKind::Great,
                };
                return Ok(Token::new(
                    kind,
                    c0.to_string(),
                    self.span_from(start, line, column),
                ));
            }
            '{' => {
                // `{` opens a group only when followed by blank space.
                if matches!(c1, Some(' ' | '\t' | '\n') | None) {
                    self.bump();
                    return Ok(Token::new(
                        TokenKind::LBrace,
                        "{",
                        self.span_from(start, line, column),
                    ));
                }
            }
            '}' => {
                // Reserved word only at command position; `echo }` is a word.
                if self.at_command_start {
                    self.bump();
                    return Ok(Token::new(
                        TokenKind::RBrace,
                        "}",
                        self.span_from(start, line, column),
                    ));
                }
            }
            '!' => {
                if matches!(c1, Some(' ' | '\t' | '\n' | '(') | None) {
                    self.bump();
                    return Ok(Token::new(
                        TokenKind::Bang,
                        "!",
                        self.span_from(start, line, column),
                    ));
                }
            }
            _ => {}
        }

        // Digits directly before a redirection operator are an fd prefix.
        if c0.is_ascii_digit() {
            let mut end = self.pos;
            while end < self.input.len() && self.input[end].is_ascii_digit() {
                end += 1;
            }
            if matches!(self.input.get(end), Some('<' | '>')) {
                let text: String = self.input[self.pos..end].iter().collect();
                while self.pos < end {
                    self.bump();
                }
                return Ok(Token::new(
                    TokenKind::Number,
                    text,
                    self.span_from(start, line, column),
                ));
            }
        }

        self.read_word(start, line, column)
    }

    // =========================================================================
    // WORDS
    // =========================================================================

    fn read_word(&mut self, start: usize, line: usize, column: usize) -> Result<Token, LexError> {
        let mut quote_seen = false;

        while let Some(c) = self.current() {
            match c {
                '\'' => {
                    quote_seen = true;
                    self.consume_single_quoted(line, column)?;
                }
                '"' => {
                    quote_seen = true;
                    self.consume_double_quoted(line, column)?;
                }
                '\\' => {
                    self.bump();
                    if self.current().is_some() {
                        self.bump();
                    }
                }
                '`' => {
                    self.consume_backquoted(line, column)?;
                }
                '$' => match self.peek(1) {
                    Some('\'') => {
                        quote_seen = true;
                        self.bump();
                        self.consume_single_quoted_ansi(line, column)?;
                    }
                    Some('"') => {
                        quote_seen = true;
                        self.bump();
                        self.consume_double_quoted(line, column)?;
                    }
                    Some('(') => {
                        self.bump();
                        self.consume_balanced_parens(line, column)?;
                    }
                    Some('{') => {
                        self.bump();
                        self.consume_balanced_braces(line, column)?;
                    }
                    _ => {
                        self.bump();
                    }
                },
                '<' | '>' if self.peek(1) == Some('(') => {
                    // Process substitution continues the word.
                    self.bump();
                    self.consume_balanced_parens(line, column)?;
                }
                c if is_word_boundary(c) => break,
                _ => {
                    self.bump();
                }
            }
        }

        let text: String = self.input[start..self.pos].iter().collect();
        let single_quoted = text.len() >= 2
            && text.starts_with('\'')
            && text.ends_with('\'')
            && !text[1..text.len() - 1].contains('\'');

        let mut kind = TokenKind::Word;
        if !quote_seen && self.at_command_start {
            if let Some(&keyword) = RESERVED_WORDS.get(text.as_str()) {
                kind = keyword;
            }
        }
        // Assignment shape: only the part before `=` must be unquoted.
        if kind == TokenKind::Word {
            if let Some(eq) = assignment_eq_index(&text) {
                if !text[..eq].contains('\'') && !text[..eq].contains('"') {
                    kind = TokenKind::AssignmentWord;
                }
            }
        }

        let mut token = Token::new(kind, text, self.span_from(start, line, column));
        token.quoted = quote_seen;
        token.single_quoted = single_quoted;
        Ok(token)
    }

    /// `'…'` including the quotes.
    fn consume_single_quoted(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        self.bump(); // opening quote
        loop {
            match self.current() {
                Some('\'') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    return Err(LexError::incomplete(
                        "unexpected EOF while looking for matching `''",
                        line,
                        column,
                    ))
                }
            }
        }
    }

    /// `$'…'` with backslash escapes; the `$` was already consumed.
    fn consume_single_quoted_ansi(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        self.bump(); // opening quote
        loop {
            match self.current() {
                Some('\'') => {
                    self.bump();
                    return Ok(());
                }
                Some('\\') => {
                    self.bump();
                    if self.current().is_some() {
                        self.bump();
                    }
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    return Err(LexError::incomplete(
                        "unexpected EOF while looking for matching `''",
                        line,
                        column,
                    ))
                }
            }
        }
    }

    /// `"…"` including the quotes; `$(…)`, `${…}` and backticks inside are
    /// consumed with balance so an inner `"` does not close the string.
    fn consume_double_quoted(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        self.bump(); // opening quote
        loop {
            match self.current() {
                Some('"') => {
                    self.bump();
                    return Ok(());
                }
                Some('\\') => {
                    self.bump();
                    if self.current().is_some() {
                        self.bump();
                    }
                }
                Some('$') => match self.peek(1) {
                    Some('(') => {
                        self.bump();
                        self.consume_balanced_parens(line, column)?;
                    }
                    Some('{') => {
                        self.bump();
                        self.consume_balanced_braces(line, column)?;
                    }
                    _ => {
                        self.bump();
                    }
                },
                Some('`') => {
                    self.consume_backquoted(line, column)?;
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    return Err(LexError::incomplete(
                        "unexpected EOF while looking for matching `\"'",
                        line,
                        column,
                    ))
                }
            }
        }
    }

    /// `` `…` `` including the backticks.
    fn consume_backquoted(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        self.bump(); // opening backtick
        loop {
            match self.current() {
                Some('`') => {
                    self.bump();
                    return Ok(());
                }
                Some('\\') => {
                    self.bump();
                    if self.current().is_some() {
                        self.bump();
                    }
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    return Err(LexError::incomplete(
                        "unexpected EOF while looking for matching ``'",
                        line,
                        column,
                    ))
                }
            }
        }
    }

    /// `(…)` with nesting and quote awareness; current char is the `(`.
    fn consume_balanced_parens(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        let mut depth = 0usize;
        loop {
            match self.current() {
                Some('(') => {
                    depth += 1;
                    self.bump();
                }
                Some(')') => {
                    depth -= 1;
                    self.bump();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some('\'') => self.consume_single_quoted(line, column)?,
                Some('"') => self.consume_double_quoted(line, column)?,
                Some('`') => self.consume_backquoted(line, column)?,
                Some('\\') => {
                    self.bump();
                    if self.current().is_some() {
                        self.bump();
                    }
                }
                Some('#') => {
                    // Comment inside command substitution.
                    while let Some(c) = self.current() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    return Err(LexError::incomplete(
                        "unexpected EOF while looking for matching `)'",
                        line,
                        column,
                    ))
                }
            }
        }
    }

    /// `{…}` with nesting and quote awareness; current char is the `{`.
    fn consume_balanced_braces(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        let mut depth = 0usize;
        loop {
            match self.current() {
                Some('{') => {
                    depth += 1;
                    self.bump();
                }
                Some('}') => {
                    depth -= 1;
                    self.bump();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some('\'') => self.consume_single_quoted(line, column)?,
                Some('"') => self.consume_double_quoted(line, column)?,
                Some('\\') => {
                    self.bump();
                    if self.current().is_some() {
                        self.bump();
                    }
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    return Err(LexError::incomplete(
                        "unexpected EOF while looking for matching `}'",
                        line,
                        column,
                    ))
                }
            }
        }
    }

    // =========================================================================
    // RAW-INTERIOR CONSTRUCTS
    // =========================================================================

    /// Decide whether `((` at command position opens an arithmetic command.
    /// Returns the interior end position (index of the first of the two
    /// closing parens) if so. A close where the final parens are not
    /// adjacent (`(… ) )`) is a nested subshell instead.
    fn scan_arith_command(&self, from: usize) -> Option<usize> {
        let mut depth = 2usize;
        let mut i = from;
        let mut in_single = false;
        let mut in_double = false;
        while i < self.input.len() {
            let c = self.input[i];
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
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 1 {
                        // Arithmetic only if the outer closer follows
                        // immediately.
                        if self.input.get(i + 1) == Some(&')') {
                            return Some(i);
                        }
                        return None;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        None
    }

    /// Emit DLParen, the raw interior as a Word, and DRParen.
    fn read_arith_tokens(
        &mut self,
        interior_end: usize,
        start: usize,
        line: usize,
        column: usize,
    ) -> Result<Token, LexError> {
        self.bump();
        self.bump();
        let open = Token::new(TokenKind::DLParen, "((", self.span_from(start, line, column));

        let (istart, iline, icolumn) = (self.pos, self.line, self.column);
        while self.pos < interior_end {
            self.bump();
        }
        let interior: String = self.input[istart..interior_end].iter().collect();
        let word = Token::new(
            TokenKind::Word,
            interior,
            self.span_from(istart, iline, icolumn),
        );

        let (cstart, cline, ccolumn) = (self.pos, self.line, self.column);
        self.bump();
        self.bump();
        let close = Token::new(TokenKind::DRParen, "))", self.span_from(cstart, cline, ccolumn));

        self.tokens.push(open.clone());
        self.update_command_start(&word);
        self.tokens.push(word);
        Ok(close)
    }

    /// Emit DLBracket, the raw interior as a Word, and DRBracket.
    fn read_cond_tokens(
        &mut self,
        start: usize,
        line: usize,
        column: usize,
    ) -> Result<Token, LexError> {
        self.bump();
        self.bump();
        let open = Token::new(
            TokenKind::DLBracket,
            "[[",
            self.span_from(start, line, column),
        );

        let (istart, iline, icolumn) = (self.pos, self.line, self.column);
        let mut in_single = false;
        let mut in_double = false;
        let interior_end;
        loop {
            match self.current() {
                None => {
                    return Err(LexError::incomplete(
                        "unexpected EOF while looking for matching `]]'",
                        line,
                        column,
                    ))
                }
                Some('\'') if !in_double => {
                    in_single = !in_single;
                    self.bump();
                }
                Some('"') if !in_single => {
                    in_double = !in_double;
                    self.bump();
                }
                Some('\\') if !in_single => {
                    self.bump();
                    if self.current().is_some() {
                        self.bump();
                    }
                }
                Some(']') if !in_single && !in_double && self.peek(1) == Some(']') => {
                    interior_end = self.pos;
                    break;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let interior: String = self.input[istart..interior_end].iter().collect();
        let word = Token::new(
            TokenKind::Word,
            interior,
            (istart, interior_end, iline, icolumn),
        );

        let (cstart, cline, ccolumn) = (self.pos, self.line, self.column);
        self.bump();
        self.bump();
        let close = Token::new(
            TokenKind::DRBracket,
            "]]",
            self.span_from(cstart, cline, ccolumn),
        );

        self.tokens.push(open);
        self.tokens.push(word);
        Ok(close)
    }

    // =========================================================================
    // HERE-DOCUMENTS
    // =========================================================================

    /// After `<<` / `<<-`: look ahead (without consuming) for the delimiter
    /// word and queue body collection for after the next newline.
    fn register_heredoc(&mut self, strip_tabs: bool) -> Result<(), LexError> {
        let mut i = self.pos;
        while matches!(self.input.get(i), Some(' ' | '\t')) {
            i += 1;
        }

        let mut delimiter = String::new();
        let mut quoted = false;
        while let Some(&c) = self.input.get(i) {
            match c {
                '\'' => {
                    quoted = true;
                    i += 1;
                    while let Some(&q) = self.input.get(i) {
                        if q == '\'' {
                            i += 1;
                            break;
                        }
                        delimiter.push(q);
                        i += 1;
                    }
                }
                '"' => {
                    quoted = true;
                    i += 1;
                    while let Some(&q) = self.input.get(i) {
                        if q == '"' {
                            i += 1;
                            break;
                        }
                        delimiter.push(q);
                        i += 1;
                    }
                }
                '\\' => {
                    quoted = true;
                    i += 1;
                    if let Some(&q) = self.input.get(i) {
                        delimiter.push(q);
                        i += 1;
                    }
                }
                c if is_word_boundary(c) => break,
                c => {
                    delimiter.push(c);
                    i += 1;
                }
            }
        }

        if delimiter.is_empty() {
            return Err(LexError::new(
                "syntax error near unexpected token `newline'",
                self.line,
                self.column,
            ));
        }

        self.pending_heredocs.push(PendingHeredoc {
            delimiter,
            strip_tabs,
            quoted,
        });
        Ok(())
    }

    /// Consume pending here-doc bodies line by line; emits one HeredocBody
    /// token per pending entry, in registration order.
    fn read_heredoc_bodies(&mut self) -> Result<(), LexError> {
        let pending = std::mem::take(&mut self.pending_heredocs);
        for heredoc in pending {
            let (start, line, column) = (self.pos, self.line, self.column);
            let mut body = String::new();
            let mut terminated = false;

            while self.pos < self.input.len() {
                let line_start = self.pos;
                while self.pos < self.input.len() && self.input[self.pos] != '\n' {
                    self.bump();
                }
                let mut text: String = self.input[line_start..self.pos].iter().collect();
                let has_newline = self.current() == Some('\n');
                if has_newline {
                    self.bump();
                }

                let candidate = if heredoc.strip_tabs {
                    text.trim_start_matches('\t').to_string()
                } else {
                    text.clone()
                };
                if candidate == heredoc.delimiter {
                    terminated = true;
                    break;
                }

                if heredoc.strip_tabs {
                    text = text.trim_start_matches('\t').to_string();
                }
                body.push_str(&text);
                body.push('\n');
            }

            if !terminated {
                return Err(LexError::incomplete(
                    format!(
                        "here-document delimited by `{}' not terminated",
                        heredoc.delimiter
                    ),
                    line,
                    column,
                ));
            }

            let mut token = Token::new(
                TokenKind::HeredocBody,
                body,
                (start, self.pos, line, column),
            );
            token.quoted = heredoc.quoted;
            self.tokens.push(token);
        }
        Ok(())
    }
}

/// Convenience wrapper.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn simple_command() {
        assert_eq!(
            kinds("echo hello"),
            vec![TokenKind::Word, TokenKind::Word, TokenKind::Eof]
        );
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("a && b || c | d ; e &"),
            vec![
                TokenKind::Word,
                TokenKind::AndAnd,
                TokenKind::Word,
                TokenKind::OrOr,
                TokenKind::Word,
                TokenKind::Pipe,
                TokenKind::Word,
                TokenKind::Semi,
                TokenKind::Word,
                TokenKind::Amp,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn keywords_only_at_command_position() {
        let toks = tokenize("if true; then echo if; fi").unwrap();
        assert_eq!(toks[0].kind, TokenKind::If);
        // `if` after `echo` stays a word
        let word_if = toks.iter().filter(|t| t.text == "if").nth(1).unwrap();
        assert_eq!(word_if.kind, TokenKind::Word);
        assert_eq!(toks.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn keyword_like_assignment_stays_word() {
        let toks = tokenize("echo if=1").unwrap();
        assert_eq!(toks[1].kind, TokenKind::AssignmentWord);
        assert_eq!(toks[1].text, "if=1");
    }

    #[test]
    fn redirection_fd_prefix() {
        let toks = tokenize("cmd 2>&1").unwrap();
        assert_eq!(toks[1].kind, TokenKind::Number);
        assert_eq!(toks[1].text, "2");
        assert_eq!(toks[2].kind, TokenKind::GreatAnd);
        assert_eq!(toks[3].kind, TokenKind::Word);
        assert_eq!(toks[3].text, "1");
    }

    #[test]
    fn digits_without_redirect_are_a_word() {
        let toks = tokenize("echo 21").unwrap();
        assert_eq!(toks[1].kind, TokenKind::Word);
        assert_eq!(toks[1].text, "21");
    }

    #[test]
    fn quoted_word_flags() {
        let toks = tokenize("echo 'single' \"double\"").unwrap();
        assert!(toks[1].quoted);
        assert!(toks[1].single_quoted);
        assert!(toks[2].quoted);
        assert!(!toks[2].single_quoted);
    }

    #[test]
    fn unterminated_quote_is_incomplete() {
        let err = tokenize("echo 'open").unwrap_err();
        assert!(err.incomplete);
    }

    #[test]
    fn command_substitution_stays_in_word() {
        let toks = tokenize("echo $(ls; pwd)").unwrap();
        assert_eq!(toks[1].kind, TokenKind::Word);
        assert_eq!(toks[1].text, "$(ls; pwd)");
    }

    #[test]
    fn arith_expansion_with_shift_stays_in_word() {
        let toks = tokenize("echo $((x<<2))").unwrap();
        assert_eq!(toks[1].kind, TokenKind::Word);
        assert_eq!(toks[1].text, "$((x<<2))");
        assert_eq!(toks[2].kind, TokenKind::Eof);
    }

    #[test]
    fn arith_command_captured_raw() {
        let toks = tokenize("((x < 3 && y >> 1))").unwrap();
        assert_eq!(toks[0].kind, TokenKind::DLParen);
        assert_eq!(toks[1].kind, TokenKind::Word);
        assert_eq!(toks[1].text, "x < 3 && y >> 1");
        assert_eq!(toks[2].kind, TokenKind::DRParen);
    }

    #[test]
    fn nested_subshells_not_arithmetic() {
        let toks = tokenize("((echo a) )").unwrap();
        assert_eq!(toks[0].kind, TokenKind::LParen);
        assert_eq!(toks[1].kind, TokenKind::LParen);
    }

    #[test]
    fn cond_command_captured_raw() {
        let toks = tokenize("[[ $x == a* || -f /etc ]]").unwrap();
        assert_eq!(toks[0].kind, TokenKind::DLBracket);
        assert_eq!(toks[1].kind, TokenKind::Word);
        assert_eq!(toks[1].text.trim(), "$x == a* || -f /etc");
        assert_eq!(toks[2].kind, TokenKind::DRBracket);
    }

    #[test]
    fn heredoc_body_collection() {
        let toks = tokenize("cat <<EOF\nhello\nworld\nEOF\n").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Word);
        assert_eq!(toks[1].kind, TokenKind::DLess);
        assert_eq!(toks[2].kind, TokenKind::Word); // delimiter word
        assert_eq!(toks[3].kind, TokenKind::Newline);
        assert_eq!(toks[4].kind, TokenKind::HeredocBody);
        assert_eq!(toks[4].text, "hello\nworld\n");
        assert!(!toks[4].quoted);
    }

    #[test]
    fn heredoc_quoted_delimiter() {
        let toks = tokenize("cat <<'EOF'\n$x\nEOF\n").unwrap();
        let body = toks.iter().find(|t| t.kind == TokenKind::HeredocBody).unwrap();
        assert!(body.quoted);
        assert_eq!(body.text, "$x\n");
    }

    #[test]
    fn heredoc_dash_strips_tabs() {
        let toks = tokenize("cat <<-EOF\n\thello\n\tEOF\n").unwrap();
        let body = toks.iter().find(|t| t.kind == TokenKind::HeredocBody).unwrap();
        assert_eq!(body.text, "hello\n");
    }

    #[test]
    fn unterminated_heredoc_is_incomplete() {
        let err = tokenize("cat <<EOF\nhello\n").unwrap_err();
        assert!(err.incomplete);
    }

    #[test]
    fn process_substitution_is_one_word() {
        let toks = tokenize("cat <(echo hi) >(wc -l)").unwrap();
        assert_eq!(toks[1].kind, TokenKind::Word);
        assert_eq!(toks[1].text, "<(echo hi)");
        assert_eq!(toks[2].kind, TokenKind::Word);
        assert_eq!(toks[2].text, ">(wc -l)");
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("echo a # trailing\necho b"),
            vec![
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Newline,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn brace_group_tokens() {
        assert_eq!(
            kinds("{ echo a; }"),
            vec![
                TokenKind::LBrace,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Semi,
                TokenKind::RBrace,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn brace_expansion_stays_in_word() {
        let toks = tokenize("echo a{b,c}d").unwrap();
        assert_eq!(toks[1].kind, TokenKind::Word);
        assert_eq!(toks[1].text, "a{b,c}d");
    }

    #[test]
    fn assignment_word_shapes() {
        assert_eq!(assignment_eq_index("x=1"), Some(1));
        assert_eq!(assignment_eq_index("x+=1"), Some(2));
        assert_eq!(assignment_eq_index("arr[2]=v"), Some(6));
        assert_eq!(assignment_eq_index("1x=1"), None);
        assert_eq!(assignment_eq_index("x"), None);
    }
}

//! Recursive descent parser
//!
//! Consumes the token stream and produces a `Script`. Grammar, abbreviated:
//!
//! ```text
//! program    ::= list? EOF
//! list       ::= statement (sep statement)*
//! statement  ::= pipeline (('&&'|'||') pipeline)* [';'|'&']
//! pipeline   ::= ['!'] ['time'] command ('|' command)*
//! command    ::= simple | compound | funcdef
//! simple     ::= assignment* (word | redirect)+
//! ```
//!
//! Compound commands live in `compound.rs`; this file owns the spine and
//! simple-command / redirection parsing.

use crate::ast::types::*;
use crate::parser::lexer::{self, Token, TokenKind};
use crate::parser::types::{ParseError, MAX_INPUT_SIZE, MAX_PARSE_DEPTH, MAX_TOKENS};
use crate::parser::word::{parse_heredoc_body, parse_word};
use std::collections::VecDeque;

/// Parse a complete program.
pub fn parse(input: &str) -> Result<Script, ParseError> {
    Parser::new().parse(input)
}

pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) depth: usize,
    pub(crate) input: String,
    /// Here-doc bodies in operator order, collected out of the token stream
    /// before parsing begins.
    pub(crate) heredoc_bodies: VecDeque<Token>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            tokens: Vec::new(),
            pos: 0,
            depth: 0,
            input: String::new(),
            heredoc_bodies: VecDeque::new(),
        }
    }

    pub fn parse(&mut self, input: &str) -> Result<Script, ParseError> {
        if input.len() > MAX_INPUT_SIZE {
            return Err(ParseError::new(
                format!("input too large: {} bytes", input.len()),
                1,
                1,
            ));
        }

        let tokens = lexer::tokenize(input)?;
        if tokens.len() > MAX_TOKENS {
            return Err(ParseError::new(
                format!("too many tokens: {}", tokens.len()),
                1,
                1,
            ));
        }
        self.prepare(input, tokens);
        self.parse_script()
    }

    /// Parse a pre-tokenized stream (used after alias expansion).
    pub fn parse_tokens(&mut self, input: &str, tokens: Vec<Token>) -> Result<Script, ParseError> {
        self.prepare(input, tokens);
        self.parse_script()
    }

    fn prepare(&mut self, input: &str, tokens: Vec<Token>) {
        self.input = input.to_string();
        // Lift here-doc bodies out of the stream; parse_redirect pops them
        // in the same order the operators were seen.
        let mut bodies = VecDeque::new();
        let mut rest = Vec::with_capacity(tokens.len());
        for tok in tokens {
            if tok.kind == TokenKind::HeredocBody {
                bodies.push_back(tok);
            } else {
                rest.push(tok);
            }
        }
        if rest.is_empty() {
            rest.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                start: 0,
                end: 0,
                line: 1,
                column: 1,
                quoted: false,
                single_quoted: false,
            });
        }
        self.tokens = rest;
        self.heredoc_bodies = bodies;
        self.pos = 0;
        self.depth = 0;
    }

    // =========================================================================
    // TOKEN HELPERS
    // =========================================================================

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    pub(crate) fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        } else {
            self.pos = self.tokens.len() - 1;
        }
        tok
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    /// Error at the current token; EOF marks the statement as completable
    /// with more input.
    pub(crate) fn unexpected(&self, what: &str) -> ParseError {
        let tok = self.current();
        let err = if tok.kind == TokenKind::Eof {
            ParseError::at_token(format!("unexpected end of input, expected {}", what), tok)
        } else {
            ParseError::at_token(
                format!("unexpected token `{}', expected {}", tok.text, what),
                tok,
            )
        };
        if tok.kind == TokenKind::Eof {
            err.mark_incomplete()
        } else {
            err
        }
    }

    pub(crate) fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            return Err(ParseError::new("maximum nesting depth exceeded", 1, 1));
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }

    pub(crate) fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    /// True at a token that can begin a command.
    pub(crate) fn at_command_start(&self) -> bool {
        let kind = self.current().kind;
        kind.is_word_like()
            || matches!(
                kind,
                TokenKind::LParen
                    | TokenKind::LBrace
                    | TokenKind::DLParen
                    | TokenKind::DLBracket
                    | TokenKind::Bang
                    | TokenKind::Function
            )
            || kind.is_redirect()
    }

    pub(crate) fn at_statement_end(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Eof
                | TokenKind::Newline
                | TokenKind::Semi
                | TokenKind::Amp
                | TokenKind::AndAnd
                | TokenKind::OrOr
                | TokenKind::Pipe
                | TokenKind::RParen
                | TokenKind::RBrace
                | TokenKind::DSemi
                | TokenKind::SemiAmp
                | TokenKind::DSemiAmp
        )
    }

    // =========================================================================
    // PROGRAM STRUCTURE
    // =========================================================================

    fn parse_script(&mut self) -> Result<Script, ParseError> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::Eof) {
            if !self.at_command_start() {
                return Err(self.unexpected("a command"));
            }
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(Script::new(statements))
    }

    /// Statements for a compound body, up to (not consuming) a terminator.
    pub(crate) fn parse_statement_list(
        &mut self,
        terminators: &[TokenKind],
    ) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            if terminators.contains(&self.current().kind) || self.check(TokenKind::Eof) {
                break;
            }
            // `;;`-family terminators end case bodies without being listed.
            if matches!(
                self.current().kind,
                TokenKind::DSemi | TokenKind::SemiAmp | TokenKind::DSemiAmp
            ) {
                break;
            }
            if !self.at_command_start() {
                return Err(self.unexpected("a command"));
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    pub(crate) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let start_offset = self.current().start;
        let mut pipelines = vec![self.parse_pipeline()?];
        let mut operators = Vec::new();

        loop {
            let op = match self.current().kind {
                TokenKind::AndAnd => AndOrOp::And,
                TokenKind::OrOr => AndOrOp::Or,
                _ => break,
            };
            self.advance();
            self.skip_newlines();
            operators.push(op);
            pipelines.push(self.parse_pipeline()?);
        }

        let mut background = false;
        match self.current().kind {
            TokenKind::Semi => {
                self.advance();
            }
            TokenKind::Amp => {
                self.advance();
                background = true;
            }
            _ => {}
        }

        let end_offset = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.end)
            .unwrap_or(start_offset);
        let source = self
            .input
            .char_indices()
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        // Token offsets are char indices; recover the byte range. Alias
        // expansion splices tokens with offsets into the alias value, so
        // anything out of range just loses its source text.
        let source_text = if start_offset < end_offset && end_offset <= source.len() {
            let byte_start = source.get(start_offset).copied().unwrap_or(0);
            let byte_end = source
                .get(end_offset)
                .copied()
                .unwrap_or(self.input.len());
            if byte_start <= byte_end {
                Some(self.input[byte_start..byte_end].trim().to_string())
            } else {
                None
            }
        } else {
            None
        };

        Ok(Statement {
            pipelines,
            operators,
            background,
            source: source_text,
        })
    }

    fn parse_pipeline(&mut self) -> Result<Pipeline, ParseError> {
        self.enter()?;
        let result = self.parse_pipeline_inner();
        self.leave();
        result
    }

    fn parse_pipeline_inner(&mut self) -> Result<Pipeline, ParseError> {
        let mut negated = false;
        let mut timed = false;
        let mut time_posix = false;

        loop {
            if self.check(TokenKind::Bang) {
                self.advance();
                negated = !negated;
                continue;
            }
            if self.check(TokenKind::Time) {
                self.advance();
                timed = true;
                if self.current().kind.is_word_like() && self.current().text == "-p" {
                    self.advance();
                    time_posix = true;
                }
                continue;
            }
            break;
        }

        // `time` with nothing after it times a null command.
        if timed && self.at_statement_end() {
            return Ok(Pipeline {
                commands: Vec::new(),
                negated,
                timed,
                time_posix,
            });
        }

        let mut commands = vec![self.parse_command()?];
        while self.check(TokenKind::Pipe) {
            self.advance();
            self.skip_newlines();
            commands.push(self.parse_command()?);
        }

        Ok(Pipeline {
            commands,
            negated,
            timed,
            time_posix,
        })
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    pub(crate) fn parse_command(&mut self) -> Result<Command, ParseError> {
        match self.current().kind {
            TokenKind::If => Ok(Command::Compound(self.parse_if()?)),
            TokenKind::While => Ok(Command::Compound(self.parse_while(false)?)),
            TokenKind::Until => Ok(Command::Compound(self.parse_while(true)?)),
            TokenKind::For => Ok(Command::Compound(self.parse_for()?)),
            TokenKind::Case => Ok(Command::Compound(self.parse_case()?)),
            TokenKind::Select => Ok(Command::Compound(self.parse_select()?)),
            TokenKind::LBrace => Ok(Command::Compound(self.parse_brace_group()?)),
            TokenKind::LParen => Ok(Command::Compound(self.parse_subshell()?)),
            TokenKind::DLParen => Ok(Command::Compound(self.parse_arith_command()?)),
            TokenKind::DLBracket => Ok(Command::Compound(self.parse_cond_command()?)),
            TokenKind::Function => self.parse_function_def(),
            kind if kind.is_word_like() => {
                // NAME () { … } function definition.
                if self.is_function_def_ahead() {
                    return self.parse_function_def();
                }
                if let Some(cmd) = self.try_parse_break_continue() {
                    return Ok(cmd);
                }
                Ok(Command::Simple(self.parse_simple_command()?))
            }
            kind if kind.is_redirect() || kind == TokenKind::Number => {
                Ok(Command::Simple(self.parse_simple_command()?))
            }
            _ => Err(self.unexpected("a command")),
        }
    }

    fn is_function_def_ahead(&self) -> bool {
        self.current().kind.is_word_like()
            && !self.current().quoted
            && lexer::is_valid_name(&self.current().text)
            && self.peek(1).kind == TokenKind::LParen
            && self.peek(2).kind == TokenKind::RParen
    }

    /// `break [n]` / `continue [n]` become dedicated nodes when the level is
    /// literal; anything fancier falls back to the builtin.
    fn try_parse_break_continue(&mut self) -> Option<Command> {
        let tok = self.current();
        if tok.quoted || (tok.text != "break" && tok.text != "continue") {
            return None;
        }
        let is_break = tok.text == "break";

        let next = self.peek(1);
        let level = if next.kind == TokenKind::Word
            && !next.quoted
            && !next.text.is_empty()
            && next.text.chars().all(|c| c.is_ascii_digit())
            && self.at_statement_end_at(2)
        {
            match next.text.parse::<u32>() {
                Ok(n) => {
                    self.advance();
                    self.advance();
                    Some(n)
                }
                Err(_) => return None,
            }
        } else if self.at_statement_end_at(1) {
            self.advance();
            Some(1)
        } else {
            return None;
        };

        level.map(|level| {
            if is_break {
                Command::Break { level }
            } else {
                Command::Continue { level }
            }
        })
    }

    fn at_statement_end_at(&self, offset: usize) -> bool {
        matches!(
            self.peek(offset).kind,
            TokenKind::Eof
                | TokenKind::Newline
                | TokenKind::Semi
                | TokenKind::Amp
                | TokenKind::AndAnd
                | TokenKind::OrOr
                | TokenKind::Pipe
                | TokenKind::RParen
                | TokenKind::RBrace
                | TokenKind::DSemi
                | TokenKind::SemiAmp
                | TokenKind::DSemiAmp
        )
    }

    // =========================================================================
    // SIMPLE COMMANDS
    // =========================================================================

    pub(crate) fn parse_simple_command(&mut self) -> Result<SimpleCommand, ParseError> {
        let line = self.current().line;
        let mut assignments = Vec::new();
        let mut words = Vec::new();
        let mut redirects = Vec::new();

        loop {
            let kind = self.current().kind;

            if kind == TokenKind::Number && self.peek(1).kind.is_redirect() {
                redirects.push(self.parse_redirect()?);
                continue;
            }
            if kind.is_redirect() {
                redirects.push(self.parse_redirect()?);
                continue;
            }

            if kind == TokenKind::AssignmentWord && words.is_empty() {
                assignments.push(self.parse_assignment()?);
                continue;
            }

            if kind.is_word_like() {
                let tok = self.advance();
                words.push(parse_word(&tok.text)?);
                continue;
            }

            break;
        }

        if assignments.is_empty() && words.is_empty() && redirects.is_empty() {
            return Err(self.unexpected("a command"));
        }

        Ok(SimpleCommand {
            assignments,
            words,
            redirects,
            line,
        })
    }

    fn parse_assignment(&mut self) -> Result<Assignment, ParseError> {
        let tok = self.advance();
        let eq = lexer::assignment_eq_index(&tok.text)
            .ok_or_else(|| ParseError::at_token("malformed assignment", &tok))?;
        let (lhs, rhs) = tok.text.split_at(eq);
        let rhs = &rhs[1..]; // skip '='
        let (lhs, append) = match lhs.strip_suffix('+') {
            Some(stripped) => (stripped, true),
            None => (lhs, false),
        };

        let (name, index) = match lhs.find('[') {
            Some(open) => {
                let name = &lhs[..open];
                let index_text = &lhs[open + 1..lhs.len() - 1];
                (name.to_string(), Some(parse_word(index_text)?))
            }
            None => (lhs.to_string(), None),
        };

        // NAME=( … ) array literal.
        if rhs.is_empty() && self.check(TokenKind::LParen) {
            self.advance();
            let mut elements = Vec::new();
            loop {
                self.skip_newlines();
                if self.check(TokenKind::RParen) {
                    self.advance();
                    break;
                }
                if self.current().kind.is_word_like() {
                    let element = self.advance();
                    elements.push(parse_word(&element.text)?);
                } else {
                    return Err(self.unexpected("array element or `)'"));
                }
            }
            return Ok(Assignment {
                name,
                index,
                value: None,
                append,
                array: Some(elements),
            });
        }

        let value = if rhs.is_empty() {
            None
        } else {
            Some(parse_word(rhs)?)
        };

        Ok(Assignment {
            name,
            index,
            value,
            append,
            array: None,
        })
    }

    // =========================================================================
    // REDIRECTIONS
    // =========================================================================

    pub(crate) fn parse_redirect(&mut self) -> Result<Redirect, ParseError> {
        let fd = if self.check(TokenKind::Number) {
            let tok = self.advance();
            Some(tok.text.parse::<i32>().map_err(|_| {
                ParseError::at_token(format!("bad file descriptor `{}'", tok.text), &tok)
            })?)
        } else {
            None
        };

        let op_tok = self.advance();
        let op = match op_tok.kind {
            TokenKind::Less => RedirectOp::Read,
            TokenKind::Great => RedirectOp::Write,
            TokenKind::DGreat => RedirectOp::Append,
            TokenKind::LessGreat => RedirectOp::ReadWrite,
            TokenKind::Clobber => RedirectOp::Clobber,
            TokenKind::LessAnd => RedirectOp::DupIn,
            TokenKind::GreatAnd => RedirectOp::DupOut,
            TokenKind::DLess => RedirectOp::HereDoc,
            TokenKind::DLessDash => RedirectOp::HereDocDash,
            TokenKind::TLess => RedirectOp::HereString,
            TokenKind::AndGreat => RedirectOp::WriteBoth,
            TokenKind::AndDGreat => RedirectOp::AppendBoth,
            _ => return Err(ParseError::at_token("expected redirection operator", &op_tok)),
        };

        if matches!(op, RedirectOp::HereDoc | RedirectOp::HereDocDash) {
            // The delimiter word token follows; the collected body was
            // lifted out of the stream in operator order.
            let delim_tok = if self.current().kind.is_word_like() {
                self.advance()
            } else {
                return Err(self.unexpected("here-document delimiter"));
            };
            let body_tok = self
                .heredoc_bodies
                .pop_front()
                .ok_or_else(|| ParseError::at_token("missing here-document body", &delim_tok))?;

            let body = if body_tok.quoted {
                Word::literal(&body_tok.text)
            } else {
                parse_heredoc_body(&body_tok.text)?
            };
            let delimiter = unquote_delimiter(&delim_tok.text);
            return Ok(Redirect {
                fd,
                op,
                target: RedirectTarget::HereDoc(HereDoc {
                    delimiter,
                    body,
                    quoted: body_tok.quoted,
                    strip_tabs: op == RedirectOp::HereDocDash,
                }),
            });
        }

        if !self.current().kind.is_word_like() {
            return Err(self.unexpected("redirection target"));
        }
        let target_tok = self.advance();
        Ok(Redirect {
            fd,
            op,
            target: RedirectTarget::Word(parse_word(&target_tok.text)?),
        })
    }

    /// Trailing redirections after a compound command.
    pub(crate) fn parse_trailing_redirects(&mut self) -> Result<Vec<Redirect>, ParseError> {
        let mut redirects = Vec::new();
        loop {
            let kind = self.current().kind;
            if kind.is_redirect() || (kind == TokenKind::Number && self.peek(1).kind.is_redirect())
            {
                redirects.push(self.parse_redirect()?);
            } else {
                break;
            }
        }
        Ok(redirects)
    }
}

/// Strip the quoting from a here-doc delimiter word.
fn unquote_delimiter(text: &str) -> String {
    let mut out = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                for q in chars.by_ref() {
                    if q == '\'' {
                        break;
                    }
                    out.push(q);
                }
            }
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                    out.push(q);
                }
            }
            '\\' => {
                if let Some(q) = chars.next() {
                    out.push(q);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_simple(script: &Script) -> &SimpleCommand {
        match &script.statements[0].pipelines[0].commands[0] {
            Command::Simple(simple) => simple,
            other => panic!("expected simple command, got {:?}", other),
        }
    }

    #[test]
    fn parses_simple_command() {
        let script = parse("echo hello world").unwrap();
        let simple = first_simple(&script);
        assert_eq!(simple.words.len(), 3);
        assert_eq!(simple.words[0].as_literal().as_deref(), Some("echo"));
    }

    #[test]
    fn parses_pipeline() {
        let script = parse("a | b | c").unwrap();
        assert_eq!(script.statements[0].pipelines[0].commands.len(), 3);
    }

    #[test]
    fn parses_and_or_list() {
        let script = parse("a && b || c").unwrap();
        let stmt = &script.statements[0];
        assert_eq!(stmt.pipelines.len(), 3);
        assert_eq!(stmt.operators, vec![AndOrOp::And, AndOrOp::Or]);
    }

    #[test]
    fn parses_background() {
        let script = parse("sleep 5 &").unwrap();
        assert!(script.statements[0].background);
    }

    #[test]
    fn parses_negated_pipeline() {
        let script = parse("! false").unwrap();
        assert!(script.statements[0].pipelines[0].negated);
    }

    #[test]
    fn parses_timed_pipeline() {
        let script = parse("time sleep 1").unwrap();
        assert!(script.statements[0].pipelines[0].timed);
    }

    #[test]
    fn parses_assignments() {
        let script = parse("FOO=bar BAZ=qux cmd arg").unwrap();
        let simple = first_simple(&script);
        assert_eq!(simple.assignments.len(), 2);
        assert_eq!(simple.assignments[0].name, "FOO");
        assert_eq!(simple.words.len(), 2);
    }

    #[test]
    fn assignment_after_command_is_a_word() {
        let script = parse("echo FOO=bar").unwrap();
        let simple = first_simple(&script);
        assert!(simple.assignments.is_empty());
        assert_eq!(simple.words.len(), 2);
    }

    #[test]
    fn parses_array_assignment() {
        let script = parse("arr=(a b c)").unwrap();
        let simple = first_simple(&script);
        let array = simple.assignments[0].array.as_ref().unwrap();
        assert_eq!(array.len(), 3);
    }

    #[test]
    fn parses_append_assignment() {
        let script = parse("x+=more").unwrap();
        let simple = first_simple(&script);
        assert!(simple.assignments[0].append);
    }

    #[test]
    fn parses_subscript_assignment() {
        let script = parse("arr[2]=val").unwrap();
        let simple = first_simple(&script);
        assert_eq!(simple.assignments[0].name, "arr");
        assert!(simple.assignments[0].index.is_some());
    }

    #[test]
    fn parses_redirects() {
        let script = parse("cmd < in > out 2>&1").unwrap();
        let simple = first_simple(&script);
        assert_eq!(simple.redirects.len(), 3);
        assert_eq!(simple.redirects[0].op, RedirectOp::Read);
        assert_eq!(simple.redirects[1].op, RedirectOp::Write);
        assert_eq!(simple.redirects[2].op, RedirectOp::DupOut);
        assert_eq!(simple.redirects[2].fd, Some(2));
    }

    #[test]
    fn parses_heredoc() {
        let script = parse("cat <<EOF\nhello $x\nEOF\n").unwrap();
        let simple = first_simple(&script);
        match &simple.redirects[0].target {
            RedirectTarget::HereDoc(doc) => {
                assert_eq!(doc.delimiter, "EOF");
                assert!(!doc.quoted);
            }
            other => panic!("expected heredoc, got {:?}", other),
        }
    }

    #[test]
    fn parses_quoted_heredoc_delimiter() {
        let script = parse("cat <<'EOF'\n$x\nEOF\n").unwrap();
        let simple = first_simple(&script);
        match &simple.redirects[0].target {
            RedirectTarget::HereDoc(doc) => {
                assert!(doc.quoted);
                assert_eq!(doc.body.as_literal().as_deref(), Some("$x\n"));
            }
            other => panic!("expected heredoc, got {:?}", other),
        }
    }

    #[test]
    fn two_heredocs_fill_in_order() {
        let script = parse("cat <<A <<B\none\nA\ntwo\nB\n").unwrap();
        let simple = first_simple(&script);
        let bodies: Vec<String> = simple
            .redirects
            .iter()
            .map(|r| match &r.target {
                RedirectTarget::HereDoc(d) => d.body.as_literal().unwrap_or_default(),
                _ => panic!("expected heredoc"),
            })
            .collect();
        assert_eq!(bodies, vec!["one\n".to_string(), "two\n".to_string()]);
    }

    #[test]
    fn parses_break_continue() {
        let script = parse("break").unwrap();
        assert!(matches!(
            script.statements[0].pipelines[0].commands[0],
            Command::Break { level: 1 }
        ));

        let script = parse("continue 2").unwrap();
        assert!(matches!(
            script.statements[0].pipelines[0].commands[0],
            Command::Continue { level: 2 }
        ));
    }

    #[test]
    fn multiple_statements() {
        let script = parse("a; b\nc").unwrap();
        assert_eq!(script.statements.len(), 3);
    }

    #[test]
    fn reports_incomplete_at_eof() {
        let err = parse("if true; then").unwrap_err();
        assert!(err.incomplete, "error should be incomplete: {}", err);
    }

    #[test]
    fn reports_syntax_error_with_position() {
        let err = parse("echo |;").unwrap_err();
        assert!(!err.incomplete);
        assert!(err.line >= 1);
    }

    #[test]
    fn statement_source_text() {
        let script = parse("echo one; echo two").unwrap();
        assert_eq!(script.statements[0].source.as_deref(), Some("echo one;"));
    }
}

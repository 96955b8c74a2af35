//! Compound command parsing
//!
//! if / while / until / for / c-style for / case / select / groups /
//! subshells / `(( ))` / `[[ ]]` / function definitions. Each parser
//! consumes its keywords, builds the node, and attaches any trailing
//! redirections.

use crate::ast::types::*;
use crate::parser::arith::parse_arith;
use crate::parser::cond::parse_cond_expr;
use crate::parser::lexer::{self, TokenKind};
use crate::parser::parser::Parser;
use crate::parser::types::ParseError;
use crate::parser::word::parse_word;

impl Parser {
    pub(crate) fn parse_if(&mut self) -> Result<CompoundCommand, ParseError> {
        self.enter()?;
        let result = self.parse_if_inner();
        self.leave();
        result
    }

    fn parse_if_inner(&mut self) -> Result<CompoundCommand, ParseError> {
        self.expect(TokenKind::If, "`if'")?;
        let mut arms = Vec::new();
        let condition = self.parse_statement_list(&[TokenKind::Then])?;
        self.expect(TokenKind::Then, "`then'")?;
        let body =
            self.parse_statement_list(&[TokenKind::Elif, TokenKind::Else, TokenKind::Fi])?;
        arms.push(IfArm { condition, body });

        let mut else_body = None;
        loop {
            match self.current().kind {
                TokenKind::Elif => {
                    self.advance();
                    let condition = self.parse_statement_list(&[TokenKind::Then])?;
                    self.expect(TokenKind::Then, "`then'")?;
                    let body = self.parse_statement_list(&[
                        TokenKind::Elif,
                        TokenKind::Else,
                        TokenKind::Fi,
                    ])?;
                    arms.push(IfArm { condition, body });
                }
                TokenKind::Else => {
                    self.advance();
                    else_body = Some(self.parse_statement_list(&[TokenKind::Fi])?);
                }
                TokenKind::Fi => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected("`elif', `else' or `fi'")),
            }
        }

        let redirects = self.parse_trailing_redirects()?;
        Ok(CompoundCommand::If(IfCommand {
            arms,
            else_body,
            redirects,
        }))
    }

    pub(crate) fn parse_while(&mut self, until: bool) -> Result<CompoundCommand, ParseError> {
        self.enter()?;
        let result = self.parse_while_inner(until);
        self.leave();
        result
    }

    fn parse_while_inner(&mut self, until: bool) -> Result<CompoundCommand, ParseError> {
        self.advance(); // while / until
        let condition = self.parse_statement_list(&[TokenKind::Do])?;
        self.expect(TokenKind::Do, "`do'")?;
        let body = self.parse_statement_list(&[TokenKind::Done])?;
        self.expect(TokenKind::Done, "`done'")?;
        let redirects = self.parse_trailing_redirects()?;

        let node = LoopCommand {
            condition,
            body,
            redirects,
        };
        Ok(if until {
            CompoundCommand::Until(node)
        } else {
            CompoundCommand::While(node)
        })
    }

    pub(crate) fn parse_for(&mut self) -> Result<CompoundCommand, ParseError> {
        self.enter()?;
        let result = self.parse_for_inner();
        self.leave();
        result
    }

    fn parse_for_inner(&mut self) -> Result<CompoundCommand, ParseError> {
        let line = self.current().line;
        self.expect(TokenKind::For, "`for'")?;

        // C-style: for ((init; cond; update))
        if self.check(TokenKind::DLParen) {
            self.advance();
            let header = self.expect(TokenKind::Word, "arithmetic header")?;
            self.expect(TokenKind::DRParen, "`))'")?;

            let clauses: Vec<&str> = header.text.splitn(3, ';').collect();
            if clauses.len() != 3 {
                return Err(ParseError::at_token(
                    "expected three arithmetic clauses in `for ((…))'",
                    &header,
                ));
            }
            let parse_clause = |text: &str| -> Result<Option<ArithExpr>, ParseError> {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    parse_arith(trimmed)
                        .map(Some)
                        .map_err(|e| ParseError::at_token(e, &header))
                }
            };
            let init = parse_clause(clauses[0])?;
            let cond = parse_clause(clauses[1])?;
            let update = parse_clause(clauses[2])?;

            let body = self.parse_do_block()?;
            let redirects = self.parse_trailing_redirects()?;
            return Ok(CompoundCommand::CStyleFor(CStyleForCommand {
                init,
                cond,
                update,
                body,
                redirects,
                line,
            }));
        }

        let (var, words) = self.parse_iteration_header()?;
        let body = self.parse_do_block()?;
        let redirects = self.parse_trailing_redirects()?;
        Ok(CompoundCommand::For(ForCommand {
            var,
            words,
            body,
            redirects,
        }))
    }

    pub(crate) fn parse_select(&mut self) -> Result<CompoundCommand, ParseError> {
        self.enter()?;
        let result = self.parse_select_inner();
        self.leave();
        result
    }

    fn parse_select_inner(&mut self) -> Result<CompoundCommand, ParseError> {
        self.expect(TokenKind::Select, "`select'")?;
        let (var, words) = self.parse_iteration_header()?;
        let body = self.parse_do_block()?;
        let redirects = self.parse_trailing_redirects()?;
        Ok(CompoundCommand::Select(SelectCommand {
            var,
            words,
            body,
            redirects,
        }))
    }

    /// `NAME [in word…] [;|\n]` shared by `for` and `select`. `None` words
    /// means iterate `"$@"`.
    fn parse_iteration_header(&mut self) -> Result<(String, Option<Vec<Word>>), ParseError> {
        let name_tok = if self.current().kind.is_word_like() {
            self.advance()
        } else {
            return Err(self.unexpected("a variable name"));
        };
        if !lexer::is_valid_name(&name_tok.text) {
            return Err(ParseError::at_token(
                format!("`{}' is not a valid identifier", name_tok.text),
                &name_tok,
            ));
        }
        let var = name_tok.text;

        // Optional separator before `in` / `do`.
        while self.check(TokenKind::Semi) || self.check(TokenKind::Newline) {
            self.advance();
        }

        let mut words = None;
        let in_next = self.check(TokenKind::In)
            || (self.current().kind == TokenKind::Word
                && !self.current().quoted
                && self.current().text == "in");
        if in_next {
            self.advance();
            let mut list = Vec::new();
            while self.current().kind.is_word_like() {
                let tok = self.advance();
                list.push(parse_word(&tok.text)?);
            }
            words = Some(list);
            if self.check(TokenKind::Semi) {
                self.advance();
            }
        }

        Ok((var, words))
    }

    /// `do … done`, allowing leading separators.
    fn parse_do_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.skip_newlines();
        if self.check(TokenKind::Semi) {
            self.advance();
            self.skip_newlines();
        }
        self.expect(TokenKind::Do, "`do'")?;
        let body = self.parse_statement_list(&[TokenKind::Done])?;
        self.expect(TokenKind::Done, "`done'")?;
        Ok(body)
    }

    pub(crate) fn parse_case(&mut self) -> Result<CompoundCommand, ParseError> {
        self.enter()?;
        let result = self.parse_case_inner();
        self.leave();
        result
    }

    fn parse_case_inner(&mut self) -> Result<CompoundCommand, ParseError> {
        self.expect(TokenKind::Case, "`case'")?;
        let subject_tok = if self.current().kind.is_word_like() {
            self.advance()
        } else {
            return Err(self.unexpected("a word after `case'"));
        };
        let subject = parse_word(&subject_tok.text)?;

        self.skip_newlines();
        let in_ok = self.check(TokenKind::In)
            || (self.current().kind.is_word_like()
                && !self.current().quoted
                && self.current().text == "in");
        if !in_ok {
            return Err(self.unexpected("`in'"));
        }
        self.advance();
        self.skip_newlines();

        let mut arms = Vec::new();
        while !self.check(TokenKind::Esac) {
            if self.check(TokenKind::Eof) {
                return Err(self.unexpected("`esac'"));
            }

            // Optional `(` before the pattern list.
            if self.check(TokenKind::LParen) {
                self.advance();
            }

            let mut patterns = Vec::new();
            loop {
                if !self.current().kind.is_word_like() {
                    return Err(self.unexpected("a case pattern"));
                }
                let tok = self.advance();
                patterns.push(parse_word(&tok.text)?);
                if self.check(TokenKind::Pipe) {
                    self.advance();
                    continue;
                }
                break;
            }
            self.expect(TokenKind::RParen, "`)'")?;

            let body = self.parse_statement_list(&[TokenKind::Esac])?;

            let terminator = match self.current().kind {
                TokenKind::DSemi => {
                    self.advance();
                    CaseTerminator::Break
                }
                TokenKind::SemiAmp => {
                    self.advance();
                    CaseTerminator::FallThrough
                }
                TokenKind::DSemiAmp => {
                    self.advance();
                    CaseTerminator::ContinueMatching
                }
                TokenKind::Esac => CaseTerminator::Break,
                _ => return Err(self.unexpected("`;;'")),
            };
            self.skip_newlines();

            arms.push(CaseArm {
                patterns,
                body,
                terminator,
            });
        }
        self.expect(TokenKind::Esac, "`esac'")?;

        let redirects = self.parse_trailing_redirects()?;
        Ok(CompoundCommand::Case(CaseCommand {
            subject,
            arms,
            redirects,
        }))
    }

    pub(crate) fn parse_brace_group(&mut self) -> Result<CompoundCommand, ParseError> {
        self.enter()?;
        let result = self.parse_group_inner(TokenKind::LBrace, TokenKind::RBrace, "`}'");
        self.leave();
        result.map(CompoundCommand::BraceGroup)
    }

    pub(crate) fn parse_subshell(&mut self) -> Result<CompoundCommand, ParseError> {
        self.enter()?;
        let result = self.parse_group_inner(TokenKind::LParen, TokenKind::RParen, "`)'");
        self.leave();
        result.map(CompoundCommand::Subshell)
    }

    fn parse_group_inner(
        &mut self,
        open: TokenKind,
        close: TokenKind,
        close_name: &str,
    ) -> Result<GroupCommand, ParseError> {
        self.expect(open, "group opener")?;
        let body = self.parse_statement_list(&[close])?;
        if body.is_empty() {
            return Err(self.unexpected("a command"));
        }
        self.expect(close, close_name)?;
        let redirects = self.parse_trailing_redirects()?;
        Ok(GroupCommand { body, redirects })
    }

    pub(crate) fn parse_arith_command(&mut self) -> Result<CompoundCommand, ParseError> {
        let line = self.current().line;
        self.expect(TokenKind::DLParen, "`(('")?;
        let header = self.expect(TokenKind::Word, "arithmetic expression")?;
        self.expect(TokenKind::DRParen, "`))'")?;
        let expr =
            parse_arith(&header.text).map_err(|e| ParseError::at_token(e, &header))?;
        let redirects = self.parse_trailing_redirects()?;
        Ok(CompoundCommand::Arith(ArithCommand {
            expr,
            redirects,
            line,
        }))
    }

    pub(crate) fn parse_cond_command(&mut self) -> Result<CompoundCommand, ParseError> {
        self.expect(TokenKind::DLBracket, "`[['")?;
        let interior = self.expect(TokenKind::Word, "conditional expression")?;
        self.expect(TokenKind::DRBracket, "`]]'")?;
        let expr = parse_cond_expr(&interior.text)?;
        let redirects = self.parse_trailing_redirects()?;
        Ok(CompoundCommand::Cond(CondCommand { expr, redirects }))
    }

    /// `function NAME [()] compound` or `NAME () compound`.
    pub(crate) fn parse_function_def(&mut self) -> Result<Command, ParseError> {
        self.enter()?;
        let result = self.parse_function_def_inner();
        self.leave();
        result
    }

    fn parse_function_def_inner(&mut self) -> Result<Command, ParseError> {
        let name = if self.check(TokenKind::Function) {
            self.advance();
            let name_tok = if self.current().kind.is_word_like() {
                self.advance()
            } else {
                return Err(self.unexpected("a function name"));
            };
            // Parentheses are optional with the `function` keyword.
            if self.check(TokenKind::LParen) && self.peek(1).kind == TokenKind::RParen {
                self.advance();
                self.advance();
            }
            name_tok.text
        } else {
            let name_tok = self.advance();
            self.expect(TokenKind::LParen, "`('")?;
            self.expect(TokenKind::RParen, "`)'")?;
            name_tok.text
        };

        self.skip_newlines();

        let body = match self.parse_command()? {
            Command::Compound(compound) => compound,
            _ => {
                return Err(self.unexpected("a compound command as function body"));
            }
        };

        let redirects = self.parse_trailing_redirects()?;
        Ok(Command::FunctionDef(FunctionDef {
            name,
            body: Box::new(body),
            redirects,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn first_compound(script: &Script) -> &CompoundCommand {
        match &script.statements[0].pipelines[0].commands[0] {
            Command::Compound(compound) => compound,
            other => panic!("expected compound, got {:?}", other),
        }
    }

    #[test]
    fn parses_if_elif_else() {
        let script = parse("if a; then b; elif c; then d; else e; fi").unwrap();
        match first_compound(&script) {
            CompoundCommand::If(node) => {
                assert_eq!(node.arms.len(), 2);
                assert!(node.else_body.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_while_and_until() {
        let script = parse("while a; do b; done").unwrap();
        assert!(matches!(first_compound(&script), CompoundCommand::While(_)));

        let script = parse("until a; do b; done").unwrap();
        assert!(matches!(first_compound(&script), CompoundCommand::Until(_)));
    }

    #[test]
    fn parses_for_in() {
        let script = parse("for i in a b c; do echo $i; done").unwrap();
        match first_compound(&script) {
            CompoundCommand::For(node) => {
                assert_eq!(node.var, "i");
                assert_eq!(node.words.as_ref().unwrap().len(), 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn for_without_in_iterates_args() {
        let script = parse("for arg; do echo $arg; done").unwrap();
        match first_compound(&script) {
            CompoundCommand::For(node) => assert!(node.words.is_none()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_c_style_for() {
        let script = parse("for ((i=0; i<5; i++)); do echo $i; done").unwrap();
        match first_compound(&script) {
            CompoundCommand::CStyleFor(node) => {
                assert!(node.init.is_some());
                assert!(node.cond.is_some());
                assert!(node.update.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn c_style_for_with_empty_clauses() {
        let script = parse("for ((;;)); do break; done").unwrap();
        match first_compound(&script) {
            CompoundCommand::CStyleFor(node) => {
                assert!(node.init.is_none());
                assert!(node.cond.is_none());
                assert!(node.update.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_case_terminators() {
        let script =
            parse("case $x in a) one;; b) two;& c) three;;& d) four; esac").unwrap();
        match first_compound(&script) {
            CompoundCommand::Case(node) => {
                assert_eq!(node.arms.len(), 4);
                assert_eq!(node.arms[0].terminator, CaseTerminator::Break);
                assert_eq!(node.arms[1].terminator, CaseTerminator::FallThrough);
                assert_eq!(node.arms[2].terminator, CaseTerminator::ContinueMatching);
                assert_eq!(node.arms[3].terminator, CaseTerminator::Break);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_case_multiple_patterns() {
        let script = parse("case $x in a|b|c) echo hi;; esac").unwrap();
        match first_compound(&script) {
            CompoundCommand::Case(node) => assert_eq!(node.arms[0].patterns.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_select() {
        let script = parse("select x in a b; do echo $x; done").unwrap();
        assert!(matches!(first_compound(&script), CompoundCommand::Select(_)));
    }

    #[test]
    fn parses_groups() {
        let script = parse("{ echo a; echo b; }").unwrap();
        assert!(matches!(first_compound(&script), CompoundCommand::BraceGroup(_)));

        let script = parse("(echo a; echo b)").unwrap();
        assert!(matches!(first_compound(&script), CompoundCommand::Subshell(_)));
    }

    #[test]
    fn parses_arith_command() {
        let script = parse("((x = 1 + 2))").unwrap();
        assert!(matches!(first_compound(&script), CompoundCommand::Arith(_)));
    }

    #[test]
    fn parses_cond_command() {
        let script = parse("[[ -f /etc/passwd && $x == y ]]").unwrap();
        assert!(matches!(first_compound(&script), CompoundCommand::Cond(_)));
    }

    #[test]
    fn parses_function_definitions() {
        let script = parse("greet() { echo hi; }").unwrap();
        match &script.statements[0].pipelines[0].commands[0] {
            Command::FunctionDef(def) => assert_eq!(def.name, "greet"),
            other => panic!("unexpected {:?}", other),
        }

        let script = parse("function greet { echo hi; }").unwrap();
        assert!(matches!(
            &script.statements[0].pipelines[0].commands[0],
            Command::FunctionDef(_)
        ));
    }

    #[test]
    fn group_redirects_attach_to_group() {
        let script = parse("{ echo a; } > out").unwrap();
        match first_compound(&script) {
            CompoundCommand::BraceGroup(node) => assert_eq!(node.redirects.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn compound_in_pipeline() {
        let script = parse("if true; then echo a; fi | wc -l").unwrap();
        assert_eq!(script.statements[0].pipelines[0].commands.len(), 2);
    }

    #[test]
    fn nested_structures() {
        let script = parse(
            "for i in 1 2; do if [ $i = 1 ]; then echo one; else echo other; fi; done",
        )
        .unwrap();
        match first_compound(&script) {
            CompoundCommand::For(node) => assert_eq!(node.body.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn incomplete_compounds_report_incomplete() {
        for input in ["if true; then", "while x; do", "case $x in", "{ echo a;", "(echo a"] {
            let err = parse(input).unwrap_err();
            assert!(err.incomplete, "{} should be incomplete", input);
        }
    }
}

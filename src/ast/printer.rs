//! Debug formatting for ASTs and token streams
//!
//! Backs `--debug-ast` and `--debug-tokens`: an indented tree dump meant for
//! humans inspecting what the parser produced, not for round-tripping.

use crate::ast::types::*;
use crate::parser::lexer::Token;
use std::fmt::Write;

/// Render a token stream, one token per line.
pub fn format_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for tok in tokens {
        let _ = writeln!(
            out,
            "{:>4}:{:<3} {:<16} {:?}",
            tok.line,
            tok.column,
            format!("{:?}", tok.kind),
            tok.text
        );
    }
    out
}

/// Render a parsed script as an indented tree.
pub fn format_script(script: &Script) -> String {
    let mut p = Printer::new();
    p.script(script);
    p.out
}

struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn new() -> Self {
        Self {
            out: String::new(),
            depth: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn nested(&mut self, header: &str, f: impl FnOnce(&mut Self)) {
        self.line(header);
        self.depth += 1;
        f(self);
        self.depth -= 1;
    }

    fn script(&mut self, script: &Script) {
        self.nested("Script", |p| {
            for stmt in &script.statements {
                p.statement(stmt);
            }
        });
    }

    fn statement(&mut self, stmt: &Statement) {
        let mut header = String::from("Statement");
        if stmt.background {
            header.push_str(" &");
        }
        self.nested(&header, |p| {
            for (i, pipeline) in stmt.pipelines.iter().enumerate() {
                if i > 0 {
                    match stmt.operators[i - 1] {
                        AndOrOp::And => p.line("&&"),
                        AndOrOp::Or => p.line("||"),
                    }
                }
                p.pipeline(pipeline);
            }
        });
    }

    fn pipeline(&mut self, pipeline: &Pipeline) {
        let mut header = String::from("Pipeline");
        if pipeline.negated {
            header.push_str(" !");
        }
        if pipeline.timed {
            header.push_str(" time");
        }
        self.nested(&header, |p| {
            for cmd in &pipeline.commands {
                p.command(cmd);
            }
        });
    }

    fn command(&mut self, cmd: &Command) {
        match cmd {
            Command::Simple(simple) => self.simple(simple),
            Command::Compound(compound) => self.compound(compound),
            Command::FunctionDef(def) => {
                let name = def.name.clone();
                self.nested(&format!("FunctionDef {}", name), |p| {
                    p.compound(&def.body);
                    p.redirects(&def.redirects);
                });
            }
            Command::Break { level } => self.line(&format!("Break {}", level)),
            Command::Continue { level } => self.line(&format!("Continue {}", level)),
        }
    }

    fn simple(&mut self, simple: &SimpleCommand) {
        self.nested("SimpleCommand", |p| {
            for assign in &simple.assignments {
                let mut text = assign.name.clone();
                if assign.append {
                    text.push('+');
                }
                text.push('=');
                if let Some(value) = &assign.value {
                    text.push_str(&word_text(value));
                } else if assign.array.is_some() {
                    text.push_str("(…)");
                }
                p.line(&format!("Assign {}", text));
            }
            for word in &simple.words {
                p.line(&format!("Word {}", word_text(word)));
            }
            p.redirects(&simple.redirects);
        });
    }

    fn compound(&mut self, compound: &CompoundCommand) {
        match compound {
            CompoundCommand::If(node) => self.nested("If", |p| {
                for arm in &node.arms {
                    p.nested("Condition", |p| p.body(&arm.condition));
                    p.nested("Then", |p| p.body(&arm.body));
                }
                if let Some(else_body) = &node.else_body {
                    p.nested("Else", |p| p.body(else_body));
                }
                p.redirects(&node.redirects);
            }),
            CompoundCommand::While(node) => self.loop_node("While", node),
            CompoundCommand::Until(node) => self.loop_node("Until", node),
            CompoundCommand::For(node) => {
                let header = format!("For {}", node.var);
                self.nested(&header, |p| {
                    if let Some(words) = &node.words {
                        let items: Vec<String> = words.iter().map(word_text).collect();
                        p.line(&format!("In {}", items.join(" ")));
                    }
                    p.nested("Body", |p| p.body(&node.body));
                    p.redirects(&node.redirects);
                });
            }
            CompoundCommand::CStyleFor(node) => self.nested("CStyleFor", |p| {
                p.nested("Body", |p| p.body(&node.body));
                p.redirects(&node.redirects);
            }),
            CompoundCommand::Case(node) => {
                let header = format!("Case {}", word_text(&node.subject));
                self.nested(&header, |p| {
                    for arm in &node.arms {
                        let pats: Vec<String> = arm.patterns.iter().map(word_text).collect();
                        p.nested(
                            &format!("Arm {} {}", pats.join("|"), arm.terminator.as_str()),
                            |p| p.body(&arm.body),
                        );
                    }
                    p.redirects(&node.redirects);
                });
            }
            CompoundCommand::Select(node) => {
                let header = format!("Select {}", node.var);
                self.nested(&header, |p| {
                    p.nested("Body", |p| p.body(&node.body));
                    p.redirects(&node.redirects);
                });
            }
            CompoundCommand::Subshell(node) => self.nested("Subshell", |p| {
                p.body(&node.body);
                p.redirects(&node.redirects);
            }),
            CompoundCommand::BraceGroup(node) => self.nested("BraceGroup", |p| {
                p.body(&node.body);
                p.redirects(&node.redirects);
            }),
            CompoundCommand::Arith(node) => {
                self.line(&format!("ArithCommand {:?}", node.expr));
            }
            CompoundCommand::Cond(node) => {
                self.line(&format!("CondCommand {:?}", node.expr));
            }
        }
    }

    fn loop_node(&mut self, name: &str, node: &LoopCommand) {
        self.nested(name, |p| {
            p.nested("Condition", |p| p.body(&node.condition));
            p.nested("Body", |p| p.body(&node.body));
            p.redirects(&node.redirects);
        });
    }

    fn body(&mut self, statements: &[Statement]) {
        for stmt in statements {
            self.statement(stmt);
        }
    }

    fn redirects(&mut self, redirects: &[Redirect]) {
        for redirect in redirects {
            let fd = redirect
                .fd
                .map(|n| n.to_string())
                .unwrap_or_default();
            let target = match &redirect.target {
                RedirectTarget::Word(word) => word_text(word),
                RedirectTarget::HereDoc(doc) => format!("heredoc<{}>", doc.delimiter),
            };
            self.line(&format!("Redirect {}{} {}", fd, redirect.op, target));
        }
    }
}

/// Approximate source text of a word, for display only.
pub fn word_text(word: &Word) -> String {
    let mut out = String::new();
    for piece in &word.pieces {
        piece_text(piece, &mut out);
    }
    out
}

fn piece_text(piece: &WordPiece, out: &mut String) {
    match piece {
        WordPiece::Literal(s) => out.push_str(s),
        WordPiece::SingleQuoted(s) => {
            out.push('\'');
            out.push_str(s);
            out.push('\'');
        }
        WordPiece::DoubleQuoted(pieces) => {
            out.push('"');
            for inner in pieces {
                piece_text(inner, out);
            }
            out.push('"');
        }
        WordPiece::Escaped(s) => {
            out.push('\\');
            out.push_str(s);
        }
        WordPiece::Param(param) => {
            out.push_str("${");
            out.push_str(&param.name);
            out.push('}');
        }
        WordPiece::CommandSub { backquoted, .. } => {
            out.push_str(if *backquoted { "`…`" } else { "$(…)" });
        }
        WordPiece::ArithSub(_) => out.push_str("$((…))"),
        WordPiece::ProcessSub { direction, .. } => out.push_str(match direction {
            ProcessSubDirection::In => "<(…)",
            ProcessSubDirection::Out => ">(…)",
        }),
        WordPiece::Brace(_) => out.push_str("{…}"),
        WordPiece::Tilde { user } => {
            out.push('~');
            if let Some(user) = user {
                out.push_str(user);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_simple_command() {
        let script = Script::new(vec![Statement::single(Pipeline::single(Command::Simple(
            SimpleCommand {
                assignments: vec![],
                words: vec![Word::literal("echo"), Word::literal("hi")],
                redirects: vec![],
                line: 1,
            },
        )))]);
        let text = format_script(&script);
        assert!(text.contains("SimpleCommand"));
        assert!(text.contains("Word echo"));
        assert!(text.contains("Word hi"));
    }
}

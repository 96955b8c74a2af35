//! `[[ … ]]` evaluation
//!
//! String, file and numeric tests over expanded operands. No word
//! splitting or pathname expansion happens here; `==`/`!=` use the shared
//! glob matcher against the unexpanded-quoting pattern form, and `=~` goes
//! through the regex engine.

use crate::ast::types::{CondBinaryOp, CondExpr, CondUnaryOp};
use crate::exec::error::ExecError;
use crate::expand::{arith, pattern, Expander};
use crate::parser::arith::parse_arith;
use regex_lite::Regex;
use std::os::unix::fs::MetadataExt;
use std::os::unix::fs::PermissionsExt;

pub fn eval_cond(ex: &mut Expander, expr: &CondExpr) -> Result<bool, ExecError> {
    match expr {
        CondExpr::And(lhs, rhs) => Ok(eval_cond(ex, lhs)? && eval_cond(ex, rhs)?),
        CondExpr::Or(lhs, rhs) => Ok(eval_cond(ex, lhs)? || eval_cond(ex, rhs)?),
        CondExpr::Not(inner) => Ok(!eval_cond(ex, inner)?),
        CondExpr::Group(inner) => eval_cond(ex, inner),
        CondExpr::Bare(word) => Ok(!ex.expand_single(word)?.is_empty()),
        CondExpr::Unary { op, operand } => eval_unary(ex, *op, operand),
        CondExpr::Binary { op, lhs, rhs } => eval_binary(ex, *op, lhs, rhs),
    }
}

fn eval_unary(
    ex: &mut Expander,
    op: CondUnaryOp,
    operand: &crate::ast::types::Word,
) -> Result<bool, ExecError> {
    let arg = ex.expand_single(operand)?;
    let meta = || std::fs::metadata(&arg);
    let lmeta = || std::fs::symlink_metadata(&arg);

    Ok(match op {
        CondUnaryOp::Exists => meta().is_ok() || lmeta().is_ok(),
        CondUnaryOp::RegularFile => meta().map(|m| m.is_file()).unwrap_or(false),
        CondUnaryOp::Directory => meta().map(|m| m.is_dir()).unwrap_or(false),
        CondUnaryOp::Symlink => lmeta().map(|m| m.file_type().is_symlink()).unwrap_or(false),
        CondUnaryOp::NonEmptyFile => meta().map(|m| m.len() > 0).unwrap_or(false),
        CondUnaryOp::Readable => nix::unistd::access(arg.as_str(), nix::unistd::AccessFlags::R_OK)
            .is_ok(),
        CondUnaryOp::Writable => nix::unistd::access(arg.as_str(), nix::unistd::AccessFlags::W_OK)
            .is_ok(),
        CondUnaryOp::Executable => nix::unistd::access(arg.as_str(), nix::unistd::AccessFlags::X_OK)
            .is_ok(),
        CondUnaryOp::BlockSpecial => meta()
            .map(|m| (m.mode() & libc::S_IFMT) == libc::S_IFBLK)
            .unwrap_or(false),
        CondUnaryOp::CharSpecial => meta()
            .map(|m| (m.mode() & libc::S_IFMT) == libc::S_IFCHR)
            .unwrap_or(false),
        CondUnaryOp::Fifo => meta()
            .map(|m| (m.mode() & libc::S_IFMT) == libc::S_IFIFO)
            .unwrap_or(false),
        CondUnaryOp::Socket => meta()
            .map(|m| (m.mode() & libc::S_IFMT) == libc::S_IFSOCK)
            .unwrap_or(false),
        CondUnaryOp::SetUid => meta()
            .map(|m| m.permissions().mode() & 0o4000 != 0)
            .unwrap_or(false),
        CondUnaryOp::SetGid => meta()
            .map(|m| m.permissions().mode() & 0o2000 != 0)
            .unwrap_or(false),
        CondUnaryOp::Sticky => meta()
            .map(|m| m.permissions().mode() & 0o1000 != 0)
            .unwrap_or(false),
        CondUnaryOp::OwnedByEuid => meta()
            .map(|m| m.uid() == nix::unistd::geteuid().as_raw())
            .unwrap_or(false),
        CondUnaryOp::OwnedByEgid => meta()
            .map(|m| m.gid() == nix::unistd::getegid().as_raw())
            .unwrap_or(false),
        CondUnaryOp::Terminal => arg
            .parse::<i32>()
            .ok()
            .map(|fd| nix::unistd::isatty(fd).unwrap_or(false))
            .unwrap_or(false),
        CondUnaryOp::NonZeroString => !arg.is_empty(),
        CondUnaryOp::ZeroString => arg.is_empty(),
        CondUnaryOp::OptionSet => ex
            .state
            .options
            .get_by_name(&arg)
            .unwrap_or(false),
        CondUnaryOp::VarSet => ex.state.param_is_set(&arg),
    })
}

fn eval_binary(
    ex: &mut Expander,
    op: CondBinaryOp,
    lhs: &crate::ast::types::Word,
    rhs: &crate::ast::types::Word,
) -> Result<bool, ExecError> {
    match op {
        CondBinaryOp::Eq | CondBinaryOp::Ne => {
            let subject = ex.expand_single(lhs)?;
            let pat = ex.expand_pattern_word(rhs)?;
            let matched =
                pattern::pattern_match(&pat, &subject, ex.state.shopts.nocasematch);
            Ok(if op == CondBinaryOp::Eq { matched } else { !matched })
        }
        CondBinaryOp::Match => {
            let subject = ex.expand_single(lhs)?;
            let regex_text = ex.expand_single(rhs)?;
            let regex = Regex::new(&regex_text).map_err(|e| {
                ExecError::Expansion(format!("invalid regex `{}': {}", regex_text, e))
            })?;
            Ok(regex.is_match(&subject))
        }
        CondBinaryOp::Lt | CondBinaryOp::Gt => {
            let a = ex.expand_single(lhs)?;
            let b = ex.expand_single(rhs)?;
            Ok(if op == CondBinaryOp::Lt { a < b } else { a > b })
        }
        CondBinaryOp::NumEq
        | CondBinaryOp::NumNe
        | CondBinaryOp::NumLt
        | CondBinaryOp::NumLe
        | CondBinaryOp::NumGt
        | CondBinaryOp::NumGe => {
            let a = numeric_operand(ex, lhs)?;
            let b = numeric_operand(ex, rhs)?;
            Ok(match op {
                CondBinaryOp::NumEq => a == b,
                CondBinaryOp::NumNe => a != b,
                CondBinaryOp::NumLt => a < b,
                CondBinaryOp::NumLe => a <= b,
                CondBinaryOp::NumGt => a > b,
                _ => a >= b,
            })
        }
        CondBinaryOp::NewerThan | CondBinaryOp::OlderThan => {
            let a = ex.expand_single(lhs)?;
            let b = ex.expand_single(rhs)?;
            let ma = std::fs::metadata(&a).ok();
            let mb = std::fs::metadata(&b).ok();
            Ok(match (ma, mb) {
                (Some(ma), Some(mb)) => {
                    if op == CondBinaryOp::NewerThan {
                        ma.mtime() > mb.mtime()
                            || (ma.mtime() == mb.mtime() && ma.mtime_nsec() > mb.mtime_nsec())
                    } else {
                        ma.mtime() < mb.mtime()
                            || (ma.mtime() == mb.mtime() && ma.mtime_nsec() < mb.mtime_nsec())
                    }
                }
                // A missing file is older than any existing one.
                (Some(_), None) => op == CondBinaryOp::NewerThan,
                (None, Some(_)) => op == CondBinaryOp::OlderThan,
                (None, None) => false,
            })
        }
        CondBinaryOp::SameFile => {
            let a = ex.expand_single(lhs)?;
            let b = ex.expand_single(rhs)?;
            match (std::fs::metadata(&a), std::fs::metadata(&b)) {
                (Ok(ma), Ok(mb)) => Ok(ma.dev() == mb.dev() && ma.ino() == mb.ino()),
                _ => Ok(false),
            }
        }
    }
}

/// Numeric operands are arithmetic expressions.
fn numeric_operand(
    ex: &mut Expander,
    word: &crate::ast::types::Word,
) -> Result<i64, ExecError> {
    let text = ex.expand_single(word)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    let expr = parse_arith(trimmed)
        .map_err(|e| ExecError::Expansion(format!("{}: {}", trimmed, e)))?;
    arith::eval_arith(ex, &expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::cond::parse_cond_expr;
    use crate::state::ShellState;

    fn eval(state: &mut ShellState, text: &str) -> bool {
        let expr = parse_cond_expr(text).unwrap();
        let mut ex = Expander::new(state);
        eval_cond(&mut ex, &expr).unwrap()
    }

    #[test]
    fn string_tests() {
        let mut state = ShellState::new();
        state.vars.set_scalar("x", "hello").unwrap();
        assert!(eval(&mut state, "-n $x"));
        assert!(!eval(&mut state, "-z $x"));
        assert!(eval(&mut state, "$x == hello"));
        assert!(eval(&mut state, "$x == h*"));
        assert!(eval(&mut state, "$x != world"));
    }

    #[test]
    fn quoted_pattern_is_literal() {
        let mut state = ShellState::new();
        state.vars.set_scalar("x", "hstar").unwrap();
        assert!(!eval(&mut state, "$x == \"h*\""));
        state.vars.set_scalar("x", "h*").unwrap();
        assert!(eval(&mut state, "$x == \"h*\""));
    }

    #[test]
    fn regex_match() {
        let mut state = ShellState::new();
        state.vars.set_scalar("x", "abc123").unwrap();
        assert!(eval(&mut state, "$x =~ ^[a-c]+[0-9]+$"));
        assert!(!eval(&mut state, "$x =~ ^[0-9]+$"));
    }

    #[test]
    fn numeric_comparisons() {
        let mut state = ShellState::new();
        state.vars.set_scalar("n", "10").unwrap();
        assert!(eval(&mut state, "$n -eq 10"));
        assert!(eval(&mut state, "$n -gt 5"));
        assert!(eval(&mut state, "$n -le 10"));
        assert!(!eval(&mut state, "$n -lt 10"));
    }

    #[test]
    fn file_tests() {
        let mut state = ShellState::new();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, "data").unwrap();

        assert!(eval(&mut state, &format!("-e {}", file.display())));
        assert!(eval(&mut state, &format!("-f {}", file.display())));
        assert!(eval(&mut state, &format!("-s {}", file.display())));
        assert!(eval(&mut state, &format!("-d {}", dir.path().display())));
        assert!(!eval(&mut state, "-e /definitely/not/here"));
    }

    #[test]
    fn file_comparisons() {
        let mut state = ShellState::new();
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        std::fs::write(&a, "x").unwrap();
        assert!(eval(
            &mut state,
            &format!("{} -ef {}", a.display(), a.display())
        ));
    }

    #[test]
    fn logical_operators() {
        let mut state = ShellState::new();
        state.vars.set_scalar("x", "1").unwrap();
        assert!(eval(&mut state, "-n $x && $x == 1"));
        assert!(eval(&mut state, "-z $x || $x == 1"));
        assert!(eval(&mut state, "! -z $x"));
    }

    #[test]
    fn var_set_test() {
        let mut state = ShellState::new();
        assert!(!eval(&mut state, "-v somevar"));
        state.vars.set_scalar("somevar", "").unwrap();
        assert!(eval(&mut state, "-v somevar"));
    }

    #[test]
    fn nocasematch() {
        let mut state = ShellState::new();
        state.vars.set_scalar("x", "HELLO").unwrap();
        assert!(!eval(&mut state, "$x == hello"));
        state.shopts.nocasematch = true;
        assert!(eval(&mut state, "$x == hello"));
    }
}

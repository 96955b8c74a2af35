//! test / [ builtin
//!
//! The POSIX test expression language over plain arguments: string and
//! file unaries, `=`/`!=` (literal, no patterns), numeric comparisons,
//! `!`, parenthesized groups, and the deprecated `-a`/`-o` connectives.

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;
use std::os::unix::fs::MetadataExt;

pub fn test(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    run_test(state, &argv[1..])
}

pub fn bracket(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let args = &argv[1..];
    match args.last() {
        Some(close) if close == "]" => run_test(state, &args[..args.len() - 1]),
        _ => {
            eprintln!("rush: [: missing `]'");
            Ok(2)
        }
    }
}

fn run_test(state: &ShellState, args: &[String]) -> Result<i32, ExecError> {
    let mut parser = TestParser { args, pos: 0, state };
    if args.is_empty() {
        return Ok(1);
    }
    match parser.or_expr() {
        Ok(result) => {
            if parser.pos != args.len() {
                eprintln!("rush: test: too many arguments");
                return Ok(2);
            }
            Ok(if result { 0 } else { 1 })
        }
        Err(message) => {
            eprintln!("rush: test: {}", message);
            Ok(2)
        }
    }
}

struct TestParser<'a> {
    args: &'a [String],
    pos: usize,
    state: &'a ShellState,
}

impl<'a> TestParser<'a> {
    fn current(&self) -> Option<&str> {
        self.args.get(self.pos).map(|s| s.as_str())
    }

    fn bump(&mut self) -> Option<&'a str> {
        let value = self.args.get(self.pos).map(|s| s.as_str());
        if value.is_some() {
            self.pos += 1;
        }
        value
    }

    fn or_expr(&mut self) -> Result<bool, String> {
        let mut value = self.and_expr()?;
        while self.current() == Some("-o") {
            self.pos += 1;
            let rhs = self.and_expr()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn and_expr(&mut self) -> Result<bool, String> {
        let mut value = self.primary()?;
        while self.current() == Some("-a") {
            self.pos += 1;
            let rhs = self.primary()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn primary(&mut self) -> Result<bool, String> {
        match self.current() {
            None => Err("argument expected".to_string()),
            Some("!") => {
                self.pos += 1;
                Ok(!self.primary()?)
            }
            Some("(") => {
                self.pos += 1;
                let inner = self.or_expr()?;
                if self.bump() != Some(")") {
                    return Err("expected `)'".to_string());
                }
                Ok(inner)
            }
            Some(first) => {
                // Binary operator?
                if let Some(op) = self.args.get(self.pos + 1).map(|s| s.as_str()) {
                    if is_binary_op(op) && self.args.len() > self.pos + 2 {
                        let lhs = first.to_string();
                        let rhs = self.args[self.pos + 2].clone();
                        self.pos += 3;
                        return binary(self.state, &lhs, op, &rhs);
                    }
                }
                // Unary operator with operand?
                if first.starts_with('-') && first.len() == 2 {
                    if let Some(operand) = self.args.get(self.pos + 1).cloned() {
                        let op = first.to_string();
                        self.pos += 2;
                        return unary(self.state, &op, &operand);
                    }
                }
                // Bare string: true when non-empty.
                let value = !first.is_empty();
                self.pos += 1;
                Ok(value)
            }
        }
    }
}

fn is_binary_op(op: &str) -> bool {
    matches!(
        op,
        "=" | "==" | "!=" | "-eq" | "-ne" | "-lt" | "-le" | "-gt" | "-ge" | "-nt" | "-ot" | "-ef"
    )
}

fn binary(_state: &ShellState, lhs: &str, op: &str, rhs: &str) -> Result<bool, String> {
    match op {
        "=" | "==" => Ok(lhs == rhs),
        "!=" => Ok(lhs != rhs),
        "-eq" | "-ne" | "-lt" | "-le" | "-gt" | "-ge" => {
            let a = parse_number(lhs)?;
            let b = parse_number(rhs)?;
            Ok(match op {
                "-eq" => a == b,
                "-ne" => a != b,
                "-lt" => a < b,
                "-le" => a <= b,
                "-gt" => a > b,
                _ => a >= b,
            })
        }
        "-nt" | "-ot" => {
            let ma = std::fs::metadata(lhs).ok();
            let mb = std::fs::metadata(rhs).ok();
            Ok(match (ma, mb) {
                (Some(ma), Some(mb)) => {
                    if op == "-nt" {
                        ma.mtime() > mb.mtime()
                    } else {
                        ma.mtime() < mb.mtime()
                    }
                }
                (Some(_), None) => op == "-nt",
                (None, Some(_)) => op == "-ot",
                (None, None) => false,
            })
        }
        "-ef" => match (std::fs::metadata(lhs), std::fs::metadata(rhs)) {
            (Ok(ma), Ok(mb)) => Ok(ma.dev() == mb.dev() && ma.ino() == mb.ino()),
            _ => Ok(false),
        },
        _ => Err(format!("{}: unknown operator", op)),
    }
}

fn unary(state: &ShellState, op: &str, arg: &str) -> Result<bool, String> {
    let meta = || std::fs::metadata(arg);
    Ok(match op {
        "-n" => !arg.is_empty(),
        "-z" => arg.is_empty(),
        "-e" | "-a" => meta().is_ok() || std::fs::symlink_metadata(arg).is_ok(),
        "-f" => meta().map(|m| m.is_file()).unwrap_or(false),
        "-d" => meta().map(|m| m.is_dir()).unwrap_or(false),
        "-s" => meta().map(|m| m.len() > 0).unwrap_or(false),
        "-h" | "-L" => std::fs::symlink_metadata(arg)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false),
        "-r" => nix::unistd::access(arg, nix::unistd::AccessFlags::R_OK).is_ok(),
        "-w" => nix::unistd::access(arg, nix::unistd::AccessFlags::W_OK).is_ok(),
        "-x" => nix::unistd::access(arg, nix::unistd::AccessFlags::X_OK).is_ok(),
        "-b" => meta()
            .map(|m| (m.mode() & libc::S_IFMT) == libc::S_IFBLK)
            .unwrap_or(false),
        "-c" => meta()
            .map(|m| (m.mode() & libc::S_IFMT) == libc::S_IFCHR)
            .unwrap_or(false),
        "-p" => meta()
            .map(|m| (m.mode() & libc::S_IFMT) == libc::S_IFIFO)
            .unwrap_or(false),
        "-S" => meta()
            .map(|m| (m.mode() & libc::S_IFMT) == libc::S_IFSOCK)
            .unwrap_or(false),
        "-t" => arg
            .parse::<i32>()
            .ok()
            .map(|fd| nix::unistd::isatty(fd).unwrap_or(false))
            .unwrap_or(false),
        "-v" => state.param_is_set(arg),
        "-o" => state.options.get_by_name(arg).unwrap_or(false),
        _ => return Err(format!("{}: unary operator expected", op)),
    })
}

fn parse_number(text: &str) -> Result<i64, String> {
    text.trim()
        .parse()
        .map_err(|_| format!("{}: integer expression expected", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(state: &ShellState, args: &[&str]) -> i32 {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        run_test(state, &args).unwrap()
    }

    #[test]
    fn string_tests() {
        let state = ShellState::new();
        assert_eq!(check(&state, &["hello"]), 0);
        assert_eq!(check(&state, &[""]), 1);
        assert_eq!(check(&state, &["-n", "x"]), 0);
        assert_eq!(check(&state, &["-z", ""]), 0);
        assert_eq!(check(&state, &["a", "=", "a"]), 0);
        assert_eq!(check(&state, &["a", "!=", "b"]), 0);
    }

    #[test]
    fn numeric_tests() {
        let state = ShellState::new();
        assert_eq!(check(&state, &["3", "-lt", "5"]), 0);
        assert_eq!(check(&state, &["5", "-ge", "5"]), 0);
        assert_eq!(check(&state, &["3", "-eq", "4"]), 1);
        // Non-numeric operand is a usage error.
        assert_eq!(check(&state, &["x", "-eq", "4"]), 2);
    }

    #[test]
    fn negation_and_connectives() {
        let state = ShellState::new();
        assert_eq!(check(&state, &["!", ""]), 0);
        assert_eq!(check(&state, &["a", "-a", "b"]), 0);
        assert_eq!(check(&state, &["", "-o", "b"]), 0);
        assert_eq!(check(&state, &["", "-a", "b"]), 1);
        assert_eq!(check(&state, &["(", "a", ")"]), 0);
    }

    #[test]
    fn empty_is_false() {
        let state = ShellState::new();
        assert_eq!(check(&state, &[]), 1);
    }

    #[test]
    fn file_tests() {
        let state = ShellState::new();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, "x").unwrap();
        let path = file.to_string_lossy().to_string();
        assert_eq!(check(&state, &["-f", &path]), 0);
        assert_eq!(check(&state, &["-d", &path]), 1);
        assert_eq!(check(&state, &["-e", "/no/such/path"]), 1);
    }
}

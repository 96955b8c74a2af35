//! read builtin
//!
//! Reads from stdin (fd 0, so redirections apply), splits on IFS into the
//! named variables, REPLY by default. Supports `-r`, `-p prompt`,
//! `-a array`, `-d delim`, `-n count`, and `-s` (accepted; echo control is
//! the terminal layer's business).

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::expand::split::split_fields;
use crate::state::{ShellState, Value};
use std::io::Write;

pub fn read(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let mut raw = false;
    let mut prompt: Option<String> = None;
    let mut array: Option<String> = None;
    let mut delim = b'\n';
    let mut max_chars: Option<usize> = None;
    let mut names: Vec<String> = Vec::new();

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "-r" => raw = true,
            "-s" => {}
            "-p" => {
                i += 1;
                prompt = argv.get(i).cloned();
            }
            "-a" => {
                i += 1;
                array = argv.get(i).cloned();
            }
            "-d" => {
                i += 1;
                delim = argv
                    .get(i)
                    .and_then(|d| d.bytes().next())
                    .unwrap_or(b'\0');
            }
            "-n" | "-N" => {
                i += 1;
                max_chars = argv.get(i).and_then(|n| n.parse().ok());
            }
            "--" => {
                i += 1;
                break;
            }
            arg if arg.starts_with('-') => {
                return crate::builtins::usage("read", &format!("{}: invalid option", arg));
            }
            _ => break,
        }
        i += 1;
    }
    names.extend(argv[i..].iter().cloned());

    if let Some(prompt) = prompt {
        eprint!("{}", prompt);
        let _ = std::io::stderr().flush();
    }

    let (line, eof) = read_until(delim, max_chars, raw);

    let ifs = state.ifs();
    let set = |state: &mut ShellState, name: &str, value: String| {
        state
            .vars
            .set_scalar(name, value)
            .map_err(|e| ExecError::Expansion(e.to_string()))
    };

    if let Some(array_name) = array {
        let fields = split_fields(&line, &ifs);
        state
            .vars
            .set(
                &array_name,
                Value::Indexed(fields.into_iter().map(Some).collect()),
            )
            .map_err(|e| ExecError::Expansion(e.to_string()))?;
    } else if names.is_empty() {
        set(state, "REPLY", line)?;
    } else {
        // Split into n fields; the last name takes the remainder.
        let mut fields = split_fields(&line, &ifs);
        for (idx, name) in names.iter().enumerate() {
            let value = if idx + 1 == names.len() {
                let rest: Vec<String> = fields.drain(..).collect();
                rest.join(" ")
            } else if fields.is_empty() {
                String::new()
            } else {
                fields.remove(0)
            };
            set(state, name, value)?;
        }
    }

    Ok(if eof { 1 } else { 0 })
}

/// Read bytes from fd 0 up to the delimiter, EOF, or a character budget.
/// Without `-r`, backslash-newline continues the line and backslash quotes
/// the next character. Returns (text, hit_eof_before_any_delimiter).
fn read_until(delim: u8, max_chars: Option<usize>, raw: bool) -> (String, bool) {
    let mut bytes = Vec::new();
    let mut eof = false;
    let mut buf = [0u8; 1];

    loop {
        if let Some(max) = max_chars {
            if bytes.len() >= max {
                break;
            }
        }
        match nix::unistd::read(libc::STDIN_FILENO, &mut buf) {
            Ok(0) => {
                eof = true;
                break;
            }
            Ok(_) => {
                let b = buf[0];
                if !raw && b == b'\\' {
                    let mut next = [0u8; 1];
                    match nix::unistd::read(libc::STDIN_FILENO, &mut next) {
                        Ok(0) => {
                            eof = true;
                            break;
                        }
                        Ok(_) => {
                            // Backslash-newline disappears; everything else
                            // is taken literally.
                            if next[0] != b'\n' {
                                bytes.push(next[0]);
                            }
                            continue;
                        }
                        Err(_) => break,
                    }
                }
                if b == delim {
                    break;
                }
                bytes.push(b);
            }
            Err(nix::errno::Errno::EINTR) => continue,
            Err(_) => break,
        }
    }

    // EOF before the delimiter fails the read even when data arrived.
    (String::from_utf8_lossy(&bytes).into_owned(), eof)
}

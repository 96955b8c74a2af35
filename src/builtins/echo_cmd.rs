//! echo builtin
//!
//! `-n` suppresses the newline, `-e` enables escapes, `-E` disables them.

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;
use std::io::Write;

pub fn echo(
    _exec: &mut Executor,
    _state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let mut newline = true;
    let mut escapes = false;
    let mut i = 1;

    while i < argv.len() {
        match argv[i].as_str() {
            "-n" => newline = false,
            "-e" => escapes = true,
            "-E" => escapes = false,
            // Combined flags like -ne.
            flag if flag.starts_with('-')
                && flag.len() > 1
                && flag.chars().skip(1).all(|c| matches!(c, 'n' | 'e' | 'E')) =>
            {
                for c in flag.chars().skip(1) {
                    match c {
                        'n' => newline = false,
                        'e' => escapes = true,
                        _ => escapes = false,
                    }
                }
            }
            _ => break,
        }
        i += 1;
    }

    let mut out = String::new();
    let mut suppress_newline = false;
    for (idx, arg) in argv[i..].iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        if escapes {
            let (text, stop) = decode_escapes(arg);
            out.push_str(&text);
            if stop {
                suppress_newline = true;
                break;
            }
        } else {
            out.push_str(arg);
        }
    }

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let _ = handle.write_all(out.as_bytes());
    if newline && !suppress_newline {
        let _ = handle.write_all(b"\n");
    }
    let _ = handle.flush();
    Ok(0)
}

/// Decode `echo -e` escapes; the bool reports a `\c` (stop output).
fn decode_escapes(text: &str) -> (String, bool) {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        i += 1;
        match chars[i] {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'e' | 'E' => out.push('\x1b'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '\\' => out.push('\\'),
            'c' => return (out, true),
            '0' => {
                let mut value = 0u32;
                let mut taken = 0;
                while taken < 3 {
                    match chars.get(i + 1).and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            i += 1;
                            taken += 1;
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            'x' => {
                let mut value = 0u32;
                let mut taken = 0;
                while taken < 2 {
                    match chars.get(i + 1).and_then(|c| c.to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            i += 1;
                            taken += 1;
                        }
                        None => break,
                    }
                }
                if taken == 0 {
                    out.push_str("\\x");
                } else {
                    out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        i += 1;
    }
    (out, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_decoding() {
        assert_eq!(decode_escapes("a\\tb\\n"), ("a\tb\n".to_string(), false));
        assert_eq!(decode_escapes("\\x41\\0102"), ("AB".to_string(), false));
        assert_eq!(decode_escapes("stop\\chere"), ("stop".to_string(), true));
        assert_eq!(decode_escapes("\\q"), ("\\q".to_string(), false));
    }
}

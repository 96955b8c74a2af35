//! printf builtin
//!
//! Standard conversions with flags, width and precision; the format string
//! cycles until all arguments are consumed. `%q` quotes for reuse as shell
//! input. Missing arguments read as empty / zero.

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;
use std::io::Write;

pub fn printf(
    _exec: &mut Executor,
    _state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    if argv.len() < 2 {
        return crate::builtins::usage("printf", "usage: printf format [arguments]");
    }
    let format = &argv[1];
    let args = &argv[2..];

    let mut out = String::new();
    let mut arg_index = 0;
    let mut status = 0;

    loop {
        let consumed = render_once(format, args, &mut arg_index, &mut out, &mut status);
        if !consumed || arg_index >= args.len() {
            break;
        }
    }

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let _ = handle.write_all(out.as_bytes());
    let _ = handle.flush();
    Ok(status)
}

/// Render the format once. Returns whether any conversion consumed an
/// argument (cycling stops otherwise).
fn render_once(
    format: &str,
    args: &[String],
    arg_index: &mut usize,
    out: &mut String,
    status: &mut i32,
) -> bool {
    let chars: Vec<char> = format.chars().collect();
    let mut consumed = false;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                i += 1;
                match chars[i] {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'a' => out.push('\x07'),
                    'b' => out.push('\x08'),
                    'f' => out.push('\x0c'),
                    'v' => out.push('\x0b'),
                    'e' => out.push('\x1b'),
                    '\\' => out.push('\\'),
                    '"' => out.push('"'),
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
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
                i += 1;
            }
            '%' => {
                if chars.get(i + 1) == Some(&'%') {
                    out.push('%');
                    i += 2;
                    continue;
                }
                let (spec, next) = parse_spec(&chars, i);
                i = next;
                let Some(spec) = spec else {
                    out.push('%');
                    continue;
                };
                let arg = args.get(*arg_index).cloned();
                if arg.is_some() {
                    *arg_index += 1;
                    consumed = true;
                }
                format_one(&spec, arg.as_deref().unwrap_or(""), out, status);
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    consumed
}

struct Spec {
    minus: bool,
    zero: bool,
    plus: bool,
    space: bool,
    width: usize,
    precision: Option<usize>,
    conv: char,
}

fn parse_spec(chars: &[char], start: usize) -> (Option<Spec>, usize) {
    let mut i = start + 1; // past '%'
    let mut spec = Spec {
        minus: false,
        zero: false,
        plus: false,
        space: false,
        width: 0,
        precision: None,
        conv: 's',
    };

    while let Some(&c) = chars.get(i) {
        match c {
            '-' => spec.minus = true,
            '0' => spec.zero = true,
            '+' => spec.plus = true,
            ' ' => spec.space = true,
            '#' => {}
            _ => break,
        }
        i += 1;
    }
    while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
        spec.width = spec.width * 10 + d as usize;
        i += 1;
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        let mut precision = 0usize;
        while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
            precision = precision * 10 + d as usize;
            i += 1;
        }
        spec.precision = Some(precision);
    }
    match chars.get(i) {
        Some(&conv) if "sdicuxXofeEgGq".contains(conv) => {
            spec.conv = conv;
            (Some(spec), i + 1)
        }
        _ => (None, start + 1),
    }
}

fn format_one(spec: &Spec, arg: &str, out: &mut String, status: &mut i32) {
    let text = match spec.conv {
        's' => {
            let mut s = arg.to_string();
            if let Some(p) = spec.precision {
                s.truncate(p.min(s.chars().count()));
            }
            s
        }
        'q' => quote_for_shell(arg),
        'c' => arg.chars().next().map(|c| c.to_string()).unwrap_or_default(),
        'd' | 'i' => {
            let n = parse_int(arg, status);
            let body = n.abs().to_string();
            let sign = if n < 0 {
                "-"
            } else if spec.plus {
                "+"
            } else if spec.space {
                " "
            } else {
                ""
            };
            return pad_numeric(spec, sign, &body, out);
        }
        'u' => {
            let n = parse_int(arg, status).max(0);
            return pad_numeric(spec, "", &n.to_string(), out);
        }
        'x' => {
            let n = parse_int(arg, status);
            return pad_numeric(spec, "", &format!("{:x}", n), out);
        }
        'X' => {
            let n = parse_int(arg, status);
            return pad_numeric(spec, "", &format!("{:X}", n), out);
        }
        'o' => {
            let n = parse_int(arg, status);
            return pad_numeric(spec, "", &format!("{:o}", n), out);
        }
        'f' | 'e' | 'E' | 'g' | 'G' => {
            let value: f64 = arg.trim().parse().unwrap_or_else(|_| {
                if !arg.trim().is_empty() {
                    *status = 1;
                }
                0.0
            });
            let precision = spec.precision.unwrap_or(6);
            match spec.conv {
                'f' => format!("{:.*}", precision, value),
                'e' => format!("{:.*e}", precision, value),
                'E' => format!("{:.*E}", precision, value),
                _ => format!("{}", value),
            }
        }
        _ => arg.to_string(),
    };

    pad(spec, &text, out);
}

fn pad(spec: &Spec, text: &str, out: &mut String) {
    let len = text.chars().count();
    if len >= spec.width {
        out.push_str(text);
        return;
    }
    let fill = spec.width - len;
    if spec.minus {
        out.push_str(text);
        out.extend(std::iter::repeat(' ').take(fill));
    } else {
        out.extend(std::iter::repeat(' ').take(fill));
        out.push_str(text);
    }
}

fn pad_numeric(spec: &Spec, sign: &str, body: &str, out: &mut String) {
    let len = sign.len() + body.chars().count();
    if len >= spec.width {
        out.push_str(sign);
        out.push_str(body);
        return;
    }
    let fill = spec.width - len;
    if spec.minus {
        out.push_str(sign);
        out.push_str(body);
        out.extend(std::iter::repeat(' ').take(fill));
    } else if spec.zero {
        out.push_str(sign);
        out.extend(std::iter::repeat('0').take(fill));
        out.push_str(body);
    } else {
        out.extend(std::iter::repeat(' ').take(fill));
        out.push_str(sign);
        out.push_str(body);
    }
}

fn parse_int(arg: &str, status: &mut i32) -> i64 {
    let trimmed = arg.trim();
    if trimmed.is_empty() {
        return 0;
    }
    // Leading-character forms: 'a is the codepoint of a.
    if let Some(rest) = trimmed.strip_prefix('\'').or_else(|| trimmed.strip_prefix('"')) {
        return rest.chars().next().map(|c| c as i64).unwrap_or(0);
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        if let Ok(n) = i64::from_str_radix(hex, 16) {
            return n;
        }
    }
    match trimmed.parse::<i64>() {
        Ok(n) => n,
        Err(_) => {
            *status = 1;
            0
        }
    }
}

/// `%q`: quote so the result re-reads as one word.
fn quote_for_shell(text: &str) -> String {
    if text.is_empty() {
        return "''".to_string();
    }
    if text
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_-./:=%+@^".contains(c))
    {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(format: &str, args: &[&str]) -> String {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut out = String::new();
        let mut idx = 0;
        let mut status = 0;
        loop {
            let consumed = render_once(format, &args, &mut idx, &mut out, &mut status);
            if !consumed || idx >= args.len() {
                break;
            }
        }
        out
    }

    #[test]
    fn strings_and_newlines() {
        assert_eq!(run("%s\\n", &["hi"]), "hi\n");
        assert_eq!(run("[%5s]", &["ab"]), "[   ab]");
        assert_eq!(run("[%-5s]", &["ab"]), "[ab   ]");
        assert_eq!(run("%.2s", &["abcdef"]), "ab");
    }

    #[test]
    fn integers() {
        assert_eq!(run("%d", &["42"]), "42");
        assert_eq!(run("%05d", &["42"]), "00042");
        assert_eq!(run("%x/%X/%o", &["255", "255", "8"]), "ff/FF/10");
        assert_eq!(run("%d", &["-7"]), "-7");
    }

    #[test]
    fn floats() {
        assert_eq!(run("%.2f", &["3.14159"]), "3.14");
    }

    #[test]
    fn cycling_format() {
        assert_eq!(run("%s-", &["a", "b", "c"]), "a-b-c-");
    }

    #[test]
    fn percent_literal() {
        assert_eq!(run("100%%", &[]), "100%");
    }

    #[test]
    fn quoting() {
        assert_eq!(quote_for_shell("plain"), "plain");
        assert_eq!(quote_for_shell("two words"), "'two words'");
        assert_eq!(quote_for_shell("it's"), "'it'\\''s'");
    }

    #[test]
    fn char_codes() {
        let mut status = 0;
        assert_eq!(parse_int("'A", &mut status), 65);
        assert_eq!(status, 0);
    }
}

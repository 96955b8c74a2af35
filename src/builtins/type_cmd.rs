//! type builtin
//!
//! Reports how a name would be resolved: alias, keyword, function,
//! builtin, or file.

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;

const KEYWORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "while", "until", "do", "done", "for", "case", "esac",
    "in", "function", "select", "time", "{", "}", "[[", "]]", "!",
];

pub fn type_cmd(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let mut name_only = false;
    let mut names: Vec<&String> = Vec::new();
    for arg in &argv[1..] {
        match arg.as_str() {
            "-t" => name_only = true,
            "-a" | "-p" | "-P" => {}
            _ => names.push(arg),
        }
    }

    let mut status = 0;
    for name in names {
        if let Some(value) = state.aliases.get(name.as_str()) {
            if name_only {
                println!("alias");
            } else {
                println!("{} is aliased to `{}'", name, value);
            }
            continue;
        }
        if KEYWORDS.contains(&name.as_str()) {
            if name_only {
                println!("keyword");
            } else {
                println!("{} is a shell keyword", name);
            }
            continue;
        }
        if state.functions.contains_key(name.as_str()) {
            if name_only {
                println!("function");
            } else {
                println!("{} is a function", name);
            }
            continue;
        }
        if crate::builtins::is_builtin(name) {
            if name_only {
                println!("builtin");
            } else {
                println!("{} is a shell builtin", name);
            }
            continue;
        }
        match find_on_path(state, name) {
            Some(path) => {
                if name_only {
                    println!("file");
                } else {
                    println!("{} is {}", name, path);
                }
            }
            None => {
                if !name_only {
                    eprintln!("rush: type: {}: not found", name);
                }
                status = 1;
            }
        }
    }
    Ok(status)
}

fn find_on_path(state: &ShellState, name: &str) -> Option<String> {
    if name.contains('/') {
        return std::fs::metadata(name).ok().map(|_| name.to_string());
    }
    let path = state.vars.get_string("PATH").unwrap_or_default();
    for dir in path.split(':') {
        let dir = if dir.is_empty() { "." } else { dir };
        let candidate = format!("{}/{}", dir, name);
        if nix::unistd::access(candidate.as_str(), nix::unistd::AccessFlags::X_OK).is_ok() {
            return Some(candidate);
        }
    }
    None
}

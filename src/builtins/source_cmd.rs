//! source / `.` builtin
//!
//! Reads and executes a file in the current shell. Relative names without
//! a slash are searched on PATH first, per POSIX, then the current
//! directory. Extra arguments become the positional parameters for the
//! duration; `return` terminates sourcing with its status.

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::input::preprocess::strip_line_continuations;
use crate::state::ShellState;

pub fn source(
    exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let Some(name) = argv.get(1) else {
        return crate::builtins::usage(&argv[0], "filename argument required");
    };

    let path = match find_script(state, name) {
        Some(path) => path,
        None => {
            eprintln!("rush: {}: {}: No such file or directory", argv[0], name);
            return Ok(1);
        }
    };

    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("rush: {}: {}: {}", argv[0], name, err);
            return Ok(1);
        }
    };

    run_sourced(exec, state, &text, &argv[2..])
}

pub(crate) fn run_sourced(
    exec: &mut Executor,
    state: &mut ShellState,
    text: &str,
    args: &[String],
) -> Result<i32, ExecError> {
    let preprocessed = strip_line_continuations(text);
    let script = match crate::parser::parse_with_aliases(&preprocessed, &state.aliases) {
        Ok(script) => script,
        Err(err) => {
            eprintln!("rush: {}", err);
            return Ok(2);
        }
    };

    let saved_positional = if args.is_empty() {
        None
    } else {
        Some(std::mem::replace(&mut state.positional, args.to_vec()))
    };

    state.source_depth += 1;
    let result = exec.run_script(state, &script);
    state.source_depth -= 1;

    if let Some(saved) = saved_positional {
        state.positional = saved;
    }

    match result {
        Ok(status) => Ok(status),
        // `return` ends the sourcing, not the shell.
        Err(ExecError::Return(code)) => Ok(code),
        Err(other) => Err(other),
    }
}

fn find_script(state: &ShellState, name: &str) -> Option<String> {
    if name.contains('/') {
        return std::fs::metadata(name).ok().map(|_| name.to_string());
    }
    let path = state.vars.get_string("PATH").unwrap_or_default();
    for dir in path.split(':') {
        let dir = if dir.is_empty() { "." } else { dir };
        let candidate = format!("{}/{}", dir, name);
        if std::fs::metadata(&candidate).map(|m| m.is_file()).unwrap_or(false) {
            return Some(candidate);
        }
    }
    // Fall back to the current directory, as bash does outside POSIX mode.
    std::fs::metadata(name).ok().map(|_| name.to_string())
}

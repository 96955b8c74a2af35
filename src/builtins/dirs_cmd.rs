//! pushd / popd / dirs builtins
//!
//! The directory stack: the current directory is conceptually the top;
//! `pushd` with no argument swaps the top two entries.

use crate::builtins::cd_cmd::change_directory;
use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;
use std::path::PathBuf;

pub fn pushd(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let current = current_dir(state);

    match argv.get(1) {
        Some(dir) => {
            let status = change_directory(state, dir, false)?;
            if status != 0 {
                return Ok(status);
            }
            state.dir_stack.push(PathBuf::from(current));
        }
        None => {
            let Some(previous) = state.dir_stack.pop() else {
                eprintln!("rush: pushd: no other directory");
                return Ok(1);
            };
            let status =
                change_directory(state, &previous.to_string_lossy(), false)?;
            if status != 0 {
                state.dir_stack.push(previous);
                return Ok(status);
            }
            state.dir_stack.push(PathBuf::from(current));
        }
    }
    print_stack(state);
    Ok(0)
}

pub fn popd(
    _exec: &mut Executor,
    state: &mut ShellState,
    _argv: &[String],
) -> Result<i32, ExecError> {
    let Some(target) = state.dir_stack.pop() else {
        eprintln!("rush: popd: directory stack empty");
        return Ok(1);
    };
    let status = change_directory(state, &target.to_string_lossy(), false)?;
    if status == 0 {
        print_stack(state);
    }
    Ok(status)
}

pub fn dirs(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    if argv.get(1).map(|a| a.as_str()) == Some("-c") {
        state.dir_stack.clear();
        return Ok(0);
    }
    print_stack(state);
    Ok(0)
}

fn current_dir(state: &ShellState) -> String {
    state
        .vars
        .get_string("PWD")
        .or_else(|| {
            std::env::current_dir()
                .ok()
                .map(|p| p.to_string_lossy().into_owned())
        })
        .unwrap_or_default()
}

fn print_stack(state: &ShellState) {
    let home = state.vars.get_string("HOME");
    let shorten = |path: &str| -> String {
        match &home {
            Some(home) if path.starts_with(home.as_str()) => {
                format!("~{}", &path[home.len()..])
            }
            _ => path.to_string(),
        }
    };

    let mut parts = vec![shorten(&current_dir(state))];
    for dir in state.dir_stack.iter().rev() {
        parts.push(shorten(&dir.to_string_lossy()));
    }
    println!("{}", parts.join(" "));
}

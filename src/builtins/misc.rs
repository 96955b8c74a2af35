//! Trivial builtins: `:`, `true`, `false`, plus the argument-checking
//! fallbacks for `break`/`continue` (the parser handles the literal
//! forms; these catch non-numeric or excess arguments).

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;

pub fn colon(_exec: &mut Executor, _state: &mut ShellState, _argv: &[String]) -> Result<i32, ExecError> {
    Ok(0)
}

pub fn true_cmd(
    _exec: &mut Executor,
    _state: &mut ShellState,
    _argv: &[String],
) -> Result<i32, ExecError> {
    Ok(0)
}

pub fn false_cmd(
    _exec: &mut Executor,
    _state: &mut ShellState,
    _argv: &[String],
) -> Result<i32, ExecError> {
    Ok(1)
}

pub fn break_cmd(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    loop_control(state, argv, true)
}

pub fn continue_cmd(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    loop_control(state, argv, false)
}

fn loop_control(state: &mut ShellState, argv: &[String], is_break: bool) -> Result<i32, ExecError> {
    let name = &argv[0];
    if argv.len() > 2 {
        eprintln!("rush: {}: too many arguments", name);
        return Ok(1);
    }
    let level = match argv.get(1) {
        None => 1,
        Some(text) => match text.parse::<u32>() {
            Ok(n) if n >= 1 => n,
            _ => {
                eprintln!("rush: {}: {}: numeric argument required", name, text);
                return Ok(1);
            }
        },
    };
    if state.loop_depth == 0 {
        eprintln!(
            "rush: {}: only meaningful in a `for', `while', or `until' loop",
            name
        );
        return Ok(0);
    }
    let level = level.min(state.loop_depth);
    if is_break {
        Err(ExecError::Break(level))
    } else {
        Err(ExecError::Continue(level))
    }
}

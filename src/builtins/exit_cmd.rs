//! exit and return builtins

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;

pub fn exit(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let code = match argv.get(1) {
        None => state.last_status,
        Some(text) => match text.parse::<i32>() {
            Ok(n) => n & 0xff,
            Err(_) => {
                eprintln!("rush: exit: {}: numeric argument required", text);
                2
            }
        },
    };
    Err(ExecError::Exit(code))
}

pub fn return_cmd(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    if !state.in_function() && state.source_depth == 0 {
        eprintln!("rush: return: can only `return' from a function or sourced script");
        return Ok(1);
    }
    let code = match argv.get(1) {
        None => state.last_status,
        Some(text) => match text.parse::<i32>() {
            Ok(n) => n & 0xff,
            Err(_) => {
                eprintln!("rush: return: {}: numeric argument required", text);
                return Ok(2);
            }
        },
    };
    Err(ExecError::Return(code))
}

//! shift builtin

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;

pub fn shift(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let count = match argv.get(1) {
        None => 1,
        Some(text) => match text.parse::<usize>() {
            Ok(n) => n,
            Err(_) => {
                eprintln!("rush: shift: {}: numeric argument required", text);
                return Ok(1);
            }
        },
    };

    if count > state.positional.len() {
        return Ok(1);
    }
    state.positional.drain(..count);
    Ok(0)
}

//! unset builtin

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;

pub fn unset(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let mut functions_only = false;
    let mut variables_only = false;
    let mut names: Vec<&String> = Vec::new();

    for arg in &argv[1..] {
        match arg.as_str() {
            "-f" => functions_only = true,
            "-v" => variables_only = true,
            _ => names.push(arg),
        }
    }

    let mut status = 0;
    for name in names {
        if functions_only {
            if let Some(function) = state.functions.get(name.as_str()) {
                if function.readonly {
                    eprintln!("rush: unset: {}: cannot unset: readonly function", name);
                    status = 1;
                    continue;
                }
            }
            state.functions.remove(name.as_str());
            continue;
        }

        match state.vars.unset(name) {
            Ok(()) => {
                // Without -v, a variable miss falls through to functions.
                if !variables_only {
                    state.functions.remove(name.as_str());
                }
            }
            Err(err) => {
                eprintln!("rush: unset: {}", err);
                status = 1;
            }
        }
    }
    Ok(status)
}

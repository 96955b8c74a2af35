//! alias and unalias builtins

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;

pub fn alias(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    if argv.len() == 1 {
        for (name, value) in &state.aliases {
            println!("alias {}='{}'", name, value);
        }
        return Ok(0);
    }

    let mut status = 0;
    for arg in &argv[1..] {
        match arg.find('=') {
            Some(eq) => {
                let name = arg[..eq].to_string();
                let value = arg[eq + 1..].to_string();
                state.aliases.insert(name, value);
            }
            None => match state.aliases.get(arg.as_str()) {
                Some(value) => println!("alias {}='{}'", arg, value),
                None => {
                    eprintln!("rush: alias: {}: not found", arg);
                    status = 1;
                }
            },
        }
    }
    Ok(status)
}

pub fn unalias(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    if argv.get(1).map(|a| a.as_str()) == Some("-a") {
        state.aliases.clear();
        return Ok(0);
    }

    let mut status = 0;
    for name in &argv[1..] {
        if state.aliases.shift_remove(name.as_str()).is_none() {
            eprintln!("rush: unalias: {}: not found", name);
            status = 1;
        }
    }
    Ok(status)
}

//! set builtin
//!
//! Toggles shell options by flag or `-o name`, replaces the positional
//! parameters after `--`, and with no arguments lists variables. The
//! `set -o` / `set +o` listings round-trip.

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::{ShellState, Value};

pub fn set(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    if argv.len() == 1 {
        for (name, var) in state.vars.visible() {
            if let Some(Value::Scalar(value)) = &var.value {
                println!("{}={}", name, value);
            }
        }
        return Ok(0);
    }

    let mut i = 1;
    while i < argv.len() {
        let arg = argv[i].as_str();
        match arg {
            "--" => {
                state.positional = argv[i + 1..].to_vec();
                return Ok(0);
            }
            "-o" | "+o" => {
                let enable = arg.starts_with('-');
                match argv.get(i + 1) {
                    None => {
                        if enable {
                            print!("{}", state.options.listing());
                        } else {
                            print!("{}", state.options.restore_commands());
                        }
                    }
                    Some(name) => {
                        if let Err(err) = state.options.set_by_name(name, enable) {
                            eprintln!("rush: set: {}", err);
                            return Ok(2);
                        }
                        i += 1;
                    }
                }
            }
            _ if arg.starts_with('-') || arg.starts_with('+') => {
                let enable = arg.starts_with('-');
                for flag in arg.chars().skip(1) {
                    if let Err(err) = state.options.set_by_flag(flag, enable) {
                        eprintln!("rush: set: {}", err);
                        return Ok(2);
                    }
                }
            }
            _ => {
                // First non-option argument starts the new positionals.
                state.positional = argv[i..].to_vec();
                return Ok(0);
            }
        }
        i += 1;
    }
    Ok(0)
}

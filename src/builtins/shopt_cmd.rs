//! shopt builtin

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::{options::ShoptOptions, ShellState};

pub fn shopt(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let mut mode: Option<bool> = None;
    let mut quiet = false;
    let mut names: Vec<&String> = Vec::new();

    for arg in &argv[1..] {
        match arg.as_str() {
            "-s" => mode = Some(true),
            "-u" => mode = Some(false),
            "-q" => quiet = true,
            "-p" => {}
            _ => names.push(arg),
        }
    }

    if names.is_empty() {
        for name in ShoptOptions::NAMES {
            let value = state.shopts.get_by_name(name).unwrap();
            match mode {
                Some(want) if value != want => continue,
                _ => {}
            }
            if !quiet {
                println!("{}\t{}", name, if value { "on" } else { "off" });
            }
        }
        return Ok(0);
    }

    let mut status = 0;
    for name in names {
        match mode {
            Some(value) => {
                if let Err(err) = state.shopts.set_by_name(name, value) {
                    eprintln!("rush: shopt: {}", err);
                    status = 1;
                }
            }
            None => match state.shopts.get_by_name(name) {
                Some(value) => {
                    if !quiet {
                        println!("{}\t{}", name, if value { "on" } else { "off" });
                    }
                    if !value {
                        status = 1;
                    }
                }
                None => {
                    eprintln!("rush: shopt: {}: invalid shell option name", name);
                    status = 1;
                }
            },
        }
    }
    Ok(status)
}

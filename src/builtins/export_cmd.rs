//! export and readonly builtins

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::{ShellState, Value};

pub fn export(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let mut unexport = false;
    let mut args: Vec<&String> = Vec::new();
    for arg in &argv[1..] {
        match arg.as_str() {
            "-n" => unexport = true,
            "-p" => {}
            _ => args.push(arg),
        }
    }

    if args.is_empty() {
        for (name, var) in state.vars.visible() {
            if var.attrs.exported {
                match &var.value {
                    Some(Value::Scalar(value)) => {
                        println!("declare -x {}=\"{}\"", name, escape_value(value))
                    }
                    _ => println!("declare -x {}", name),
                }
            }
        }
        return Ok(0);
    }

    let mut status = 0;
    for arg in args {
        let (name, value) = split_assignment(arg);
        if !crate::parser::lexer::is_valid_name(name) {
            eprintln!("rush: export: `{}': not a valid identifier", arg);
            status = 1;
            continue;
        }
        if let Some(value) = value {
            if let Err(err) = state.vars.set_scalar(name, value) {
                eprintln!("rush: export: {}", err);
                status = 1;
                continue;
            }
        }
        if unexport {
            state.vars.set_attr(name, |a| a.exported = false);
        } else {
            state.vars.export(name);
        }
    }
    Ok(status)
}

pub fn readonly(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let args: Vec<&String> = argv[1..].iter().filter(|a| a.as_str() != "-p").collect();

    if args.is_empty() {
        for (name, var) in state.vars.visible() {
            if var.attrs.readonly {
                match &var.value {
                    Some(Value::Scalar(value)) => {
                        println!("declare -r {}=\"{}\"", name, escape_value(value))
                    }
                    _ => println!("declare -r {}", name),
                }
            }
        }
        return Ok(0);
    }

    let mut status = 0;
    for arg in args {
        let (name, value) = split_assignment(arg);
        if !crate::parser::lexer::is_valid_name(name) {
            eprintln!("rush: readonly: `{}': not a valid identifier", arg);
            status = 1;
            continue;
        }
        if let Some(value) = value {
            if let Err(err) = state.vars.set_scalar(name, value) {
                eprintln!("rush: readonly: {}", err);
                status = 1;
                continue;
            }
        }
        state.vars.make_readonly(name);
    }
    Ok(status)
}

fn split_assignment(arg: &str) -> (&str, Option<&str>) {
    match arg.find('=') {
        Some(eq) => (&arg[..eq], Some(&arg[eq + 1..])),
        None => (arg, None),
    }
}

pub(crate) fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

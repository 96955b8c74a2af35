//! declare / typeset / local builtins
//!
//! Attribute management (-r readonly, -x export, -i integer, -a indexed,
//! -A associative) plus assignment; `local` targets the current function
//! scope and is an error outside one.

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::{ShellState, Value};

#[derive(Default)]
struct Flags {
    readonly: bool,
    export: bool,
    integer: bool,
    indexed: bool,
    assoc: bool,
    print: bool,
    /// `+x`-style removals.
    unexport: bool,
}

pub fn declare(
    exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    run_declare(exec, state, argv, false)
}

pub fn local(
    exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    if !state.in_function() {
        eprintln!("rush: local: can only be used in a function");
        return Ok(1);
    }
    run_declare(exec, state, argv, true)
}

fn run_declare(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
    local_scope: bool,
) -> Result<i32, ExecError> {
    let mut flags = Flags::default();
    let mut args: Vec<&String> = Vec::new();

    for arg in &argv[1..] {
        match arg.as_str() {
            "-r" => flags.readonly = true,
            "-x" => flags.export = true,
            "+x" => flags.unexport = true,
            "-i" => flags.integer = true,
            "-a" => flags.indexed = true,
            "-A" => flags.assoc = true,
            "-p" => flags.print = true,
            "-g" | "--" => {}
            a if a.starts_with('-') || a.starts_with('+') => {
                eprintln!("rush: {}: {}: invalid option", argv[0], a);
                return Ok(2);
            }
            _ => args.push(arg),
        }
    }

    if args.is_empty() {
        for (name, var) in state.vars.visible() {
            print_declaration(&name, var);
        }
        return Ok(0);
    }

    let mut status = 0;
    for arg in args {
        let (name, value) = match arg.find('=') {
            Some(eq) => (&arg[..eq], Some(arg[eq + 1..].to_string())),
            None => (arg.as_str(), None),
        };
        if !crate::parser::lexer::is_valid_name(name) {
            eprintln!("rush: {}: `{}': not a valid identifier", argv[0], arg);
            status = 1;
            continue;
        }

        if flags.print {
            match state.vars.get(name) {
                Some(var) => print_declaration(name, var),
                None => {
                    eprintln!("rush: {}: {}: not found", argv[0], name);
                    status = 1;
                }
            }
            continue;
        }

        let value = match value {
            Some(text) if flags.integer => {
                match crate::parser::arith::parse_arith(&text) {
                    Ok(expr) => {
                        let mut ex = crate::expand::Expander::new(state);
                        match crate::expand::arith::eval_arith(&mut ex, &expr) {
                            Ok(n) => Some(n.to_string()),
                            Err(err) => {
                                eprintln!("rush: {}: {}", argv[0], err);
                                status = 1;
                                continue;
                            }
                        }
                    }
                    Err(err) => {
                        eprintln!("rush: {}: {}", argv[0], err);
                        status = 1;
                        continue;
                    }
                }
            }
            other => other,
        };

        let result = if local_scope {
            state
                .vars
                .set_local(name, value.map(Value::scalar))
        } else if let Some(value) = value {
            state.vars.set_scalar(name, value)
        } else if state.vars.get(name).is_none() {
            // Declaration without assignment.
            if flags.assoc {
                state.vars.set(name, Value::Assoc(Default::default()))
            } else if flags.indexed {
                state.vars.set(name, Value::Indexed(Vec::new()))
            } else {
                state.vars.set_local(name, None)
            }
        } else {
            Ok(())
        };
        if let Err(err) = result {
            eprintln!("rush: {}: {}", argv[0], err);
            status = 1;
            continue;
        }

        // Seed container types when requested on a fresh name.
        if flags.assoc
            && state.vars.get(name).map_or(true, |v| v.value.is_none())
        {
            let _ = state.vars.set(name, Value::Assoc(Default::default()));
        }
        if flags.indexed
            && state.vars.get(name).map_or(true, |v| v.value.is_none())
        {
            let _ = state.vars.set(name, Value::Indexed(Vec::new()));
        }

        state.vars.set_attr(name, |attrs| {
            if flags.readonly {
                attrs.readonly = true;
            }
            if flags.export {
                attrs.exported = true;
            }
            if flags.unexport {
                attrs.exported = false;
            }
            if flags.integer {
                attrs.integer = true;
            }
        });
    }
    Ok(status)
}

fn print_declaration(name: &str, var: &crate::state::Variable) {
    let mut attrs = String::new();
    if matches!(var.value, Some(Value::Indexed(_))) {
        attrs.push('a');
    }
    if matches!(var.value, Some(Value::Assoc(_))) {
        attrs.push('A');
    }
    if var.attrs.integer {
        attrs.push('i');
    }
    if var.attrs.readonly {
        attrs.push('r');
    }
    if var.attrs.exported {
        attrs.push('x');
    }
    let flag = if attrs.is_empty() {
        "--".to_string()
    } else {
        format!("-{}", attrs)
    };

    match &var.value {
        None => println!("declare {} {}", flag, name),
        Some(Value::Scalar(value)) => println!(
            "declare {} {}=\"{}\"",
            flag,
            name,
            crate::builtins::export_cmd::escape_value(value)
        ),
        Some(Value::Indexed(items)) => {
            let body: Vec<String> = items
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.as_ref().map(|v| format!("[{}]=\"{}\"", i, v)))
                .collect();
            println!("declare {} {}=({})", flag, name, body.join(" "));
        }
        Some(Value::Assoc(map)) => {
            let body: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("[{}]=\"{}\"", k, v))
                .collect();
            println!("declare {} {}=({})", flag, name, body.join(" "));
        }
    }
}

//! Simple command execution
//!
//! Expansion of argv and assignments, temporary assignment scope, command
//! resolution (special builtins, functions, regular builtins, PATH), and
//! fork/exec of external programs with the exit-status conventions
//! (127 not found, 126 not executable, 128+N signal death).

use crate::ast::types::*;
use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::exec::{process_sub, redirect};
use crate::expand::Expander;
use crate::jobs::signals;
use crate::state::{ShellState, Value, Variable};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execve, fork, ForkResult, Pid};
use std::ffi::CString;

impl Executor {
    pub(crate) fn run_simple(
        &mut self,
        state: &mut ShellState,
        simple: &SimpleCommand,
    ) -> Result<i32, ExecError> {
        state.current_line = simple.line;

        let mut ex = Expander::new(state);
        let argv = ex.expand_words(&simple.words)?;
        let procsubs = std::mem::take(&mut ex.procsubs);
        drop(ex);

        let result = self.run_simple_expanded(state, simple, argv);
        process_sub::reap(procsubs);
        result
    }

    fn run_simple_expanded(
        &mut self,
        state: &mut ShellState,
        simple: &SimpleCommand,
        argv: Vec<String>,
    ) -> Result<i32, ExecError> {
        // Assignment-only command: assignments persist in the current
        // scope; $? reflects any command substitution that ran.
        if argv.is_empty() {
            let has_sub = simple
                .assignments
                .iter()
                .any(assignment_has_command_sub);
            for assignment in &simple.assignments {
                apply_assignment(state, assignment, false)?;
            }
            if !simple.redirects.is_empty() {
                let mut ex = Expander::new(state);
                match redirect::apply_redirects(&mut ex, &simple.redirects, false) {
                    Ok(guard) => drop(guard),
                    Err(ExecError::Redirect(msg)) => {
                        eprintln!("rush: {}", msg);
                        return Ok(1);
                    }
                    Err(other) => return Err(other),
                }
            }
            // $? comes from a command substitution if one ran, else 0.
            return Ok(if has_sub { state.last_status } else { 0 });
        }

        if state.options.xtrace {
            let ps4 = state.vars.get_string("PS4").unwrap_or_else(|| "+ ".into());
            eprintln!("{}{}", ps4, argv.join(" "));
        }

        // Temporary assignments, visible only to this command.
        let saved = save_assignments(state, &simple.assignments);
        for assignment in &simple.assignments {
            apply_assignment(state, assignment, true)?;
        }

        let result = self.dispatch(state, &argv, &simple.redirects);

        restore_assignments(state, saved);
        result
    }

    fn dispatch(
        &mut self,
        state: &mut ShellState,
        argv: &[String],
        redirects: &[Redirect],
    ) -> Result<i32, ExecError> {
        let name = argv[0].as_str();

        // `exec` manipulates this shell's own fds; its redirections are
        // permanent and it never forks.
        if name == "exec" {
            return self.run_exec_builtin(state, argv, redirects);
        }

        if let Some(builtin) = crate::builtins::lookup_special(name) {
            return self.run_builtin(state, builtin, argv, redirects);
        }

        if state.functions.contains_key(name) {
            return self.call_function(state, name, &argv[1..], redirects);
        }

        if let Some(builtin) = crate::builtins::lookup_regular(name) {
            return self.run_builtin(state, builtin, argv, redirects);
        }

        self.run_external(state, argv, redirects)
    }

    fn run_builtin(
        &mut self,
        state: &mut ShellState,
        builtin: crate::builtins::BuiltinFn,
        argv: &[String],
        redirects: &[Redirect],
    ) -> Result<i32, ExecError> {
        let guard = {
            let mut ex = Expander::new(state);
            match redirect::apply_redirects(&mut ex, redirects, false) {
                Ok(guard) => guard,
                Err(ExecError::Redirect(msg)) => {
                    eprintln!("rush: {}", msg);
                    return Ok(1);
                }
                Err(other) => return Err(other),
            }
        };
        let result = builtin(self, state, argv);
        drop(guard);
        result
    }

    fn run_exec_builtin(
        &mut self,
        state: &mut ShellState,
        argv: &[String],
        redirects: &[Redirect],
    ) -> Result<i32, ExecError> {
        {
            let mut ex = Expander::new(state);
            match redirect::apply_redirects(&mut ex, redirects, true) {
                Ok(guard) => drop(guard),
                Err(ExecError::Redirect(msg)) => {
                    eprintln!("rush: {}", msg);
                    return Ok(1);
                }
                Err(other) => return Err(other),
            }
        }

        if argv.len() == 1 {
            return Ok(0);
        }

        // Replace the shell image entirely.
        let path = match resolve_command_path(state, &argv[1]) {
            Resolution::Found(path) => path,
            Resolution::NotExecutable(path) => {
                eprintln!("rush: exec: {}: cannot execute", path);
                return exec_failure(state, 126);
            }
            Resolution::NotFound => {
                eprintln!("rush: exec: {}: not found", argv[1]);
                return exec_failure(state, 127);
            }
        };
        let err = do_execve(&path, &argv[1..], &state.child_environ());
        eprintln!("rush: exec: {}: {}", argv[1], err.desc());
        exec_failure(state, if err == nix::errno::Errno::EACCES { 126 } else { 127 })
    }

    pub(crate) fn call_function(
        &mut self,
        state: &mut ShellState,
        name: &str,
        args: &[String],
        call_redirects: &[Redirect],
    ) -> Result<i32, ExecError> {
        let function = state.functions.get(name).cloned().unwrap();

        let guard = {
            let mut ex = Expander::new(state);
            let mut all = function.redirects.clone();
            all.extend_from_slice(call_redirects);
            match redirect::apply_redirects(&mut ex, &all, false) {
                Ok(guard) => guard,
                Err(ExecError::Redirect(msg)) => {
                    eprintln!("rush: {}", msg);
                    return Ok(1);
                }
                Err(other) => return Err(other),
            }
        };

        state.push_function(name, args.to_vec());
        let saved_loop_depth = std::mem::take(&mut state.loop_depth);
        let result = self.run_compound(state, &function.body);
        state.loop_depth = saved_loop_depth;
        state.pop_function();
        drop(guard);

        match result {
            Ok(status) => Ok(status),
            Err(ExecError::Return(code)) => Ok(code),
            Err(other) => Err(other),
        }
    }

    fn run_external(
        &mut self,
        state: &mut ShellState,
        argv: &[String],
        redirects: &[Redirect],
    ) -> Result<i32, ExecError> {
        let path = match resolve_command_path(state, &argv[0]) {
            Resolution::Found(path) => path,
            Resolution::NotExecutable(path) => {
                eprintln!("rush: {}: permission denied", path);
                return Ok(126);
            }
            Resolution::NotFound => {
                eprintln!("rush: {}: command not found", argv[0]);
                return Ok(127);
            }
        };

        let interactive_fg = state.interactive && !state.in_forked_child;

        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                signals::reset_for_child();
                if interactive_fg {
                    let _ = nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0));
                }
                state.in_forked_child = true;
                {
                    let mut ex = Expander::new(state);
                    if let Err(err) = redirect::apply_redirects(&mut ex, redirects, true) {
                        eprintln!("rush: {}", err);
                        crate::exec::command_sub::flush_and_exit(1);
                    }
                }
                let err = do_execve(&path, argv, &state.child_environ());
                let status = match err {
                    nix::errno::Errno::ENOENT => 127,
                    nix::errno::Errno::EACCES => 126,
                    _ => 1,
                };
                eprintln!("rush: {}: {}", argv[0], err.desc());
                crate::exec::command_sub::flush_and_exit(status);
            }
            Ok(ForkResult::Parent { child }) => {
                if interactive_fg {
                    let _ = nix::unistd::setpgid(child, child);
                    signals::give_terminal_to(child);
                }
                let status = wait_for_foreground(state, child);
                if interactive_fg {
                    signals::reclaim_terminal();
                }
                Ok(status)
            }
            Err(e) => {
                eprintln!("rush: fork failed: {}", e);
                Ok(1)
            }
        }
    }
}

/// Wait for one foreground child, retrying on EINTR.
pub(crate) fn wait_for_foreground(state: &mut ShellState, pid: Pid) -> i32 {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return code,
            Ok(WaitStatus::Signaled(_, sig, _)) => {
                if sig == nix::sys::signal::Signal::SIGINT && state.interactive {
                    eprintln!();
                }
                return 128 + sig as i32;
            }
            Err(nix::errno::Errno::EINTR) => continue,
            Err(_) => return 1,
            Ok(_) => continue,
        }
    }
}

enum Resolution {
    Found(String),
    NotExecutable(String),
    NotFound,
}

/// PATH resolution, or a direct path when the name contains a slash.
fn resolve_command_path(state: &ShellState, name: &str) -> Resolution {
    if name.contains('/') {
        return classify_candidate(name);
    }

    let path = state.vars.get_string("PATH").unwrap_or_default();
    let mut not_executable = None;
    for dir in path.split(':') {
        let dir = if dir.is_empty() { "." } else { dir };
        let candidate = format!("{}/{}", dir, name);
        match classify_candidate(&candidate) {
            Resolution::Found(p) => return Resolution::Found(p),
            Resolution::NotExecutable(p) => {
                not_executable.get_or_insert(p);
            }
            Resolution::NotFound => {}
        }
    }
    match not_executable {
        Some(p) => Resolution::NotExecutable(p),
        None => Resolution::NotFound,
    }
}

fn classify_candidate(path: &str) -> Resolution {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(_) => return Resolution::NotFound,
    };
    if meta.is_dir() {
        return Resolution::NotExecutable(path.to_string());
    }
    if nix::unistd::access(path, nix::unistd::AccessFlags::X_OK).is_ok() {
        Resolution::Found(path.to_string())
    } else {
        Resolution::NotExecutable(path.to_string())
    }
}

fn do_execve(path: &str, argv: &[String], env: &[String]) -> nix::errno::Errno {
    let c_path = match CString::new(path) {
        Ok(p) => p,
        Err(_) => return nix::errno::Errno::ENOENT,
    };
    let c_argv: Vec<CString> = argv
        .iter()
        .filter_map(|a| CString::new(a.as_str()).ok())
        .collect();
    let c_env: Vec<CString> = env
        .iter()
        .filter_map(|e| CString::new(e.as_str()).ok())
        .collect();
    match execve(&c_path, &c_argv, &c_env) {
        Ok(infallible) => match infallible {},
        Err(err) => err,
    }
}

/// `exec` failure: interactive shells survive, scripts die.
fn exec_failure(state: &ShellState, status: i32) -> Result<i32, ExecError> {
    if state.interactive {
        Ok(status)
    } else {
        Err(ExecError::Exit(status))
    }
}

// =============================================================================
// ASSIGNMENTS
// =============================================================================

fn assignment_has_command_sub(assignment: &Assignment) -> bool {
    fn word_has(word: &Word) -> bool {
        word.pieces.iter().any(piece_has)
    }
    fn piece_has(piece: &WordPiece) -> bool {
        match piece {
            WordPiece::CommandSub { .. } => true,
            WordPiece::DoubleQuoted(inner) => inner.iter().any(piece_has),
            _ => false,
        }
    }
    assignment.value.as_ref().map(word_has).unwrap_or(false)
        || assignment
            .array
            .as_ref()
            .map(|words| words.iter().any(word_has))
            .unwrap_or(false)
}

/// Snapshot the variables a command's prefix assignments will touch.
pub(crate) fn save_assignments(
    state: &ShellState,
    assignments: &[Assignment],
) -> Vec<(String, Option<Variable>)> {
    assignments
        .iter()
        .map(|a| (a.name.clone(), state.vars.get(&a.name).cloned()))
        .collect()
}

pub(crate) fn restore_assignments(
    state: &mut ShellState,
    saved: Vec<(String, Option<Variable>)>,
) {
    for (name, old) in saved.into_iter().rev() {
        match old {
            Some(var) => {
                let _ = state.vars.unset(&name);
                if let Some(value) = var.value.clone() {
                    let _ = state.vars.set(&name, value);
                }
                state.vars.set_attr(&name, |attrs| *attrs = var.attrs);
            }
            None => {
                let _ = state.vars.unset(&name);
            }
        }
    }
}

/// Perform one assignment. `temp` marks command-prefix assignments, which
/// are exported so the command sees them.
pub(crate) fn apply_assignment(
    state: &mut ShellState,
    assignment: &Assignment,
    temp: bool,
) -> Result<(), ExecError> {
    let map_err = |e: crate::state::VarError| ExecError::Expansion(e.to_string());

    if let Some(elements) = &assignment.array {
        let mut ex = Expander::new(state);
        let mut expanded = Vec::new();
        for element in elements {
            // Array literals split and glob like argv words.
            expanded.extend(ex.expand_word_fields(element)?);
        }
        drop(ex);

        // `([key]=value …)` form fills keys; otherwise sequential indices.
        let keyed = expanded
            .iter()
            .all(|e| e.starts_with('[') && e.contains("]="));
        if keyed && !expanded.is_empty() {
            if !assignment.append {
                state
                    .vars
                    .set(&assignment.name, Value::Assoc(Default::default()))
                    .map_err(map_err)?;
            }
            for element in &expanded {
                let close = element.find("]=").unwrap();
                let key = &element[1..close];
                let value = &element[close + 2..];
                state
                    .vars
                    .set_key(&assignment.name, key, value.to_string())
                    .map_err(map_err)?;
            }
        } else if assignment.append {
            let mut items: Vec<Option<String>> = match state
                .vars
                .get(&assignment.name)
                .and_then(|v| v.value.as_ref())
            {
                Some(Value::Indexed(items)) => items.clone(),
                Some(other) => vec![Some(other.as_scalar())],
                None => Vec::new(),
            };
            items.extend(expanded.into_iter().map(Some));
            state
                .vars
                .set(&assignment.name, Value::Indexed(items))
                .map_err(map_err)?;
        } else {
            state
                .vars
                .set(
                    &assignment.name,
                    Value::Indexed(expanded.into_iter().map(Some).collect()),
                )
                .map_err(map_err)?;
        }
    } else {
        let value = {
            let mut ex = Expander::new(state);
            match &assignment.value {
                Some(word) => ex.expand_assignment_value(word)?,
                None => String::new(),
            }
        };

        if let Some(index_word) = &assignment.index {
            let mut ex = Expander::new(state);
            let index_text = ex.expand_single(index_word)?;
            drop(ex);
            let is_assoc = matches!(
                state.vars.get(&assignment.name).and_then(|v| v.value.as_ref()),
                Some(Value::Assoc(_))
            );
            if is_assoc {
                let old = state
                    .vars
                    .get(&assignment.name)
                    .and_then(|v| v.value.as_ref())
                    .and_then(|v| v.get_key(&index_text))
                    .unwrap_or_default();
                let new = if assignment.append {
                    format!("{}{}", old, value)
                } else {
                    value
                };
                state
                    .vars
                    .set_key(&assignment.name, &index_text, new)
                    .map_err(map_err)?;
            } else {
                let expr = crate::parser::arith::parse_arith(&index_text)
                    .map_err(|e| ExecError::Expansion(format!("bad subscript: {}", e)))?;
                let mut ex = Expander::new(state);
                let index = crate::expand::arith::eval_arith(&mut ex, &expr)?;
                drop(ex);
                let new = if assignment.append {
                    let old = state
                        .vars
                        .get(&assignment.name)
                        .and_then(|v| v.value.as_ref())
                        .and_then(|v| v.get_index(index))
                        .unwrap_or_default();
                    format!("{}{}", old, value)
                } else {
                    value
                };
                state
                    .vars
                    .set_index(&assignment.name, index, new)
                    .map_err(map_err)?;
            }
        } else {
            let integer = state
                .vars
                .get(&assignment.name)
                .map(|v| v.attrs.integer)
                .unwrap_or(false);
            let value = if integer {
                let expr = crate::parser::arith::parse_arith(&value)
                    .map_err(|e| ExecError::Expansion(e))?;
                let mut ex = Expander::new(state);
                let n = crate::expand::arith::eval_arith(&mut ex, &expr)?;
                drop(ex);
                n.to_string()
            } else {
                value
            };

            let new = if assignment.append {
                let old = state.vars.get_string(&assignment.name).unwrap_or_default();
                format!("{}{}", old, value)
            } else {
                value
            };
            state.vars.set_scalar(&assignment.name, new).map_err(map_err)?;
        }
    }

    if temp || state.options.allexport {
        state.vars.export(&assignment.name);
    }
    Ok(())
}
